//! Test utilities for the scaffold engine
//!
//! This module provides helpers for writing tests: template fixtures, zip
//! archive construction, isolated engine environments and a file system that
//! fails on demand.
//!
//! # Example
//!
//! ```rust,no_run
//! use scaffold_cli::test_utils::{TemplateFixture, TestEnvironment};
//!
//! let env = TestEnvironment::new().unwrap();
//! TemplateFixture::new("Console.CSharp", "Console App")
//!     .short_name("console")
//!     .write(&env.templates_dir().join("console"))
//!     .unwrap();
//! let loader = env.loader();
//! ```

pub mod environment;
pub mod fixtures;

pub use environment::{FlakyFileSystem, TestEnvironment};
pub use fixtures::{ComponentManifestFixture, TemplateFixture};

use std::io::{Cursor, Write};
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use zip::write::SimpleFileOptions;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Respects `RUST_LOG` when set, or uses the provided level. Without either,
/// no subscriber is installed.
///
/// ```bash
/// RUST_LOG=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}

/// Builds an in-memory zip archive from `(name, content)` pairs.
///
/// Names ending in `/` become directory entries.
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    for (name, content) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, options).expect("Failed to add zip directory");
        } else {
            writer.start_file(*name, options).expect("Failed to start zip entry");
            writer.write_all(content).expect("Failed to write zip entry");
        }
    }

    writer.finish().expect("Failed to finish zip archive").into_inner()
}
