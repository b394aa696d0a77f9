//! Integration test suite for scaffold
//!
//! End-to-end tests that install template content into a temporary base
//! directory and exercise caches, resolution and the `scaffold` binary.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **cli**: The `scaffold` binary driven through `assert_cmd`
//! - **resolution**: Queries resolved against installed templates
//! - **scan_and_cache**: Installs and the per-locale cache documents they write
//! - **settings**: Settings persistence and template loading

mod cli;
mod resolution;
mod scan_and_cache;
mod settings;

use scaffold_cli::config::EngineConfig;
use scaffold_cli::engine::Engine;
use scaffold_cli::environment::Host;
use scaffold_cli::filesystem::PhysicalFileSystem;
use scaffold_cli::test_utils::TestEnvironment;
use std::sync::Arc;

/// Engine over `env` for a host with the given locale and default language.
pub fn engine_for(env: &TestEnvironment, locale: Option<&str>, default_language: Option<&str>) -> Engine {
    let host = Host::new("scaffold")
        .with_locale(locale.map(str::to_string))
        .with_default_language(default_language.map(str::to_string));
    Engine::with_environment(EngineConfig::default(), env.environment_with(host, Arc::new(PhysicalFileSystem)))
}

/// Wildcard request installing every directory below the templates directory.
pub fn all_templates(env: &TestEnvironment) -> String {
    format!("{}/*", env.templates_dir().display())
}
