//! scaffold - template discovery and resolution
//!
//! Finds templates in directories, archives and restored content packages,
//! records them in per-locale template caches and resolves user queries to
//! the one template that should be invoked.
//!
//! # Architecture Overview
//!
//! Everything the engine knows lives below one base directory:
//!
//! ```text
//! <base>/
//!   settings.json                 mount points, install units, components, probing paths
//!   templatecache.json            culture-neutral cache
//!   de-DE.templatecache.json      one cache per locale
//!   content/                      component directories copied out of archives
//!   packages/                     archives and restored content packages
//!   scratch/                      restore workspace, removed afterwards
//! ```
//!
//! Content is reached through [`mount`] points. The [`scanner`] walks mounted
//! content for template definitions and hands them to [`generator`]s, which
//! turn each definition into a [`template::TemplateInfo`]. The
//! [`template_cache`] merges the results into one document per locale, and
//! [`resolution`] filters and disambiguates cached templates for a query.
//!
//! # Core Modules
//!
//! - [`engine`] - One session over a base directory, the entry point for the CLI
//! - [`settings`] - Persistent settings and the loader the other modules share
//! - [`mount`] - Folder and zip mount points
//! - [`components`] - Registry of generators and mount point factories
//! - [`scanner`] - Install-time discovery of templates and localizations
//! - [`template_cache`] - Per-locale template caches
//! - [`resolution`] - Match predicates, disambiguation and user help
//! - [`installer`] - Local paths and `name::version` package restores
//! - [`install_unit`] - Package identity of archive mount points
//! - [`trie`] - Byte-level token matching for template processors
//!
//! ## Supporting Modules
//!
//! - [`config`] - `config.toml` loading
//! - [`core`] - Error types and user-facing error formatting
//! - [`environment`] - Host description and non-critical error reporting
//! - [`filesystem`] - File system abstraction
//! - [`paths`] - Well-known locations below the base directory
//! - [`utils`] - Retry backoff and atomic writes
//!
//! # Example
//!
//! ```rust,no_run
//! use scaffold_cli::config::EngineConfig;
//! use scaffold_cli::engine::{Engine, Resolution};
//! use scaffold_cli::resolution::TemplateQuery;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let engine = Engine::from_config(EngineConfig::default())?;
//! engine.install(&["./templates/*"]).await?;
//!
//! if let Resolution::Template(info) = engine.resolve(&TemplateQuery::named("console"))? {
//!     println!("{} ({})", info.name, info.identity);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod engine;
pub mod environment;
pub mod filesystem;
pub mod paths;
pub mod utils;

pub mod components;
pub mod generator;
pub mod mount;
pub mod settings;
pub mod template;

pub mod install_unit;
pub mod installer;
pub mod resolution;
pub mod scanner;
pub mod template_cache;
pub mod trie;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
