//! Command-line interface for the `scaffold` binary.
//!
//! # Available Commands
//!
//! - `install` - Scan local template content or restore `name::version` packages
//! - `list` - List cached templates matching a query
//! - `show` - Resolve a query to one template and print its details
//! - `cache` - Inspect or clean the template caches
//!
//! # Global Options
//!
//! - `--verbose` - Enable debug output
//! - `--quiet` - Suppress everything except errors
//! - `--config` - Path to a custom `config.toml`
//!
//! # Example
//!
//! ```bash
//! scaffold install ./templates/* Contoso.Templates::1.2.0
//! scaffold list console --language C#
//! scaffold show console --param Framework=net9
//! scaffold cache clean
//! ```

mod cache;
mod install;
mod list;
mod show;

use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::resolution::TemplateQuery;
use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Main CLI structure for the `scaffold` binary.
#[derive(Parser, Debug)]
#[command(
    name = "scaffold",
    about = "Discover, catalogue and resolve project templates",
    version,
    long_about = "scaffold scans directories, archives and content packages for templates and keeps a localized catalogue of them."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress everything except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true, env = crate::config::CONFIG_PATH_ENV)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Install template content from paths, wildcards or packages
    Install(install::InstallCommand),

    /// List templates matching a query
    List(list::ListCommand),

    /// Resolve a query to one template and show it
    Show(show::ShowCommand),

    /// Inspect or clean the template caches
    Cache(cache::CacheCommand),
}

/// Query arguments shared by `list` and `show`.
#[derive(Args, Debug, Clone, Default)]
pub struct QueryArgs {
    /// Template name, short name or classification
    pub name: Option<String>,

    /// Only templates authored in this language
    #[arg(short, long)]
    pub language: Option<String>,

    /// Only templates of this type (project, item, ...)
    #[arg(short = 't', long = "type")]
    pub type_filter: Option<String>,

    /// Template parameter as NAME or NAME=VALUE, repeatable
    #[arg(short, long = "param", value_name = "NAME[=VALUE]")]
    pub params: Vec<String>,

    /// Do not prefer the configured default language
    #[arg(long)]
    pub no_default_language: bool,
}

impl QueryArgs {
    /// Converts the arguments into a resolution query.
    pub fn to_query(&self) -> Result<TemplateQuery> {
        let mut parameters = Vec::with_capacity(self.params.len());
        for param in &self.params {
            let (name, value) = match param.split_once('=') {
                Some((name, value)) => (name.trim(), Some(value.to_string())),
                None => (param.trim(), None),
            };
            if name.is_empty() {
                bail!("Invalid parameter '{param}': expected NAME or NAME=VALUE");
            }
            parameters.push((name.to_string(), value));
        }

        Ok(TemplateQuery {
            name: self.name.clone(),
            language: self.language.clone(),
            type_filter: self.type_filter.clone(),
            parameters,
            default_language: None,
            suppress_default_language_filter: self.no_default_language,
        })
    }
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` wins when set. Otherwise `--verbose` logs debug output, `--quiet`
/// only errors and the default is warnings.
pub fn init_logging(verbose: bool, quiet: bool) {
    let default = if verbose {
        "scaffold_cli=debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

impl Cli {
    /// Loads the configuration, builds the engine and runs the command.
    pub async fn execute(self) -> Result<()> {
        init_logging(self.verbose, self.quiet);

        let config = EngineConfig::load_with_optional(self.config.clone()).await?;
        let engine = Engine::from_config(config)?;
        self.execute_with_engine(&engine).await
    }

    /// Runs the command against an existing engine.
    pub async fn execute_with_engine(self, engine: &Engine) -> Result<()> {
        match self.command {
            Commands::Install(cmd) => cmd.execute(engine, self.quiet).await,
            Commands::List(cmd) => cmd.execute(engine),
            Commands::Show(cmd) => cmd.execute(engine),
            Commands::Cache(cmd) => cmd.execute(engine),
        }
    }
}
