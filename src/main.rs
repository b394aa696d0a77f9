//! `scaffold` CLI entry point
//!
//! Parses the command line, runs the command and turns errors into
//! user-facing messages with suggestions.
//!
//! - `install` - Scan template content or restore packages
//! - `list` - List templates matching a query
//! - `show` - Resolve a query to one template
//! - `cache` - Inspect or clean the template caches

use anyhow::Result;
use clap::Parser;
use scaffold_cli::cli;
use scaffold_cli::core::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
