//! Install template content.
//!
//! ```bash
//! # A directory, an archive and every pack-* directory below ./vendor
//! scaffold install ./my-template ./templates.zip "./vendor/pack-*"
//!
//! # A remote package, restored by the configured restore tool
//! scaffold install Contoso.Templates::1.2.0
//! ```

use crate::engine::Engine;
use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;

/// Command to install template content.
#[derive(Args, Debug)]
pub struct InstallCommand {
    /// Paths, wildcard paths or `name::version` packages
    #[arg(required = true)]
    requests: Vec<String>,
}

impl InstallCommand {
    pub async fn execute(self, engine: &Engine, quiet: bool) -> Result<()> {
        let host = engine.environment().host();
        let already_reported = host.non_critical_errors().len();

        let report = engine.install(&self.requests).await?;

        let problems = host.non_critical_errors().split_off(already_reported);
        for problem in &problems {
            eprintln!("{}: {}", "warning".yellow().bold(), problem.message);
        }

        if !quiet {
            let templates = report.scanned.templates();
            if templates.is_empty() {
                println!("{}", "No templates found".yellow());
            } else {
                println!("{} {} template(s):", "Installed".green().bold(), templates.len());
                for template in templates {
                    println!("  {:<32} {}", template.short_name, template.name.bright_black());
                }
            }
        }

        if !problems.is_empty() && report.scanned.templates().is_empty() {
            bail!("No templates were installed");
        }
        Ok(())
    }
}
