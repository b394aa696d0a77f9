//! Inspect or clean the template caches.

use crate::engine::Engine;
use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;

/// Command to manage the template caches.
#[derive(Args, Debug)]
pub struct CacheCommand {
    #[command(subcommand)]
    command: CacheSubcommands,
}

#[derive(Subcommand, Debug)]
enum CacheSubcommands {
    /// Show cache documents, mount points and probing paths
    Info,

    /// Delete every template cache document
    Clean,
}

impl CacheCommand {
    pub fn execute(self, engine: &Engine) -> Result<()> {
        match self.command {
            CacheSubcommands::Info => show_info(engine),
            CacheSubcommands::Clean => {
                engine.clean_caches()?;
                println!("{}", "Template caches cleaned".green());
                Ok(())
            }
        }
    }
}

fn show_info(engine: &Engine) -> Result<()> {
    let loader = engine.loader();
    loader.ensure_loaded()?;
    let paths = engine.environment().paths();

    println!("{}", "Template cache".bold());
    println!("  {:<16} {}", "Base directory:", paths.base_dir().display());
    println!("  {:<16} {}", "Current locale:", engine.environment().host().locale().unwrap_or("culture neutral"));

    let (neutral, _) = loader.try_read_template_cache_file(None)?;
    let mut locales = loader.locales_with_template_cache_files()?;
    if neutral {
        locales.insert(0, "(neutral)".to_string());
    }
    println!("  {:<16} {}", "Documents:", if locales.is_empty() { "none".to_string() } else { locales.join(", ") });
    println!("  {:<16} {}", "Templates:", engine.template_cache()?.template_info.len());

    let mounts = loader.mount_points()?;
    println!();
    println!("{} ({})", "Mount points".bold(), mounts.len());
    for mount in mounts {
        let package = loader
            .try_get_install_unit_descriptor(mount.mount_point_id)?
            .map(|descriptor| format!(" [{descriptor}]"))
            .unwrap_or_default();
        println!("  {}{} {}", mount.place, package.yellow(), mount.mount_point_id.to_string().bright_black());
    }

    println!();
    println!("{}", "Probing paths".bold());
    for path in loader.probing_paths()? {
        println!("  {path}");
    }
    Ok(())
}
