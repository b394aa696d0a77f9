//! Resolve a query to one template and print its details.

use super::QueryArgs;
use crate::engine::Engine;
use crate::resolution::help::resolution_help;
use crate::template::TemplateInfo;
use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;

/// Command to show the template a query resolves to.
#[derive(Args, Debug)]
pub struct ShowCommand {
    #[command(flatten)]
    query: QueryArgs,

    /// Print the raw template configuration
    #[arg(long)]
    raw: bool,
}

impl ShowCommand {
    pub fn execute(self, engine: &Engine) -> Result<()> {
        let query = self.query.to_query()?;
        if query.name.as_deref().is_none_or(|n| n.trim().is_empty()) {
            bail!("A template name is required");
        }
        let query = engine.complete_query(query);

        let (templates, result) = engine.query(&query)?;
        let (matched, status) = result.singular_invokable_match();
        let Some(matched) = matched else {
            if let Some(help) = resolution_help(query.name.as_deref(), &result, &templates) {
                eprintln!("{help}");
            }
            bail!("Could not resolve '{}' to a single template ({status:?})", query.name.unwrap_or_default());
        };

        let Some(template) = engine.load_template(&matched.info)? else {
            bail!("Template '{}' is no longer available at {}", matched.info.identity, matched.info.config_place);
        };

        print_info(&template.info);
        if self.raw {
            println!();
            println!("{}", "Configuration".cyan().bold());
            println!("{}", serde_json::to_string_pretty(&template.config)?);
        }
        if let Some(host_config) = &template.host_config {
            println!();
            println!("{}", "Host configuration".cyan().bold());
            println!("{}", serde_json::to_string_pretty(host_config)?);
        }
        Ok(())
    }
}

fn print_info(info: &TemplateInfo) {
    println!("{}", info.name.bold());
    if let Some(description) = &info.description {
        println!("  {description}");
    }
    println!();
    println!("  {:<14} {}", "Short name:", info.short_name.bright_white());
    println!("  {:<14} {}", "Identity:", info.identity);
    println!("  {:<14} {}", "Group:", info.effective_group_identity());
    println!("  {:<14} {}", "Precedence:", info.precedence);
    if let Some(author) = &info.author {
        println!("  {:<14} {}", "Author:", author);
    }
    let languages = info.languages();
    if !languages.is_empty() {
        println!("  {:<14} {}", "Languages:", languages.join(", ").yellow());
    }
    if let Some(kind) = info.template_type() {
        println!("  {:<14} {}", "Type:", kind);
    }
    if !info.classifications.is_empty() {
        println!("  {:<14} {}", "Tags:", info.classifications.join(", "));
    }
    println!("  {:<14} {}", "Config:", info.config_place.bright_black());
}
