//! List cached templates matching a query.
//!
//! Without a name every template passing the other filters is listed. With a
//! name the list is the best match list of the query, falling back to every
//! template in the requested context when nothing matches.
//!
//! ```bash
//! scaffold list
//! scaffold list web --language F#
//! scaffold list console --exact --format json
//! ```

use super::QueryArgs;
use crate::engine::Engine;
use crate::resolution::FilteredTemplateInfo;
use crate::resolution::help::resolution_help;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde_json::json;
use std::collections::HashMap;
use uuid::Uuid;

/// Command to list templates.
#[derive(Args, Debug)]
pub struct ListCommand {
    #[command(flatten)]
    query: QueryArgs,

    /// Only templates that match every filter exactly
    #[arg(long)]
    exact: bool,

    /// Output format
    #[arg(short, long, default_value = "table", value_parser = ["table", "json"])]
    format: String,
}

/// One printed row.
#[derive(Debug, PartialEq, Eq)]
struct ListRow {
    name: String,
    short_name: String,
    languages: String,
    template_type: String,
    group: String,
    /// `name::version` of the package the template was installed from
    package: Option<String>,
}

/// Install units by mount point id.
type Packages = HashMap<Uuid, String>;

impl ListRow {
    fn new(template: &FilteredTemplateInfo, packages: &Packages) -> Self {
        let info = &template.info;
        Self {
            name: info.name.clone(),
            short_name: info.short_name.clone(),
            languages: info.languages().join(", "),
            template_type: info.template_type().unwrap_or_default().to_string(),
            group: template.group_identity().to_string(),
            package: packages.get(&info.config_mount_point_id).cloned(),
        }
    }
}

impl ListCommand {
    pub fn query_args(&self) -> &QueryArgs {
        &self.query
    }

    pub fn execute(self, engine: &Engine) -> Result<()> {
        let query = engine.complete_query(self.query.to_query()?);
        let packages: Packages = engine
            .loader()
            .install_unit_descriptors()?
            .into_iter()
            .map(|descriptor| (descriptor.mount_point_id, descriptor.to_string()))
            .collect();
        let row = |template: &FilteredTemplateInfo| ListRow::new(template, &packages);

        let (rows, help): (Vec<ListRow>, Option<String>) = if self.exact {
            let cache = engine.template_cache()?;
            let rows = cache.list(true, &query.filters()).iter().map(row).collect();
            (rows, None)
        } else {
            let (templates, result) = engine.query(&query)?;
            let name = query.name.as_deref().filter(|n| !n.trim().is_empty());
            if name.is_none() {
                let rows =
                    result.core_matched_templates().iter().filter(|t| !t.has_mismatch()).map(row).collect();
                (rows, None)
            } else {
                let rows = result.best_template_match_list().iter().map(row).collect();
                let help = if result.using_context_matches() {
                    resolution_help(name, &result, &templates)
                } else {
                    None
                };
                (rows, help)
            }
        };

        if self.format == "json" {
            output_json(&rows)?;
        } else {
            output_table(&rows);
        }

        if let Some(help) = help {
            eprintln!();
            eprintln!("{help}");
        }
        Ok(())
    }
}

fn output_json(rows: &[ListRow]) -> Result<()> {
    let items: Vec<serde_json::Value> = rows
        .iter()
        .map(|row| {
            json!({
                "name": row.name,
                "shortName": row.short_name,
                "languages": row.languages,
                "type": row.template_type,
                "groupIdentity": row.group,
                "package": row.package,
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&items)?);
    Ok(())
}

fn output_table(rows: &[ListRow]) {
    if rows.is_empty() {
        println!("No templates found.");
        return;
    }

    println!("{}", "Templates".bold());
    println!();
    println!(
        "{:<40} {:<20} {:<16} {:<10} {}",
        "Name".cyan().bold(),
        "Short Name".cyan().bold(),
        "Language".cyan().bold(),
        "Type".cyan().bold(),
        "Package".cyan().bold()
    );
    println!("{}", "-".repeat(110).bright_black());
    for row in rows {
        println!(
            "{:<40} {:<20} {:<16} {:<10} {}",
            row.name,
            row.short_name.bright_white(),
            row.languages.yellow(),
            row.template_type.bright_black(),
            row.package.as_deref().unwrap_or("-").bright_black()
        );
    }
    println!();
    println!("{}: {} templates", "Total".green().bold(), rows.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{CacheTag, TemplateInfo};

    #[test]
    fn test_row_from_template() {
        let mut info = TemplateInfo {
            identity: "Console.CSharp".to_string(),
            name: "Console Application".to_string(),
            short_name: "console".to_string(),
            ..TemplateInfo::default()
        };
        info.tags.insert("language".into(), CacheTag::single("C#"));
        info.tags.insert("type".into(), CacheTag::single("project"));

        let mount = info.config_mount_point_id;
        let template = FilteredTemplateInfo::new(info, Vec::new());
        let row = ListRow::new(&template, &Packages::new());
        assert_eq!(
            row,
            ListRow {
                name: "Console Application".to_string(),
                short_name: "console".to_string(),
                languages: "C#".to_string(),
                template_type: "project".to_string(),
                group: "Console.CSharp".to_string(),
                package: None,
            }
        );

        let packages = Packages::from([(mount, "Contoso.Templates::1.2.0".to_string())]);
        let row = ListRow::new(&template, &packages);
        assert_eq!(row.package.as_deref(), Some("Contoso.Templates::1.2.0"));
    }
}
