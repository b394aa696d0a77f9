//! Built-in generator for JSON described templates.
//!
//! # Layout
//!
//! ```text
//! <template dir>/
//! └── .template.config/
//!     ├── template.json                    # descriptor
//!     ├── <host>.host.json                 # optional host overrides
//!     └── localize/
//!         └── templatestrings.<locale>.json
//! ```
//!
//! # Descriptor
//!
//! ```json
//! {
//!   "identity": "Example.Console.CSharp",
//!   "groupIdentity": "Example.Console",
//!   "name": "Console App",
//!   "shortName": "console",
//!   "classifications": ["Common", "Console"],
//!   "precedence": 100,
//!   "tags": { "language": "C#", "type": "project" },
//!   "symbols": {
//!     "Framework": {
//!       "type": "parameter",
//!       "datatype": "choice",
//!       "defaultValue": "net9.0",
//!       "choices": [{ "choice": "net9.0", "description": "Target .NET 9" }]
//!     }
//!   }
//! }
//! ```
//!
//! Choice-typed parameter symbols become tags, other parameter symbols become
//! cache parameters.

use super::Generator;
use crate::constants::{LOCALIZATION_DIR, TEMPLATE_CONFIG_DIR, TEMPLATE_CONFIG_FILE};
use crate::mount::{EntryKind, MountEntry, MountPoint};
use crate::template::{
    CacheParameter, CacheTag, LocalizationLocator, ParameterSymbolLocalization, Template,
    TemplateInfo,
};
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};
use uuid::Uuid;

/// Generator id of [`JsonTemplateGenerator`].
pub const JSON_TEMPLATE_GENERATOR_ID: Uuid =
    Uuid::from_u128(0x0C434DF7_E2CB_4DEE_B216_D7C58C8EB4B3);

const LOCALIZATION_FILE_PREFIX: &str = "templatestrings.";
const LOCALIZATION_FILE_SUFFIX: &str = ".json";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TemplateConfig {
    identity: String,
    group_identity: Option<String>,
    name: String,
    #[serde(default)]
    short_name: String,
    author: Option<String>,
    description: Option<String>,
    #[serde(default)]
    classifications: Vec<String>,
    default_name: Option<String>,
    #[serde(default)]
    precedence: i32,
    #[serde(default)]
    tags: BTreeMap<String, String>,
    #[serde(default)]
    symbols: BTreeMap<String, SymbolConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SymbolConfig {
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(alias = "dataType")]
    datatype: Option<String>,
    description: Option<String>,
    default_value: Option<Value>,
    #[serde(default)]
    choices: Vec<ChoiceConfig>,
}

#[derive(Debug, Deserialize)]
struct ChoiceConfig {
    choice: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LocalizationConfig {
    identity: Option<String>,
    name: Option<String>,
    author: Option<String>,
    description: Option<String>,
    #[serde(default)]
    symbols: BTreeMap<String, SymbolLocalizationConfig>,
}

#[derive(Debug, Deserialize)]
struct SymbolLocalizationConfig {
    description: Option<String>,
    #[serde(default)]
    choices: BTreeMap<String, String>,
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Generator for templates described by `.template.config/template.json`.
#[derive(Debug, Default)]
pub struct JsonTemplateGenerator;

impl JsonTemplateGenerator {
    fn read_config(entry: &MountEntry<'_>) -> Result<TemplateConfig> {
        let content = entry.read_to_vec()?;
        serde_json::from_slice(&content)
            .with_context(|| format!("Invalid template descriptor: {}", entry.full_path()))
    }

    fn template_info(entry: &MountEntry<'_>, config: TemplateConfig) -> TemplateInfo {
        let mut tags: BTreeMap<String, CacheTag> =
            config.tags.into_iter().map(|(key, value)| (key, CacheTag::single(value))).collect();
        let mut cache_parameters = BTreeMap::new();

        for (name, symbol) in config.symbols {
            let is_parameter =
                symbol.kind.as_deref().is_none_or(|k| k.eq_ignore_ascii_case("parameter"));
            if !is_parameter {
                continue;
            }

            let default_value = symbol.default_value.as_ref().map(scalar_to_string);
            if symbol.datatype.as_deref().is_some_and(|d| d.eq_ignore_ascii_case("choice")) {
                let choices = symbol
                    .choices
                    .into_iter()
                    .map(|c| (c.choice, c.description.unwrap_or_default()))
                    .collect();
                tags.insert(
                    name,
                    CacheTag {
                        description: symbol.description,
                        choices_and_descriptions: choices,
                        default_value,
                    },
                );
            } else {
                cache_parameters.insert(
                    name,
                    CacheParameter {
                        data_type: symbol.datatype,
                        default_value,
                        description: symbol.description,
                    },
                );
            }
        }

        TemplateInfo {
            identity: config.identity,
            group_identity: config.group_identity,
            name: config.name,
            short_name: config.short_name,
            author: config.author,
            description: config.description,
            classifications: config.classifications,
            default_name: config.default_name,
            precedence: config.precedence,
            generator_id: JSON_TEMPLATE_GENERATOR_ID,
            config_mount_point_id: entry.mount_point().info().mount_point_id,
            config_place: entry.full_path().to_string(),
            tags,
            cache_parameters,
            ..TemplateInfo::default()
        }
    }

    fn read_locator(entry: &MountEntry<'_>, template: &TemplateInfo) -> Result<LocalizationLocator> {
        let locale = entry
            .name()
            .strip_prefix(LOCALIZATION_FILE_PREFIX)
            .and_then(|rest| rest.strip_suffix(LOCALIZATION_FILE_SUFFIX))
            .filter(|locale| !locale.is_empty())
            .with_context(|| format!("Not a localization file: {}", entry.full_path()))?;

        let content = entry.read_to_vec()?;
        let config: LocalizationConfig = serde_json::from_slice(&content)
            .with_context(|| format!("Invalid localization file: {}", entry.full_path()))?;

        let parameter_symbols = config
            .symbols
            .into_iter()
            .map(|(name, symbol)| {
                (
                    name,
                    ParameterSymbolLocalization {
                        description: symbol.description,
                        choices_and_descriptions: symbol.choices,
                    },
                )
            })
            .collect();

        Ok(LocalizationLocator {
            locale: locale.to_string(),
            identity: config.identity.unwrap_or_else(|| template.identity.clone()),
            mount_point_id: entry.mount_point().info().mount_point_id,
            config_place: entry.full_path().to_string(),
            name: config.name,
            author: config.author,
            description: config.description,
            parameter_symbols,
        })
    }
}

impl Generator for JsonTemplateGenerator {
    fn id(&self) -> Uuid {
        JSON_TEMPLATE_GENERATOR_ID
    }

    fn get_templates_and_langpacks(
        &self,
        root: &dyn MountPoint,
    ) -> Result<(Vec<TemplateInfo>, Vec<LocalizationLocator>)> {
        let mut templates = Vec::new();
        let mut locators = Vec::new();

        for entry in root.root().enumerate_files(TEMPLATE_CONFIG_FILE, true)? {
            let Some(config_dir) = entry.parent().filter(|p| p.name() == TEMPLATE_CONFIG_DIR)
            else {
                continue;
            };

            let info = match Self::read_config(&entry) {
                Ok(config) => Self::template_info(&entry, config),
                Err(e) => {
                    warn!("Skipping template {}: {:#}", entry.full_path(), e);
                    continue;
                }
            };

            let localize_dir = config_dir.child(LOCALIZATION_DIR, EntryKind::Directory);
            let pattern = format!("{LOCALIZATION_FILE_PREFIX}*{LOCALIZATION_FILE_SUFFIX}");
            for file in localize_dir.enumerate_files(&pattern, false)? {
                match Self::read_locator(&file, &info) {
                    Ok(locator) => locators.push(locator),
                    Err(e) => warn!("Skipping localization {}: {:#}", file.full_path(), e),
                }
            }

            debug!("Found template '{}' at {}", info.identity, info.config_place);
            templates.push(info);
        }

        Ok((templates, locators))
    }

    fn try_get_template_from_config(
        &self,
        config: &MountEntry<'_>,
        locale_config: Option<&MountEntry<'_>>,
        host_config: Option<&MountEntry<'_>>,
    ) -> Result<Option<Template>> {
        let content = config.read_to_vec()?;
        let raw: Value = match serde_json::from_slice(&content) {
            Ok(raw) => raw,
            Err(e) => {
                debug!("{} is not a JSON template: {}", config.full_path(), e);
                return Ok(None);
            }
        };
        let Ok(parsed) = serde_json::from_value::<TemplateConfig>(raw.clone()) else {
            return Ok(None);
        };

        let mut info = Self::template_info(config, parsed);
        let localization =
            locale_config.map(|entry| Self::read_locator(entry, &info)).transpose()?;
        if let Some(locator) = &localization {
            info = info.localized(Some(locator));
        }

        let host = match host_config {
            Some(entry) => {
                info.host_config_mount_point_id = Some(entry.mount_point().info().mount_point_id);
                info.host_config_place = Some(entry.full_path().to_string());
                let bytes = entry.read_to_vec()?;
                Some(serde_json::from_slice(&bytes).with_context(|| {
                    format!("Invalid host config: {}", entry.full_path())
                })?)
            }
            None => None,
        };

        Ok(Some(Template {
            info,
            config: raw,
            localization,
            host_config: host,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{EngineEnvironment, Host};
    use crate::filesystem::PhysicalFileSystem;
    use crate::mount::{FileSystemMountPointFactory, MountPointFactory, MountRequest};
    use crate::paths::Paths;
    use crate::test_utils::TemplateFixture;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn mount(temp: &TempDir) -> Box<dyn MountPoint> {
        let env = Arc::new(EngineEnvironment::new(
            Host::new("scaffold"),
            Paths::new(temp.path().join("base")),
            Arc::new(PhysicalFileSystem),
        ));
        FileSystemMountPointFactory
            .try_mount(
                &env,
                &MountRequest {
                    id: Uuid::new_v4(),
                    parent: None,
                    place: &temp.path().join("src").to_string_lossy(),
                },
            )
            .unwrap()
    }

    #[test]
    fn test_discovers_templates_and_langpacks() {
        let temp = TempDir::new().unwrap();
        TemplateFixture::new("Console.CSharp", "Console App")
            .short_name("console")
            .group("Console")
            .language("C#")
            .choice_parameter("Framework", &[("net8", "Eight"), ("net9", "Nine")], "net9")
            .parameter("Port", "integer", "8080")
            .localization("de-DE", serde_json::json!({ "name": "Konsolenanwendung" }))
            .write(&temp.path().join("src/console"))
            .unwrap();
        std::fs::create_dir_all(temp.path().join("src/broken/.template.config")).unwrap();
        std::fs::write(temp.path().join("src/broken/.template.config/template.json"), "{").unwrap();

        let mount = mount(&temp);
        let (templates, locators) =
            JsonTemplateGenerator.get_templates_and_langpacks(mount.as_ref()).unwrap();

        assert_eq!(templates.len(), 1);
        let info = &templates[0];
        assert_eq!(info.identity, "Console.CSharp");
        assert_eq!(info.config_place, "/console/.template.config/template.json");
        assert_eq!(info.languages(), vec!["C#"]);
        assert_eq!(info.tags["Framework"].default_value.as_deref(), Some("net9"));
        assert_eq!(info.cache_parameters["Port"].default_value.as_deref(), Some("8080"));

        assert_eq!(locators.len(), 1);
        assert_eq!(locators[0].locale, "de-DE");
        assert_eq!(locators[0].identity, "Console.CSharp");
        assert_eq!(locators[0].name.as_deref(), Some("Konsolenanwendung"));
    }

    #[test]
    fn test_load_template_from_config_with_overlays() {
        let temp = TempDir::new().unwrap();
        TemplateFixture::new("Web.App", "Web App")
            .localization("fr-FR", serde_json::json!({ "name": "Application web" }))
            .host_file("scaffold", serde_json::json!({ "order": 10 }))
            .write(&temp.path().join("src/web"))
            .unwrap();

        let mount = mount(&temp);
        let config = mount.file_info("/web/.template.config/template.json");
        let locale = mount.file_info("/web/.template.config/localize/templatestrings.fr-FR.json");
        let host = mount.file_info("/web/.template.config/scaffold.host.json");

        let template = JsonTemplateGenerator
            .try_get_template_from_config(&config, Some(&locale), Some(&host))
            .unwrap()
            .unwrap();
        assert_eq!(template.info.name, "Application web");
        assert_eq!(template.host_config.unwrap()["order"], 10);
        assert_eq!(
            template.info.host_config_place.as_deref(),
            Some("/web/.template.config/scaffold.host.json")
        );
    }

    #[test]
    fn test_non_template_config_is_none() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("src")).unwrap();
        std::fs::write(temp.path().join("src/template.json"), "{\"unrelated\":true}").unwrap();

        let mount = mount(&temp);
        let config = mount.file_info("/template.json");
        assert!(JsonTemplateGenerator.try_get_template_from_config(&config, None, None).unwrap().is_none());
    }
}
