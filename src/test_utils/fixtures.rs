//! Test fixtures for template content
//!
//! Builders that lay out template directories and component manifests the way
//! the built-in JSON generator expects them.

use crate::constants::{
    HOST_TEMPLATE_FILE_CONFIG_BASE_NAME, LANGUAGE_TAG, LOCALIZATION_DIR, TEMPLATE_CONFIG_DIR,
    TEMPLATE_CONFIG_FILE, TYPE_TAG,
};
use anyhow::{Context, Result};
use serde_json::{Map, Value, json};
use std::fs;
use std::path::{Path, PathBuf};

/// Builder for a `.template.config` directory.
#[derive(Clone, Debug)]
pub struct TemplateFixture {
    descriptor: Map<String, Value>,
    tags: Map<String, Value>,
    symbols: Map<String, Value>,
    localizations: Vec<(String, Value)>,
    host_files: Vec<(String, Value)>,
}

impl TemplateFixture {
    pub fn new(identity: &str, name: &str) -> Self {
        let mut descriptor = Map::new();
        descriptor.insert("identity".into(), json!(identity));
        descriptor.insert("name".into(), json!(name));
        Self {
            descriptor,
            tags: Map::new(),
            symbols: Map::new(),
            localizations: Vec::new(),
            host_files: Vec::new(),
        }
    }

    pub fn short_name(mut self, short_name: &str) -> Self {
        self.descriptor.insert("shortName".into(), json!(short_name));
        self
    }

    pub fn group(mut self, group_identity: &str) -> Self {
        self.descriptor.insert("groupIdentity".into(), json!(group_identity));
        self
    }

    pub fn author(mut self, author: &str) -> Self {
        self.descriptor.insert("author".into(), json!(author));
        self
    }

    pub fn precedence(mut self, precedence: i32) -> Self {
        self.descriptor.insert("precedence".into(), json!(precedence));
        self
    }

    pub fn classification(mut self, classification: &str) -> Self {
        let entry = self.descriptor.entry("classifications").or_insert_with(|| json!([]));
        if let Value::Array(items) = entry {
            items.push(json!(classification));
        }
        self
    }

    pub fn language(mut self, language: &str) -> Self {
        self.tags.insert(LANGUAGE_TAG.into(), json!(language));
        self
    }

    pub fn type_tag(mut self, kind: &str) -> Self {
        self.tags.insert(TYPE_TAG.into(), json!(kind));
        self
    }

    /// Adds a choice parameter, cached as a tag.
    pub fn choice_parameter(mut self, name: &str, choices: &[(&str, &str)], default: &str) -> Self {
        let choices: Vec<Value> = choices
            .iter()
            .map(|(choice, description)| json!({ "choice": choice, "description": description }))
            .collect();
        self.symbols.insert(
            name.into(),
            json!({
                "type": "parameter",
                "datatype": "choice",
                "defaultValue": default,
                "choices": choices,
            }),
        );
        self
    }

    /// Adds a non-choice parameter, cached as a cache parameter.
    pub fn parameter(mut self, name: &str, datatype: &str, default: &str) -> Self {
        self.symbols.insert(
            name.into(),
            json!({ "type": "parameter", "datatype": datatype, "defaultValue": default }),
        );
        self
    }

    /// Adds `localize/templatestrings.<locale>.json`.
    pub fn localization(mut self, locale: &str, strings: Value) -> Self {
        self.localizations.push((locale.to_string(), strings));
        self
    }

    /// Adds `<host>.host.json`.
    pub fn host_file(mut self, host: &str, content: Value) -> Self {
        self.host_files.push((host.to_string(), content));
        self
    }

    /// The `template.json` document.
    pub fn descriptor(&self) -> Value {
        let mut descriptor = self.descriptor.clone();
        if !self.tags.is_empty() {
            descriptor.insert("tags".into(), Value::Object(self.tags.clone()));
        }
        if !self.symbols.is_empty() {
            descriptor.insert("symbols".into(), Value::Object(self.symbols.clone()));
        }
        Value::Object(descriptor)
    }

    /// Files relative to the template directory.
    pub fn files(&self) -> Vec<(String, Vec<u8>)> {
        let config_dir = TEMPLATE_CONFIG_DIR;
        let mut files = vec![(
            format!("{config_dir}/{TEMPLATE_CONFIG_FILE}"),
            self.descriptor().to_string().into_bytes(),
        )];
        for (locale, strings) in &self.localizations {
            files.push((
                format!("{config_dir}/{LOCALIZATION_DIR}/templatestrings.{locale}.json"),
                strings.to_string().into_bytes(),
            ));
        }
        for (host, content) in &self.host_files {
            files.push((
                format!("{config_dir}/{host}{HOST_TEMPLATE_FILE_CONFIG_BASE_NAME}"),
                content.to_string().into_bytes(),
            ));
        }
        files
    }

    /// Zip entries for this template below `prefix` inside an archive.
    pub fn archive_entries(&self, prefix: &str) -> Vec<(String, Vec<u8>)> {
        let prefix = prefix.trim_matches('/');
        self.files()
            .into_iter()
            .map(|(name, content)| {
                let name = if prefix.is_empty() {
                    name
                } else {
                    format!("{prefix}/{name}")
                };
                (name, content)
            })
            .collect()
    }

    /// Writes the template below `dir`. Returns the descriptor path.
    pub fn write(&self, dir: &Path) -> Result<PathBuf> {
        for (name, content) in self.files() {
            let path = dir.join(&name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        }
        Ok(dir.join(TEMPLATE_CONFIG_DIR).join(TEMPLATE_CONFIG_FILE))
    }
}

/// Builder for a `*.component.json` manifest.
#[derive(Clone, Debug, Default)]
pub struct ComponentManifestFixture {
    components: Vec<Value>,
    requires: Vec<String>,
}

impl ComponentManifestFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generator(mut self, implementation: &str) -> Self {
        self.components.push(json!({ "kind": "generator", "implementation": implementation }));
        self
    }

    pub fn mount_point_factory(mut self, implementation: &str) -> Self {
        self.components
            .push(json!({ "kind": "mount-point-factory", "implementation": implementation }));
        self
    }

    pub fn requires(mut self, implementation: &str) -> Self {
        self.requires.push(implementation.to_string());
        self
    }

    pub fn content(&self) -> String {
        json!({ "components": self.components, "requires": self.requires }).to_string()
    }

    /// Writes `<dir>/<name>.component.json`.
    pub fn write(&self, dir: &Path, name: &str) -> Result<PathBuf> {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
        let path = dir.join(format!("{name}.component.json"));
        fs::write(&path, self.content()).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}
