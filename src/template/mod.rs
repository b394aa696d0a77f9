//! Template descriptor data model.
//!
//! - [`TemplateInfo`] - one cache entry
//! - [`LocalizationLocator`] - locale overlay for one template identity
//! - [`ScannedTemplateInfo`] - accumulated result of a scan
//! - [`Template`] - a template loaded from its config by a generator

mod info;
mod localization;

pub use info::{CacheParameter, CacheTag, TemplateInfo};
pub use localization::{LocalizationLocator, ParameterSymbolLocalization};

use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Templates and localization locators discovered by one scan.
#[derive(Debug, Clone, Default)]
pub struct ScannedTemplateInfo {
    templates: Vec<TemplateInfo>,
    index: HashMap<String, usize>,
    locators: BTreeMap<String, HashMap<String, LocalizationLocator>>,
}

impl ScannedTemplateInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a template; a later template with the same identity replaces it.
    pub fn add_template(&mut self, template: TemplateInfo) {
        match self.index.get(&template.identity) {
            Some(&position) => self.templates[position] = template,
            None => {
                self.index.insert(template.identity.clone(), self.templates.len());
                self.templates.push(template);
            }
        }
    }

    /// Adds a locator; a later locator for the same locale and identity replaces it.
    pub fn add_localization_locator(&mut self, locator: LocalizationLocator) {
        self.locators
            .entry(locator.locale.clone())
            .or_default()
            .insert(locator.identity.clone(), locator);
    }

    /// Merges another scan result into this one, the other one winning.
    pub fn extend(&mut self, other: ScannedTemplateInfo) {
        for template in other.templates {
            self.add_template(template);
        }
        for locator in other.locators.into_values().flat_map(HashMap::into_values) {
            self.add_localization_locator(locator);
        }
    }

    /// Templates in discovery order.
    pub fn templates(&self) -> &[TemplateInfo] {
        &self.templates
    }

    pub fn template(&self, identity: &str) -> Option<&TemplateInfo> {
        self.index.get(identity).map(|&position| &self.templates[position])
    }

    /// Locales with at least one newly discovered locator, sorted.
    pub fn locales(&self) -> impl Iterator<Item = &str> {
        self.locators.keys().map(String::as_str)
    }

    /// Locators discovered for `locale`, keyed by template identity.
    pub fn localization_locators_for_locale(
        &self,
        locale: &str,
    ) -> Option<&HashMap<String, LocalizationLocator>> {
        self.locators.get(locale)
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty() && self.locators.is_empty()
    }
}

/// A template loaded from its configuration.
#[derive(Debug, Clone)]
pub struct Template {
    /// Descriptor, localized when a locale config was supplied
    pub info: TemplateInfo,
    /// Raw template configuration
    pub config: Value,
    /// Locator applied to `info`
    pub localization: Option<LocalizationLocator>,
    /// Host-specific overrides from `<host>.host.json`
    pub host_config: Option<Value>,
}
