//! Locale overlays for cached templates.
//!
//! A [`LocalizationLocator`] carries the locale-specific text for one template
//! identity. Overlaying replaces template text only where the override is
//! non-blank, per parameter and per enumerated choice.

use super::{CacheParameter, CacheTag, TemplateInfo};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Localized text for one parameter symbol.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParameterSymbolLocalization {
    pub description: Option<String>,
    pub choices_and_descriptions: BTreeMap<String, String>,
}

/// Where a template's localization for one locale lives, plus its overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LocalizationLocator {
    pub locale: String,
    /// Identity of the template this locator localizes.
    pub identity: String,
    pub mount_point_id: Uuid,
    pub config_place: String,
    pub name: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub parameter_symbols: BTreeMap<String, ParameterSymbolLocalization>,
}

fn non_blank(value: Option<&String>) -> Option<&String> {
    value.filter(|v| !v.trim().is_empty())
}

fn overlay(base: &Option<String>, value: Option<&String>) -> Option<String> {
    non_blank(value).cloned().or_else(|| base.clone())
}

impl TemplateInfo {
    /// Returns this template overlaid with `locator`.
    ///
    /// Without a locator the text is unchanged and the locale-config reference
    /// is cleared.
    #[must_use]
    pub fn localized(&self, locator: Option<&LocalizationLocator>) -> TemplateInfo {
        let mut localized = self.clone();
        localized.locale_config_mount_point_id = None;
        localized.locale_config_place = None;

        let Some(locator) = locator else {
            return localized;
        };

        if let Some(name) = non_blank(locator.name.as_ref()) {
            localized.name = name.clone();
        }
        localized.author = overlay(&self.author, locator.author.as_ref());
        localized.description = overlay(&self.description, locator.description.as_ref());
        localized.locale_config_mount_point_id = Some(locator.mount_point_id);
        localized.locale_config_place = Some(locator.config_place.clone());
        localized.tags = localize_tags(&self.tags, &locator.parameter_symbols);
        localized.cache_parameters =
            localize_parameters(&self.cache_parameters, &locator.parameter_symbols);
        localized
    }

    /// Locator reconstructed from a cache entry that was written localized.
    ///
    /// Returns `None` for unlocalized entries. Parameter overrides are not
    /// recoverable from a cache entry and are left empty.
    pub fn stored_locator(&self, locale: &str) -> Option<LocalizationLocator> {
        let mount_point_id = self.locale_config_mount_point_id.filter(|id| !id.is_nil())?;
        Some(LocalizationLocator {
            locale: locale.to_string(),
            identity: self.identity.clone(),
            mount_point_id,
            config_place: self.locale_config_place.clone().unwrap_or_default(),
            name: Some(self.name.clone()),
            author: self.author.clone(),
            description: self.description.clone(),
            parameter_symbols: BTreeMap::new(),
        })
    }
}

fn localize_tags(
    tags: &BTreeMap<String, CacheTag>,
    symbols: &BTreeMap<String, ParameterSymbolLocalization>,
) -> BTreeMap<String, CacheTag> {
    tags.iter()
        .map(|(key, tag)| {
            let Some(localization) = symbols.get(key) else {
                return (key.clone(), tag.clone());
            };

            let choices = tag
                .choices_and_descriptions
                .iter()
                .map(|(choice, description)| {
                    let text = non_blank(localization.choices_and_descriptions.get(choice))
                        .unwrap_or(description);
                    (choice.clone(), text.clone())
                })
                .collect();

            let localized = CacheTag {
                description: overlay(&tag.description, localization.description.as_ref()),
                choices_and_descriptions: choices,
                default_value: tag.default_value.clone(),
            };
            (key.clone(), localized)
        })
        .collect()
}

fn localize_parameters(
    parameters: &BTreeMap<String, CacheParameter>,
    symbols: &BTreeMap<String, ParameterSymbolLocalization>,
) -> BTreeMap<String, CacheParameter> {
    parameters
        .iter()
        .map(|(key, parameter)| {
            let mut localized = parameter.clone();
            if let Some(localization) = symbols.get(key) {
                localized.description =
                    overlay(&parameter.description, localization.description.as_ref());
            }
            (key.clone(), localized)
        })
        .collect()
}
