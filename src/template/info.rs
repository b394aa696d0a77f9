//! Cached template descriptors.

use crate::constants::{LANGUAGE_TAG, TYPE_TAG};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// A choice-valued template tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheTag {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Allowed values and their descriptions.
    pub choices_and_descriptions: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl CacheTag {
    /// A tag with a single value and no descriptions.
    pub fn single(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            description: None,
            choices_and_descriptions: BTreeMap::from([(value.clone(), String::new())]),
            default_value: Some(value),
        }
    }

    /// `true` if `choice` is one of the allowed values, ignoring case.
    pub fn has_choice(&self, choice: &str) -> bool {
        self.choices_and_descriptions.keys().any(|c| c.eq_ignore_ascii_case(choice))
    }
}

/// A free-form template parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheParameter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One template as recorded in a template cache.
///
/// `identity` is the merge key across rebuilds and locales.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TemplateInfo {
    pub identity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_identity: Option<String>,
    pub name: String,
    pub short_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub classifications: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_name: Option<String>,
    /// Higher wins when several invokable templates share a group.
    pub precedence: i32,
    pub generator_id: Uuid,
    pub config_mount_point_id: Uuid,
    pub config_place: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale_config_mount_point_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale_config_place: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_config_mount_point_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_config_place: Option<String>,
    pub tags: BTreeMap<String, CacheTag>,
    pub cache_parameters: BTreeMap<String, CacheParameter>,
}

impl TemplateInfo {
    /// Serialized field names, used to accept documents with differently cased keys.
    pub const FIELD_NAMES: &'static [&'static str] = &[
        "identity",
        "groupIdentity",
        "name",
        "shortName",
        "author",
        "description",
        "classifications",
        "defaultName",
        "precedence",
        "generatorId",
        "configMountPointId",
        "configPlace",
        "localeConfigMountPointId",
        "localeConfigPlace",
        "hostConfigMountPointId",
        "hostConfigPlace",
        "tags",
        "cacheParameters",
    ];

    /// Group identity, or the identity for ungrouped templates.
    pub fn effective_group_identity(&self) -> &str {
        self.group_identity.as_deref().filter(|g| !g.trim().is_empty()).unwrap_or(&self.identity)
    }

    /// Tag looked up by case-insensitive name.
    pub fn tag(&self, name: &str) -> Option<&CacheTag> {
        self.tags.get(name).or_else(|| {
            self.tags.iter().find(|(key, _)| key.eq_ignore_ascii_case(name)).map(|(_, tag)| tag)
        })
    }

    /// Cache parameter looked up by case-insensitive name.
    pub fn cache_parameter(&self, name: &str) -> Option<&CacheParameter> {
        self.cache_parameters.get(name).or_else(|| {
            self.cache_parameters
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, parameter)| parameter)
        })
    }

    /// Languages the template is authored in, from the `language` tag.
    pub fn languages(&self) -> Vec<&str> {
        self.tag(LANGUAGE_TAG)
            .map(|tag| tag.choices_and_descriptions.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Value of the `type` tag (project, item, ...).
    pub fn template_type(&self) -> Option<&str> {
        let tag = self.tag(TYPE_TAG)?;
        tag.default_value.as_deref().or_else(|| tag.choices_and_descriptions.keys().next().map(String::as_str))
    }
}
