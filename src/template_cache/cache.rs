//! A single template cache document.

use crate::constants::{CURRENT_CACHE_VERSION, DEFAULT_EMPTY_CACHE_FILE_CONTENT};
use crate::core::EngineError;
use crate::resolution::{FilteredTemplateInfo, TemplateFilter, filter_templates};
use crate::settings::SettingsLoader;
use crate::template::TemplateInfo;
use anyhow::{Context, Result};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::{debug, warn};

const TEMPLATE_INFO_FIELD: &str = "templateInfo";
const CACHE_VERSION_FIELD: &str = "cacheVersion";
const IDENTITY_FIELD: &str = "identity";

/// Descriptors of every known template for one locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateCache {
    pub cache_version: String,
    pub template_info: Vec<TemplateInfo>,
    /// Entries that do not describe a template; written back verbatim after
    /// the readable ones.
    pub unreadable_entries: Vec<Value>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum CacheEntry<'a> {
    Template(&'a TemplateInfo),
    Unreadable(&'a Value),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CacheDocument<'a> {
    cache_version: &'a str,
    template_info: Vec<CacheEntry<'a>>,
}

impl Serialize for TemplateCache {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let entries = self
            .template_info
            .iter()
            .map(CacheEntry::Template)
            .chain(self.unreadable_entries.iter().map(CacheEntry::Unreadable))
            .collect();
        CacheDocument {
            cache_version: &self.cache_version,
            template_info: entries,
        }
        .serialize(serializer)
    }
}

/// Identity named by a raw cache entry, if it names one.
pub fn entry_identity(entry: &Value) -> Option<&str> {
    field(entry.as_object()?, IDENTITY_FIELD)?.as_str()
}

impl Default for TemplateCache {
    fn default() -> Self {
        Self::new(Vec::new(), None)
    }
}

fn field<'v>(object: &'v Map<String, Value>, name: &str) -> Option<&'v Value> {
    object.get(name).or_else(|| {
        object.iter().find(|(key, _)| key.eq_ignore_ascii_case(name)).map(|(_, value)| value)
    })
}

/// Renames keys that differ from a known field name only by case.
fn canonical_keys(entry: &Map<String, Value>) -> Map<String, Value> {
    entry
        .iter()
        .map(|(key, value)| {
            let canonical = TemplateInfo::FIELD_NAMES
                .iter()
                .find(|name| name.eq_ignore_ascii_case(key))
                .map_or_else(|| key.clone(), |name| (*name).to_string());
            (canonical, value.clone())
        })
        .collect()
}

impl TemplateCache {
    /// A cache holding `templates`, at the current version unless one is given.
    pub fn new(templates: Vec<TemplateInfo>, cache_version: Option<String>) -> Self {
        Self {
            cache_version: cache_version.unwrap_or_else(|| CURRENT_CACHE_VERSION.to_string()),
            template_info: templates,
            unreadable_entries: Vec::new(),
        }
    }

    /// Keeps `entries` as unreadable entries of this cache.
    #[must_use]
    pub fn with_unreadable_entries(mut self, entries: Vec<Value>) -> Self {
        self.unreadable_entries = entries;
        self
    }

    /// Reads a cache from a parsed document.
    ///
    /// Returns `None` unless both the template list and the version field are
    /// present. Field names are matched ignoring case. Entries that are not
    /// objects, or that do not describe a template, are kept unread.
    pub fn try_parse(document: &Value) -> Option<Self> {
        let object = document.as_object()?;
        let templates = field(object, TEMPLATE_INFO_FIELD)?;
        let version = field(object, CACHE_VERSION_FIELD)?;

        let cache_version = match version {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };

        let mut template_info = Vec::new();
        let mut unreadable_entries = Vec::new();
        for raw in templates.as_array().into_iter().flatten() {
            let Some(entry) = raw.as_object() else {
                warn!("Keeping template cache entry that is not an object");
                unreadable_entries.push(raw.clone());
                continue;
            };
            match serde_json::from_value::<TemplateInfo>(Value::Object(canonical_keys(entry))) {
                Ok(info) => template_info.push(info),
                Err(e) => {
                    warn!("Keeping unreadable template cache entry {:?}: {}", entry_identity(raw), e);
                    unreadable_entries.push(raw.clone());
                }
            }
        }

        Some(Self {
            cache_version,
            template_info,
            unreadable_entries,
        })
    }

    /// Parses document text for `locale`.
    ///
    /// The empty document `{}` is an empty cache.
    ///
    /// # Errors
    ///
    /// [`EngineError::CacheParseError`] for anything that is not a cache.
    pub fn parse_for_locale(content: &str, locale: Option<&str>) -> Result<Self, EngineError> {
        if content.trim() == DEFAULT_EMPTY_CACHE_FILE_CONTENT {
            return Ok(Self::default());
        }

        let error = || EngineError::CacheParseError {
            locale: locale.unwrap_or("culture neutral").to_string(),
        };
        let document: Value = serde_json::from_str(content).map_err(|_| error())?;
        Self::try_parse(&document).ok_or_else(error)
    }

    /// Serialized document text.
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize template cache")
    }

    /// Loads the cache of the host's current locale.
    ///
    /// A locale without a document is seeded by cloning the neutral document,
    /// which is then read back. Before the first scan neither exists and the
    /// cache is empty.
    ///
    /// # Errors
    ///
    /// - [`EngineError::CacheCloneFailed`] when the clone cannot be read back
    /// - [`EngineError::CacheParseError`] when the document is not a cache
    pub fn load_for_current_locale(loader: &SettingsLoader) -> Result<Self> {
        let locale = loader.environment().host().locale();
        let (found, mut content) = loader.try_read_template_cache_file(locale)?;

        if !found {
            let (neutral_found, neutral) = loader.try_read_template_cache_file(None)?;
            if !neutral_found {
                debug!("No template cache yet");
                return Ok(Self::default());
            }

            content = neutral;
            if let Some(locale) = locale {
                debug!("Seeding template cache for {} from the neutral cache", locale);
                loader.write_template_cache_file(Some(locale), &content)?;
                let (cloned, clone) = loader.try_read_template_cache_file(Some(locale))?;
                if !cloned {
                    return Err(EngineError::CacheCloneFailed {
                        locale: locale.to_string(),
                    }
                    .into());
                }
                content = clone;
            }
        }

        Ok(Self::parse_for_locale(&content, locale)?)
    }

    /// Templates of this cache that satisfy `filters`.
    pub fn list(&self, exact_only: bool, filters: &[TemplateFilter]) -> Vec<FilteredTemplateInfo> {
        filter_templates(&self.template_info, exact_only, filters)
    }
}
