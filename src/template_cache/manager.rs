//! Writing the cache documents of every locale after a scan.

use super::TemplateCache;
use super::cache::entry_identity;
use crate::settings::SettingsLoader;
use crate::template::{LocalizationLocator, ScannedTemplateInfo, TemplateInfo};
use anyhow::Result;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Locators rebuilt from the localized entries of a cache document, by identity.
///
/// Entries that were written without a locale config are unlocalized and
/// contribute nothing.
pub fn localizations_from_templates(
    templates: &[TemplateInfo],
    locale: &str,
) -> HashMap<String, LocalizationLocator> {
    templates
        .iter()
        .filter_map(|template| template.stored_locator(locale))
        .map(|locator| (locator.identity.clone(), locator))
        .collect()
}

/// Merges a scan over the previous entries of one locale.
///
/// New descriptors come first, in scan order, each localized with the best
/// locator for its identity. Previous entries whose identity the scan did not
/// visit follow unchanged apart from a newer locator. A locator in
/// `new_locators` beats one in `stored_locators`.
pub fn merge_templates(
    new_templates: &[TemplateInfo],
    existing: &[TemplateInfo],
    new_locators: Option<&HashMap<String, LocalizationLocator>>,
    stored_locators: &HashMap<String, LocalizationLocator>,
) -> Vec<TemplateInfo> {
    let preferred = |identity: &str| {
        new_locators.and_then(|locators| locators.get(identity)).or_else(|| stored_locators.get(identity))
    };

    let mut seen = HashSet::new();
    let mut merged = Vec::with_capacity(new_templates.len() + existing.len());

    for template in new_templates {
        if seen.insert(template.identity.as_str()) {
            merged.push(template.localized(preferred(&template.identity)));
        }
    }
    for template in existing {
        if !seen.insert(template.identity.as_str()) {
            continue;
        }
        match new_locators.and_then(|locators| locators.get(&template.identity)) {
            Some(locator) => merged.push(template.localized(Some(locator))),
            None => merged.push(template.clone()),
        }
    }
    merged
}

/// Maintains the cache documents of all locales.
pub struct TemplateCacheManager<'a> {
    loader: &'a SettingsLoader,
}

impl<'a> TemplateCacheManager<'a> {
    pub fn new(loader: &'a SettingsLoader) -> Self {
        Self {
            loader,
        }
    }

    /// Writes every cache document affected by `scanned`.
    ///
    /// Order: the current locale, locales with new locators, every other
    /// locale that already has a document, then the neutral document last.
    /// Returns the locales written in that order, `None` being the neutral
    /// document.
    pub fn write_template_caches(&self, scanned: &ScannedTemplateInfo) -> Result<Vec<Option<String>>> {
        let current = self.loader.environment().host().locale().map(str::to_string);
        let mut written: Vec<Option<String>> = Vec::new();
        let mut pending: Vec<String> = Vec::new();

        pending.extend(current);
        pending.extend(scanned.locales().map(str::to_string));
        pending.extend(self.loader.locales_with_template_cache_files()?);

        let mut done = HashSet::new();
        for locale in pending {
            if !done.insert(locale.clone()) {
                continue;
            }
            self.write_template_cache_for_locale(
                Some(&locale),
                scanned.templates(),
                scanned.localization_locators_for_locale(&locale),
            )?;
            written.push(Some(locale));
        }

        // Locales without a document are based on the neutral one
        self.write_template_cache_for_locale(None, scanned.templates(), None)?;
        written.push(None);

        info!("Wrote {} template cache documents", written.len());
        Ok(written)
    }

    /// Merges `new_templates` into the document of `locale` and writes it.
    ///
    /// A locale without a document starts from the neutral document.
    pub fn write_template_cache_for_locale(
        &self,
        locale: Option<&str>,
        new_templates: &[TemplateInfo],
        new_locators: Option<&HashMap<String, LocalizationLocator>>,
    ) -> Result<()> {
        let (found, mut content) = self.loader.try_read_template_cache_file(locale)?;
        if !found && locale.is_some() {
            content = self.loader.try_read_template_cache_file(None)?.1;
        }

        let existing = TemplateCache::parse_for_locale(&content, locale)?;
        let stored = localizations_from_templates(&existing.template_info, locale.unwrap_or_default());
        let merged = merge_templates(new_templates, &existing.template_info, new_locators, &stored);

        // Unreadable entries survive unless the scan rediscovered their identity
        let unreadable: Vec<_> = existing
            .unreadable_entries
            .into_iter()
            .filter(|entry| {
                entry_identity(entry).is_none_or(|id| !new_templates.iter().any(|t| t.identity == id))
            })
            .collect();

        debug!(
            "Template cache for {}: {} entries, {} kept unread",
            locale.unwrap_or("culture neutral locale"),
            merged.len(),
            unreadable.len()
        );
        let cache = TemplateCache::new(merged, Some(existing.cache_version)).with_unreadable_entries(unreadable);
        self.loader.write_template_cache_file(locale, &cache.to_json_string()?)
    }

    /// Deletes every locale document and then the neutral one.
    pub fn delete_all_locale_cache_files(&self) -> Result<()> {
        for locale in self.loader.locales_with_template_cache_files()? {
            self.loader.delete_template_cache_for_locale(Some(&locale))?;
        }
        self.loader.delete_template_cache_for_locale(None)
    }
}
