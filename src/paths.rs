//! Well-known directory layout below the engine base directory.
//!
//! ```text
//! <base>/
//! ├── settings.json               # mount points, probing paths, components
//! ├── templatecache.json          # culture neutral template cache
//! ├── <locale>.templatecache.json # one per locale
//! ├── content/                    # materialized component directories
//! ├── packages/                   # materialized archives and restored packages
//! └── scratch/                    # temporary restore projects
//! ```

use crate::constants::{SETTINGS_FILE_NAME, TEMPLATE_CACHE_FILE_BASE_NAME};
use std::path::{Path, PathBuf};

/// Resolved engine paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    base_dir: PathBuf,
}

impl Paths {
    /// Creates the layout rooted at `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Root of all engine state.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// The settings document.
    #[must_use]
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join(SETTINGS_FILE_NAME)
    }

    /// Directory receiving component directories copied out of archives.
    #[must_use]
    pub fn content_dir(&self) -> PathBuf {
        self.base_dir.join("content")
    }

    /// Directory receiving archives and restored packages.
    #[must_use]
    pub fn packages_dir(&self) -> PathBuf {
        self.base_dir.join("packages")
    }

    /// Directory for throwaway restore projects.
    #[must_use]
    pub fn scratch_dir(&self) -> PathBuf {
        self.base_dir.join("scratch")
    }

    /// Cache document for `locale`, or the culture neutral document for `None`.
    #[must_use]
    pub fn template_cache_file(&self, locale: Option<&str>) -> PathBuf {
        match locale.filter(|l| !l.is_empty()) {
            Some(locale) => self.base_dir.join(format!("{locale}.{TEMPLATE_CACHE_FILE_BASE_NAME}")),
            None => self.base_dir.join(TEMPLATE_CACHE_FILE_BASE_NAME),
        }
    }

    /// Extracts the locale from a locale cache file name.
    ///
    /// Returns `None` for the neutral document and for unrelated files.
    #[must_use]
    pub fn locale_of_cache_file(file_name: &str) -> Option<&str> {
        let locale = file_name.strip_suffix(TEMPLATE_CACHE_FILE_BASE_NAME)?.strip_suffix('.')?;
        (!locale.is_empty()).then_some(locale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_file_names() {
        let paths = Paths::new("/base");
        assert_eq!(paths.template_cache_file(None), PathBuf::from("/base/templatecache.json"));
        assert_eq!(paths.template_cache_file(Some("")), PathBuf::from("/base/templatecache.json"));
        assert_eq!(
            paths.template_cache_file(Some("de-DE")),
            PathBuf::from("/base/de-DE.templatecache.json")
        );
    }

    #[test]
    fn test_locale_of_cache_file() {
        assert_eq!(Paths::locale_of_cache_file("de-DE.templatecache.json"), Some("de-DE"));
        assert_eq!(Paths::locale_of_cache_file("templatecache.json"), None);
        assert_eq!(Paths::locale_of_cache_file(".templatecache.json"), None);
        assert_eq!(Paths::locale_of_cache_file("settings.json"), None);
    }
}
