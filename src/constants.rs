//! Global constants used throughout the scaffold engine.
//!
//! This module contains retry parameters, well-known file names and other
//! values that are used across multiple modules. Defining them centrally
//! keeps the on-disk layout discoverable in one place.

use std::time::Duration;

/// Maximum number of attempts when reading the settings document.
///
/// Another process may be in the middle of replacing the document, so reads
/// are retried with a short backoff before the failure becomes fatal.
pub const MAX_SETTINGS_LOAD_ATTEMPTS: u32 = 20;

/// Starting delay between settings read attempts (2ms).
pub const SETTINGS_READ_BACKOFF_MS: u64 = 2;

/// Maximum number of attempts when saving a probing path.
pub const MAX_PROBING_PATH_SAVE_ATTEMPTS: u32 = 10;

/// Starting delay between settings save attempts (10ms).
pub const SETTINGS_SAVE_BACKOFF_MS: u64 = 10;

/// Maximum backoff delay for exponential backoff (500ms).
///
/// Exponential backoff delays are capped at this value to prevent
/// excessive wait times during retry operations.
pub const MAX_BACKOFF_DELAY_MS: u64 = 500;

/// Version string written into every template cache document.
pub const CURRENT_CACHE_VERSION: &str = "1.0.0.0";

/// Content returned for a cache document that does not exist yet.
pub const DEFAULT_EMPTY_CACHE_FILE_CONTENT: &str = "{}";

/// Base name of the template cache documents.
///
/// The culture neutral cache is stored under this exact name; locale caches
/// are stored as `<locale>.templatecache.json`.
pub const TEMPLATE_CACHE_FILE_BASE_NAME: &str = "templatecache.json";

/// File name of the settings document inside the base directory.
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Suffix of the per-host template override file (`<host>.host.json`).
pub const HOST_TEMPLATE_FILE_CONFIG_BASE_NAME: &str = ".host.json";

/// Glob pattern identifying component manifest files inside a content root.
pub const COMPONENT_MANIFEST_PATTERN: &str = "*.component.json";

/// Glob pattern of the package manifest at the root of a package archive.
pub const NUSPEC_FILE_PATTERN: &str = "*.nuspec";

/// Name of the directory holding a template's configuration.
pub const TEMPLATE_CONFIG_DIR: &str = ".template.config";

/// Name of the template descriptor file inside [`TEMPLATE_CONFIG_DIR`].
pub const TEMPLATE_CONFIG_FILE: &str = "template.json";

/// Name of the localization directory inside [`TEMPLATE_CONFIG_DIR`].
pub const LOCALIZATION_DIR: &str = "localize";

/// Tag carrying the languages a template is authored in.
pub const LANGUAGE_TAG: &str = "language";

/// Tag carrying the kind of template (project, item, ...).
pub const TYPE_TAG: &str = "type";

/// Default host identifier used when no configuration overrides it.
pub const DEFAULT_HOST_IDENTIFIER: &str = "scaffold";

/// Default external tool used to restore remote content packages.
pub const DEFAULT_RESTORE_COMMAND: &str = "dotnet";

/// Timeout for a single package restore invocation (5 minutes).
pub const DEFAULT_RESTORE_TIMEOUT: Duration = Duration::from_secs(300);

/// Number of times a failed package restore is retried.
pub const MAX_RESTORE_ATTEMPTS: usize = 3;
