//! Error handling for the scaffold engine
//!
//! This module provides the strongly-typed error enum used across the engine and
//! the user-friendly rendering used by the CLI. The error system follows two
//! principles:
//! 1. **Strongly-typed errors** for precise handling in code
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! - [`EngineError`] - Enumerated error types for all fatal failure cases
//! - [`ErrorContext`] - Wrapper that adds user-friendly messages and suggestions
//!
//! Expected outcomes are deliberately *not* errors: an unknown mount point id or
//! generator id yields `Ok(None)`, and an ambiguous template query is reported
//! through the resolution result. Only persisted-state corruption, exhausted
//! retries and invalid user input surface as [`EngineError`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use scaffold_cli::core::{EngineError, ErrorContext};
//!
//! let context = ErrorContext::new(EngineError::CacheParseError {
//!     locale: "de-DE".to_string(),
//! })
//! .with_suggestion("Run 'scaffold cache clean' and reinstall your templates");
//!
//! context.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for engine operations.
///
/// # Error Categories
///
/// ## Persisted state
/// - [`SettingsReadFailed`] - Settings document unreadable after all retries
/// - [`SettingsParseError`] - Settings document is not valid JSON
/// - [`SettingsSaveFailed`] - Settings document could not be saved after all retries
/// - [`CacheParseError`] - Template cache document is present but malformed
/// - [`CacheCloneFailed`] - Neutral cache could not be cloned for a locale
///
/// ## Components and mounts
/// - [`InvalidComponentManifest`] - A component manifest could not be parsed
/// - [`UnknownImplementation`] - A manifest names an implementation the host never registered
/// - [`MountFailed`] - No factory could mount a place that must be mounted
///
/// ## Installation
/// - [`InvalidPackageSpecification`] - An install request is neither a path nor a package
/// - [`RestoreToolNotFound`] - The external restore tool is not on `PATH`
/// - [`RestoreFailed`] - The external restore process failed
///
/// [`SettingsReadFailed`]: EngineError::SettingsReadFailed
/// [`SettingsParseError`]: EngineError::SettingsParseError
/// [`SettingsSaveFailed`]: EngineError::SettingsSaveFailed
/// [`CacheParseError`]: EngineError::CacheParseError
/// [`CacheCloneFailed`]: EngineError::CacheCloneFailed
/// [`InvalidComponentManifest`]: EngineError::InvalidComponentManifest
/// [`UnknownImplementation`]: EngineError::UnknownImplementation
/// [`MountFailed`]: EngineError::MountFailed
/// [`InvalidPackageSpecification`]: EngineError::InvalidPackageSpecification
/// [`RestoreToolNotFound`]: EngineError::RestoreToolNotFound
/// [`RestoreFailed`]: EngineError::RestoreFailed
#[derive(Error, Debug)]
pub enum EngineError {
    /// The settings document could not be read.
    ///
    /// Reads are retried because another process may be replacing the
    /// document; this error is raised once every attempt has failed.
    #[error("Failed to read settings from {path} after {attempts} attempts")]
    SettingsReadFailed {
        /// Path to the settings document
        path: String,
        /// Number of attempts made
        attempts: u32,
    },

    /// The settings document exists but is not a valid settings document.
    #[error("Invalid settings document {path}: {reason}")]
    SettingsParseError {
        /// Path to the settings document
        path: String,
        /// Parser message
        reason: String,
    },

    /// Saving the settings document kept failing.
    #[error("Failed to save settings after {attempts} attempts: {reason}")]
    SettingsSaveFailed {
        /// Number of attempts made
        attempts: u32,
        /// Failure of the last attempt
        reason: String,
    },

    /// A template cache document was read but could not be parsed.
    #[error("Template cache for {locale} was read, but couldn't be parsed")]
    CacheParseError {
        /// Locale of the cache, or "culture neutral locale"
        locale: String,
    },

    /// The culture neutral cache could not be cloned as a locale cache.
    #[error("Unable to clone the culture neutral cache for locale {locale}")]
    CacheCloneFailed {
        /// Locale whose cache was being created
        locale: String,
    },

    /// A component manifest in a content root is malformed.
    #[error("Invalid component manifest {path}: {reason}")]
    InvalidComponentManifest {
        /// Path to the manifest
        path: String,
        /// Why the manifest was rejected
        reason: String,
    },

    /// No implementation is registered under the given key.
    #[error("No component implementation registered for '{key}'")]
    UnknownImplementation {
        /// Implementation key from a manifest or the settings document
        key: String,
    },

    /// A place that must be mounted was rejected by every factory.
    #[error("Unable to mount '{place}': {reason}")]
    MountFailed {
        /// Place that failed to mount
        place: String,
        /// Why mounting failed
        reason: String,
    },

    /// An install request is neither an existing path nor a `name::version` package.
    #[error("Invalid package specification: {spec}")]
    InvalidPackageSpecification {
        /// The offending request
        spec: String,
    },

    /// The external restore tool could not be located.
    #[error("Package restore tool '{tool}' not found in PATH")]
    RestoreToolNotFound {
        /// Name of the tool
        tool: String,
    },

    /// The external restore process failed.
    #[error("Package restore failed: {reason}")]
    RestoreFailed {
        /// Failure description
        reason: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

/// Error wrapper carrying a suggestion and details for display.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying engine error
    pub error: EngineError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Wraps an error without suggestion or details.
    #[must_use]
    pub const fn new(error: EngineError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Adds a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Adds details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Prints the error to stderr with colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Converts any error into an [`ErrorContext`] with suggestions for the CLI.
///
/// Engine errors anywhere in the cause chain are recognized; everything else
/// is reported as a configuration error carrying the full chain as details.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    // Context values are only visible to a downcast of the outer error
    if let Some(engine_error) = error
        .downcast_ref::<EngineError>()
        .or_else(|| error.chain().find_map(|e| e.downcast_ref::<EngineError>()))
    {
        return create_error_context(engine_error, &error);
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>()
        && io_error.kind() == std::io::ErrorKind::PermissionDenied
    {
        return ErrorContext::new(EngineError::Io(std::io::Error::new(
            io_error.kind(),
            io_error.to_string(),
        )))
        .with_suggestion("Check the permissions of the scaffold base directory")
        .with_details(format!("{error:#}"));
    }

    ErrorContext::new(EngineError::Other {
        message: error.to_string(),
    })
    .with_details(format!("{error:#}"))
}

fn create_error_context(error: &EngineError, chain: &anyhow::Error) -> ErrorContext {
    let details = format!("{chain:#}");
    let (error, suggestion) = match error {
        EngineError::SettingsReadFailed {
            path,
            attempts,
        } => (
            EngineError::SettingsReadFailed {
                path: path.clone(),
                attempts: *attempts,
            },
            "Another scaffold process may be holding the settings file; try again",
        ),
        EngineError::SettingsParseError {
            path,
            reason,
        } => (
            EngineError::SettingsParseError {
                path: path.clone(),
                reason: reason.clone(),
            },
            "Fix or delete the settings file; it is recreated on the next run",
        ),
        EngineError::SettingsSaveFailed {
            attempts,
            reason,
        } => (
            EngineError::SettingsSaveFailed {
                attempts: *attempts,
                reason: reason.clone(),
            },
            "Check that the base directory is writable and no other process rewrites it continuously",
        ),
        EngineError::CacheParseError {
            locale,
        } => (
            EngineError::CacheParseError {
                locale: locale.clone(),
            },
            "Run 'scaffold cache clean' and reinstall your template sources",
        ),
        EngineError::CacheCloneFailed {
            locale,
        } => (
            EngineError::CacheCloneFailed {
                locale: locale.clone(),
            },
            "Check that the base directory is writable",
        ),
        EngineError::InvalidComponentManifest {
            path,
            reason,
        } => (
            EngineError::InvalidComponentManifest {
                path: path.clone(),
                reason: reason.clone(),
            },
            "Check the JSON syntax of the component manifest",
        ),
        EngineError::UnknownImplementation {
            key,
        } => (
            EngineError::UnknownImplementation {
                key: key.clone(),
            },
            "The component was built for a different host; update the content source",
        ),
        EngineError::MountFailed {
            place,
            reason,
        } => (
            EngineError::MountFailed {
                place: place.clone(),
                reason: reason.clone(),
            },
            "Check that the path is a directory or a valid archive",
        ),
        EngineError::InvalidPackageSpecification {
            spec,
        } => (
            EngineError::InvalidPackageSpecification {
                spec: spec.clone(),
            },
            "Pass an existing directory, an archive, a wildcard path, or 'name::version'",
        ),
        EngineError::RestoreToolNotFound {
            tool,
        } => (
            EngineError::RestoreToolNotFound {
                tool: tool.clone(),
            },
            "Install the restore tool or set 'restore_command' in config.toml",
        ),
        EngineError::RestoreFailed {
            reason,
        } => (
            EngineError::RestoreFailed {
                reason: reason.clone(),
            },
            "Check the package name, version and your network connection",
        ),
        EngineError::ConfigError {
            message,
        } => (
            EngineError::ConfigError {
                message: message.clone(),
            },
            "Check config.toml for invalid values",
        ),
        EngineError::Io(e) => (
            EngineError::Io(std::io::Error::new(e.kind(), e.to_string())),
            "Check that the path exists and is accessible",
        ),
        EngineError::Json(e) => (
            EngineError::ConfigError {
                message: format!("JSON error: {e}"),
            },
            "Check the JSON syntax of the reported file",
        ),
        EngineError::Toml(e) => (
            EngineError::ConfigError {
                message: format!("TOML parsing error: {e}"),
            },
            "Check the TOML syntax in config.toml",
        ),
        EngineError::Other {
            message,
        } => {
            return ErrorContext::new(EngineError::Other {
                message: message.clone(),
            })
            .with_details(details);
        }
    };

    ErrorContext::new(error).with_suggestion(suggestion).with_details(details)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_error_display() {
        let error = EngineError::SettingsReadFailed {
            path: "/tmp/settings.json".to_string(),
            attempts: 20,
        };
        assert_eq!(
            error.to_string(),
            "Failed to read settings from /tmp/settings.json after 20 attempts"
        );

        let error = EngineError::CacheParseError {
            locale: "de-DE".to_string(),
        };
        assert_eq!(error.to_string(), "Template cache for de-DE was read, but couldn't be parsed");
    }

    #[test]
    fn test_error_context_display() {
        let ctx = ErrorContext::new(EngineError::SettingsSaveFailed {
            attempts: 10,
            reason: "permission denied".to_string(),
        })
        .with_suggestion("try again")
        .with_details("disk full");

        let rendered = ctx.to_string();
        assert!(rendered.contains("Failed to save settings after 10 attempts"));
        assert!(rendered.contains("Details: disk full"));
        assert!(rendered.contains("Suggestion: try again"));
    }

    #[test]
    fn test_user_friendly_error_finds_engine_error_in_chain() {
        let error: anyhow::Result<()> = Err(EngineError::CacheParseError {
            locale: "fr-FR".to_string(),
        })
        .context("Failed to write template caches");

        let ctx = user_friendly_error(error.unwrap_err());
        assert!(matches!(ctx.error, EngineError::CacheParseError { .. }));
        assert!(ctx.suggestion.unwrap().contains("cache clean"));
        assert!(ctx.details.unwrap().contains("Failed to write template caches"));
    }

    #[test]
    fn test_user_friendly_error_finds_engine_error_used_as_context() {
        let error: anyhow::Result<()> =
            Err(anyhow::anyhow!("disk full")).context(EngineError::CacheCloneFailed {
                locale: "de-DE".to_string(),
            });

        let ctx = user_friendly_error(error.unwrap_err());
        assert!(matches!(ctx.error, EngineError::CacheCloneFailed { .. }));
        assert!(ctx.suggestion.is_some());
    }

    #[test]
    fn test_user_friendly_error_generic() {
        let ctx = user_friendly_error(anyhow::anyhow!("something odd"));
        assert!(matches!(ctx.error, EngineError::Other { .. }));
        assert!(ctx.to_string().starts_with("something odd"));
    }
}
