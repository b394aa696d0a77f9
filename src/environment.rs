//! Engine session context.
//!
//! An [`EngineEnvironment`] is constructed once per process and passed to every
//! engine component. It bundles the host description, the directory layout and
//! the file system capability.

use crate::config::EngineConfig;
use crate::filesystem::{FileSystem, PhysicalFileSystem};
use crate::paths::Paths;
use anyhow::Result;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::warn;

/// A problem worth reporting that does not stop the current operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonCriticalError {
    /// Short machine-readable code, e.g. `InvalidPath`.
    pub code: String,
    /// Human readable message.
    pub message: String,
    /// Location or input the error relates to.
    pub context: String,
}

/// Description of the application hosting the engine.
#[derive(Debug)]
pub struct Host {
    identifier: String,
    fallback_host_identifiers: Vec<String>,
    locale: Option<String>,
    default_language: Option<String>,
    non_critical_errors: Mutex<Vec<NonCriticalError>>,
}

impl Host {
    /// Creates a host with the given identifier and no locale.
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            fallback_host_identifiers: Vec::new(),
            locale: None,
            default_language: None,
            non_critical_errors: Mutex::new(Vec::new()),
        }
    }

    /// Sets the current locale.
    #[must_use]
    pub fn with_locale(mut self, locale: Option<String>) -> Self {
        self.locale = locale.filter(|l| !l.trim().is_empty());
        self
    }

    /// Sets the identifiers tried when the primary host file is missing.
    #[must_use]
    pub fn with_fallback_host_identifiers(mut self, fallbacks: Vec<String>) -> Self {
        self.fallback_host_identifiers = fallbacks;
        self
    }

    /// Sets the language preferred when a query names none.
    #[must_use]
    pub fn with_default_language(mut self, language: Option<String>) -> Self {
        self.default_language = language;
        self
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn fallback_host_identifiers(&self) -> &[String] {
        &self.fallback_host_identifiers
    }

    /// Locale of the current-locale cache, `None` for culture neutral.
    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    pub fn default_language(&self) -> Option<&str> {
        self.default_language.as_deref()
    }

    /// Logs and records a non-critical error.
    pub fn on_non_critical_error(&self, code: &str, message: &str, context: &str) {
        warn!("{}: {} ({})", code, message, context);
        self.non_critical_errors.lock().unwrap_or_else(PoisonError::into_inner).push(
            NonCriticalError {
                code: code.to_string(),
                message: message.to_string(),
                context: context.to_string(),
            },
        );
    }

    /// Errors recorded so far.
    pub fn non_critical_errors(&self) -> Vec<NonCriticalError> {
        self.non_critical_errors.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// Host, paths and file system shared by all engine components.
pub struct EngineEnvironment {
    host: Host,
    paths: Paths,
    fs: Arc<dyn FileSystem>,
}

impl EngineEnvironment {
    pub fn new(host: Host, paths: Paths, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            host,
            paths,
            fs,
        }
    }

    /// Builds the environment described by `config` over the physical file system.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let host = Host::new(config.host_identifier.clone())
            .with_locale(config.resolved_locale())
            .with_fallback_host_identifiers(config.fallback_host_identifiers.clone())
            .with_default_language(config.default_language.clone());

        Ok(Self::new(host, Paths::new(config.resolved_base_dir()?), Arc::new(PhysicalFileSystem)))
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    pub fn fs(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    /// Shared handle to the file system, for mount points that outlive a borrow.
    pub fn fs_arc(&self) -> Arc<dyn FileSystem> {
        Arc::clone(&self.fs)
    }
}

impl std::fmt::Debug for EngineEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineEnvironment")
            .field("host", &self.host)
            .field("paths", &self.paths)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_critical_errors_are_recorded() {
        let host = Host::new("scaffold");
        host.on_non_critical_error("InvalidPath", "Path not found", "/nope");
        host.on_non_critical_error("InvalidPath", "Path not found", "/other");

        let errors = host.non_critical_errors();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].context, "/nope");
    }

    #[test]
    fn test_blank_locale_is_neutral() {
        let host = Host::new("scaffold").with_locale(Some("  ".to_string()));
        assert_eq!(host.locale(), None);
    }

    #[test]
    fn test_from_config_uses_base_dir() {
        let config = EngineConfig {
            base_dir: Some("/tmp/scaffold-base".into()),
            locale: Some("de-DE".to_string()),
            ..EngineConfig::default()
        };
        let env = EngineEnvironment::from_config(&config).unwrap();
        assert_eq!(env.paths().base_dir(), std::path::Path::new("/tmp/scaffold-base"));
        assert_eq!(env.host().locale(), Some("de-DE"));
    }
}
