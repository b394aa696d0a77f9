//! Engine configuration (`~/.scaffold/config.toml`).
//!
//! The configuration names the host the engine runs for, the locale used for
//! template caches and where the engine keeps its persisted state. Every field
//! is optional; a missing file yields the defaults.
//!
//! # Configuration File Location
//!
//! - **Unix/macOS**: `~/.scaffold/config.toml`
//! - **Windows**: `%LOCALAPPDATA%\scaffold\config.toml`
//!
//! The location can be overridden using the `SCAFFOLD_CONFIG` environment
//! variable or the `--config` flag of the CLI.
//!
//! # File Format
//!
//! ```toml
//! host_identifier = "scaffold"
//! fallback_host_identifiers = ["dotnetcli"]
//! locale = "de-DE"
//! default_language = "C#"
//! base_dir = "~/.scaffold"
//! restore_command = "dotnet"
//! restore_timeout_secs = 300
//! ```

use crate::constants::{DEFAULT_HOST_IDENTIFIER, DEFAULT_RESTORE_COMMAND, DEFAULT_RESTORE_TIMEOUT};
use crate::core::EngineError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Environment variable overriding the configuration file location.
pub const CONFIG_PATH_ENV: &str = "SCAFFOLD_CONFIG";

/// Engine configuration loaded from TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Identifier of the host application, used to find `<id>.host.json` files.
    pub host_identifier: String,

    /// Identifiers tried in order when no host file exists for `host_identifier`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fallback_host_identifiers: Vec<String>,

    /// Locale of the current-locale template cache. Detected from `LANG` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,

    /// Language preferred when a query names none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_language: Option<String>,

    /// Directory holding settings, caches and materialized content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<PathBuf>,

    /// Executable used to restore remote packages.
    pub restore_command: String,

    /// Seconds the restore process may run before it is killed.
    pub restore_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            host_identifier: DEFAULT_HOST_IDENTIFIER.to_string(),
            fallback_host_identifiers: Vec::new(),
            locale: None,
            default_language: None,
            base_dir: None,
            restore_command: DEFAULT_RESTORE_COMMAND.to_string(),
            restore_timeout_secs: DEFAULT_RESTORE_TIMEOUT.as_secs(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from `path`, or from the default location when `None`.
    ///
    /// A missing file yields [`EngineConfig::default`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };
        if path.exists() {
            Self::load_from(&path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config: Self =
            toml::from_str(&content).map_err(EngineError::Toml).with_context(
                || format!("Failed to parse config from {}", path.display()),
            )?;
        config
            .validate()
            .with_context(|| format!("Invalid config in {}", path.display()))?;
        Ok(config)
    }

    /// Rejects values the engine cannot run with.
    pub fn validate(&self) -> std::result::Result<(), EngineError> {
        let invalid = |message: &str| {
            Err(EngineError::ConfigError {
                message: message.to_string(),
            })
        };

        if self.host_identifier.trim().is_empty() {
            return invalid("host_identifier must not be empty");
        }
        if self.fallback_host_identifiers.iter().any(|id| id.trim().is_empty()) {
            return invalid("fallback_host_identifiers must not contain empty entries");
        }
        if self.restore_command.trim().is_empty() {
            return invalid("restore_command must not be empty");
        }
        if self.restore_timeout_secs == 0 {
            return invalid("restore_timeout_secs must be greater than zero");
        }
        Ok(())
    }

    /// Save configuration to a specific file, creating parent directories.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write config to {}", path.display()))?;

        Ok(())
    }

    /// Default configuration file path, honoring `SCAFFOLD_CONFIG`.
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV)
            && !path.trim().is_empty()
        {
            return Ok(PathBuf::from(path));
        }

        Ok(Self::default_base_dir()?.join("config.toml"))
    }

    /// Default engine directory (`~/.scaffold`, or `%LOCALAPPDATA%\scaffold`).
    pub fn default_base_dir() -> Result<PathBuf> {
        let dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("scaffold")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".scaffold")
        };
        Ok(dir)
    }

    /// Base directory after `~` expansion, falling back to the default.
    pub fn resolved_base_dir(&self) -> Result<PathBuf> {
        match &self.base_dir {
            Some(dir) => {
                let raw = dir.to_string_lossy();
                let expanded = shellexpand::tilde(&raw);
                Ok(PathBuf::from(expanded.as_ref()))
            }
            None => Self::default_base_dir(),
        }
    }

    /// Locale from the configuration, or detected from the process environment.
    ///
    /// `LANG=de_DE.UTF-8` becomes `de-DE`. `C` and `POSIX` count as no locale.
    #[must_use]
    pub fn resolved_locale(&self) -> Option<String> {
        if let Some(locale) = self.locale.as_ref().filter(|l| !l.trim().is_empty()) {
            return Some(locale.trim().to_string());
        }

        ["LC_ALL", "LANG"].iter().find_map(|var| std::env::var(var).ok().and_then(|v| normalize_locale(&v)))
    }

    /// Restore timeout as a [`Duration`].
    #[must_use]
    pub const fn restore_timeout(&self) -> Duration {
        Duration::from_secs(self.restore_timeout_secs)
    }
}

fn normalize_locale(raw: &str) -> Option<String> {
    let tag = raw.split(['.', '@']).next().unwrap_or_default().trim();
    if tag.is_empty() || tag.eq_ignore_ascii_case("C") || tag.eq_ignore_ascii_case("POSIX") {
        return None;
    }
    Some(tag.replace('_', "-"))
}
