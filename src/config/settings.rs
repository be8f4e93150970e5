//! Application settings and configuration types.
//!
//! Settings are read from `settings.json` in the platform config directory
//! (`~/.config/unsubscriber/settings.json` on Linux), or from the path in
//! `UNSUBSCRIBER_CONFIG`. Every field has a default, so a missing file or a
//! partial one is fine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::domain::{AccountId, ProviderConfig};

/// Environment variable overriding the settings file location.
pub const CONFIG_ENV_VAR: &str = "UNSUBSCRIBER_CONFIG";

/// Keyword passed to the mailbox search.
pub const DEFAULT_KEYWORD: &str = "unsubscribe";

/// Pattern for candidate unsubscribe URLs, matched case-insensitively.
pub const DEFAULT_LINK_PATTERN: &str = r#"https?://[^\s"']*unsubscribe[^\s"']*"#;

/// Errors that can occur while loading settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The settings file exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid JSON for [`Settings`].
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// No home directory could be determined and no override was given.
    #[error("could not determine a config directory; set UNSUBSCRIBER_CONFIG")]
    NoConfigDir,
}

/// Top-level application settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Which mailbox to scan.
    pub account: AccountSettings,
    /// Search keyword and link extraction.
    pub search: SearchSettings,
    /// Outbound request behavior.
    pub http: HttpSettings,
}

impl Settings {
    /// Returns the default settings file path for this platform.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("io", "unsubscriber", "unsubscriber")
            .map(|dirs| dirs.config_dir().join("settings.json"))
    }

    /// Returns the settings path, honoring [`CONFIG_ENV_VAR`].
    pub fn resolve_path() -> Result<PathBuf, SettingsError> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
            _ => Self::default_path().ok_or(SettingsError::NoConfigDir),
        }
    }

    /// Loads settings from the resolved path.
    pub fn load() -> Result<Self, SettingsError> {
        let path = Self::resolve_path()?;
        Self::load_from(&path)
    }

    /// Loads settings from `path`, falling back to defaults if it doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no settings file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(SettingsError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let settings = serde_json::from_str(&contents).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }
}

/// Mailbox account selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountSettings {
    /// Account identifier, used as the keychain lookup key.
    pub id: AccountId,
    /// Provider and connection details.
    pub provider: ProviderConfig,
}

impl Default for AccountSettings {
    fn default() -> Self {
        Self {
            id: AccountId::from("default"),
            provider: ProviderConfig::default(),
        }
    }
}

/// Search and extraction settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Query passed to the mailbox search.
    pub keyword: String,
    /// Regular expression for candidate links (compiled case-insensitive).
    pub link_pattern: String,
    /// Drop repeated links before dispatch. Off by default, so a link found
    /// in ten messages is requested ten times.
    pub dedupe_links: bool,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            keyword: DEFAULT_KEYWORD.to_string(),
            link_pattern: DEFAULT_LINK_PATTERN.to_string(),
            dedupe_links: false,
        }
    }
}

/// Outbound HTTP settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// `User-Agent` header sent with each request.
    pub user_agent: String,
    /// Per-request timeout in seconds. `None` leaves requests unbounded.
    pub timeout_seconds: Option<u64>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: concat!("unsubscriber/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_seconds: None,
        }
    }
}
