//! Configuration management
//!
//! Settings live in `<data dir>/settings.json`:
//! ```json
//! {
//!   "api": { "baseUri": "http://localhost:8000/api/", "csrfPath": "csrf",
//!            "timeoutSecs": 30, "csrfTtlSecs": 3600 }
//! }
//! ```
//! Fields the client does not manage are preserved on save.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Overrides `api.baseUri`
pub const BASE_URI_ENV: &str = "TICKETMGR_BASE_URI";

/// Passphrase for the encrypted secret store (never written to disk)
pub const SECRET_PASSPHRASE_ENV: &str = "TICKETMGR_SECRET_PASSPHRASE";

/// Overrides the data directory
pub const DATA_DIR_ENV: &str = "TICKETMGR_DIR";

const DEFAULT_BASE_URI: &str = "http://localhost:8000/api/";
const DEFAULT_CSRF_PATH: &str = "csrf";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CSRF_TTL_SECS: u64 = 3600;

fn default_base_uri() -> String {
    DEFAULT_BASE_URI.to_string()
}

fn default_csrf_path() -> String {
    DEFAULT_CSRF_PATH.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_csrf_ttl_secs() -> u64 {
    DEFAULT_CSRF_TTL_SECS
}

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    api: ApiSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Backend API settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSettings {
    /// Base URI every request path is appended to
    #[serde(default = "default_base_uri")]
    pub base_uri: String,
    /// Path (relative to the base) of the endpoint issuing CSRF cookies
    #[serde(default = "default_csrf_path")]
    pub csrf_path: String,
    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Token lifetime when the backend does not send Max-Age
    #[serde(default = "default_csrf_ttl_secs")]
    pub csrf_ttl_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_uri: default_base_uri(),
            csrf_path: default_csrf_path(),
            timeout_secs: default_timeout_secs(),
            csrf_ttl_secs: default_csrf_ttl_secs(),
        }
    }
}

impl ApiSettings {
    /// Settings pointing at another backend, other values default
    pub fn with_base_uri(base_uri: impl Into<String>) -> Self {
        Self {
            base_uri: base_uri.into(),
            ..Self::default()
        }
    }
}

/// ticketmgr configuration (simplified view of settings)
#[derive(Clone, Default)]
pub struct Config {
    pub api: ApiSettings,
    /// Encrypts the secret store when set
    pub secret_passphrase: Option<String>,
    // Keep the raw settings for preservation when saving
    _raw_settings: SettingsFile,
}

impl Config {
    /// Load config from the data directory, applying environment overrides
    pub fn load(data_dir: &Path) -> Result<Self> {
        Self::load_with_env(data_dir, |key| std::env::var(key).ok())
    }

    /// Load config with a custom environment lookup
    pub fn load_with_env(data_dir: &Path, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let settings_path = data_dir.join("settings.json");

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)
                .with_context(|| format!("Failed to read {}", settings_path.display()))?;
            serde_json::from_str(&content).unwrap_or_default()
        } else {
            SettingsFile::default()
        };

        let mut api = raw.api.clone();
        if let Some(base_uri) = env(BASE_URI_ENV).filter(|v| !v.trim().is_empty()) {
            api.base_uri = base_uri;
        }

        let secret_passphrase = env(SECRET_PASSPHRASE_ENV).filter(|v| !v.is_empty());

        Ok(Self {
            api,
            secret_passphrase,
            _raw_settings: raw,
        })
    }

    /// Save config to the data directory
    /// Preserves other settings that the client doesn't manage
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let settings_path = data_dir.join("settings.json");

        // Load existing settings to preserve fields we don't manage
        let mut settings = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str::<SettingsFile>(&content).unwrap_or_default()
        } else {
            self._raw_settings.clone()
        };

        settings.api = self.api.clone();

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api", &self.api)
            .field("secret_passphrase", &self.secret_passphrase.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Data directory from `TICKETMGR_DIR`, or `~/.ticketmgr`
pub fn default_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".ticketmgr"))
        .context("Could not find home directory")
}
