//! Configuration loading with layered overrides.
//!
//! Config is loaded in order (each layer overrides the previous):
//! 1. Default values
//! 2. Config file (TOML)
//! 3. Environment variables
//! 4. Explicit overrides

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;

/// Console core configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub routes: Routes,
    #[serde(default)]
    pub api: Api,
    #[serde(default)]
    pub lists: Lists,
}

/// Navigation targets used by the guard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Routes {
    #[serde(default = "default_login_path")]
    pub login_path: String,
    /// Where authenticated principals land when a route turns them away.
    #[serde(default = "default_default_path")]
    pub default_path: String,
}

impl Default for Routes {
    fn default() -> Self {
        Self {
            login_path: default_login_path(),
            default_path: default_default_path(),
        }
    }
}

fn default_login_path() -> String {
    "/login".to_string()
}

fn default_default_path() -> String {
    "/dashboard".to_string()
}

/// Backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Api {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Path suffix identifying login requests.
    #[serde(default = "default_login_endpoint")]
    pub login_endpoint: String,
    /// Per-request timeout in seconds; 0 disables it.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Api {
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}

impl Default for Api {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            login_endpoint: default_login_endpoint(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080/api".to_string()
}

fn default_login_endpoint() -> String {
    "/auth/login".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// List screen settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lists {
    /// Search box debounce window in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Lists {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for Lists {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            page_size: default_page_size(),
        }
    }
}

fn default_debounce_ms() -> u64 {
    400
}

fn default_page_size() -> u32 {
    10
}

const MAX_DEBOUNCE_MS: u64 = 2_000;

impl Config {
    /// Reject values the controllers cannot work with.
    pub fn validate(&self) -> crate::Result<()> {
        if self.lists.debounce_ms == 0 || self.lists.debounce_ms > MAX_DEBOUNCE_MS {
            return Err(Error::Config(format!(
                "debounce_ms must be within 1..={MAX_DEBOUNCE_MS}, got {}",
                self.lists.debounce_ms
            )));
        }
        if self.lists.page_size == 0 {
            return Err(Error::Config("page_size must be greater than 0".into()));
        }
        for (name, path) in [
            ("login_path", &self.routes.login_path),
            ("default_path", &self.routes.default_path),
        ] {
            if !path.starts_with('/') {
                return Err(Error::Config(format!("{name} must start with '/', got {path}")));
            }
        }
        let base_url = &self.api.base_url;
        match Url::parse(base_url) {
            Ok(url) if url.cannot_be_a_base() => {
                return Err(Error::Config(format!("base_url {base_url:?} cannot carry API paths")));
            }
            Ok(_) => {}
            Err(e) => return Err(Error::Config(format!("base_url {base_url:?} is invalid: {e}"))),
        }
        if self.routes.login_path == self.routes.default_path {
            return Err(Error::Config("login_path and default_path must differ".into()));
        }
        Ok(())
    }
}

/// Explicit values that win over every other layer.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub debounce_ms: Option<u64>,
    pub page_size: Option<u32>,
}

/// Builder for loading configuration with customizable options.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Environment variable prefix (e.g., "ASSETDESK" -> ASSETDESK_API_URL)
    pub env_prefix: String,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self {
            env_prefix: "ASSETDESK".to_string(),
        }
    }
}

impl ConfigLoader {
    /// Create a new config loader with the given environment prefix.
    pub fn new(env_prefix: impl Into<String>) -> Self {
        Self {
            env_prefix: env_prefix.into(),
        }
    }

    /// Load configuration from file, environment, and explicit overrides.
    pub fn load(&self, config_path: Option<&Path>, overrides: &Overrides) -> crate::Result<Config> {
        let mut config: Config = if let Some(path) = config_path {
            let content = std::fs::read_to_string(path)
                .map_err(|e| Error::Config(format!("Failed to read config file: {e}")))?;
            toml::from_str(&content)
                .map_err(|e| Error::Config(format!("Failed to parse config: {e}")))?
        } else {
            Config::default()
        };

        let prefix = &self.env_prefix;

        if let Ok(url) = std::env::var(format!("{prefix}_API_URL")) {
            config.api.base_url = url;
        }
        if let Some(secs) = self.env_number(&format!("{prefix}_REQUEST_TIMEOUT"))? {
            config.api.request_timeout_secs = secs;
        }
        if let Some(ms) = self.env_number(&format!("{prefix}_DEBOUNCE_MS"))? {
            config.lists.debounce_ms = ms;
        }
        if let Some(size) = self.env_number(&format!("{prefix}_PAGE_SIZE"))? {
            config.lists.page_size = size;
        }

        if let Some(url) = &overrides.base_url {
            config.api.base_url = url.clone();
        }
        if let Some(secs) = overrides.request_timeout_secs {
            config.api.request_timeout_secs = secs;
        }
        if let Some(ms) = overrides.debounce_ms {
            config.lists.debounce_ms = ms;
        }
        if let Some(size) = overrides.page_size {
            config.lists.page_size = size;
        }

        config.validate()?;
        Ok(config)
    }

    fn env_number<T: std::str::FromStr>(&self, key: &str) -> crate::Result<Option<T>> {
        match std::env::var(key) {
            Ok(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| Error::Config(format!("{key} must be a number, got {raw:?}"))),
            Err(_) => Ok(None),
        }
    }
}
