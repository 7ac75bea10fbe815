//! Configuration Management
//!
//! [`ClientConfig`] is what the library needs to talk to a server and is
//! passed explicitly into [`crate::api::ApiClient::new`]. [`Config`] is the
//! CLI's persistent store of last-used settings.

use crate::api::{ApiError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Environment variable for the API base URL
pub const ENV_API_URL: &str = "DIREKTIV_API_URL";
/// Environment variable for the default namespace
pub const ENV_NAMESPACE: &str = "DIREKTIV_NAMESPACE";
/// Environment variable for the API key
pub const ENV_APIKEY: &str = "DIREKTIV_APIKEY";

/// Default per-request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for an API client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root, e.g. `http://direktiv.local/api/`
    pub base_url: Url,
    /// Sent as the `apikey` header when set
    pub apikey: Option<String>,
    /// Per-request timeout (not applied to event streams)
    pub timeout: Duration,
}

impl ClientConfig {
    /// Validate a base URL and build a config without credentials
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        if base_url.scheme() != "http" && base_url.scheme() != "https" {
            return Err(ApiError::InvalidUrl(format!(
                "URL must start with http:// or https://, got: {}",
                base_url
            )));
        }

        Ok(Self {
            base_url,
            apikey: None,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    #[must_use]
    pub fn with_apikey(mut self, apikey: impl Into<String>) -> Self {
        self.apikey = Some(apikey.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Read a non-empty environment variable
fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Validate a namespace name: lowercase letters, digits, `-` and `_`
pub fn validate_namespace(namespace: &str) -> bool {
    if namespace.is_empty() || namespace.len() > 64 {
        return false;
    }

    let mut chars = namespace.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c.is_ascii_digit() => {},
        _ => return false,
    }

    namespace
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Last used API URL
    #[serde(default)]
    pub url: Option<String>,
    /// Last used namespace
    #[serde(default)]
    pub namespace: Option<String>,
    /// API key
    #[serde(default)]
    pub apikey: Option<String>,
}

impl Config {
    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("direktiv-hooks").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> std::io::Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };

        // Create parent directory
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)?;

        Ok(())
    }

    /// Get effective URL (config > environment)
    pub fn effective_url(&self) -> Option<String> {
        self.url.clone().or_else(|| env_value(ENV_API_URL))
    }

    /// Get effective namespace (config > environment)
    pub fn effective_namespace(&self) -> Option<String> {
        let namespace = self.namespace.clone().or_else(|| env_value(ENV_NAMESPACE))?;
        if validate_namespace(&namespace) {
            Some(namespace)
        } else {
            tracing::warn!("Invalid namespace name in configuration: {}", namespace);
            None
        }
    }

    /// Get effective API key (config > environment)
    pub fn effective_apikey(&self) -> Option<String> {
        self.apikey.clone().or_else(|| env_value(ENV_APIKEY))
    }

    /// Build client settings from the effective values
    pub fn client_config(&self) -> Result<ClientConfig> {
        let url = self
            .effective_url()
            .ok_or_else(|| ApiError::InvalidUrl(format!("no API URL configured (set {})", ENV_API_URL)))?;

        let mut config = ClientConfig::new(&url)?;
        config.apikey = self.effective_apikey();
        Ok(config)
    }

    /// Set URL and save
    pub fn set_url(&mut self, url: &str) -> std::io::Result<()> {
        self.url = Some(url.to_string());
        self.save()
    }

    /// Set namespace and save
    pub fn set_namespace(&mut self, namespace: &str) -> std::io::Result<()> {
        self.namespace = Some(namespace.to_string());
        self.save()
    }
}
