//! Configuration
//!
//! Optional TOML file with session defaults and HTTP client settings:
//!
//! ```toml
//! concat = true
//! routing_enabled = true
//! method = "POST"
//!
//! [headers]
//! Content-Type = "application/json"
//!
//! [http]
//! base_url = "http://localhost:8050"
//! connect_timeout_secs = 10
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::ConfigError;
use crate::session::{SessionProps, StreamOptions};

/// HTTP client settings for [`crate::transport::HttpTransport`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Base for relative stream URLs
    pub base_url: Option<String>,
    pub connect_timeout_secs: Option<u64>,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            connect_timeout_secs: Some(30),
            user_agent: format!("streamroute/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Session defaults loaded from disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub concat: bool,
    pub initial_done: bool,
    pub routing_enabled: bool,
    pub method: String,
    pub headers: BTreeMap<String, String>,
    pub http: HttpSettings,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            concat: true,
            initial_done: false,
            routing_enabled: false,
            method: StreamOptions::default().method,
            headers: BTreeMap::new(),
            http: HttpSettings::default(),
        }
    }
}

impl StreamConfig {
    /// `<config dir>/streamroute/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("streamroute").join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `explicit` if given (it must exist), else the default path if it
    /// exists, else built-in defaults.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => {
                debug!("no config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Stream options from the configured method and headers
    pub fn stream_options(&self, payload: Option<String>) -> StreamOptions {
        StreamOptions {
            method: self.method.clone(),
            headers: self.headers.clone(),
            payload,
            with_credentials: false,
        }
    }

    /// Owner inputs for a session on `url`
    pub fn session_props(&self, url: impl Into<String>, payload: Option<String>) -> SessionProps {
        SessionProps::new(url)
            .with_options(self.stream_options(payload))
            .with_concat(self.concat)
            .with_initial_done(self.initial_done)
            .with_routing(self.routing_enabled)
    }
}
