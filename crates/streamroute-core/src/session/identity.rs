//! Stream identity and owner-facing inputs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::router::RouteConfig;

fn default_method() -> String {
    "GET".to_string()
}

/// Connection options handed to the transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamOptions {
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Request body, typically the JSON the producer needs to start streaming
    #[serde(default)]
    pub payload: Option<String>,
    #[serde(default, alias = "withCredentials")]
    pub with_credentials: bool,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            method: default_method(),
            headers: BTreeMap::new(),
            payload: None,
            with_credentials: false,
        }
    }
}

impl StreamOptions {
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = Some(payload.into());
        self
    }
}

/// `(url, options)` identifying one logical connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamIdentity {
    pub url: String,
    pub options: StreamOptions,
}

/// Inputs the owner sets on a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProps {
    pub url: Option<String>,
    pub options: Option<StreamOptions>,
    /// Append frames to the value instead of replacing it
    pub concat: bool,
    pub initial_done: bool,
    /// Decode envelopes and push them into the component registry
    pub routing_enabled: bool,
}

impl Default for SessionProps {
    fn default() -> Self {
        Self {
            url: None,
            options: None,
            concat: true,
            initial_done: false,
            routing_enabled: false,
        }
    }
}

impl SessionProps {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn with_options(mut self, options: StreamOptions) -> Self {
        self.options = Some(options);
        self
    }

    pub fn with_concat(mut self, concat: bool) -> Self {
        self.concat = concat;
        self
    }

    pub fn with_initial_done(mut self, initial_done: bool) -> Self {
        self.initial_done = initial_done;
        self
    }

    pub fn with_routing(mut self, routing_enabled: bool) -> Self {
        self.routing_enabled = routing_enabled;
        self
    }

    /// The identity to connect to; an empty URL counts as none
    pub fn identity(&self) -> Option<StreamIdentity> {
        let url = self.url.as_deref().filter(|url| !url.is_empty())?;
        Some(StreamIdentity {
            url: url.to_string(),
            options: self.options.clone().unwrap_or_default(),
        })
    }

    pub fn route_config(&self) -> RouteConfig {
        RouteConfig {
            concat: self.concat,
            routing_enabled: self.routing_enabled,
        }
    }

    /// Whether switching from `self` to `next` tears the session down
    pub(crate) fn requires_rebuild(&self, next: &SessionProps) -> bool {
        self.url != next.url || self.options != next.options || self.concat != next.concat
    }
}
