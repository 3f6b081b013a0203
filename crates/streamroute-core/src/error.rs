//! Error types shared across the crate

use std::path::PathBuf;
use thiserror::Error;

/// Reasons a frame could not be decoded into an update envelope
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    #[error("frame is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("frame is not a JSON array")]
    NotAnArray,
    #[error("envelope does not start with a string tag")]
    MissingTag,
    #[error("{tag} envelope is missing its {field}")]
    MissingField {
        tag: &'static str,
        field: &'static str,
    },
    #[error("{tag} envelope has an invalid {field}: expected {expected}")]
    InvalidField {
        tag: &'static str,
        field: &'static str,
        expected: &'static str,
    },
}

/// Failures reported by a streaming transport
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("invalid stream url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("invalid stream options: {0}")]
    InvalidOptions(String),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("server responded with status {status}")]
    Status { status: u16 },
    #[error("stream read failed: {0}")]
    Read(String),
    #[error("stream closed by server")]
    Closed,
}

/// Configuration loading failures
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
