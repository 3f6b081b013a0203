//! Frame classification

use serde_json::Value;

use super::envelope::Envelope;
use crate::error::EnvelopeError;

/// End-of-stream marker, compared verbatim before any parsing
pub const DONE_SENTINEL: &str = "[DONE]";

/// What a single message string turned out to be
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// The `[DONE]` sentinel
    Sentinel,
    /// Plain data; routing is disabled so no parse was attempted
    Opaque,
    /// A decoded update envelope
    Structured(Envelope),
    /// Routing was enabled but the frame is not an envelope
    Malformed(EnvelopeError),
}

impl Frame {
    pub fn classify(text: &str, routing_enabled: bool) -> Self {
        if text == DONE_SENTINEL {
            return Self::Sentinel;
        }
        if !routing_enabled {
            return Self::Opaque;
        }
        match serde_json::from_str::<Value>(text) {
            Ok(value) => match Envelope::decode(&value) {
                Ok(envelope) => Self::Structured(envelope),
                Err(e) => Self::Malformed(e),
            },
            Err(e) => Self::Malformed(EnvelopeError::InvalidJson(e.to_string())),
        }
    }
}
