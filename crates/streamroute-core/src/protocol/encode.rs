//! Server-side encoding of frames
//!
//! Produces the text/event-stream form a producer writes so that the
//! router on the other end can dispatch it.

use serde_json::Value;

use super::envelope::Envelope;
use super::frame::DONE_SENTINEL;

/// One event in text/event-stream form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerSentEvent {
    pub data: String,
    pub event: Option<String>,
    pub id: Option<String>,
    pub retry: Option<u64>,
}

impl ServerSentEvent {
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            ..Default::default()
        }
    }

    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_retry(mut self, retry_ms: u64) -> Self {
        self.retry = Some(retry_ms);
        self
    }

    /// Encode as `field: value` lines terminated by a blank line.
    /// Multi-line data is split over several `data:` lines; `\r\n`, `\r`
    /// and `\n` all end a line, so a reader sees them as `\n`.
    pub fn encode(&self) -> String {
        let mut out = String::new();
        let lines = self
            .data
            .split("\r\n")
            .flat_map(|part| part.split(|c: char| c == '\r' || c == '\n'));
        for line in lines {
            out.push_str("data: ");
            out.push_str(line);
            out.push('\n');
        }
        if let Some(event) = &self.event {
            out.push_str(&format!("event: {}\n", event));
        }
        if let Some(id) = &self.id {
            out.push_str(&format!("id: {}\n", id));
        }
        if let Some(retry) = self.retry {
            out.push_str(&format!("retry: {}\n", retry));
        }
        out.push('\n');
        out
    }
}

/// The event that terminates a stream
pub fn done_event() -> ServerSentEvent {
    ServerSentEvent::new(DONE_SENTINEL)
}

impl Envelope {
    pub fn to_value(&self) -> Value {
        match self {
            Self::Error { target, payload } => Value::Array(vec![
                Value::from(self.tag()),
                target.as_ref().map_or(Value::Null, |id| id.to_value()),
                payload.to_value(),
            ]),
            Self::Single { target, patch } => Value::Array(vec![
                Value::from(self.tag()),
                target.to_value(),
                Value::Object(patch.clone()),
            ]),
            Self::Batch(updates) => Value::Array(vec![
                Value::from(self.tag()),
                Value::Array(updates.iter().map(|u| u.to_pair()).collect()),
            ]),
            Self::Unknown(tag) => Value::Array(vec![Value::from(tag.as_str())]),
        }
    }

    /// The JSON text carried in an event's `data` field
    pub fn to_frame(&self) -> String {
        self.to_value().to_string()
    }

    pub fn to_event(&self) -> ServerSentEvent {
        ServerSentEvent::new(self.to_frame())
    }
}
