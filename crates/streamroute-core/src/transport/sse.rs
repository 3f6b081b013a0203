//! text/event-stream decoding
//!
//! Splits a byte stream into events. Partial lines are buffered across
//! chunks and a line ends at `\r\n`, `\r` or `\n`. Comment lines (`:`)
//! are skipped, consecutive `data:` lines are joined with `\n` and a
//! blank line dispatches the event.

use bytes::{Buf, BytesMut};
use tracing::{debug, trace};

/// A dispatched event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseMessage {
    /// Event type; `None` means the default `message` type
    pub event: Option<String>,
    pub data: String,
    /// Last event id seen on the stream
    pub id: Option<String>,
}

impl SseMessage {
    /// Whether this is delivered to plain message listeners
    pub fn is_message(&self) -> bool {
        matches!(self.event.as_deref(), None | Some("message"))
    }
}

/// Incremental event-stream decoder
#[derive(Debug, Default)]
pub struct SseLineDecoder {
    buffer: BytesMut,
    /// Last line ended in `\r`; a leading `\n` in the next chunk belongs to it
    skip_lf: bool,
    data: Option<String>,
    event: Option<String>,
    last_event_id: Option<String>,
    retry_ms: Option<u64>,
    bytes_received: usize,
}

impl SseLineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconnection delay last announced by the server
    pub fn retry_ms(&self) -> Option<u64> {
        self.retry_ms
    }

    pub fn bytes_received(&self) -> usize {
        self.bytes_received
    }

    /// Feed a chunk and return every event it completed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseMessage> {
        self.bytes_received += chunk.len();
        self.buffer.extend_from_slice(chunk);
        trace!(
            "SSE chunk received: {} bytes (total: {} bytes)",
            chunk.len(),
            self.bytes_received
        );

        let mut messages = Vec::new();
        loop {
            if self.skip_lf {
                match self.buffer.first() {
                    Some(b'\n') => {
                        self.buffer.advance(1);
                        self.skip_lf = false;
                    }
                    Some(_) => self.skip_lf = false,
                    None => break,
                }
            }
            let Some(end) = self.buffer.iter().position(|&b| b == b'\n' || b == b'\r') else {
                break;
            };
            self.skip_lf = self.buffer[end] == b'\r';
            let line = self.buffer.split_to(end + 1);
            let line = String::from_utf8_lossy(&line[..end]);
            if let Some(message) = self.process_line(&line) {
                messages.push(message);
            }
        }
        messages
    }

    fn process_line(&mut self, line: &str) -> Option<SseMessage> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "data" => match &mut self.data {
                Some(data) => {
                    data.push('\n');
                    data.push_str(value);
                }
                None => self.data = Some(value.to_string()),
            },
            "event" => self.event = Some(value.to_string()),
            "id" if !value.contains('\0') => self.last_event_id = Some(value.to_string()),
            "retry" => match value.parse() {
                Ok(ms) => self.retry_ms = Some(ms),
                Err(_) => debug!("ignoring invalid SSE retry value: {}", value),
            },
            _ => trace!("ignoring SSE field: {}", field),
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseMessage> {
        let event = self.event.take();
        let data = self.data.take()?;
        Some(SseMessage {
            event,
            data,
            id: self.last_event_id.clone(),
        })
    }
}
