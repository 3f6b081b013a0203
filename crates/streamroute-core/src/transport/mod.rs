//! Streaming transport seam
//!
//! A transport opens a connection and pushes [`TransportEvent`]s into the
//! sink it was given, in delivery order. The session owns the returned
//! [`Connection`] exclusively and closes it exactly when it is done with it.

pub mod http;
pub mod sse;

use tokio::sync::mpsc;

use crate::error::TransportError;
use crate::session::StreamOptions;

pub use http::HttpTransport;
pub use sse::{SseLineDecoder, SseMessage};

/// What a connection reports to its session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// One decoded message string
    Message(String),
    /// The connection failed or dropped
    Error(TransportError),
}

/// Where a connection delivers its events
pub type EventSink = mpsc::UnboundedSender<TransportEvent>;

/// Opens streaming connections
pub trait Transport: Send + Sync {
    fn open(
        &self,
        url: &str,
        options: &StreamOptions,
        sink: EventSink,
    ) -> Result<Box<dyn Connection>, TransportError>;
}

/// Handle to one open connection
pub trait Connection: Send {
    /// Stop delivering events. Safe to call any number of times.
    fn close(&mut self);

    fn is_closed(&self) -> bool;
}
