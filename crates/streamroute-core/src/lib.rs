//! streamroute core
//!
//! Routes server-sent event frames to addressable components and tracks the
//! lifecycle of one stream session:
//! - `protocol` - sentinel, update envelopes and their wire encoding
//! - `router` - pure frame classification and routing
//! - `session` - the stream session controller and its published state
//! - `transport` - the streaming connection seam plus an HTTP implementation

pub mod config;
pub mod error;
pub mod notify;
pub mod protocol;
pub mod registry;
pub mod router;
pub mod session;
pub mod transport;

pub use config::{HttpSettings, StreamConfig};
pub use error::{ConfigError, EnvelopeError, TransportError};
pub use notify::{LogNotifier, UserNotifier};
pub use protocol::{ComponentId, Envelope, ErrorPayload, PropsPatch, PropsUpdate, DONE_SENTINEL};
pub use registry::ComponentRegistry;
pub use router::{classify_and_route, Effect, RouteConfig, Routed};
pub use session::{
    SessionController, SessionPhase, SessionProps, SessionState, StreamIdentity, StreamOptions,
};
pub use transport::{Connection, EventSink, Transport, TransportEvent};
