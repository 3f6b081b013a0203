//! Stream session lifecycle
//!
//! One session per stream identity. The controller opens the connection,
//! feeds frames through the router, applies the resulting effects and
//! republishes `{value, done}` to its owner.

mod controller;
mod identity;
mod state;

pub use controller::SessionController;
pub use identity::{SessionProps, StreamIdentity, StreamOptions};
pub use state::{SessionPhase, SessionState};
