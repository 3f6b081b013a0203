//! Frame router
//!
//! Turns one raw frame into a new session state plus the effects the
//! session controller must apply. Pure: no I/O and nothing here can fail
//! the caller; malformed input is logged and degrades to opaque data.

use tracing::{debug, warn};

use crate::protocol::{Envelope, Frame, PropsUpdate};
use crate::session::SessionState;

/// Per-session routing switches, fixed when the session opens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteConfig {
    pub concat: bool,
    pub routing_enabled: bool,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            concat: true,
            routing_enabled: false,
        }
    }
}

/// Side effects requested by a routed frame, in application order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Push a props patch into the component registry
    SetProps(PropsUpdate),
    /// Surface an error message to the user
    Alert(String),
    /// Close the stream
    Close,
}

/// Result of routing one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routed {
    pub state: SessionState,
    pub effects: Vec<Effect>,
}

impl Routed {
    pub fn closes(&self) -> bool {
        self.effects.contains(&Effect::Close)
    }
}

/// Text shown to the user for an `[ERROR]` envelope with `handleError` set
pub fn alert_message(error: &str) -> String {
    format!("Error from SSE stream: {}", error)
}

/// Classify `frame` and compute its effects against `state`
pub fn classify_and_route(state: &SessionState, frame: &str, config: RouteConfig) -> Routed {
    let mut next = state.clone();
    let mut effects = Vec::new();

    let classified = Frame::classify(frame, config.routing_enabled);
    if classified == Frame::Sentinel {
        next.mark_done();
        effects.push(Effect::Close);
        return Routed {
            state: next,
            effects,
        };
    }

    // The raw text stays the observable value even when it also routes.
    next.accumulate(frame, config.concat);

    match classified {
        Frame::Sentinel | Frame::Opaque => {}
        Frame::Malformed(e) => {
            debug!(error = %e, "frame is not an update envelope, not routing");
        }
        Frame::Structured(envelope) => route_envelope(envelope, &mut effects),
    }

    Routed {
        state: next,
        effects,
    }
}

fn route_envelope(envelope: Envelope, effects: &mut Vec<Effect>) {
    match envelope {
        Envelope::Error { target, payload } => {
            warn!(
                component = ?target.as_ref().map(|id| id.to_string()),
                error = %payload.error,
                resets = payload.reset_props.len(),
                "stream reported an error"
            );
            if payload.handle_error {
                effects.push(Effect::Alert(alert_message(&payload.error)));
            }
            effects.extend(payload.reset_props.into_iter().map(Effect::SetProps));
            effects.push(Effect::Close);
        }
        Envelope::Single { target, patch } => {
            effects.push(Effect::SetProps(PropsUpdate { id: target, patch }));
        }
        Envelope::Batch(updates) => {
            debug!("routing batch of {} updates", updates.len());
            effects.extend(updates.into_iter().map(Effect::SetProps));
        }
        Envelope::Unknown(tag) => {
            warn!("Unknown stream type: {}", tag);
        }
    }
}
