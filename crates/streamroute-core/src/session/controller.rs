//! Stream session controller
//!
//! Owns at most one live connection. Every message is routed to
//! completion before the next one is taken, and `{value, done}` is
//! republished after each of them.

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use super::identity::{SessionProps, StreamIdentity};
use super::state::{SessionPhase, SessionState};
use crate::error::TransportError;
use crate::notify::UserNotifier;
use crate::protocol::DONE_SENTINEL;
use crate::registry::ComponentRegistry;
use crate::router::{self, Effect, RouteConfig};
use crate::transport::{Connection, Transport, TransportEvent};

/// The live half of a session: its connection and event channel
struct ActiveStream {
    identity: StreamIdentity,
    route: RouteConfig,
    connection: Box<dyn Connection>,
    events: mpsc::UnboundedReceiver<TransportEvent>,
    opened_at: Instant,
    frame_count: usize,
}

impl ActiveStream {
    fn close(mut self, reason: &str) {
        self.connection.close();
        info!(
            url = %self.identity.url,
            frames = self.frame_count,
            "stream closed after {:?}: {}",
            self.opened_at.elapsed(),
            reason
        );
    }
}

enum Step {
    Props(bool),
    Event(Option<TransportEvent>),
}

/// Drives one stream session per identity
pub struct SessionController {
    transport: Arc<dyn Transport>,
    registry: Arc<dyn ComponentRegistry>,
    notifier: Arc<dyn UserNotifier>,
    props: Option<SessionProps>,
    state: SessionState,
    phase: SessionPhase,
    active: Option<ActiveStream>,
    output: watch::Sender<SessionState>,
}

impl SessionController {
    pub fn new(
        transport: Arc<dyn Transport>,
        registry: Arc<dyn ComponentRegistry>,
        notifier: Arc<dyn UserNotifier>,
    ) -> Self {
        let (output, _) = watch::channel(SessionState::default());
        Self {
            transport,
            registry,
            notifier,
            props: None,
            state: SessionState::default(),
            phase: SessionPhase::Idle,
            active: None,
            output,
        }
    }

    /// Receiver of every republished `{value, done}`
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.output.subscribe()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Identity of the open connection, if any
    pub fn identity(&self) -> Option<&StreamIdentity> {
        self.active.as_ref().map(|active| &active.identity)
    }

    /// Apply the owner's inputs.
    ///
    /// A change of url, options or concat tears the current session down
    /// and starts a fresh one. Other inputs are stored and take effect with
    /// the next session.
    pub fn update_props(&mut self, props: SessionProps) {
        let rebuild = self
            .props
            .as_ref()
            .map_or(true, |current| current.requires_rebuild(&props));
        self.props = Some(props);
        if rebuild {
            self.rebuild();
        }
    }

    fn rebuild(&mut self) {
        self.release("stream identity changed");

        let Some(props) = self.props.as_ref() else {
            return;
        };
        let Some(identity) = props.identity() else {
            debug!("no stream url, session idle");
            self.state = SessionState::default();
            self.phase = SessionPhase::Idle;
            self.publish();
            return;
        };

        self.state = SessionState::new(props.initial_done);
        let route = props.route_config();
        let (sink, events) = mpsc::unbounded_channel();
        match self.transport.open(&identity.url, &identity.options, sink) {
            Ok(connection) => {
                info!(
                    url = %identity.url,
                    method = %identity.options.method,
                    concat = route.concat,
                    routing = route.routing_enabled,
                    "stream opened"
                );
                self.active = Some(ActiveStream {
                    identity,
                    route,
                    connection,
                    events,
                    opened_at: Instant::now(),
                    frame_count: 0,
                });
                self.phase = SessionPhase::Open;
            }
            Err(e) => {
                warn!(url = %identity.url, error = %e, "failed to open stream");
                self.phase = SessionPhase::Closed;
            }
        }
        self.publish();
    }

    /// Wait for the next event of the open connection.
    ///
    /// Returns `None` immediately when nothing is open, and closes the
    /// session if the transport drops its sink without reporting an error.
    pub async fn next_event(&mut self) -> Option<TransportEvent> {
        let active = self.active.as_mut()?;
        let event = active.events.recv().await;
        if event.is_none() {
            self.close_stream("transport went away");
        }
        event
    }

    pub fn dispatch(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Message(text) => self.handle_message(&text),
            TransportEvent::Error(e) => self.handle_transport_error(e),
        }
    }

    /// Route one message from the open connection
    pub fn handle_message(&mut self, text: &str) {
        let route = match self.active.as_mut() {
            Some(active) => {
                active.frame_count += 1;
                active.route
            }
            None => {
                debug!("dropping frame, no open stream");
                return;
            }
        };

        let routed = router::classify_and_route(&self.state, text, route);
        self.state = routed.state;
        for effect in routed.effects {
            match effect {
                Effect::SetProps(update) => {
                    if let Err(e) = self.registry.set_props(&update.id, &update.patch) {
                        warn!(component = %update.id, error = %e, "failed to apply routed props");
                    }
                }
                Effect::Alert(message) => self.notifier.alert(&message),
                Effect::Close => {
                    let reason = if text == DONE_SENTINEL {
                        "end of stream"
                    } else {
                        "error envelope"
                    };
                    self.close_stream(reason);
                }
            }
        }
        self.publish();
    }

    /// Transport failures close the connection but leave `done` alone
    pub fn handle_transport_error(&mut self, error: TransportError) {
        if self.active.is_none() {
            debug!(error = %error, "ignoring transport error, no open stream");
            return;
        }
        warn!(error = %error, "Unhandled SSE error");
        self.close_stream("transport error");
    }

    /// Owner teardown: release the connection and end the session
    pub fn shutdown(&mut self) {
        self.close_stream("session shut down");
        self.props = None;
    }

    /// Drive the session from a stream of owner inputs.
    ///
    /// Returns once the props sender is dropped, after shutting down.
    pub async fn run(mut self, mut props_rx: watch::Receiver<SessionProps>) {
        let initial = props_rx.borrow_and_update().clone();
        self.update_props(initial);

        loop {
            let step = if self.active.is_some() {
                tokio::select! {
                    biased;
                    changed = props_rx.changed() => Step::Props(changed.is_ok()),
                    event = self.next_event() => Step::Event(event),
                }
            } else {
                Step::Props(props_rx.changed().await.is_ok())
            };

            match step {
                Step::Props(true) => {
                    let props = props_rx.borrow_and_update().clone();
                    self.update_props(props);
                }
                Step::Props(false) => {
                    self.shutdown();
                    return;
                }
                Step::Event(Some(event)) => self.dispatch(event),
                Step::Event(None) => {}
            }
        }
    }

    fn close_stream(&mut self, reason: &str) {
        self.release(reason);
        self.phase = SessionPhase::Closed;
    }

    /// Close the connection, if any, without touching the phase
    fn release(&mut self, reason: &str) {
        if let Some(active) = self.active.take() {
            active.close(reason);
        }
    }

    fn publish(&self) {
        self.output.send_replace(self.state.clone());
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.release("session dropped");
    }
}
