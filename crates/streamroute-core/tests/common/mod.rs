//! Fakes for driving a session without a network

#![allow(dead_code)]

use anyhow::anyhow;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

use streamroute_core::{
    ComponentId, ComponentRegistry, Connection, EventSink, PropsPatch, SessionController,
    StreamOptions, Transport, TransportError, TransportEvent, UserNotifier,
};

/// Everything the session did to its collaborators, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Open(String),
    Close(usize),
    SetProps(String, Value),
    Alert(String),
}

#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<Call>>>);

impl Journal {
    pub fn push(&self, call: Call) {
        self.0.lock().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().clone()
    }

    pub fn set_props_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, Call::SetProps(..)))
            .collect()
    }

    pub fn count(&self, wanted: &Call) -> usize {
        self.0.lock().iter().filter(|call| *call == wanted).count()
    }
}

pub fn set(id: &str, props: Value) -> Call {
    Call::SetProps(id.to_string(), props)
}

/// Transport that hands out in-memory connections
pub struct FakeTransport {
    journal: Journal,
    sinks: Mutex<Vec<EventSink>>,
    script: Vec<String>,
    fail_open: bool,
}

impl FakeTransport {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            sinks: Mutex::new(Vec::new()),
            script: Vec::new(),
            fail_open: false,
        }
    }

    /// Every opened connection immediately receives these frames
    pub fn with_script(mut self, frames: &[&str]) -> Self {
        self.script = frames.iter().map(|frame| frame.to_string()).collect();
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub fn opened(&self) -> usize {
        self.sinks.lock().len()
    }

    /// Push an event into the n-th opened connection
    pub fn send(&self, connection: usize, event: TransportEvent) -> bool {
        self.sinks.lock()[connection].send(event).is_ok()
    }
}

impl Transport for FakeTransport {
    fn open(
        &self,
        url: &str,
        _options: &StreamOptions,
        sink: EventSink,
    ) -> Result<Box<dyn Connection>, TransportError> {
        if self.fail_open {
            return Err(TransportError::Connect("refused".to_string()));
        }
        self.journal.push(Call::Open(url.to_string()));
        for frame in &self.script {
            let _ = sink.send(TransportEvent::Message(frame.clone()));
        }
        let mut sinks = self.sinks.lock();
        sinks.push(sink);
        Ok(Box::new(FakeConnection {
            index: sinks.len() - 1,
            journal: self.journal.clone(),
            closed: false,
        }))
    }
}

struct FakeConnection {
    index: usize,
    journal: Journal,
    closed: bool,
}

impl Connection for FakeConnection {
    fn close(&mut self) {
        // Record every call so tests can check close happens exactly once.
        self.journal.push(Call::Close(self.index));
        self.closed = true;
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

pub fn recording_registry(journal: Journal) -> impl ComponentRegistry {
    move |id: &ComponentId, patch: &PropsPatch| -> anyhow::Result<()> {
        journal.push(Call::SetProps(id.to_string(), Value::Object(patch.clone())));
        Ok(())
    }
}

/// Registry that refuses updates for `broken` and records the rest
pub fn failing_registry(journal: Journal, broken: &'static str) -> impl ComponentRegistry {
    move |id: &ComponentId, patch: &PropsPatch| -> anyhow::Result<()> {
        if id.to_string() == broken {
            return Err(anyhow!("component {} is not mounted", broken));
        }
        journal.push(Call::SetProps(id.to_string(), Value::Object(patch.clone())));
        Ok(())
    }
}

pub fn recording_notifier(journal: Journal) -> impl UserNotifier {
    move |message: &str| journal.push(Call::Alert(message.to_string()))
}

pub struct Harness {
    pub journal: Journal,
    pub transport: Arc<FakeTransport>,
    pub controller: SessionController,
}

impl Harness {
    pub fn new() -> Self {
        let journal = Journal::default();
        Self::with_transport(journal.clone(), FakeTransport::new(journal))
    }

    pub fn with_transport(journal: Journal, transport: FakeTransport) -> Self {
        let registry = recording_registry(journal.clone());
        Self::build(journal, transport, Arc::new(registry))
    }

    pub fn build(
        journal: Journal,
        transport: FakeTransport,
        registry: Arc<dyn ComponentRegistry>,
    ) -> Self {
        let transport = Arc::new(transport);
        let controller = SessionController::new(
            transport.clone(),
            registry,
            Arc::new(recording_notifier(journal.clone())),
        );
        Self {
            journal,
            transport,
            controller,
        }
    }

    /// Deliver a message on the latest connection and let the session handle it
    pub fn deliver(&mut self, text: &str) {
        self.controller
            .dispatch(TransportEvent::Message(text.to_string()));
    }
}
