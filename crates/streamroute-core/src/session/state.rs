//! Session state tracking

use serde::Serialize;

/// The two observable outputs of a session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionState {
    /// Latest frame, or all frames concatenated
    pub value: String,
    /// Set by the `[DONE]` sentinel; only a new identity clears it
    pub done: bool,
}

impl SessionState {
    pub fn new(initial_done: bool) -> Self {
        Self {
            value: String::new(),
            done: initial_done,
        }
    }

    /// Fold one frame's text into the accumulated value
    pub fn accumulate(&mut self, text: &str, concat: bool) {
        if concat {
            self.value.push_str(text);
        } else {
            self.value.clear();
            self.value.push_str(text);
        }
    }

    pub fn mark_done(&mut self) {
        self.done = true;
    }
}

/// Where the current session is in its lifecycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionPhase {
    /// No identity, or an identity without a URL
    #[default]
    Idle,
    /// Connection requested and receiving frames
    Open,
    /// Sentinel, `[ERROR]`, transport failure or teardown
    Closed,
}
