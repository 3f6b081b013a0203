//! Wire protocol carried inside the event stream
//!
//! A frame is either the `[DONE]` sentinel, a JSON array envelope tagged
//! `[ERROR]`, `[SINGLE]` or `[BATCH]`, or opaque text.

pub mod encode;
pub mod envelope;
pub mod frame;

pub use encode::{done_event, ServerSentEvent};
pub use envelope::{
    ComponentId, Envelope, ErrorPayload, PropsPatch, PropsUpdate, BATCH_TAG, ERROR_TAG, SINGLE_TAG,
};
pub use frame::{Frame, DONE_SENTINEL};
