//! Update envelopes
//!
//! Envelopes are JSON arrays interpreted by their first element:
//!
//! ```text
//! ["[SINGLE]", id, {props}]
//! ["[BATCH]", [[id, {props}], ...]]
//! ["[ERROR]", id, {"error": "...", "handleError": true, "resetProps": [[id, {props}], ...]}]
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use tracing::trace;

use crate::error::EnvelopeError;

pub const ERROR_TAG: &str = "[ERROR]";
pub const SINGLE_TAG: &str = "[SINGLE]";
pub const BATCH_TAG: &str = "[BATCH]";

/// Partial property state applied to one component
pub type PropsPatch = Map<String, Value>;

/// Address of a component in the registry
///
/// Plain ids are strings. Pattern-matching ids are objects such as
/// `{"type": "output", "index": 3}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComponentId {
    Name(String),
    Pattern(Map<String, Value>),
}

impl ComponentId {
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(name) => Some(Self::Name(name.clone())),
            Value::Object(pattern) => Some(Self::Pattern(pattern.clone())),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Name(name) => Value::String(name.clone()),
            Self::Pattern(pattern) => Value::Object(pattern.clone()),
        }
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Pattern(_) => write!(f, "{}", self.to_value()),
        }
    }
}

impl From<&str> for ComponentId {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for ComponentId {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

/// One `(component id, props patch)` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropsUpdate {
    pub id: ComponentId,
    pub patch: PropsPatch,
}

impl PropsUpdate {
    pub fn new(id: impl Into<ComponentId>, patch: PropsPatch) -> Self {
        Self {
            id: id.into(),
            patch,
        }
    }

    /// Decode a 2-element `[id, {props}]` array. Anything else yields `None`.
    pub fn from_pair(value: &Value) -> Option<Self> {
        match value.as_array()?.as_slice() {
            [id, Value::Object(patch)] => Some(Self {
                id: ComponentId::from_value(id)?,
                patch: patch.clone(),
            }),
            _ => None,
        }
    }

    pub fn to_pair(&self) -> Value {
        Value::Array(vec![self.id.to_value(), Value::Object(self.patch.clone())])
    }
}

/// Payload of an `[ERROR]` envelope
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorPayload {
    /// Message shown to the user when `handle_error` is set
    pub error: String,
    pub handle_error: bool,
    /// Component resets applied before the stream closes
    pub reset_props: Vec<PropsUpdate>,
}

impl ErrorPayload {
    /// Lenient decode: missing or malformed fields fall back to their defaults.
    ///
    /// Accepts both `handleError`/`resetProps` and `handle_error`/`reset_props`.
    /// `reset_props` may be a list of pairs or an object keyed by component id.
    pub fn from_value(value: Option<&Value>) -> Self {
        let Some(Value::Object(fields)) = value else {
            return Self::default();
        };
        let field = |camel: &str, snake: &str| fields.get(camel).or_else(|| fields.get(snake));

        let error = match fields.get("error") {
            Some(Value::String(message)) => message.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        let handle_error = field("handleError", "handle_error").is_some_and(is_truthy);
        let reset_props = match field("resetProps", "reset_props") {
            Some(Value::Array(pairs)) => decode_pairs(pairs, ERROR_TAG),
            Some(Value::Object(by_id)) => by_id
                .iter()
                .map(|(id, props)| {
                    let patch = match props {
                        Value::Object(patch) => patch.clone(),
                        scalar => {
                            let mut patch = Map::new();
                            patch.insert("value".to_string(), scalar.clone());
                            patch
                        }
                    };
                    PropsUpdate::new(id.as_str(), patch)
                })
                .collect(),
            _ => Vec::new(),
        };

        Self {
            error,
            handle_error,
            reset_props,
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "error": self.error,
            "handleError": self.handle_error,
            "resetProps": self.reset_props.iter().map(PropsUpdate::to_pair).collect::<Vec<_>>(),
        })
    }
}

/// A decoded update envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    /// Server-side failure: optionally alert, reset components, then close
    Error {
        target: Option<ComponentId>,
        payload: ErrorPayload,
    },
    /// Exactly one component update
    Single {
        target: ComponentId,
        patch: PropsPatch,
    },
    /// Zero or more updates applied in order
    Batch(Vec<PropsUpdate>),
    /// Array with a tag we do not route
    Unknown(String),
}

impl Envelope {
    pub fn single(target: impl Into<ComponentId>, patch: PropsPatch) -> Self {
        Self::Single {
            target: target.into(),
            patch,
        }
    }

    pub fn batch(updates: impl IntoIterator<Item = PropsUpdate>) -> Self {
        Self::Batch(updates.into_iter().collect())
    }

    pub fn error(target: Option<ComponentId>, payload: ErrorPayload) -> Self {
        Self::Error { target, payload }
    }

    pub fn tag(&self) -> &str {
        match self {
            Self::Error { .. } => ERROR_TAG,
            Self::Single { .. } => SINGLE_TAG,
            Self::Batch(_) => BATCH_TAG,
            Self::Unknown(tag) => tag,
        }
    }

    /// Decode a parsed JSON value into an envelope
    pub fn decode(value: &Value) -> Result<Self, EnvelopeError> {
        let items = value.as_array().ok_or(EnvelopeError::NotAnArray)?;
        let tag = items
            .first()
            .and_then(Value::as_str)
            .ok_or(EnvelopeError::MissingTag)?;

        match tag {
            ERROR_TAG => Ok(Self::Error {
                target: items.get(1).and_then(ComponentId::from_value),
                payload: ErrorPayload::from_value(items.get(2)),
            }),
            SINGLE_TAG => {
                let target = items.get(1).ok_or(EnvelopeError::MissingField {
                    tag: SINGLE_TAG,
                    field: "component id",
                })?;
                let target =
                    ComponentId::from_value(target).ok_or(EnvelopeError::InvalidField {
                        tag: SINGLE_TAG,
                        field: "component id",
                        expected: "a string or an object",
                    })?;
                let patch = match items.get(2) {
                    Some(Value::Object(patch)) => patch.clone(),
                    Some(_) => {
                        return Err(EnvelopeError::InvalidField {
                            tag: SINGLE_TAG,
                            field: "props",
                            expected: "an object",
                        })
                    }
                    None => {
                        return Err(EnvelopeError::MissingField {
                            tag: SINGLE_TAG,
                            field: "props",
                        })
                    }
                };
                Ok(Self::Single { target, patch })
            }
            BATCH_TAG => match items.get(1) {
                Some(Value::Array(pairs)) => Ok(Self::Batch(decode_pairs(pairs, BATCH_TAG))),
                Some(_) => Err(EnvelopeError::InvalidField {
                    tag: BATCH_TAG,
                    field: "updates",
                    expected: "a list of [id, props] pairs",
                }),
                None => Err(EnvelopeError::MissingField {
                    tag: BATCH_TAG,
                    field: "updates",
                }),
            },
            other => Ok(Self::Unknown(other.to_string())),
        }
    }
}

fn decode_pairs(pairs: &[Value], tag: &str) -> Vec<PropsUpdate> {
    pairs
        .iter()
        .filter_map(|pair| {
            let update = PropsUpdate::from_pair(pair);
            if update.is_none() {
                trace!(tag, pair = %pair, "skipping malformed update pair");
            }
            update
        })
        .collect()
}

/// JavaScript truthiness, which the server-side flags were written against
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn patch(value: Value) -> PropsPatch {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_decode_single() {
        let envelope = Envelope::decode(&json!(["[SINGLE]", "compA", {"text": "hi"}])).unwrap();
        assert_eq!(envelope, Envelope::single("compA", patch(json!({"text": "hi"}))));
    }

    #[test]
    fn test_decode_single_with_pattern_id() {
        let envelope =
            Envelope::decode(&json!(["[SINGLE]", {"type": "out", "index": 2}, {"x": 1}])).unwrap();
        match envelope {
            Envelope::Single { target, .. } => {
                assert_eq!(target, ComponentId::Pattern(patch(json!({"type": "out", "index": 2}))));
            }
            other => panic!("unexpected envelope: {:?}", other),
        }
    }

    #[test]
    fn test_decode_single_rejects_bad_shapes() {
        assert!(matches!(
            Envelope::decode(&json!(["[SINGLE]"])),
            Err(EnvelopeError::MissingField { .. })
        ));
        assert!(matches!(
            Envelope::decode(&json!(["[SINGLE]", 5, {}])),
            Err(EnvelopeError::InvalidField { .. })
        ));
        assert!(matches!(
            Envelope::decode(&json!(["[SINGLE]", "a", "not props"])),
            Err(EnvelopeError::InvalidField { .. })
        ));
    }

    #[test]
    fn test_decode_batch_skips_malformed_pairs() {
        let envelope = Envelope::decode(&json!([
            "[BATCH]",
            [["a", {"x": 1}], ["b"], "junk", ["c", {"y": 2}, "extra"], ["d", {"z": 3}]]
        ]))
        .unwrap();
        assert_eq!(
            envelope,
            Envelope::batch([
                PropsUpdate::new("a", patch(json!({"x": 1}))),
                PropsUpdate::new("d", patch(json!({"z": 3}))),
            ])
        );
    }

    #[test]
    fn test_decode_batch_requires_list() {
        assert!(Envelope::decode(&json!(["[BATCH]", {"a": 1}])).is_err());
        assert!(Envelope::decode(&json!(["[BATCH]"])).is_err());
    }

    #[test]
    fn test_decode_error_camel_and_snake_case() {
        let camel = Envelope::decode(&json!([
            "[ERROR]", "compX",
            {"error": "boom", "handleError": true, "resetProps": [["compA", {"x": 0}]]}
        ]))
        .unwrap();
        let snake = Envelope::decode(&json!([
            "[ERROR]", "compX",
            {"error": "boom", "handle_error": true, "reset_props": [["compA", {"x": 0}]]}
        ]))
        .unwrap();
        assert_eq!(camel, snake);
        let Envelope::Error { target, payload } = camel else {
            panic!("expected error envelope");
        };
        assert_eq!(target, Some(ComponentId::from("compX")));
        assert_eq!(payload.error, "boom");
        assert!(payload.handle_error);
        assert_eq!(payload.reset_props.len(), 1);
    }

    #[test]
    fn test_error_payload_reset_props_by_id() {
        let payload = ErrorPayload::from_value(Some(&json!({
            "error": "x",
            "reset_props": {"button": {"disabled": false}, "status": "idle"}
        })));
        assert_eq!(
            payload.reset_props,
            vec![
                PropsUpdate::new("button", patch(json!({"disabled": false}))),
                PropsUpdate::new("status", patch(json!({"value": "idle"}))),
            ]
        );
    }

    #[test]
    fn test_error_payload_defaults() {
        assert_eq!(ErrorPayload::from_value(None), ErrorPayload::default());
        assert_eq!(
            ErrorPayload::from_value(Some(&json!("nope"))),
            ErrorPayload::default()
        );
        let payload = ErrorPayload::from_value(Some(&json!({"handleError": 0})));
        assert!(!payload.handle_error);
        let payload = ErrorPayload::from_value(Some(&json!({"handleError": "yes"})));
        assert!(payload.handle_error);
    }

    #[test]
    fn test_decode_unknown_and_non_envelopes() {
        assert_eq!(
            Envelope::decode(&json!(["[RUNNING]", "a", {}])).unwrap(),
            Envelope::Unknown("[RUNNING]".to_string())
        );
        // tags are case-sensitive
        assert_eq!(
            Envelope::decode(&json!(["[single]", "a", {}])).unwrap().tag(),
            "[single]"
        );
        assert_eq!(
            Envelope::decode(&json!({"a": 1})),
            Err(EnvelopeError::NotAnArray)
        );
        assert_eq!(Envelope::decode(&json!([])), Err(EnvelopeError::MissingTag));
        assert_eq!(Envelope::decode(&json!([1, 2])), Err(EnvelopeError::MissingTag));
    }
}
