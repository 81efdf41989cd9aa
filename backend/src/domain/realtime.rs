//! Real-time event payloads.
//!
//! [`RealtimeEvent`] is what WebSocket clients receive. [`Envelope`] wraps an
//! event with the identity of the process that emitted it so the fan-out
//! subscriber can skip its own publications.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Identity of one server process within the fan-out group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Uuid);

impl NodeId {
    /// Generate a fresh node identity.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Named event pushed to connected clients.
///
/// # Examples
/// ```
/// use serde_json::json;
/// use todo_backend::domain::RealtimeEvent;
///
/// let event = RealtimeEvent::new("task.updated", json!({"id": 1}));
/// assert_eq!(
///     serde_json::to_value(&event).unwrap(),
///     json!({"event": "task.updated", "payload": {"id": 1}})
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeEvent {
    /// Event name.
    pub event: String,
    /// Arbitrary JSON payload.
    #[serde(default)]
    pub payload: Value,
}

impl RealtimeEvent {
    /// Build an event from its name and payload.
    pub fn new(event: impl Into<String>, payload: Value) -> Self {
        Self {
            event: event.into(),
            payload,
        }
    }
}

/// Event tagged with the emitting node, as carried on the pub/sub channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Node that emitted the event.
    pub origin: NodeId,
    /// The event itself.
    #[serde(flatten)]
    pub event: RealtimeEvent,
}

impl Envelope {
    /// Tag an event with its origin.
    pub const fn new(origin: NodeId, event: RealtimeEvent) -> Self {
        Self { origin, event }
    }

    /// Whether this envelope was emitted by `node`.
    pub fn is_from(&self, node: NodeId) -> bool {
        self.origin == node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    fn envelope_flattens_event_fields() {
        let node = NodeId::random();
        let envelope = Envelope::new(node, RealtimeEvent::new("ping", json!(null)));
        let value = serde_json::to_value(&envelope).expect("serialise envelope");

        assert_eq!(value["event"], json!("ping"));
        assert_eq!(value["origin"], json!(node.to_string()));
    }

    #[rstest]
    fn missing_payload_defaults_to_null() {
        let event: RealtimeEvent =
            serde_json::from_value(json!({"event": "bare"})).expect("deserialise event");
        assert_eq!(event.payload, Value::Null);
    }

    #[rstest]
    fn is_from_compares_origin() {
        let node = NodeId::random();
        let envelope = Envelope::new(node, RealtimeEvent::new("x", json!({})));
        assert!(envelope.is_from(node));
        assert!(!envelope.is_from(NodeId::random()));
    }
}
