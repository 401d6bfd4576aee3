//! Message envelope types
//!
//! Every message on the raw channel is an [`Envelope`]. The channel has no
//! request/response pairing of its own, so the envelope carries a fresh
//! [`MessageId`] per call for traceability and a `type` routing key the
//! receiving dispatch bus uses to find handlers.

use crate::errors::{CourierError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Unique identifier of one envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Generate a fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Wire-level message unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Per-call identifier
    pub id: MessageId,
    /// Routing key used to find handlers
    #[serde(rename = "type")]
    pub message_type: String,
    /// Opaque payload
    pub data: Value,
    /// Creation time in milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl Envelope {
    /// Create an envelope stamped with a fresh id and the current time
    pub fn new(message_type: impl Into<String>, data: Value) -> Self {
        Self {
            id: MessageId::new(),
            message_type: message_type.into(),
            data,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// The answer to one envelope as it travels back over the channel
///
/// A handler failure is part of the reply so the caller sees the same error
/// variant the callee raised.
pub type Reply = std::result::Result<Value, CourierError>;

/// Payload of a service call
///
/// `path` is absent when the call targets the service root. `args` is empty
/// for a bare property read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallData {
    /// Dotted property path, `None` for the root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Ordered argument list
    #[serde(default)]
    pub args: Vec<Value>,
}

impl CallData {
    /// Call data for a path and argument list
    pub fn new(path: Option<String>, args: Vec<Value>) -> Self {
        Self { path, args }
    }

    /// Path split into its property names; empty for the root
    pub fn segments(&self) -> Vec<&str> {
        match self.path.as_deref() {
            None | Some("") => Vec::new(),
            Some(path) => path.split('.').collect(),
        }
    }

    /// Encode as an envelope payload
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Decode from an envelope payload
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| CourierError::invalid_call(format!("malformed call data: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_uses_type_key_on_the_wire() {
        let envelope = Envelope::new("proxy-service.math", json!({"args": []}));
        let encoded = serde_json::to_value(&envelope).unwrap();
        assert_eq!(encoded["type"], "proxy-service.math");
        assert!(encoded["timestamp"].as_i64().unwrap() > 0);
    }

    #[test]
    fn test_envelope_ids_are_unique() {
        let a = Envelope::new("t", Value::Null);
        let b = Envelope::new("t", Value::Null);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_root_call_omits_path() {
        let data = CallData::new(None, vec![]);
        assert_eq!(data.to_value().unwrap(), json!({"args": []}));
        assert!(data.segments().is_empty());
    }

    #[test]
    fn test_call_data_segments() {
        let data = CallData::from_value(json!({"path": "obj.concat", "args": ["a"]})).unwrap();
        assert_eq!(data.segments(), vec!["obj", "concat"]);
        assert_eq!(data.args, vec![json!("a")]);
    }

    #[test]
    fn test_malformed_call_data() {
        let err = CallData::from_value(json!({"path": 3})).unwrap_err();
        assert!(matches!(err, CourierError::InvalidCall { .. }));
    }
}
