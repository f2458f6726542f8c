//! Default dialogue event type

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// An event exchanged between a publisher and a subscriber
///
/// The wire representation is a JSON object with camelCase keys:
///
/// ```json
/// {"id":"a","destination":"orders","payload":{"qty":1},"headers":{},"timestamp":1700000000000}
/// ```
///
/// `headers` and `timestamp` may be omitted by the sender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueEvent {
    /// Event identifier, unique per publisher
    pub id: String,
    /// Logical destination (channel) of the event
    pub destination: String,
    /// Application payload
    #[serde(default)]
    pub payload: Value,
    /// Free-form string headers
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Creation time in milliseconds since the Unix epoch
    #[serde(default)]
    pub timestamp: u64,
}

impl DialogueEvent {
    /// Create an event stamped with the current time
    pub fn new(id: impl Into<String>, destination: impl Into<String>, payload: Value) -> Self {
        Self {
            id: id.into(),
            destination: destination.into(),
            payload,
            headers: HashMap::new(),
            timestamp: now_millis(),
        }
    }

    /// Add a header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Look up a header
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_minimal_json_uses_defaults() {
        let event: DialogueEvent =
            serde_json::from_str(r#"{"id":"a","destination":"orders"}"#).unwrap();
        assert_eq!(event.id, "a");
        assert_eq!(event.destination, "orders");
        assert_eq!(event.payload, Value::Null);
        assert!(event.headers.is_empty());
        assert_eq!(event.timestamp, 0);
    }

    #[test]
    fn test_camel_case_keys() {
        let event =
            DialogueEvent::new("b", "orders", json!({"qty": 2})).with_header("tenant", "t1");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["id"], "b");
        assert_eq!(value["payload"]["qty"], 2);
        assert_eq!(value["headers"]["tenant"], "t1");
        assert!(value["timestamp"].as_u64().unwrap() > 0);
        assert_eq!(event.header("tenant"), Some("t1"));
    }
}
