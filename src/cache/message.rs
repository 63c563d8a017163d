//! Cross-tab messages published on the broadcast channel.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Notification exchanged between tabs sharing an origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum CrossTabMessage {
    /// A tab stored a fresh payload for `key`
    CacheUpdated { key: String, payload: Value },
    /// A tab removed the stored entry for `key`
    CacheInvalidated { key: String },
}

impl CrossTabMessage {
    pub fn updated(key: impl Into<String>, payload: Value) -> Self {
        CrossTabMessage::CacheUpdated {
            key: key.into(),
            payload,
        }
    }

    pub fn invalidated(key: impl Into<String>) -> Self {
        CrossTabMessage::CacheInvalidated { key: key.into() }
    }

    /// Resource key the message concerns.
    pub fn key(&self) -> &str {
        match self {
            CrossTabMessage::CacheUpdated { key, .. } => key,
            CrossTabMessage::CacheInvalidated { key } => key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_updated_wire_shape() {
        let msg = CrossTabMessage::updated("commands", json!({"Fun": []}));
        let value = serde_json::to_value(&msg).unwrap();

        assert_eq!(value["type"], "cache-updated");
        assert_eq!(value["key"], "commands");
        assert_eq!(value["payload"], json!({"Fun": []}));
    }

    #[test]
    fn test_invalidated_has_no_payload() {
        let value = serde_json::to_value(CrossTabMessage::invalidated("shards")).unwrap();

        assert_eq!(value["type"], "cache-invalidated");
        assert!(value.get("payload").is_none());
    }

    #[test]
    fn test_key_accessor() {
        assert_eq!(CrossTabMessage::invalidated("a").key(), "a");
        assert_eq!(CrossTabMessage::updated("b", Value::Null).key(), "b");
    }
}
