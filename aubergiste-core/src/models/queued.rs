//! Persisted offline queue entries.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::request::Method;

/// A request deferred while offline, persisted until replayed.
///
/// Only JSON-bodied requests are queueable; the queue rejects multipart
/// uploads at enqueue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedRequest {
    /// Unique queue entry id.
    pub id: String,
    /// Target URL.
    pub url: String,
    /// HTTP method.
    pub method: Method,
    /// JSON body, when the original call carried one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// Caller headers captured at enqueue time.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// When the request was enqueued.
    pub enqueued_at: DateTime<Utc>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serde_round_trip() {
        let entry = QueuedRequest {
            id: "q_1".to_string(),
            url: "https://api.test/stays".to_string(),
            method: Method::Post,
            body: Some(json!({"room": 12})),
            headers: HashMap::from([("X-Request-Id".to_string(), "abc".to_string())]),
            enqueued_at: Utc::now(),
        };

        let serialized = serde_json::to_string(&entry).unwrap();
        let parsed: QueuedRequest = serde_json::from_str(&serialized).unwrap();
        assert_eq!(parsed.id, entry.id);
        assert_eq!(parsed.method, Method::Post);
        assert_eq!(parsed.body, entry.body);
        assert_eq!(parsed.headers, entry.headers);
    }

    #[test]
    fn test_method_serializes_uppercase() {
        let entry = QueuedRequest {
            id: "q_2".to_string(),
            url: "https://api.test/ping".to_string(),
            method: Method::Delete,
            body: None,
            headers: HashMap::new(),
            enqueued_at: Utc::now(),
        };
        let serialized = serde_json::to_value(&entry).unwrap();
        assert_eq!(serialized["method"], "DELETE");
        assert!(serialized.get("body").is_none());
    }
}
