//! The response envelope returned by every request.

use serde::Serialize;
use serde_json::Value;

/// The only shape the request executor ever returns.
///
/// Callers never see raw transport errors; timeouts, CORS failures, server
/// errors, and parse failures are all encoded here. Invariants, enforced by
/// the constructors:
///
/// - `success == true` iff `error` is absent
/// - `is_timeout` and `is_cors` are mutually exclusive and only set on
///   failure envelopes
#[derive(Debug, Clone, Serialize)]
pub struct ResponseEnvelope {
    /// Whether the call succeeded.
    pub success: bool,
    /// Parsed response payload on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Human-readable failure message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// HTTP status, when one was observed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// The call exceeded its deadline.
    pub is_timeout: bool,
    /// The failure was classified as cross-origin.
    pub is_cors: bool,
}

impl ResponseEnvelope {
    /// A successful response.
    pub fn ok(data: Value, status: u16) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            status: Some(status),
            is_timeout: false,
            is_cors: false,
        }
    }

    /// A terminal failure.
    pub fn failure(error: impl Into<String>, status: Option<u16>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            status,
            is_timeout: false,
            is_cors: false,
        }
    }

    /// A deadline failure. Never retried.
    pub fn timeout(error: impl Into<String>) -> Self {
        Self {
            is_timeout: true,
            ..Self::failure(error, None)
        }
    }

    /// A cross-origin failure. Never retried.
    pub fn cors(error: impl Into<String>) -> Self {
        Self {
            is_cors: true,
            ..Self::failure(error, None)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_has_no_error() {
        let envelope = ResponseEnvelope::ok(json!({"id": 1}), 200);
        assert!(envelope.success);
        assert!(envelope.error.is_none());
        assert_eq!(envelope.status, Some(200));
        assert!(!envelope.is_timeout);
        assert!(!envelope.is_cors);
    }

    #[test]
    fn test_failure_has_error() {
        let envelope = ResponseEnvelope::failure("Une erreur est survenue", Some(500));
        assert!(!envelope.success);
        assert!(envelope.error.is_some());
        assert_eq!(envelope.status, Some(500));
    }

    #[test]
    fn test_timeout_and_cors_flags_are_exclusive() {
        let timeout = ResponseEnvelope::timeout("expired");
        assert!(timeout.is_timeout && !timeout.is_cors && !timeout.success);

        let cors = ResponseEnvelope::cors("blocked");
        assert!(cors.is_cors && !cors.is_timeout && !cors.success);
    }
}
