//! Structured, leveled logging with error fan-out.
//!
//! Emission goes through `tracing`; what this layer adds is
//! environment-aware verbosity (debug suppressed in production, stacks and
//! request bodies redacted) and an observer list for error-level records.
//! Every non-internal error-level emission is handed to the registered
//! [`ErrorSink`]s — the error monitor registers itself as one, which makes
//! it the ingestion point for all errors logged anywhere in the
//! application. Records tagged internal (the monitor's own diagnostics)
//! are skipped structurally, so the fan-out cannot feed on its own output.

use std::sync::{Arc, RwLock};

use aubergiste_core::{ErrorSink, Fault, Method};
use serde_json::{Value, json};

/// Source tag attached to sink notifications from plain log calls.
const LOGGER_SOURCE: &str = "logger";

// ============================================================================
// Environment
// ============================================================================

/// Deployment environment, controlling log verbosity and redaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    /// Verbose logging, stacks and bodies included.
    #[default]
    Development,
    /// Debug suppressed, stacks and request bodies redacted.
    Production,
}

impl Environment {
    /// Resolves the environment from `AUBERGISTE_ENV`.
    pub fn detect() -> Self {
        std::env::var("AUBERGISTE_ENV")
            .map(|name| Self::from_name(&name))
            .unwrap_or_default()
    }

    /// Parses an environment name; anything but `production` is
    /// development.
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("production") {
            Environment::Production
        } else {
            Environment::Development
        }
    }

    /// Returns the environment as a log field value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    /// Returns true in production.
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

// ============================================================================
// Logger
// ============================================================================

/// Structured logger with environment-aware verbosity and error fan-out.
pub struct Logger {
    environment: Environment,
    sinks: RwLock<Vec<Arc<dyn ErrorSink>>>,
}

impl Logger {
    /// Creates a logger for the detected environment.
    pub fn new() -> Self {
        Self::with_environment(Environment::detect())
    }

    /// Creates a logger for an explicit environment.
    pub fn with_environment(environment: Environment) -> Self {
        Self {
            environment,
            sinks: RwLock::new(Vec::new()),
        }
    }

    /// Returns the logger's environment.
    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Registers an observer for error-level emissions.
    pub fn add_error_sink(&self, sink: Arc<dyn ErrorSink>) {
        if let Ok(mut sinks) = self.sinks.write() {
            sinks.push(sink);
        }
    }

    /// Renders structured data for emission. Never panics: unserializable
    /// data degrades to a placeholder instead.
    fn render(data: &Value) -> Option<String> {
        if data.is_null() {
            return None;
        }
        Some(serde_json::to_string(data).unwrap_or_else(|e| format!("<unserializable: {e}>")))
    }

    /// Debug level logging. No-op in production.
    pub fn debug(&self, message: &str, data: &Value) {
        if self.environment.is_production() {
            return;
        }
        match Self::render(data) {
            Some(payload) => {
                tracing::debug!(environment = self.environment.as_str(), data = %payload, "{message}");
            }
            None => tracing::debug!(environment = self.environment.as_str(), "{message}"),
        }
    }

    /// Info level logging.
    pub fn info(&self, message: &str, data: &Value) {
        match Self::render(data) {
            Some(payload) => {
                tracing::info!(environment = self.environment.as_str(), data = %payload, "{message}");
            }
            None => tracing::info!(environment = self.environment.as_str(), "{message}"),
        }
    }

    /// Warning level logging.
    pub fn warn(&self, message: &str, data: &Value) {
        match Self::render(data) {
            Some(payload) => {
                tracing::warn!(environment = self.environment.as_str(), data = %payload, "{message}");
            }
            None => tracing::warn!(environment = self.environment.as_str(), "{message}"),
        }
    }

    /// Error level logging for a normalized fault.
    ///
    /// The stack is emitted only outside production; sinks always receive
    /// the full fault.
    pub fn error(&self, message: &str, fault: &Fault) {
        self.error_with_source(message, fault, LOGGER_SOURCE);
    }

    /// Error level logging with an explicit source tag for sinks.
    pub fn error_with_source(&self, message: &str, fault: &Fault, source: &str) {
        let stack = if self.environment.is_production() {
            None
        } else {
            fault.stack.as_deref()
        };
        match stack {
            Some(stack) => tracing::error!(
                environment = self.environment.as_str(),
                name = %fault.name,
                error = %fault.message,
                stack = %stack,
                "{message}"
            ),
            None => tracing::error!(
                environment = self.environment.as_str(),
                name = %fault.name,
                error = %fault.message,
                "{message}"
            ),
        }
        self.notify_sinks(fault, source);
    }

    /// Error level logging for a plain data mapping.
    pub fn error_data(&self, message: &str, data: &Value) {
        match Self::render(data) {
            Some(payload) => {
                tracing::error!(environment = self.environment.as_str(), data = %payload, "{message}");
            }
            None => tracing::error!(environment = self.environment.as_str(), "{message}"),
        }
        self.notify_sinks(&Fault::new("Error", message), LOGGER_SOURCE);
    }

    /// Error level emission from inside the monitoring system. Emitted but
    /// never fanned out, so monitoring diagnostics cannot re-enter
    /// capture.
    pub fn internal_error(&self, message: &str, data: &Value) {
        match Self::render(data) {
            Some(payload) => {
                tracing::error!(environment = self.environment.as_str(), internal = true, data = %payload, "{message}");
            }
            None => {
                tracing::error!(environment = self.environment.as_str(), internal = true, "{message}");
            }
        }
    }

    /// Logs an outgoing API request. Bodies are redacted in production.
    pub fn log_api_request(&self, method: Method, url: &str, body: Option<&Value>) {
        let data = if self.environment.is_production() {
            json!({ "method": method.as_str(), "url": url, "data": "[REDACTED]" })
        } else {
            json!({ "method": method.as_str(), "url": url, "data": body })
        };
        self.debug(&format!("API Request: {method} {url}"), &data);
    }

    /// Logs an API response. Failure statuses are logged at error level
    /// and therefore reach the error sinks.
    pub fn log_api_response(&self, method: Method, url: &str, status: u16, data: &Value) {
        if status >= 400 {
            self.error_data(
                &format!("API Error: {method} {url} returned {status}"),
                &json!({ "method": method.as_str(), "url": url, "status": status, "response": data }),
            );
        } else {
            let response = if self.environment.is_production() {
                Value::String("[REDACTED]".to_string())
            } else {
                data.clone()
            };
            self.debug(
                &format!("API Response: {method} {url} returned {status}"),
                &json!({ "method": method.as_str(), "url": url, "status": status, "response": response }),
            );
        }
    }

    fn notify_sinks(&self, fault: &Fault, source: &str) {
        if fault.internal {
            return;
        }
        // Clone the sink list out of the lock: a sink must be able to log
        // or register without deadlocking the fan-out.
        let sinks = match self.sinks.read() {
            Ok(sinks) => sinks.clone(),
            Err(_) => return,
        };
        for sink in sinks {
            sink.on_error(fault, source);
        }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("environment", &self.environment)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        seen: Mutex<Vec<(String, String, String)>>,
    }

    impl ErrorSink for RecordingSink {
        fn on_error(&self, fault: &Fault, source: &str) {
            self.seen.lock().unwrap().push((
                fault.name.clone(),
                fault.message.clone(),
                source.to_string(),
            ));
        }
    }

    #[test]
    fn test_environment_from_name() {
        assert_eq!(Environment::from_name("production"), Environment::Production);
        assert_eq!(Environment::from_name("PRODUCTION"), Environment::Production);
        assert_eq!(Environment::from_name("development"), Environment::Development);
        assert_eq!(Environment::from_name("staging"), Environment::Development);
    }

    #[test]
    fn test_error_fans_out_to_sinks() {
        let logger = Logger::with_environment(Environment::Development);
        let sink = Arc::new(RecordingSink::default());
        logger.add_error_sink(sink.clone());

        let fault = Fault::new("NetworkError", "connection refused");
        logger.error("API Error: GET /clients", &fault);

        let seen = sink.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "NetworkError");
        assert_eq!(seen[0].2, "logger");
    }

    #[test]
    fn test_internal_faults_are_not_fanned_out() {
        let logger = Logger::with_environment(Environment::Development);
        let sink = Arc::new(RecordingSink::default());
        logger.add_error_sink(sink.clone());

        let fault = Fault::new("Error", "monitoring hiccup").internal();
        logger.error("should stay internal", &fault);
        logger.internal_error("diagnostic output", &Value::Null);

        assert!(sink.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_error_data_builds_a_fault() {
        let logger = Logger::with_environment(Environment::Development);
        let sink = Arc::new(RecordingSink::default());
        logger.add_error_sink(sink.clone());

        logger.error_data("validation failed", &json!({"field": "email"}));

        let seen = sink.seen.lock().unwrap();
        assert_eq!(seen[0].0, "Error");
        assert_eq!(seen[0].1, "validation failed");
    }

    #[test]
    fn test_failure_responses_reach_sinks() {
        let logger = Logger::with_environment(Environment::Development);
        let sink = Arc::new(RecordingSink::default());
        logger.add_error_sink(sink.clone());

        logger.log_api_response(Method::Get, "https://api.test/x", 200, &Value::Null);
        assert!(sink.seen.lock().unwrap().is_empty());

        logger.log_api_response(Method::Get, "https://api.test/x", 502, &Value::Null);
        assert_eq!(sink.seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_all_sinks_receive_each_error() {
        let logger = Logger::with_environment(Environment::Development);
        let first = Arc::new(RecordingSink::default());
        let second = Arc::new(RecordingSink::default());
        logger.add_error_sink(first.clone());
        logger.add_error_sink(second.clone());

        logger.error("boom", &Fault::new("Error", "boom"));

        assert_eq!(first.seen.lock().unwrap().len(), 1);
        assert_eq!(second.seen.lock().unwrap().len(), 1);
    }
}
