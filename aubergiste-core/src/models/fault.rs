//! The normalized failure shape.

use std::error::Error as StdError;
use std::fmt;

/// A normalized failure, fed to the classifier and the error monitor.
///
/// Transport errors, synthetic HTTP-status errors, and failures raised
/// inside the monitoring system itself are all flattened into this shape.
/// The `stack` holds the rendered error source chain; the classifier
/// matches against `name`, `message`, and `stack`.
#[derive(Debug, Clone)]
pub struct Fault {
    /// Error kind name, e.g. `NetworkError`, `HttpError`.
    pub name: String,
    /// Human-readable message.
    pub message: String,
    /// Rendered source chain, when one exists.
    pub stack: Option<String>,
    /// HTTP status for synthetic status errors.
    pub status: Option<u16>,
    /// Produced by the monitoring system itself. Internal faults are never
    /// re-captured by error sinks.
    pub internal: bool,
}

impl Fault {
    /// Creates a fault with a name and message.
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            stack: None,
            status: None,
            internal: false,
        }
    }

    /// Attaches an HTTP status.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Attaches a rendered source chain.
    #[must_use]
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Marks the fault as internal to the monitoring system.
    #[must_use]
    pub fn internal(mut self) -> Self {
        self.internal = true;
        self
    }

    /// Builds a fault from any error, rendering its source chain into the
    /// stack field.
    pub fn from_error(name: impl Into<String>, error: &(dyn StdError + 'static)) -> Self {
        let mut chain = Vec::new();
        let mut current: Option<&(dyn StdError + 'static)> = error.source();
        while let Some(source) = current {
            chain.push(source.to_string());
            current = source.source();
        }

        let mut fault = Self::new(name, error.to_string());
        if !chain.is_empty() {
            fault.stack = Some(chain.join("\n"));
        }
        fault
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Leaf;

    impl fmt::Display for Leaf {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("connection refused")
        }
    }

    impl StdError for Leaf {}

    #[derive(Debug)]
    struct Wrapper(Leaf);

    impl fmt::Display for Wrapper {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("request failed")
        }
    }

    impl StdError for Wrapper {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn test_from_error_renders_source_chain() {
        let fault = Fault::from_error("NetworkError", &Wrapper(Leaf));
        assert_eq!(fault.name, "NetworkError");
        assert_eq!(fault.message, "request failed");
        assert_eq!(fault.stack.as_deref(), Some("connection refused"));
        assert!(!fault.internal);
    }

    #[test]
    fn test_builder_flags() {
        let fault = Fault::new("HttpError", "Service Unavailable")
            .with_status(503)
            .internal();
        assert_eq!(fault.status, Some(503));
        assert!(fault.internal);
    }
}
