//! Failure classification.
//!
//! Pure functions deciding whether a fault looks cross-origin and whether
//! it is worth retrying. The CORS detection is inherently approximate:
//! network stacks deliberately obscure cross-origin failures as generic
//! transport errors, so the only available signal is substring matching
//! over what the failure says about itself. This is a known limitation of
//! the heuristic, not a bug to fix.

use aubergiste_core::Fault;

/// Substrings that mark a failure as cross-origin, matched
/// case-insensitively against the fault's message, stack, and name.
const CORS_INDICATORS: [&str; 7] = [
    "access-control-allow-origin",
    "cross-origin",
    "cors",
    "blocked by cors policy",
    "origin is not allowed",
    "has been blocked by cors",
    "cross origin request",
];

/// Returns true if the fault looks like a cross-origin failure.
pub fn is_cors_fault(fault: &Fault) -> bool {
    let message = fault.message.to_lowercase();
    let stack = fault
        .stack
        .as_deref()
        .map(str::to_lowercase)
        .unwrap_or_default();
    let name = fault.name.to_lowercase();

    CORS_INDICATORS
        .iter()
        .any(|indicator| message.contains(indicator) || stack.contains(indicator) || name.contains(indicator))
}

/// Returns true if a failed attempt should be retried.
///
/// Cross-origin failures never retry (they will keep failing), transport
/// failures and 5xx responses do, and 4xx client errors never do.
pub fn should_retry(fault: &Fault) -> bool {
    if is_cors_fault(fault) {
        return false;
    }

    // A status verdict wins over everything else: only 5xx retries.
    if let Some(status) = fault.status {
        return (500..600).contains(&status);
    }

    fault.name.eq_ignore_ascii_case("NetworkError")
        || fault.message.to_lowercase().contains("network")
}

// ============================================================================
// Tests
// ============================================================================
