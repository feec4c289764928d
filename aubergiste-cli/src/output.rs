//! Output formatting for CLI.

use anyhow::Result;
use aubergiste_core::ResponseEnvelope;
use serde::Serialize;

/// Prints a value as JSON, optionally pretty.
pub fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{rendered}");
    Ok(())
}

/// Renders a response envelope for human reading.
pub fn format_envelope(envelope: &ResponseEnvelope) -> String {
    let mut lines = Vec::new();

    let status = envelope
        .status
        .map_or_else(|| "-".to_string(), |s| s.to_string());

    if envelope.success {
        lines.push(format!("OK ({status})"));
        if let Some(data) = &envelope.data {
            lines.push(
                serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string()),
            );
        }
    } else {
        let kind = if envelope.is_timeout {
            " [timeout]"
        } else if envelope.is_cors {
            " [cors]"
        } else {
            ""
        };
        lines.push(format!("FAILED ({status}){kind}"));
        if let Some(error) = &envelope.error {
            lines.push(error.clone());
        }
    }

    lines.join("\n")
}

// ============================================================================
// Tests
// ============================================================================
