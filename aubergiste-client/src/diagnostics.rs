//! CORS diagnostic probe.
//!
//! Issues one plain GET and one OPTIONS preflight-style call, both without
//! credentials, and reports the `access-control-*` response headers
//! observed on each. This is operator troubleshooting tooling; it is not
//! part of the normal request flow.

use std::collections::BTreeMap;

use aubergiste_core::Fault;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Serialize;
use serde_json::Value;

use crate::classify;
use crate::error::ClientError;
use crate::executor::{API_CORS_SOURCE, ApiClient};

/// The response headers the probe reports.
const OBSERVED_HEADERS: [&str; 4] = [
    "access-control-allow-origin",
    "access-control-allow-credentials",
    "access-control-allow-methods",
    "access-control-allow-headers",
];

// ============================================================================
// Report Types
// ============================================================================

/// Observation from a single probe call.
#[derive(Debug, Clone, Serialize)]
pub struct CorsProbeResult {
    /// HTTP status of the probe response.
    pub status: u16,
    /// Whether the status was 2xx.
    pub ok: bool,
    /// Observed `access-control-*` headers; `None` when absent.
    pub headers: BTreeMap<String, Option<String>>,
}

/// The full diagnostic report.
#[derive(Debug, Clone, Serialize)]
pub struct CorsReport {
    /// Both probes completed.
    pub success: bool,
    /// The failure was classified as cross-origin.
    pub is_cors: bool,
    /// Failure message when a probe failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Plain GET observation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub basic: Option<CorsProbeResult>,
    /// OPTIONS preflight observation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preflight: Option<CorsProbeResult>,
}

// ============================================================================
// Probe
// ============================================================================

impl ApiClient {
    /// Runs the CORS diagnostic against a URL.
    pub async fn test_cors_config(&self, url: &str) -> CorsReport {
        self.logger()
            .info(&format!("Running CORS test for {url}"), &Value::Null);

        match self.run_cors_probes(url).await {
            Ok((basic, preflight)) => CorsReport {
                success: true,
                is_cors: false,
                error: None,
                basic: Some(basic),
                preflight: Some(preflight),
            },
            Err(e) => {
                let fault = Fault::from_error("CorsTestError", &e);
                if classify::is_cors_fault(&fault) {
                    self.monitor().capture(&fault, API_CORS_SOURCE);
                    CorsReport {
                        success: false,
                        is_cors: true,
                        error: Some("CORS configuration issues detected".to_string()),
                        basic: None,
                        preflight: None,
                    }
                } else {
                    self.logger().error("CORS test failed", &fault);
                    CorsReport {
                        success: false,
                        is_cors: false,
                        error: Some(fault.message),
                        basic: None,
                        preflight: None,
                    }
                }
            }
        }
    }

    async fn run_cors_probes(
        &self,
        url: &str,
    ) -> Result<(CorsProbeResult, CorsProbeResult), ClientError> {
        // First probe: simple GET with minimal headers, no credentials.
        let basic = self
            .http()
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        let basic = observe(&basic);

        // Second probe: OPTIONS shaped like a browser preflight.
        let preflight = self
            .http()
            .request(reqwest::Method::OPTIONS, url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .header("Access-Control-Request-Method", "POST")
            .header("Access-Control-Request-Headers", "content-type,authorization")
            .send()
            .await?;
        let preflight = observe(&preflight);

        Ok((basic, preflight))
    }
}

fn observe(response: &reqwest::Response) -> CorsProbeResult {
    let headers = OBSERVED_HEADERS
        .iter()
        .map(|name| {
            (
                (*name).to_string(),
                response
                    .headers()
                    .get(*name)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string),
            )
        })
        .collect();

    CorsProbeResult {
        status: response.status().as_u16(),
        ok: response.status().is_success(),
        headers,
    }
}

// ============================================================================
// Tests
// ============================================================================
