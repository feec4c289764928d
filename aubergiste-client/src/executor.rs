//! The request executor.
//!
//! [`ApiClient`] issues every HTTP call the application makes: it injects
//! default and bearer-token headers, enforces a per-request deadline,
//! parses responses by content type, classifies failures, retries with
//! backoff where the classifier allows it, and reports cross-origin
//! failures to the error monitor.
//!
//! The contract with callers is that [`ApiClient::request`] never returns
//! an `Err`: every outcome, including timeouts, transport failures, and
//! malformed bodies, is encoded in the returned
//! [`ResponseEnvelope`]. Retries are invisible apart from added latency.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use aubergiste_core::{
    CredentialStore, Fault, FormPayload, Method, QueuedRequest, RequestBody, RequestDescriptor,
    ResponseEnvelope,
};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde_json::{Value, json};

use crate::classify;
use crate::connectivity::ConnectivityMonitor;
use crate::error::ClientError;
use crate::logger::Logger;
use crate::monitor::ErrorMonitor;
use crate::queue::OfflineRequestQueue;
use crate::retry::RetryPolicy;

/// Default deadline for business calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default deadline for uploads.
pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Source tag for CORS failures reported to the error monitor.
pub const API_CORS_SOURCE: &str = "api_cors";

/// User-facing fallback when no better failure message is known.
pub const GENERIC_ERROR_MESSAGE: &str = "Une erreur est survenue";

const CORS_ERROR_MESSAGE: &str =
    "Erreur de connexion au serveur (CORS). Vérifiez la configuration CORS du serveur.";

const OFFLINE_QUEUED_MESSAGE: &str =
    "Connexion indisponible. La requête a été mise en file d'attente.";

const OFFLINE_ERROR_MESSAGE: &str = "Connexion indisponible. Veuillez vérifier votre réseau.";

fn timeout_message(timeout: Duration) -> String {
    format!(
        "La requête a expiré après {} secondes. Veuillez réessayer.",
        timeout.as_secs()
    )
}

// ============================================================================
// Replayer
// ============================================================================

/// Replays queued requests once connectivity returns.
///
/// Implemented by [`ApiClient`]; the offline queue depends on this trait
/// so tests can substitute a recording fake.
#[async_trait]
pub trait Replayer: Send + Sync {
    /// Executes a previously queued request.
    async fn replay(&self, request: QueuedRequest) -> ResponseEnvelope;
}

// ============================================================================
// Api Client
// ============================================================================

/// The outcome of a single attempt: either a final envelope, or a fault
/// for the failure handler to classify.
enum AttemptOutcome {
    Done(ResponseEnvelope),
    Failed(Fault),
}

/// HTTP client with retries, error monitoring, and offline hand-off.
pub struct ApiClient {
    http: reqwest::Client,
    logger: Arc<Logger>,
    monitor: Arc<ErrorMonitor>,
    connectivity: ConnectivityMonitor,
    credentials: Option<Arc<dyn CredentialStore>>,
    queue: OnceLock<Arc<OfflineRequestQueue>>,
    retry: RetryPolicy,
    default_timeout: Duration,
    upload_timeout: Duration,
}

impl ApiClient {
    /// Creates a builder for customizing the client.
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::new()
    }

    /// Returns the logger this client emits through.
    pub fn logger(&self) -> &Arc<Logger> {
        &self.logger
    }

    /// Returns the error monitor this client reports to.
    pub fn monitor(&self) -> &Arc<ErrorMonitor> {
        &self.monitor
    }

    /// Returns the connectivity signal.
    pub fn connectivity(&self) -> &ConnectivityMonitor {
        &self.connectivity
    }

    /// Returns the inner reqwest client for diagnostic probes.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Attaches the offline queue used for `queue_if_offline` hand-off.
    ///
    /// Called once during composition; later calls are ignored.
    pub fn attach_queue(&self, queue: Arc<OfflineRequestQueue>) {
        let _ = self.queue.set(queue);
    }

    /// Sends a request, resolving to an envelope on every path.
    pub async fn request(&self, descriptor: RequestDescriptor) -> ResponseEnvelope {
        if descriptor.queue_if_offline && !self.connectivity.is_online() {
            return self.hand_to_queue(descriptor).await;
        }

        let timeout = descriptor.timeout.unwrap_or(self.default_timeout);
        let mut attempt: u32 = 0;

        loop {
            let fault = match self.execute_once(&descriptor, timeout).await {
                AttemptOutcome::Done(envelope) => return envelope,
                AttemptOutcome::Failed(fault) => fault,
            };

            if classify::is_cors_fault(&fault) {
                self.report_cors(&fault, descriptor.method, &descriptor.url);
                return ResponseEnvelope::cors(CORS_ERROR_MESSAGE);
            }

            self.logger.error(
                &format!("API Error: {} {}", descriptor.method, descriptor.url),
                &fault,
            );

            if !descriptor.skip_retry
                && attempt < self.retry.max_attempts
                && classify::should_retry(&fault)
            {
                let delay = self.retry.delay_for_attempt(attempt);
                self.logger.warn(
                    &format!(
                        "Retrying API call ({}/{}) to {} after {}ms",
                        attempt + 1,
                        self.retry.max_attempts,
                        descriptor.url,
                        delay.as_millis()
                    ),
                    &Value::Null,
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            let status = fault.status;
            return ResponseEnvelope::failure(parse_api_error(&fault), status);
        }
    }

    async fn execute_once(
        &self,
        descriptor: &RequestDescriptor,
        timeout: Duration,
    ) -> AttemptOutcome {
        let mut builder = self
            .http
            .request(to_reqwest_method(descriptor.method), &descriptor.url);

        // Default headers first so caller headers can override them. The
        // Content-Type is left to the multipart encoder for form bodies.
        let is_form = matches!(descriptor.body, Some(RequestBody::Form(_)));
        builder = builder.header(ACCEPT, "application/json");
        if !is_form {
            builder = builder.header(CONTENT_TYPE, "application/json");
        }
        for (name, value) in &descriptor.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if let Some(store) = &self.credentials {
            match store.token().await {
                Ok(Some(token)) => {
                    builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
                }
                Ok(None) => self.logger.debug("No token available for request", &Value::Null),
                Err(e) => self.logger.warn(
                    "Failed to read credential store",
                    &json!({ "error": e.to_string() }),
                ),
            }
        }

        match &descriptor.body {
            Some(RequestBody::Json(value)) => builder = builder.json(value),
            Some(RequestBody::Form(payload)) => builder = builder.multipart(build_form(payload)),
            None => {}
        }

        self.logger.log_api_request(
            descriptor.method,
            &descriptor.url,
            descriptor.body.as_ref().and_then(RequestBody::as_json),
        );

        let exchange = tokio::time::timeout(timeout, async {
            let response = builder.send().await?;
            let status = response.status();
            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, content_type, body))
        })
        .await;

        let (status, content_type, body) = match exchange {
            Err(_elapsed) => {
                // The in-flight future is dropped here, aborting the call.
                // Deadline failures bypass the retry loop entirely.
                self.logger.error(
                    &format!(
                        "API request timeout after {}s: {} {}",
                        timeout.as_secs(),
                        descriptor.method,
                        descriptor.url
                    ),
                    &Fault::new("TimeoutError", timeout_message(timeout)),
                );
                return AttemptOutcome::Done(ResponseEnvelope::timeout(timeout_message(timeout)));
            }
            Ok(Err(e)) => return AttemptOutcome::Failed(Fault::from_error("NetworkError", &e)),
            Ok(Ok(exchange)) => exchange,
        };

        let data = parse_payload(&content_type, &body);
        self.logger
            .log_api_response(descriptor.method, &descriptor.url, status.as_u16(), &data);

        if status.is_success() {
            AttemptOutcome::Done(ResponseEnvelope::ok(data, status.as_u16()))
        } else {
            AttemptOutcome::Failed(status_fault(status, &data))
        }
    }

    fn report_cors(&self, fault: &Fault, method: Method, url: &str) {
        self.logger.internal_error(
            &format!("CORS ERROR in {method} request to {url}"),
            &json!({
                "error": fault.message,
                "targetUrl": url,
                "origin": origin_of(url),
                "corsHints": {
                    "probableIssues": [
                        "Missing Access-Control-Allow-Origin header",
                        "Credentials sent to a wildcard origin",
                        "Preflight OPTIONS request failure",
                    ],
                    "suggestedSolutions": [
                        "Verify the API is reachable from this origin",
                        "Check the server's CORS configuration",
                    ],
                },
            }),
        );
        self.monitor.capture(fault, API_CORS_SOURCE);
    }

    async fn hand_to_queue(&self, descriptor: RequestDescriptor) -> ResponseEnvelope {
        let Some(queue) = self.queue.get() else {
            self.logger
                .warn("Offline with no request queue attached", &Value::Null);
            return ResponseEnvelope::failure(OFFLINE_ERROR_MESSAGE, None);
        };

        match queue.enqueue(&descriptor).await {
            Ok(_) => ResponseEnvelope::failure(OFFLINE_QUEUED_MESSAGE, None),
            Err(e) => {
                self.logger.error(
                    "Failed to queue offline request",
                    &Fault::from_error("QueueError", &e),
                );
                ResponseEnvelope::failure(OFFLINE_ERROR_MESSAGE, None)
            }
        }
    }

    // ------------------------------------------------------------------
    // Convenience wrappers
    // ------------------------------------------------------------------

    /// Performs a GET request.
    pub async fn get(&self, url: &str) -> ResponseEnvelope {
        self.request(RequestDescriptor::builder(Method::Get, url).build())
            .await
    }

    /// Performs a POST request with a JSON body.
    pub async fn post(&self, url: &str, body: Value) -> ResponseEnvelope {
        self.request(RequestDescriptor::builder(Method::Post, url).json(body).build())
            .await
    }

    /// Performs a PUT request with a JSON body.
    pub async fn put(&self, url: &str, body: Value) -> ResponseEnvelope {
        self.request(RequestDescriptor::builder(Method::Put, url).json(body).build())
            .await
    }

    /// Performs a PATCH request with a JSON body.
    pub async fn patch(&self, url: &str, body: Value) -> ResponseEnvelope {
        self.request(RequestDescriptor::builder(Method::Patch, url).json(body).build())
            .await
    }

    /// Performs a DELETE request.
    pub async fn delete(&self, url: &str) -> ResponseEnvelope {
        self.request(RequestDescriptor::builder(Method::Delete, url).build())
            .await
    }

    /// Uploads a multipart form with the extended upload deadline.
    pub async fn upload(&self, url: &str, form: FormPayload) -> ResponseEnvelope {
        self.request(
            RequestDescriptor::builder(Method::Post, url)
                .form(form)
                .timeout(self.upload_timeout)
                .build(),
        )
        .await
    }
}

#[async_trait]
impl Replayer for ApiClient {
    async fn replay(&self, request: QueuedRequest) -> ResponseEnvelope {
        let mut builder = RequestDescriptor::builder(request.method, request.url);
        for (name, value) in request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.json(body);
        }
        self.request(builder.build()).await
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("retry", &self.retry)
            .field("default_timeout", &self.default_timeout)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`ApiClient`].
pub struct ApiClientBuilder {
    logger: Option<Arc<Logger>>,
    monitor: Option<Arc<ErrorMonitor>>,
    connectivity: Option<ConnectivityMonitor>,
    credentials: Option<Arc<dyn CredentialStore>>,
    retry: RetryPolicy,
    default_timeout: Duration,
    upload_timeout: Duration,
}

impl ApiClientBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self {
            logger: None,
            monitor: None,
            connectivity: None,
            credentials: None,
            retry: RetryPolicy::default(),
            default_timeout: DEFAULT_REQUEST_TIMEOUT,
            upload_timeout: DEFAULT_UPLOAD_TIMEOUT,
        }
    }

    /// Sets the logger.
    #[must_use]
    pub fn logger(mut self, logger: Arc<Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Sets an already-installed error monitor. When absent, a monitor is
    /// created and registered on the logger's error sinks.
    #[must_use]
    pub fn monitor(mut self, monitor: Arc<ErrorMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// Sets the connectivity signal.
    #[must_use]
    pub fn connectivity(mut self, connectivity: ConnectivityMonitor) -> Self {
        self.connectivity = Some(connectivity);
        self
    }

    /// Sets the credential store used for bearer token injection.
    #[must_use]
    pub fn credentials(mut self, credentials: Arc<dyn CredentialStore>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the default request deadline.
    #[must_use]
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Sets the upload deadline.
    #[must_use]
    pub fn upload_timeout(mut self, timeout: Duration) -> Self {
        self.upload_timeout = timeout;
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Fails only when the underlying HTTP client cannot be constructed,
    /// which indicates a broken TLS configuration.
    pub fn build(self) -> Result<ApiClient, ClientError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("aubergiste/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let logger = self.logger.unwrap_or_else(|| Arc::new(Logger::new()));
        let monitor = self
            .monitor
            .unwrap_or_else(|| ErrorMonitor::install(&logger));

        Ok(ApiClient {
            http,
            logger,
            monitor,
            connectivity: self.connectivity.unwrap_or_default(),
            credentials: self.credentials,
            queue: OnceLock::new(),
            retry: self.retry,
            default_timeout: self.default_timeout,
            upload_timeout: self.upload_timeout,
        })
    }
}

impl Default for ApiClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
        Method::Options => reqwest::Method::OPTIONS,
    }
}

fn build_form(payload: &FormPayload) -> reqwest::multipart::Form {
    let mut form = reqwest::multipart::Form::new();
    for (name, value) in &payload.fields {
        form = form.text(name.clone(), value.clone());
    }
    for part in &payload.files {
        let file_part = match reqwest::multipart::Part::bytes(part.bytes.clone())
            .file_name(part.file_name.clone())
            .mime_str(&part.mime_type)
        {
            Ok(file_part) => file_part,
            Err(_) => reqwest::multipart::Part::bytes(part.bytes.clone())
                .file_name(part.file_name.clone()),
        };
        form = form.part(part.name.clone(), file_part);
    }
    form
}

/// Parses a response body by content type. A JSON parse failure degrades
/// to a payload describing the failure instead of failing the call.
fn parse_payload(content_type: &str, body: &str) -> Value {
    if content_type.contains("application/json") {
        serde_json::from_str(body).unwrap_or_else(|e| {
            json!({
                "error": "Failed to parse response data",
                "originalError": e.to_string(),
            })
        })
    } else {
        Value::String(body.to_string())
    }
}

/// Builds the synthetic fault for a non-2xx response, preferring the
/// server's own message fields.
fn status_fault(status: reqwest::StatusCode, data: &Value) -> Fault {
    let message = data
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| data.get("error").and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .map_or_else(|| "Unknown API error".to_string(), str::to_string)
        });
    Fault::new("HttpError", message).with_status(status.as_u16())
}

fn origin_of(raw: &str) -> Option<String> {
    let parsed = url::Url::parse(raw).ok()?;
    let host = parsed.host_str()?.to_string();
    let scheme = parsed.scheme();
    match parsed.port() {
        Some(port) => Some(format!("{scheme}://{host}:{port}")),
        None => Some(format!("{scheme}://{host}")),
    }
}

/// Renders a fault into the user-facing failure message.
pub fn parse_api_error(fault: &Fault) -> String {
    if fault.message.trim().is_empty() {
        GENERIC_ERROR_MESSAGE.to_string()
    } else {
        fault.message.clone()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::Environment;
    use aubergiste_store::MemoryCredentialStore;

    /// A client with millisecond retry delays so tests stay fast.
    fn test_client() -> ApiClient {
        let logger = Arc::new(Logger::with_environment(Environment::Development));
        ApiClient::builder()
            .logger(logger)
            .retry_policy(
                RetryPolicy::default()
                    .with_base_delay(Duration::from_millis(1))
                    .with_max_delay(Duration::from_millis(5))
                    .with_max_jitter(Duration::ZERO),
            )
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_success_parses_json() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/clients/7")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": 7, "name": "Dupont"}"#)
            .create_async()
            .await;

        let client = test_client();
        let envelope = client.get(&format!("{}/clients/7", server.url())).await;

        assert!(envelope.success);
        assert_eq!(envelope.status, Some(200));
        assert_eq!(envelope.data.unwrap()["name"], "Dupont");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_json_body_is_returned_as_text() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/ping")
            .with_status(200)
            .with_header("content-type", "text/plain")
            .with_body("pong")
            .create_async()
            .await;

        let envelope = test_client().get(&format!("{}/ping", server.url())).await;
        assert!(envelope.success);
        assert_eq!(envelope.data.unwrap(), Value::String("pong".to_string()));
    }

    #[tokio::test]
    async fn test_malformed_json_degrades_without_failing() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/broken")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("{not json")
            .create_async()
            .await;

        let envelope = test_client().get(&format!("{}/broken", server.url())).await;
        assert!(envelope.success);
        let data = envelope.data.unwrap();
        assert_eq!(data["error"], "Failed to parse response data");
    }

    #[tokio::test]
    async fn test_bearer_token_is_injected() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/secure")
            .match_header("authorization", "Bearer jwt-abc")
            .match_header("accept", "application/json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("{}")
            .create_async()
            .await;

        let client = ApiClient::builder()
            .logger(Arc::new(Logger::with_environment(Environment::Development)))
            .credentials(Arc::new(MemoryCredentialStore::with_token("jwt-abc")))
            .build()
            .unwrap();

        let envelope = client.get(&format!("{}/secure", server.url())).await;
        assert!(envelope.success);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/missing")
            .with_status(404)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message": "Fiche introuvable"}"#)
            .expect(1)
            .create_async()
            .await;

        let envelope = test_client().get(&format!("{}/missing", server.url())).await;

        assert!(!envelope.success);
        assert_eq!(envelope.status, Some(404));
        assert_eq!(envelope.error.as_deref(), Some("Fiche introuvable"));
        assert!(!envelope.is_timeout);
        assert!(!envelope.is_cors);
        // Exactly one attempt: 4xx never retries.
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_errors_retry_until_success() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        // A scripted backend: three 503s, then a 200. Each response
        // closes its connection so every attempt reconnects and counts.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_seen = Arc::clone(&hits);

        tokio::spawn(async move {
            let body = r#"{"recovered": true}"#;
            let unavailable = "HTTP/1.1 503 Service Unavailable\r\ncontent-length: 0\r\nconnection: close\r\n\r\n".to_string();
            let recovered = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            for response in [&unavailable, &unavailable, &unavailable, &recovered] {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                hits_seen.fetch_add(1, Ordering::SeqCst);
                let mut request = [0u8; 1024];
                let _ = socket.read(&mut request).await;
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        let envelope = test_client().get(&format!("http://{addr}/flaky")).await;

        assert!(envelope.success);
        assert_eq!(envelope.data.unwrap()["recovered"], true);
        // One initial attempt plus exactly three backed-off retries.
        assert_eq!(hits.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_retries_exhaust_into_failure_envelope() {
        let mut server = mockito::Server::new_async().await;
        // 3 retries after the initial attempt: 4 requests total.
        let mock = server
            .mock("GET", "/down")
            .with_status(503)
            .expect(4)
            .create_async()
            .await;

        let envelope = test_client().get(&format!("{}/down", server.url())).await;

        assert!(!envelope.success);
        assert_eq!(envelope.status, Some(503));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_skip_retry_stops_after_first_attempt() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/health")
            .with_status(503)
            .expect(1)
            .create_async()
            .await;

        let client = test_client();
        let envelope = client
            .request(
                RequestDescriptor::builder(Method::Get, format!("{}/health", server.url()))
                    .skip_retry()
                    .build(),
            )
            .await;

        assert!(!envelope.success);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_deadline_produces_timeout_envelope() {
        // A listener that accepts and then never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _socket = listener.accept().await;
            tokio::time::sleep(Duration::from_secs(60)).await;
        });

        let client = test_client();
        let envelope = client
            .request(
                RequestDescriptor::builder(Method::Get, format!("http://{addr}/slow"))
                    .timeout(Duration::from_millis(200))
                    .build(),
            )
            .await;

        assert!(!envelope.success);
        assert!(envelope.is_timeout);
        assert!(!envelope.is_cors);
        assert!(envelope.error.unwrap().contains("La requête a expiré"));
    }

    #[tokio::test]
    async fn test_cors_message_produces_cors_envelope_without_retry() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/cross")
            .with_status(403)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message": "Request has been blocked by CORS policy"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = test_client();
        let envelope = client.get(&format!("{}/cross", server.url())).await;

        assert!(!envelope.success);
        assert!(envelope.is_cors);
        assert!(!envelope.is_timeout);
        mock.assert_async().await;

        // The monitor saw the failure with the dedicated source tag.
        let cors_records: Vec<_> = client
            .monitor()
            .all_errors()
            .into_iter()
            .filter(|r| r.source == API_CORS_SOURCE)
            .collect();
        assert_eq!(cors_records.len(), 1);
        assert!(cors_records[0].is_cors_error);
    }

    #[tokio::test]
    async fn test_failed_attempts_are_captured_by_the_monitor() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/missing")
            .with_status(404)
            .create_async()
            .await;

        let client = test_client();
        client.get(&format!("{}/missing", server.url())).await;

        assert!(client.monitor().stats().total_errors > 0);
    }

    #[test]
    fn test_status_fault_prefers_server_message() {
        let fault = status_fault(
            reqwest::StatusCode::BAD_REQUEST,
            &json!({"message": "Champ obligatoire manquant"}),
        );
        assert_eq!(fault.message, "Champ obligatoire manquant");
        assert_eq!(fault.status, Some(400));

        let fallback = status_fault(reqwest::StatusCode::BAD_GATEWAY, &Value::Null);
        assert_eq!(fallback.message, "Bad Gateway");
    }

    #[test]
    fn test_parse_api_error_falls_back_to_generic_message() {
        assert_eq!(
            parse_api_error(&Fault::new("Error", "  ")),
            GENERIC_ERROR_MESSAGE
        );
        assert_eq!(parse_api_error(&Fault::new("Error", "explicit")), "explicit");
    }

    #[test]
    fn test_origin_of() {
        assert_eq!(
            origin_of("https://api.aubergiste.fr/clients?page=2").as_deref(),
            Some("https://api.aubergiste.fr")
        );
        assert_eq!(
            origin_of("http://localhost:5173/x").as_deref(),
            Some("http://localhost:5173")
        );
        assert!(origin_of("not a url").is_none());
    }
}
