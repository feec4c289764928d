//! Request descriptors and body payloads.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;

// ============================================================================
// HTTP Method
// ============================================================================

/// HTTP methods supported by the request layer.
///
/// `Options` exists for the CORS preflight diagnostic only; business calls
/// use the other five.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// HTTP GET.
    Get,
    /// HTTP POST.
    Post,
    /// HTTP PUT.
    Put,
    /// HTTP PATCH.
    Patch,
    /// HTTP DELETE.
    Delete,
    /// HTTP OPTIONS (preflight diagnostic).
    Options,
}

impl Method {
    /// Returns the method as an uppercase wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            "OPTIONS" => Ok(Method::Options),
            other => Err(CoreError::InvalidRequest(format!(
                "Unknown HTTP method: {other}"
            ))),
        }
    }
}

// ============================================================================
// Request Body
// ============================================================================

/// A single file part of a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    /// Form field name.
    pub name: String,
    /// File name reported to the server.
    pub file_name: String,
    /// MIME type of the content.
    pub mime_type: String,
    /// Raw file bytes.
    pub bytes: Vec<u8>,
}

/// An owned description of a multipart form body.
///
/// The transport form object is not reusable across attempts, so the
/// executor rebuilds it from this description on every retry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormPayload {
    /// Plain text fields.
    pub fields: Vec<(String, String)>,
    /// File parts.
    pub files: Vec<FilePart>,
}

impl FormPayload {
    /// Creates an empty form payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a text field.
    #[must_use]
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Adds a file part.
    #[must_use]
    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        self.files.push(FilePart {
            name: name.into(),
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        });
        self
    }

    /// Returns true if the form carries no fields or files.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.files.is_empty()
    }
}

/// Request body payload.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// JSON body, serialized as UTF-8 JSON text with
    /// `Content-Type: application/json`.
    Json(Value),
    /// Multipart form body. The Content-Type header is left to the HTTP
    /// layer so it can attach the boundary.
    Form(FormPayload),
}

impl RequestBody {
    /// Returns the JSON value if this is a JSON body.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            RequestBody::Json(value) => Some(value),
            RequestBody::Form(_) => None,
        }
    }

    /// Returns true if this body can be persisted to the offline queue.
    ///
    /// Multipart bodies carry raw bytes and runtime boundaries; they are
    /// rejected at enqueue rather than silently mangled.
    pub fn is_queueable(&self) -> bool {
        matches!(self, RequestBody::Json(_))
    }
}

// ============================================================================
// Request Descriptor
// ============================================================================

/// A single logical HTTP call, immutable once built.
///
/// Descriptors are constructed via [`RequestDescriptor::builder`] and passed
/// by value to the request executor. The executor owns the retry loop; the
/// descriptor only says what to call and under which constraints.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    /// Target URL.
    pub url: String,
    /// HTTP method.
    pub method: Method,
    /// Caller-supplied headers, merged over the executor defaults.
    pub headers: HashMap<String, String>,
    /// Optional body payload.
    pub body: Option<RequestBody>,
    /// Per-request deadline; the executor default applies when absent.
    pub timeout: Option<Duration>,
    /// Skip the automatic retry loop for this call.
    pub skip_retry: bool,
    /// Hand the call to the offline queue instead of failing when the
    /// connectivity monitor reports offline.
    pub queue_if_offline: bool,
}

impl RequestDescriptor {
    /// Starts building a descriptor for the given method and URL.
    pub fn builder(method: Method, url: impl Into<String>) -> RequestDescriptorBuilder {
        RequestDescriptorBuilder::new(method, url)
    }
}

/// Builder for [`RequestDescriptor`].
#[derive(Debug, Clone)]
pub struct RequestDescriptorBuilder {
    url: String,
    method: Method,
    headers: HashMap<String, String>,
    body: Option<RequestBody>,
    timeout: Option<Duration>,
    skip_retry: bool,
    queue_if_offline: bool,
}

impl RequestDescriptorBuilder {
    /// Creates a new builder.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            headers: HashMap::new(),
            body: None,
            timeout: None,
            skip_retry: false,
            queue_if_offline: false,
        }
    }

    /// Adds a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets a JSON body.
    #[must_use]
    pub fn json(mut self, value: Value) -> Self {
        self.body = Some(RequestBody::Json(value));
        self
    }

    /// Sets a multipart form body.
    #[must_use]
    pub fn form(mut self, payload: FormPayload) -> Self {
        self.body = Some(RequestBody::Form(payload));
        self
    }

    /// Sets the per-request deadline.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Disables the automatic retry loop.
    #[must_use]
    pub fn skip_retry(mut self) -> Self {
        self.skip_retry = true;
        self
    }

    /// Opts into offline queuing.
    #[must_use]
    pub fn queue_if_offline(mut self) -> Self {
        self.queue_if_offline = true;
        self
    }

    /// Builds the descriptor.
    pub fn build(self) -> RequestDescriptor {
        RequestDescriptor {
            url: self.url,
            method: self.method,
            headers: self.headers,
            body: self.body,
            timeout: self.timeout,
            skip_retry: self.skip_retry,
            queue_if_offline: self.queue_if_offline,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
