//! Single-shot HTTP transport with safe logging and cancellation.
//!
//! - [`Transport`]: the capability the SerpApi client depends on (one
//!   request in, status + headers + raw bytes out)
//! - [`ReqwestTransport`]: the default `reqwest`-backed implementation
//! - Redacts sensitive query params and never logs secret values
//! - Optional *raw* request/response logging via `SERPAPI_HTTP_RAW=1`
//!
//! Example (no_run):
//! ```rust,no_run
//! # async fn demo() -> Result<(), serpapi_http::TransportError> {
//! use serpapi_http::{HttpRequest, ReqwestTransport, Transport};
//! use tokio_util::sync::CancellationToken;
//!
//! let transport = ReqwestTransport::new()?;
//! let url = "https://serpapi.com/account?api_key=secret".parse().unwrap();
//! let resp = transport
//!     .execute(HttpRequest::get(url), &CancellationToken::new())
//!     .await?;
//! println!("{} ({} bytes)", resp.status, resp.body.len());
//! # Ok(()) }
//! ```
//!
//! The transport performs exactly one exchange per call. It does not retry,
//! and it does not interpret status codes: a 4xx/5xx response is still an
//! `Ok(HttpResponse)`. Only failures without an HTTP status (connect, TLS,
//! body read, timeout, cancellation) surface as [`TransportError`].
//!
//! Observability: structured `tracing` events are emitted for request start,
//! response headers, body snippets (truncated), cancellations and network
//! errors, plus raw request/response lines (target `http.raw`) when
//! `SERPAPI_HTTP_RAW=1`.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, StatusCode, Url};
use std::env;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

// ==============================
// Raw logging toggles
// ==============================

const RAW_ENV: &str = "SERPAPI_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024; // cap raw body logs (64 KiB)
const SNIPPET_MAX: usize = 500;

const SECRET_KEYS: &[&str] = &[
    "access_token",
    "authorization",
    "auth",
    "key",
    "api_key",
    "token",
    "secret",
    "client_secret",
    "bearer",
];

fn raw_enabled() -> bool {
    matches!(
        env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

fn is_secret(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    SECRET_KEYS.contains(&lower.as_str())
}

static REQUEST_SEQ: AtomicU64 = AtomicU64::new(1);

fn next_request_id() -> String {
    format!("r{}", REQUEST_SEQ.fetch_add(1, Ordering::Relaxed))
}

// ==============================
// Errors
// ==============================

/// Failures that happen before an HTTP status is available.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out")]
    Timeout,
    #[error("request cancelled")]
    Cancelled,
}

impl TransportError {
    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_builder() {
            Self::Build(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

// ==============================
// Request / response
// ==============================

/// A fully formed request handed to a [`Transport`].
#[derive(Clone, Debug)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    /// Upper bound for the whole exchange; `None` defers to the transport.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    /// A bare `GET` for `url` with no extra headers.
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            headers: HeaderMap::new(),
            timeout: None,
        }
    }

    /// Add (or replace) a header.
    ///
    /// ```
    /// use reqwest::header::{HeaderValue, USER_AGENT};
    /// use serpapi_http::HttpRequest;
    ///
    /// let req = HttpRequest::get("https://example.com/".parse().unwrap())
    ///     .with_header(USER_AGENT, HeaderValue::from_static("demo/1.0"));
    /// assert_eq!(req.headers[USER_AGENT], "demo/1.0");
    /// ```
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Raw outcome of an exchange: status, headers and the undecoded body.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse {
    /// Convenience for fakes and tests.
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }
}

// ==============================
// Transport capability
// ==============================

/// One request/response exchange, honoring `cancel`.
///
/// Implementations must be safe to share between concurrent callers.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(
        &self,
        request: HttpRequest,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, TransportError>;
}

/// Default transport backed by a pooled `reqwest::Client`.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    inner: Client,
}

impl ReqwestTransport {
    /// Build a transport with a 5s connect timeout.
    pub fn new() -> Result<Self, TransportError> {
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Wrap an existing client (proxy, TLS roots, ... configured by the caller).
    pub fn from_client(inner: Client) -> Self {
        Self { inner }
    }

    async fn send(&self, req_id: &str, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let HttpRequest {
            method,
            url,
            headers,
            timeout,
        } = request;

        let (host_path, redacted_q) = redact_query(&url);
        tracing::debug!(
            req_id=%req_id,
            method=%method,
            host_path=%host_path,
            query=?redacted_q,
            timeout_ms=timeout.map(|t| t.as_millis() as u64),
            "http.request.start"
        );

        if raw_enabled() {
            let curl = make_curl(&method, &url, &headers);
            tracing::debug!(target: "http.raw", %req_id, %curl, "request");
        }

        let mut rb = self.inner.request(method, url).headers(headers);
        if let Some(t) = timeout {
            rb = rb.timeout(t);
        }

        let t0 = Instant::now();
        let resp = rb.send().await.map_err(|err| {
            tracing::warn!(req_id=%req_id, message=%err, "http.network_error.send");
            TransportError::from_reqwest(err)
        })?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.bytes().await.map_err(|err| {
            tracing::warn!(req_id=%req_id, message=%err, "http.network_error.body");
            TransportError::from_reqwest(err)
        })?;
        let dur_ms = t0.elapsed().as_millis() as u64;

        let x_request_id = headers
            .get("x-request-id")
            .or_else(|| headers.get("x-correlation-id"))
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");

        tracing::debug!(
            req_id=%req_id,
            %status,
            duration_ms=dur_ms,
            body_len=body.len(),
            x_request_id=%x_request_id,
            "http.response.headers"
        );

        if raw_enabled() {
            let hdrs = redact_headers(&headers);
            let truncated = body.len() > RAW_MAX_BODY;
            let text = String::from_utf8_lossy(&body[..body.len().min(RAW_MAX_BODY)]);
            tracing::info!(
                target: "http.raw",
                %req_id,
                status=%status,
                duration_ms=dur_ms,
                headers=?hdrs,
                body=%text,
                truncated
            );
        }

        tracing::trace!(
            req_id=%req_id,
            body_snippet=%snip_body(&body),
            "http.response.body_snippet"
        );

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(
        &self,
        request: HttpRequest,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, TransportError> {
        let req_id = next_request_id();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(req_id=%req_id, "http.cancelled");
                Err(TransportError::Cancelled)
            }
            res = self.send(&req_id, request) => res,
        }
    }
}

// ==============================
// Helpers
// ==============================

/// Truncated, lossy view of a body for log lines and error messages.
pub fn snip_body(body: &[u8]) -> String {
    let mut snip = String::from_utf8_lossy(body).to_string();
    if snip.len() > SNIPPET_MAX {
        let mut cut = SNIPPET_MAX;
        while !snip.is_char_boundary(cut) {
            cut -= 1;
        }
        snip.truncate(cut);
        snip.push_str("...");
    }
    snip
}

/// Split a URL into "host + path" and a redacted query list for logging.
pub fn redact_query(url: &Url) -> (String, Vec<(String, String)>) {
    let host_path = format!("{}{}", url.host_str().unwrap_or("-"), url.path());
    let redacted = url
        .query_pairs()
        .map(|(k, v)| {
            let k = k.to_string();
            let v = if is_secret(&k) {
                "<redacted>".to_string()
            } else {
                v.to_string()
            };
            (k, v)
        })
        .collect::<Vec<_>>();
    (host_path, redacted)
}

/// Render a best-effort curl command for repro/debug, with secrets redacted.
fn make_curl(method: &Method, url: &Url, headers: &HeaderMap) -> String {
    let mut parts = vec!["curl".to_string(), format!("-X{}", method)];
    for (name, val) in headers.iter() {
        let mut v = val.to_str().unwrap_or("").to_string();
        if name.as_str().eq_ignore_ascii_case("authorization") {
            v = "<redacted>".into();
        }
        parts.push(format!(
            "-H '{}: {}'",
            name.as_str(),
            v.replace('\'', r"'\''")
        ));
    }

    let mut safe = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if is_secret(&k) {
                "<redacted>".to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), v)
        })
        .collect();
    if !pairs.is_empty() {
        safe.query_pairs_mut().clear().extend_pairs(pairs);
    }
    parts.push(format!("'{}'", safe.as_str()));
    parts.join(" ")
}

/// Redact sensitive headers for logging.
fn redact_headers(h: &HeaderMap) -> Vec<(String, String)> {
    h.iter()
        .map(|(k, v)| {
            let key = k.as_str().to_string();
            let val = if key.eq_ignore_ascii_case("authorization")
                || key.eq_ignore_ascii_case("set-cookie")
            {
                "<redacted>".to_string()
            } else {
                v.to_str().unwrap_or("").to_string()
            };
            (key, val)
        })
        .collect()
}
