//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with timeouts, redirect limits and default headers
//! - GET requests that record status, content type, body and timing
//! - Transport error classification
//! - Per-session request statistics
//!
//! Network failures are data here: every fetch produces a `FetchResult`.

use crate::config::SessionConfig;
use crate::crawler::parser::is_html_content_type;
use crate::{ConfigError, CrawlError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::{redirect::Policy, Client};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use url::Url;

/// Class of a failure below the HTTP layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportErrorKind {
    Timeout,
    Connect,
    Dns,
    Tls,
    TooManyRedirects,
    Body,
    /// The session was closed before the fetch
    Closed,
    Other,
}

impl TransportErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::Connect => "connect",
            TransportErrorKind::Dns => "dns",
            TransportErrorKind::Tls => "tls",
            TransportErrorKind::TooManyRedirects => "too_many_redirects",
            TransportErrorKind::Body => "body",
            TransportErrorKind::Closed => "closed",
            TransportErrorKind::Other => "other",
        }
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a fetch ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchOutcome {
    /// A response was received, whatever its status
    Http { status: u16 },

    /// No usable response
    Transport {
        kind: TransportErrorKind,
        cause: String,
    },

    /// The worker handling this URL failed before producing a result
    Failed { cause: String },
}

impl FetchOutcome {
    /// HTTP status, if a response was received
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchOutcome::Http { status } => Some(*status),
            _ => None,
        }
    }

    /// True for any 2xx response
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Http { status } if (200..300).contains(status))
    }
}

impl fmt::Display for FetchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchOutcome::Http { status } => write!(f, "HTTP {}", status),
            FetchOutcome::Transport { kind, cause } => write!(f, "{} error: {}", kind, cause),
            FetchOutcome::Failed { cause } => write!(f, "failed: {}", cause),
        }
    }
}

/// Everything observed while fetching one URL
#[derive(Debug, Clone, Serialize)]
pub struct FetchResult {
    /// URL that was requested
    pub requested_url: Url,

    /// URL after redirects (same as requested when none were followed)
    pub final_url: Url,

    pub outcome: FetchOutcome,

    /// Wall-clock time spent on the request
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,

    /// Content-Type header value
    pub content_type: Option<String>,

    /// Declared Content-Length, or the body size when it was read
    pub content_length: Option<u64>,

    /// Raw body, only kept for HTML responses
    #[serde(skip)]
    pub body: Option<String>,

    /// Raw outbound hrefs, filled in by the crawl engine
    pub links: Vec<String>,

    /// Link distance from the seed
    pub depth: u32,

    pub fetched_at: DateTime<Utc>,
}

fn serialize_millis<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(elapsed.as_millis() as u64)
}

impl FetchResult {
    /// Creates a result with no response metadata
    pub fn new(requested_url: Url, outcome: FetchOutcome, elapsed: Duration) -> Self {
        Self {
            final_url: requested_url.clone(),
            requested_url,
            outcome,
            elapsed,
            content_type: None,
            content_length: None,
            body: None,
            links: Vec::new(),
            depth: 0,
            fetched_at: Utc::now(),
        }
    }

    /// Creates a transport failure result
    pub fn transport_error(
        requested_url: Url,
        kind: TransportErrorKind,
        cause: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self::new(
            requested_url,
            FetchOutcome::Transport {
                kind,
                cause: cause.into(),
            },
            elapsed,
        )
    }

    /// Creates a result for a worker that failed without fetching
    pub fn failed(requested_url: Url, cause: impl Into<String>) -> Self {
        Self::new(
            requested_url,
            FetchOutcome::Failed {
                cause: cause.into(),
            },
            Duration::ZERO,
        )
    }

    /// Sets the depth this URL was discovered at
    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    /// True for any 2xx response
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    /// True if the response was declared as HTML
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .map(is_html_content_type)
            .unwrap_or(false)
    }

    /// True if the request ended up at a different URL
    pub fn redirected(&self) -> bool {
        self.final_url != self.requested_url
    }
}

/// Request counters reported by a session
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionStats {
    pub requests_made: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    /// Percentage of requests with a 2xx response
    pub success_rate: f64,
    pub average_response_time_ms: f64,
    /// Per-host breakdown; only populated by sessions spanning several hosts
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub domains: BTreeMap<String, SessionStats>,
}

impl SessionStats {
    /// Number of distinct hosts a session has talked to
    pub fn domains_accessed(&self) -> usize {
        self.domains.len()
    }
}

/// Lock-free request counters shared by concurrent fetches
#[derive(Debug, Default)]
pub(crate) struct StatsRecorder {
    requests: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    total_micros: AtomicU64,
}

impl StatsRecorder {
    pub(crate) fn record(&self, result: &FetchResult) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        if result.is_success() {
            self.successes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
        self.total_micros
            .fetch_add(result.elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> SessionStats {
        let requests = self.requests.load(Ordering::Relaxed);
        let successes = self.successes.load(Ordering::Relaxed);
        let total_micros = self.total_micros.load(Ordering::Relaxed);

        let (success_rate, average_response_time_ms) = if requests == 0 {
            (0.0, 0.0)
        } else {
            (
                successes as f64 / requests as f64 * 100.0,
                total_micros as f64 / requests as f64 / 1000.0,
            )
        };

        SessionStats {
            requests_made: requests,
            successful_requests: successes,
            failed_requests: self.failures.load(Ordering::Relaxed),
            success_rate,
            average_response_time_ms,
            domains: BTreeMap::new(),
        }
    }
}

/// A source of `FetchResult`s
///
/// Implementations must be safe to call from many worker tasks at once.
#[async_trait]
pub trait FetchSession: Send + Sync {
    /// Fetches one URL; never fails, errors are reported in the result
    async fn fetch(&self, url: &Url) -> FetchResult;

    /// Releases pooled connections; later fetches report `Closed`
    async fn close(&self);

    /// Returns the request counters so far
    fn stats(&self) -> SessionStats;
}

/// Builds the default header set, with configured headers taking precedence
fn build_default_headers(config: &SessionConfig) -> Result<HeaderMap, ConfigError> {
    let mut headers = HeaderMap::new();

    let defaults = [
        (USER_AGENT, &config.user_agent),
        (ACCEPT, &config.accept),
        (ACCEPT_LANGUAGE, &config.accept_language),
    ];
    for (name, value) in defaults {
        let value = HeaderValue::from_str(value)
            .map_err(|e| ConfigError::Validation(format!("Invalid {} header: {}", name, e)))?;
        headers.insert(name, value);
    }

    for (name, value) in &config.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ConfigError::Validation(format!("Invalid header name {}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ConfigError::Validation(format!("Invalid value for {}: {}", name, e)))?;
        headers.insert(name, value);
    }

    Ok(headers)
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The session configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(CrawlError)` - Invalid headers or the TLS backend failed to initialize
pub fn build_http_client(config: &SessionConfig) -> Result<Client, CrawlError> {
    let headers = build_default_headers(config)?;

    let client = Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .redirect(Policy::limited(config.max_redirects))
        .pool_idle_timeout(Duration::from_secs(90))
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}

/// Flattens an error and its sources into one message
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

/// Maps a reqwest error onto a transport error kind
fn classify_error(err: &reqwest::Error) -> TransportErrorKind {
    if err.is_timeout() {
        return TransportErrorKind::Timeout;
    }
    if err.is_redirect() {
        return TransportErrorKind::TooManyRedirects;
    }
    if err.is_body() || err.is_decode() {
        return TransportErrorKind::Body;
    }

    let chain = error_chain(err).to_lowercase();
    if chain.contains("dns") || chain.contains("failed to lookup") {
        TransportErrorKind::Dns
    } else if chain.contains("certificate") || chain.contains("tls") || chain.contains("ssl") {
        TransportErrorKind::Tls
    } else if err.is_connect() {
        TransportErrorKind::Connect
    } else {
        TransportErrorKind::Other
    }
}

/// A pooled HTTP session for one crawl
pub struct HttpFetchSession {
    client: RwLock<Option<Client>>,
    stats: StatsRecorder,
}

impl HttpFetchSession {
    /// Creates a session from configuration
    pub fn new(config: &SessionConfig) -> Result<Self, CrawlError> {
        Ok(Self::with_client(build_http_client(config)?))
    }

    /// Wraps an already built client
    pub fn with_client(client: Client) -> Self {
        Self {
            client: RwLock::new(Some(client)),
            stats: StatsRecorder::default(),
        }
    }

    /// True once `close` has been called
    pub fn is_closed(&self) -> bool {
        self.current_client().is_none()
    }

    fn current_client(&self) -> Option<Client> {
        self.client
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    async fn read_response(url: &Url, response: reqwest::Response, start: Instant) -> FetchResult {
        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let declared_length = response.content_length();

        let is_html = content_type
            .as_deref()
            .map(is_html_content_type)
            .unwrap_or(false);

        let body = if is_html {
            match response.text().await {
                Ok(body) => Some(body),
                Err(e) => {
                    tracing::warn!("Failed to read body of {}: {}", final_url, e);
                    let mut result = FetchResult::transport_error(
                        url.clone(),
                        TransportErrorKind::Body,
                        error_chain(&e),
                        start.elapsed(),
                    );
                    result.final_url = final_url;
                    result.content_type = content_type;
                    return result;
                }
            }
        } else {
            None
        };

        let mut result =
            FetchResult::new(url.clone(), FetchOutcome::Http { status }, start.elapsed());
        result.final_url = final_url;
        result.content_type = content_type;
        result.content_length =
            declared_length.or_else(|| body.as_ref().map(|b| b.len() as u64));
        result.body = body;
        result
    }
}

#[async_trait]
impl FetchSession for HttpFetchSession {
    async fn fetch(&self, url: &Url) -> FetchResult {
        let Some(client) = self.current_client() else {
            return FetchResult::transport_error(
                url.clone(),
                TransportErrorKind::Closed,
                "session is closed",
                Duration::ZERO,
            );
        };

        let start = Instant::now();
        let result = match client.get(url.clone()).send().await {
            Ok(response) => Self::read_response(url, response, start).await,
            Err(e) => {
                let kind = classify_error(&e);
                tracing::warn!("Transport error ({}) fetching {}: {}", kind, url, e);
                FetchResult::transport_error(url.clone(), kind, error_chain(&e), start.elapsed())
            }
        };

        tracing::debug!(
            "Fetched {} -> {} in {}ms",
            url,
            result.outcome,
            result.elapsed.as_millis()
        );
        self.stats.record(&result);
        result
    }

    async fn close(&self) {
        let client = self
            .client
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if client.is_some() {
            tracing::debug!("HTTP session closed");
        }
    }

    fn stats(&self) -> SessionStats {
        self.stats.snapshot()
    }
}
