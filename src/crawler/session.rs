//! Fetch session wrappers
//!
//! - `RateLimitedFetchSession` paces dispatches to a fixed request rate
//! - `MultiDomainFetchSession` keeps one pooled session per host
//! - `create_session` picks the right session for a configuration

use crate::config::{SessionConfig, MIN_REQUESTS_PER_SECOND};
use crate::crawler::fetcher::{
    FetchResult, FetchSession, HttpFetchSession, SessionStats, TransportErrorKind,
};
use crate::url::extract_domain;
use crate::CrawlError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

/// Enforces a minimum interval between dispatches of the wrapped session
///
/// All callers share one last-dispatch time. The lock is held while waiting,
/// so concurrent fetches leave in a paced single file while their requests
/// still overlap on the wire.
pub struct RateLimitedFetchSession<S> {
    inner: S,
    min_interval: Duration,
    last_dispatch: tokio::sync::Mutex<Option<Instant>>,
}

impl<S: FetchSession> RateLimitedFetchSession<S> {
    /// Wraps `inner`, allowing at most `requests_per_second` dispatches per second
    ///
    /// A non-positive or non-finite rate disables pacing. Positive rates
    /// below `MIN_REQUESTS_PER_SECOND` are raised to it.
    pub fn new(inner: S, requests_per_second: f64) -> Self {
        let min_interval = if requests_per_second.is_finite() && requests_per_second > 0.0 {
            Duration::from_secs_f64(1.0 / requests_per_second.max(MIN_REQUESTS_PER_SECOND))
        } else {
            Duration::ZERO
        };

        Self {
            inner,
            min_interval,
            last_dispatch: tokio::sync::Mutex::new(None),
        }
    }

    /// Minimum time between two dispatches
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Returns the wrapped session
    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn wait_for_slot(&self) {
        let mut last = self.last_dispatch.lock().await;
        if let Some(previous) = *last {
            let next = previous + self.min_interval;
            if next > Instant::now() {
                tokio::time::sleep_until(next).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[async_trait]
impl<S: FetchSession> FetchSession for RateLimitedFetchSession<S> {
    async fn fetch(&self, url: &Url) -> FetchResult {
        self.wait_for_slot().await;
        self.inner.fetch(url).await
    }

    async fn close(&self) {
        self.inner.close().await;
    }

    fn stats(&self) -> SessionStats {
        self.inner.stats()
    }
}

/// Lazily creates and caches one HTTP session per host
///
/// Once closed, no new per-host session is created.
pub struct MultiDomainFetchSession {
    config: SessionConfig,
    sessions: Mutex<HashMap<String, Arc<HttpFetchSession>>>,
    closed: AtomicBool,
}

impl MultiDomainFetchSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            sessions: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Returns the cached session for `host`, creating it if needed
    ///
    /// Returns `Ok(None)` after `close`.
    fn session_for(&self, host: &str) -> Result<Option<Arc<HttpFetchSession>>, CrawlError> {
        // Checked under the map lock so `close` cannot miss a new session
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        if self.closed.load(Ordering::SeqCst) {
            return Ok(None);
        }
        if let Some(session) = sessions.get(host) {
            return Ok(Some(Arc::clone(session)));
        }

        let session = Arc::new(HttpFetchSession::new(&self.config)?);
        tracing::debug!("Created HTTP session for {}", host);
        sessions.insert(host.to_string(), Arc::clone(&session));
        Ok(Some(session))
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn all_sessions(&self) -> Vec<(String, Arc<HttpFetchSession>)> {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(host, session)| (host.clone(), Arc::clone(session)))
            .collect()
    }

    /// Number of hosts a session has been created for
    pub fn domains_accessed(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

#[async_trait]
impl FetchSession for MultiDomainFetchSession {
    async fn fetch(&self, url: &Url) -> FetchResult {
        let Some(host) = extract_domain(url) else {
            return FetchResult::failed(url.clone(), "URL has no host");
        };

        match self.session_for(&host) {
            Ok(Some(session)) => session.fetch(url).await,
            Ok(None) => FetchResult::transport_error(
                url.clone(),
                TransportErrorKind::Closed,
                "session is closed",
                Duration::ZERO,
            ),
            Err(e) => {
                tracing::warn!("Could not create session for {}: {}", host, e);
                FetchResult::failed(url.clone(), e.to_string())
            }
        }
    }

    async fn close(&self) {
        let sessions: Vec<Arc<HttpFetchSession>> = {
            let guard = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
            self.closed.store(true, Ordering::SeqCst);
            let open: Vec<_> = guard.values().map(Arc::clone).collect();
            open
        };
        for session in sessions {
            session.close().await;
        }
    }

    fn stats(&self) -> SessionStats {
        let mut total = SessionStats::default();
        let mut weighted_ms = 0.0;

        for (host, session) in self.all_sessions() {
            let stats = session.stats();
            total.requests_made += stats.requests_made;
            total.successful_requests += stats.successful_requests;
            total.failed_requests += stats.failed_requests;
            weighted_ms += stats.average_response_time_ms * stats.requests_made as f64;
            total.domains.insert(host, stats);
        }

        if total.requests_made > 0 {
            let requests = total.requests_made as f64;
            total.success_rate = total.successful_requests as f64 / requests * 100.0;
            total.average_response_time_ms = weighted_ms / requests;
        }

        total
    }
}

/// Builds the session a crawl should use for this configuration
///
/// A configured request rate wraps the HTTP session in a rate limiter.
pub fn create_session(config: &SessionConfig) -> Result<Arc<dyn FetchSession>, CrawlError> {
    let session = HttpFetchSession::new(config)?;

    match config.requests_per_second {
        Some(rate) => {
            tracing::info!("Rate limiting requests to {} per second", rate);
            Ok(Arc::new(RateLimitedFetchSession::new(session, rate)))
        }
        None => Ok(Arc::new(session)),
    }
}
