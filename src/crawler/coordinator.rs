//! Crawl engine - wave-based crawl orchestration
//!
//! This module contains the main crawl loop, which:
//! - Seeds the frontier and derives the domain scope from the seed
//! - Takes batches from the frontier within the remaining budget
//! - Fetches each batch concurrently and waits for the whole wave
//! - Feeds discovered links back into the frontier
//! - Runs analyzers and collects one record per fetched URL

use crate::analyzer::{run_analyzers, AnalysisFields, Analyzer};
use crate::config::{validate, validate_budget, Config, CrawlBudget, CrawlerConfig};
use crate::crawler::fetcher::{FetchResult, FetchSession};
use crate::crawler::frontier::{Frontier, FrontierEntry};
use crate::crawler::parser::extract_links_from_document;
use crate::crawler::session::create_session;
use crate::output::CrawlStats;
use crate::url::DomainScope;
use crate::CrawlError;
use scraper::Html;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use url::Url;

/// Lifecycle of a crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlPhase {
    Idle,
    Seeding,
    Dispatching,
    Draining,
    Finished,
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CrawlPhase::Idle => "idle",
            CrawlPhase::Seeding => "seeding",
            CrawlPhase::Dispatching => "dispatching",
            CrawlPhase::Draining => "draining",
            CrawlPhase::Finished => "finished",
        };
        write!(f, "{}", name)
    }
}

/// One crawled URL: fetch metadata plus analyzer output
#[derive(Debug, Clone, Serialize)]
pub struct PageRecord {
    #[serde(flatten)]
    pub fetch: FetchResult,

    /// Fields merged from every analyzer that succeeded
    pub analysis: AnalysisFields,

    /// `"<analyzer>: <message>"` for every analyzer that failed
    pub analyzer_errors: Vec<String>,
}

impl From<FetchResult> for PageRecord {
    fn from(fetch: FetchResult) -> Self {
        Self {
            fetch,
            analysis: AnalysisFields::new(),
            analyzer_errors: Vec::new(),
        }
    }
}

/// Everything a worker task needs, cheap to clone per entry
#[derive(Clone)]
struct WorkerContext {
    session: Arc<dyn FetchSession>,
    frontier: Arc<Frontier>,
    analyzers: Arc<[Arc<dyn Analyzer>]>,
    semaphore: Arc<Semaphore>,
    max_depth: u32,
}

/// Fetches one entry, offers its links and runs analyzers
async fn process_entry(ctx: WorkerContext, entry: FrontierEntry) -> PageRecord {
    let Ok(_permit) = Arc::clone(&ctx.semaphore).acquire_owned().await else {
        return FetchResult::failed(entry.url, "worker pool closed")
            .with_depth(entry.depth)
            .into();
    };

    let mut fetch = ctx.session.fetch(&entry.url).await.with_depth(entry.depth);

    if !fetch.is_success() || !fetch.is_html() {
        return fetch.into();
    }
    if !ctx.frontier.scope().contains(&fetch.final_url) {
        tracing::debug!(
            "{} redirected out of scope to {}",
            fetch.requested_url,
            fetch.final_url
        );
        return fetch.into();
    }
    let Some(body) = fetch.body.as_deref() else {
        return fetch.into();
    };

    let follow_links = fetch.outcome.status() == Some(200) && entry.depth < ctx.max_depth;

    // Html is not Send; keep it inside this block
    let (links, report) = {
        let document = Html::parse_document(body);
        let links = if follow_links {
            extract_links_from_document(&document)
        } else {
            Vec::new()
        };
        let report = run_analyzers(&ctx.analyzers, &document, &fetch.final_url);
        (links, report)
    };

    let accepted = links
        .iter()
        .filter(|href| ctx.frontier.offer(href, Some(&fetch.final_url), entry.depth + 1))
        .count();
    tracing::debug!(
        "{}: {} links, {} new at depth {}",
        fetch.final_url,
        links.len(),
        accepted,
        entry.depth + 1
    );

    fetch.links = links;
    PageRecord {
        fetch,
        analysis: report.fields,
        analyzer_errors: report.errors,
    }
}

/// Single-domain crawler
///
/// A crawler runs once: `crawl` drives it from `Idle` to `Finished` and
/// closes its fetch session on the way out.
pub struct Crawler {
    budget: CrawlBudget,
    priority_patterns: Vec<String>,
    session: Arc<dyn FetchSession>,
    analyzers: Vec<Arc<dyn Analyzer>>,
    phase: CrawlPhase,
    frontier: Option<Arc<Frontier>>,
    started_at: Option<Instant>,
    finished_at: Option<Instant>,
    urls_processed: u64,
    successful: u64,
    total_response_time: Duration,
}

impl Crawler {
    /// Creates a crawler from a full configuration
    ///
    /// # Arguments
    ///
    /// * `config` - Crawler and session configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Ready to crawl
    /// * `Err(CrawlError)` - Invalid configuration or HTTP client failure
    pub fn new(config: &Config) -> Result<Self, CrawlError> {
        validate(config)?;
        let session = create_session(&config.session)?;

        let mut crawler = Self::with_session(config.crawler.budget(), session)?;
        crawler.priority_patterns = config.crawler.priority_patterns.clone();
        Ok(crawler)
    }

    /// Creates a crawler around an existing fetch session
    pub fn with_session(
        budget: CrawlBudget,
        session: Arc<dyn FetchSession>,
    ) -> Result<Self, CrawlError> {
        validate_budget(&budget)?;

        Ok(Self {
            budget,
            priority_patterns: Vec::new(),
            session,
            analyzers: Vec::new(),
            phase: CrawlPhase::Idle,
            frontier: None,
            started_at: None,
            finished_at: None,
            urls_processed: 0,
            successful: 0,
            total_response_time: Duration::ZERO,
        })
    }

    /// Adds an analyzer, run on every successfully fetched HTML page
    pub fn with_analyzer(mut self, analyzer: impl Analyzer + 'static) -> Self {
        self.analyzers.push(Arc::new(analyzer));
        self
    }

    /// Routes URLs containing any of these substrings ahead of the others
    pub fn with_priority_patterns(mut self, patterns: Vec<String>) -> Self {
        self.priority_patterns = patterns;
        self
    }

    pub fn budget(&self) -> &CrawlBudget {
        &self.budget
    }

    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    /// The frontier of the current or last crawl
    pub fn frontier(&self) -> Option<&Frontier> {
        self.frontier.as_deref()
    }

    fn set_phase(&mut self, phase: CrawlPhase) {
        if self.phase != phase {
            tracing::debug!("Crawl phase: {} -> {}", self.phase, phase);
            self.phase = phase;
        }
    }

    fn record(&mut self, record: &PageRecord) {
        self.urls_processed += 1;
        if record.fetch.is_success() {
            self.successful += 1;
        }
        self.total_response_time += record.fetch.elapsed;
    }

    /// Crawls the seed's domain until the frontier drains or the budget is spent
    ///
    /// # Arguments
    ///
    /// * `seed` - Absolute http(s) URL; its host becomes the crawl scope
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<PageRecord>)` - One record per fetched URL, wave by wave in dispatch order
    /// * `Err(CrawlError)` - The seed is unusable or the crawler already ran
    pub async fn crawl(&mut self, seed: &str) -> Result<Vec<PageRecord>, CrawlError> {
        if self.phase != CrawlPhase::Idle {
            return Err(CrawlError::AlreadyStarted);
        }
        self.set_phase(CrawlPhase::Seeding);

        let seed_url = Url::parse(seed.trim()).map_err(|e| CrawlError::InvalidSeed {
            url: seed.to_string(),
            reason: e.to_string(),
        })?;
        let scope = DomainScope::from_url(&seed_url).map_err(|e| CrawlError::InvalidSeed {
            url: seed.to_string(),
            reason: e.to_string(),
        })?;

        let frontier = Arc::new(
            Frontier::new(scope, self.budget.max_depth)
                .with_priority_patterns(&self.priority_patterns),
        );
        self.frontier = Some(Arc::clone(&frontier));
        self.started_at = Some(Instant::now());

        tracing::info!(
            "Starting crawl of {} (max {} URLs, depth {}, concurrency {})",
            frontier.scope().host(),
            self.budget.max_urls,
            self.budget.max_depth,
            self.budget.max_concurrency
        );

        if !frontier.offer(seed, None, 0) {
            tracing::warn!("Seed URL {} was filtered out", seed);
        }

        let ctx = WorkerContext {
            session: Arc::clone(&self.session),
            frontier: Arc::clone(&frontier),
            analyzers: self.analyzers.clone().into(),
            semaphore: Arc::new(Semaphore::new(self.budget.max_concurrency)),
            max_depth: self.budget.max_depth,
        };

        let mut results: Vec<PageRecord> = Vec::new();
        let mut wave = 0;

        loop {
            let remaining = self.budget.max_urls.saturating_sub(results.len());
            if remaining == 0 {
                tracing::info!("URL budget of {} reached", self.budget.max_urls);
                break;
            }
            if !frontier.has_pending() {
                break;
            }

            self.set_phase(CrawlPhase::Dispatching);
            let batch = frontier.take_batch(self.budget.max_concurrency.min(remaining));
            if batch.is_empty() {
                break;
            }
            wave += 1;

            let handles: Vec<(FrontierEntry, JoinHandle<PageRecord>)> = batch
                .into_iter()
                .map(|entry| {
                    let handle = tokio::spawn(process_entry(ctx.clone(), entry.clone()));
                    (entry, handle)
                })
                .collect();

            self.set_phase(CrawlPhase::Draining);
            for (entry, handle) in handles {
                let record = match handle.await {
                    Ok(record) => record,
                    Err(e) => {
                        tracing::warn!("Worker for {} failed: {}", entry.url, e);
                        FetchResult::failed(entry.url.clone(), format!("worker failed: {}", e))
                            .with_depth(entry.depth)
                            .into()
                    }
                };
                frontier.complete(&entry.url);
                self.record(&record);
                results.push(record);
            }

            let stats = frontier.stats();
            tracing::info!(
                "Wave {}: {} processed, {} queued, {} filtered, {} duplicates",
                wave,
                results.len(),
                stats.pending,
                stats.total_filtered(),
                stats.duplicates
            );
        }

        self.set_phase(CrawlPhase::Finished);
        self.session.close().await;
        self.finished_at = Some(Instant::now());

        tracing::info!(
            "Crawl completed: {} URLs in {} waves, {:.2}s",
            results.len(),
            wave,
            self.elapsed().as_secs_f64()
        );

        Ok(results)
    }

    fn elapsed(&self) -> Duration {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => end.duration_since(start),
            (Some(start), None) => start.elapsed(),
            _ => Duration::ZERO,
        }
    }

    /// Returns a statistics snapshot; valid during and after a crawl
    pub fn stats(&self) -> CrawlStats {
        let frontier = self.frontier.as_ref().map(|f| f.stats()).unwrap_or_default();
        let elapsed_seconds = self.elapsed().as_secs_f64();
        let processed = self.urls_processed as f64;

        let (success_rate, avg_response_time_ms) = if self.urls_processed == 0 {
            (0.0, 0.0)
        } else {
            (
                self.successful as f64 / processed * 100.0,
                self.total_response_time.as_secs_f64() * 1000.0 / processed,
            )
        };
        let urls_per_second = if elapsed_seconds > 0.0 {
            processed / elapsed_seconds
        } else {
            0.0
        };

        CrawlStats {
            phase: self.phase,
            urls_found: frontier.discovered,
            urls_processed: self.urls_processed,
            urls_filtered: frontier.filtered,
            urls_duplicate: frontier.duplicates,
            queue_depth: frontier.pending,
            success_rate,
            avg_response_time_ms,
            elapsed_seconds,
            urls_per_second,
            session: self.session.stats(),
        }
    }
}

/// Crawls `seed` with default session settings and the given budget
///
/// # Example
///
/// ```no_run
/// use wavecrawl::{crawl, CrawlBudget};
///
/// # async fn run() -> wavecrawl::Result<()> {
/// let budget = CrawlBudget { max_urls: 50, max_depth: 2, max_concurrency: 5 };
/// let pages = crawl("https://example.com/", budget).await?;
/// println!("fetched {} pages", pages.len());
/// # Ok(())
/// # }
/// ```
pub async fn crawl(seed: &str, budget: CrawlBudget) -> Result<Vec<PageRecord>, CrawlError> {
    let config = Config {
        crawler: CrawlerConfig {
            max_urls: budget.max_urls,
            max_depth: budget.max_depth,
            max_concurrency: budget.max_concurrency,
            ..CrawlerConfig::default()
        },
        ..Config::default()
    };

    Crawler::new(&config)?.crawl(seed).await
}
