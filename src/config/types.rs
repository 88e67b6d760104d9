use serde::Deserialize;
use std::collections::BTreeMap;

/// Default maximum number of pages fetched per crawl
pub const DEFAULT_MAX_URLS: usize = 10_000;

/// Default maximum link depth from the seed
pub const DEFAULT_MAX_DEPTH: u32 = 10;

/// Default size of the per-batch worker pool
pub const DEFAULT_MAX_CONCURRENCY: usize = 25;

/// Default browser-like user agent sent with every request
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Default Accept header
pub const DEFAULT_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Default Accept-Language header
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// Slowest accepted request rate, one request every 1000 seconds
pub const MIN_REQUESTS_PER_SECOND: f64 = 0.001;

/// Main configuration structure for Wavecrawl
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Maximum number of pages to fetch
    #[serde(default = "default_max_urls")]
    pub max_urls: usize,

    /// Maximum depth to crawl from the seed URL
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Maximum number of concurrent fetches per batch
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Substrings that move a URL into the priority lane of the frontier
    #[serde(default)]
    pub priority_patterns: Vec<String>,
}

impl CrawlerConfig {
    /// Returns the read-only budget the engine enforces
    pub fn budget(&self) -> CrawlBudget {
        CrawlBudget {
            max_urls: self.max_urls,
            max_depth: self.max_depth,
            max_concurrency: self.max_concurrency,
        }
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_urls: DEFAULT_MAX_URLS,
            max_depth: DEFAULT_MAX_DEPTH,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            priority_patterns: Vec::new(),
        }
    }
}

/// HTTP session configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SessionConfig {
    /// Total request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// TCP/TLS connect timeout in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Maximum number of redirects followed per request
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// User-Agent header value
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Accept header value
    #[serde(default = "default_accept")]
    pub accept: String,

    /// Accept-Language header value
    #[serde(default = "default_accept_language")]
    pub accept_language: String,

    /// When set, requests are paced to at most this many per second
    #[serde(default)]
    pub requests_per_second: Option<f64>,

    /// Extra headers; these override the defaults above on name clashes
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            max_redirects: default_max_redirects(),
            user_agent: default_user_agent(),
            accept: default_accept(),
            accept_language: default_accept_language(),
            requests_per_second: None,
            headers: BTreeMap::new(),
        }
    }
}

/// Limits enforced by the crawl engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlBudget {
    /// Stop dispatching once this many pages have been fetched
    pub max_urls: usize,
    /// No frontier entry is created deeper than this
    pub max_depth: u32,
    /// Size of the worker pool for one batch
    pub max_concurrency: usize,
}

impl Default for CrawlBudget {
    fn default() -> Self {
        CrawlerConfig::default().budget()
    }
}

fn default_max_urls() -> usize {
    DEFAULT_MAX_URLS
}

fn default_max_depth() -> u32 {
    DEFAULT_MAX_DEPTH
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_max_redirects() -> usize {
    10
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_accept() -> String {
    DEFAULT_ACCEPT.to_string()
}

fn default_accept_language() -> String {
    DEFAULT_ACCEPT_LANGUAGE.to_string()
}
