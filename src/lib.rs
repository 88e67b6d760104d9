//! Wavecrawl: a single-domain, wave-based web crawler
//!
//! This crate implements a crawl frontier and concurrent fetch engine. It
//! canonicalizes and deduplicates URLs, filters out assets and noise, fetches
//! pages in bounded concurrent batches and hands each page to pluggable analyzers.

pub mod analyzer;
pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for crawl operations
///
/// Only conditions that make the whole crawl impossible end up here. Per-URL
/// problems are reported through `FetchOutcome` and the crawl statistics.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Invalid seed URL {url}: {reason}")]
    InvalidSeed { url: String, reason: String },

    #[error("Crawler has already been run")]
    AlreadyStarted,
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use analyzer::{Analyzer, AnalyzerError, TitleAnalyzer};
pub use config::{Config, CrawlBudget};
pub use crawler::{crawl, Crawler, FetchOutcome, FetchResult, Frontier, PageRecord};
pub use output::CrawlStats;
pub use state::EntryState;
pub use crate::url::{canonicalize, is_relevant, DomainScope, RejectReason};
