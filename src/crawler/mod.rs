//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - The deduplicating frontier
//! - HTTP fetch sessions, optionally rate limited
//! - HTML link extraction
//! - The wave-based crawl engine

mod coordinator;
mod fetcher;
mod frontier;
mod parser;
mod session;

pub use coordinator::{crawl, CrawlPhase, Crawler, PageRecord};
pub use fetcher::{
    build_http_client, FetchOutcome, FetchResult, FetchSession, HttpFetchSession, SessionStats,
    TransportErrorKind,
};
pub use frontier::{FilteredUrl, Frontier, FrontierEntry, FrontierStats, FILTERED_LOG_CAPACITY};
pub use parser::{extract_links, extract_links_from_document, extract_title, is_html_content_type};
pub use session::{create_session, MultiDomainFetchSession, RateLimitedFetchSession};
