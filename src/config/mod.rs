//! Configuration module for Wavecrawl
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key has a default, so a missing file section is valid.
//!
//! # Example
//!
//! ```no_run
//! use wavecrawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("wavecrawl.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlBudget, CrawlerConfig, SessionConfig, DEFAULT_ACCEPT, DEFAULT_ACCEPT_LANGUAGE,
    DEFAULT_MAX_CONCURRENCY, DEFAULT_MAX_DEPTH, DEFAULT_MAX_URLS, DEFAULT_USER_AGENT,
    MIN_REQUESTS_PER_SECOND,
};

// Re-export parser and validation functions
pub use parser::{load_config, parse_config};
pub use validation::{validate, validate_budget};
