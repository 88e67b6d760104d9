//! Output module for crawl statistics
//!
//! This module handles:
//! - The statistics snapshot exported by a crawler
//! - Rendering statistics for the command line

pub mod stats;

pub use stats::{print_statistics, CrawlStats};
