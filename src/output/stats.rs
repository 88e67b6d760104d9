//! Crawl statistics
//!
//! This module provides the statistics snapshot exported by a crawler and a
//! formatted stdout rendering for the CLI.

use crate::crawler::{CrawlPhase, SessionStats};
use crate::url::RejectReason;
use serde::Serialize;
use std::collections::BTreeMap;

/// Crawl statistics summary
#[derive(Debug, Clone, Serialize)]
pub struct CrawlStats {
    /// Phase the crawler was in when the snapshot was taken
    pub phase: CrawlPhase,

    /// URLs accepted into the frontier
    pub urls_found: u64,

    /// URLs that produced a result
    pub urls_processed: u64,

    /// Declined URLs, by reason
    pub urls_filtered: BTreeMap<RejectReason, u64>,

    /// Offers of an already known URL
    pub urls_duplicate: u64,

    /// Entries still waiting in the frontier
    pub queue_depth: usize,

    /// Percentage of processed URLs with a 2xx response
    pub success_rate: f64,

    pub avg_response_time_ms: f64,

    pub elapsed_seconds: f64,

    pub urls_per_second: f64,

    /// Counters reported by the fetch session
    pub session: SessionStats,
}

impl CrawlStats {
    /// Total declined URLs across all reasons
    pub fn total_filtered(&self) -> u64 {
        self.urls_filtered.values().sum()
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStats) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  URLs found: {}", stats.urls_found);
    println!("  URLs processed: {}", stats.urls_processed);
    println!("  URLs filtered: {}", stats.total_filtered());
    println!("  Duplicates skipped: {}", stats.urls_duplicate);
    println!("  Still queued: {}", stats.queue_depth);
    println!();

    println!("Performance:");
    println!("  Success rate: {:.1}%", stats.success_rate);
    println!("  Average response time: {:.0} ms", stats.avg_response_time_ms);
    println!("  Elapsed: {:.2} s", stats.elapsed_seconds);
    println!("  Throughput: {:.2} URLs/sec", stats.urls_per_second);
    println!();

    if !stats.urls_filtered.is_empty() {
        println!("Filtered by Reason:");
        // Sort reasons by count (descending)
        let mut reason_counts: Vec<_> = stats.urls_filtered.iter().collect();
        reason_counts.sort_by(|a, b| b.1.cmp(a.1));

        let total = stats.total_filtered();
        for (reason, count) in reason_counts {
            let percentage = (*count as f64 / total as f64) * 100.0;
            println!("  {}: {} ({:.1}%)", reason, count, percentage);
        }
        println!();
    }

    println!("Session:");
    println!("  Requests made: {}", stats.session.requests_made);
    println!("  Successful: {}", stats.session.successful_requests);
    println!("  Failed: {}", stats.session.failed_requests);
    for (domain, domain_stats) in &stats.session.domains {
        println!(
            "  {}: {} requests, {:.1}% success",
            domain, domain_stats.requests_made, domain_stats.success_rate
        );
    }
}
