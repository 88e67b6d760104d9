//! Wavecrawl main entry point
//!
//! This is the command-line interface for the Wavecrawl single-domain crawler.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use wavecrawl::analyzer::TitleAnalyzer;
use wavecrawl::config::{load_config, validate, Config};
use wavecrawl::output::print_statistics;
use wavecrawl::{Crawler, PageRecord};

/// Wavecrawl: a single-domain, wave-based web crawler
///
/// Wavecrawl starts from a seed URL, stays on the seed's domain, skips
/// assets and tracking noise, and fetches pages in bounded concurrent waves.
#[derive(Parser, Debug)]
#[command(name = "wavecrawl")]
#[command(version = "1.0.0")]
#[command(about = "A single-domain, wave-based web crawler", long_about = None)]
struct Cli {
    /// URL to start crawling from; its host becomes the crawl scope
    #[arg(value_name = "SEED_URL")]
    seed: String,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Maximum number of pages to fetch
    #[arg(long, value_name = "N")]
    max_urls: Option<usize>,

    /// Maximum link depth from the seed
    #[arg(long, value_name = "N")]
    max_depth: Option<u32>,

    /// Maximum number of concurrent requests per wave
    #[arg(long, value_name = "N")]
    concurrency: Option<usize>,

    /// Maximum requests per second
    #[arg(long, value_name = "N")]
    rate: Option<f64>,

    /// Print results as JSON lines instead of a summary
    #[arg(long)]
    json: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    /// Applies command-line overrides on top of the loaded configuration
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(max_urls) = self.max_urls {
            config.crawler.max_urls = max_urls;
        }
        if let Some(max_depth) = self.max_depth {
            config.crawler.max_depth = max_depth;
        }
        if let Some(concurrency) = self.concurrency {
            config.crawler.max_concurrency = concurrency;
        }
        if let Some(rate) = self.rate {
            config.session.requests_per_second = Some(rate);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?
        }
        None => Config::default(),
    };
    cli.apply_overrides(&mut config);
    validate(&config).context("Invalid configuration")?;

    let mut crawler = Crawler::new(&config)?.with_analyzer(TitleAnalyzer);

    let results = crawler
        .crawl(&cli.seed)
        .await
        .with_context(|| format!("Crawl of {} failed", cli.seed))?;

    if cli.json {
        for record in &results {
            println!("{}", serde_json::to_string(record)?);
        }
    } else {
        for record in &results {
            print_record(record);
        }
        println!();
        print_statistics(&crawler.stats());
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("wavecrawl=info,warn"),
            1 => EnvFilter::new("wavecrawl=debug,info"),
            2 => EnvFilter::new("wavecrawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Prints one line per crawled page
fn print_record(record: &PageRecord) {
    let fetch = &record.fetch;
    let title = record
        .analysis
        .get("title")
        .and_then(|v| v.as_str())
        .unwrap_or("-");

    println!(
        "[{}] {} ({}ms, depth {}) {}",
        fetch.outcome,
        fetch.requested_url,
        fetch.elapsed.as_millis(),
        fetch.depth,
        title
    );
    if fetch.redirected() {
        println!("    -> {}", fetch.final_url);
    }
    for error in &record.analyzer_errors {
        println!("    ! {}", error);
    }
}
