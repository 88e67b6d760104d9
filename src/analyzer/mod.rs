//! Pluggable page analyzers
//!
//! Analyzers run once per successfully fetched HTML page, after link
//! extraction, and return named fields that are stored next to the fetch
//! metadata. They cannot influence which URLs are crawled.

mod title;

pub use title::TitleAnalyzer;

use scraper::Html;
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use thiserror::Error;
use url::Url;

/// Named values produced by analyzers for one page
pub type AnalysisFields = BTreeMap<String, serde_json::Value>;

/// Failure reported by an analyzer
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("{0}")]
    Failed(String),

    #[error("analyzer panicked: {0}")]
    Panicked(String),
}

/// Extracts additional fields from a fetched page
///
/// Implementations are shared between worker tasks, so they must be
/// `Send + Sync`.
pub trait Analyzer: Send + Sync {
    /// Name used in error messages
    fn name(&self) -> &str;

    /// Analyzes one parsed page
    fn analyze(&self, document: &Html, url: &Url) -> Result<AnalysisFields, AnalyzerError>;
}

/// Merged output of every analyzer for one page
#[derive(Debug, Default)]
pub struct AnalysisReport {
    pub fields: AnalysisFields,
    pub errors: Vec<String>,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Runs every analyzer against a page, isolating failures
///
/// Fields are merged in analyzer order; a later analyzer overwrites a field
/// of the same name. Errors and panics become `"<name>: <message>"` entries.
pub fn run_analyzers(analyzers: &[Arc<dyn Analyzer>], document: &Html, url: &Url) -> AnalysisReport {
    let mut report = AnalysisReport::default();

    for analyzer in analyzers {
        let outcome = catch_unwind(AssertUnwindSafe(|| analyzer.analyze(document, url)))
            .unwrap_or_else(|payload| Err(AnalyzerError::Panicked(panic_message(&*payload))));

        match outcome {
            Ok(fields) => report.fields.extend(fields),
            Err(e) => {
                tracing::warn!("Analyzer {} failed on {}: {}", analyzer.name(), url, e);
                report.errors.push(format!("{}: {}", analyzer.name(), e));
            }
        }
    }

    report
}
