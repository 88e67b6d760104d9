//! URL handling module for Wavecrawl
//!
//! This module provides URL canonicalization, domain scoping and the relevance
//! filter that together decide which discovered links may enter the frontier.

mod domain;
mod filter;
mod normalize;

use serde::Serialize;
use std::fmt;

// Re-export main functions
pub use domain::{extract_domain, DomainScope};
pub use filter::{check_relevance, is_relevant, FilterMatch};
pub use normalize::{canonicalize, canonicalize_with_reason, normalize_url};

/// Reason code attached to every URL the frontier declines
///
/// These are not errors. They are counted per reason so operators can audit
/// how aggressive the filtering is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// The href could not be parsed or resolved
    InvalidUrl,
    /// Not http or https (mailto:, javascript:, tel:, ...)
    UnsupportedScheme,
    /// Host differs from the crawl's domain scope
    CrossDomain,
    /// Path ends in a non-page file extension
    FileExtension,
    /// Cart, checkout, account or admin endpoint
    Ecommerce,
    /// CMS asset directory, API endpoint or third-party tracker
    Technical,
    /// Session or tracking query parameter survived canonicalization
    TrackingParam,
    /// Would exceed the crawl's maximum depth
    DepthExceeded,
}

impl RejectReason {
    /// Returns the stable reason code used in logs and statistics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidUrl => "invalid_url",
            Self::UnsupportedScheme => "unsupported_scheme",
            Self::CrossDomain => "cross_domain",
            Self::FileExtension => "file_extension",
            Self::Ecommerce => "ecommerce",
            Self::Technical => "technical",
            Self::TrackingParam => "tracking_param",
            Self::DepthExceeded => "depth_exceeded",
        }
    }

    /// Returns all reason codes
    pub fn all() -> [Self; 8] {
        [
            Self::InvalidUrl,
            Self::UnsupportedScheme,
            Self::CrossDomain,
            Self::FileExtension,
            Self::Ecommerce,
            Self::Technical,
            Self::TrackingParam,
            Self::DepthExceeded,
        ]
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
