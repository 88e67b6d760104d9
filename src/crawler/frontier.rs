//! Crawl frontier: deduplicated work queue
//!
//! This module handles:
//! - Canonicalizing and filtering every offered href
//! - The visited set, keyed by canonical URL, with each entry's lifecycle state
//! - Priority and normal FIFO lanes of pending entries
//! - Rejection bookkeeping by reason code
//!
//! All state sits behind one mutex, so `offer` and `take_batch` are safe to call
//! from worker tasks and the coordinator at the same time.

use crate::state::EntryState;
use crate::url::{canonicalize_with_reason, check_relevance, DomainScope, RejectReason};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use url::Url;

/// Maximum number of rejections kept in the audit log
pub const FILTERED_LOG_CAPACITY: usize = 10_000;

/// A URL accepted into the frontier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    /// Canonical URL
    pub url: Url,

    /// Link distance from the seed (seed is 0)
    pub depth: u32,

    /// Page the link was found on; `None` for the seed
    pub discovered_from: Option<Url>,
}

/// One declined URL, kept for auditing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilteredUrl {
    pub url: String,
    pub reason: RejectReason,
    pub details: String,
}

/// Point-in-time frontier counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FrontierStats {
    /// URLs accepted into the visited set
    pub discovered: u64,
    /// Entries handed to workers
    pub dispatched: u64,
    /// Entries whose result has been recorded
    pub done: u64,
    /// Offers of an already visited URL
    pub duplicates: u64,
    /// Declined offers, by reason
    pub filtered: BTreeMap<RejectReason, u64>,
    /// Entries waiting in either lane
    pub pending: usize,
    /// Entries waiting in the priority lane
    pub priority_pending: usize,
}

impl FrontierStats {
    /// Total declined offers across all reasons
    pub fn total_filtered(&self) -> u64 {
        self.filtered.values().sum()
    }

    /// Entries dispatched but not yet done
    pub fn in_flight(&self) -> u64 {
        self.dispatched - self.done
    }
}

#[derive(Debug, Default)]
struct FrontierInner {
    visited: HashMap<String, EntryState>,
    priority_lane: VecDeque<FrontierEntry>,
    normal_lane: VecDeque<FrontierEntry>,
    filtered_log: Vec<FilteredUrl>,
    discovered: u64,
    dispatched: u64,
    done: u64,
    duplicates: u64,
    filtered: BTreeMap<RejectReason, u64>,
}

impl FrontierInner {
    fn pending(&self) -> usize {
        self.priority_lane.len() + self.normal_lane.len()
    }

    fn record_rejection(&mut self, url: &str, reason: RejectReason, details: String) {
        tracing::debug!(url, reason = %reason, "Filtered: {}", details);
        *self.filtered.entry(reason).or_insert(0) += 1;
        if self.filtered_log.len() < FILTERED_LOG_CAPACITY {
            self.filtered_log.push(FilteredUrl {
                url: url.to_string(),
                reason,
                details,
            });
        }
    }

    fn pop_next(&mut self) -> Option<FrontierEntry> {
        self.priority_lane
            .pop_front()
            .or_else(|| self.normal_lane.pop_front())
    }
}

/// The deduplicated work queue for one crawl
///
/// Membership in the visited set is decided at offer time, so an entry can
/// never be dequeued twice.
pub struct Frontier {
    scope: DomainScope,
    max_depth: u32,
    priority_patterns: Vec<String>,
    inner: Mutex<FrontierInner>,
}

impl Frontier {
    /// Creates an empty frontier for the given scope
    pub fn new(scope: DomainScope, max_depth: u32) -> Self {
        Self {
            scope,
            max_depth,
            priority_patterns: Vec::new(),
            inner: Mutex::new(FrontierInner::default()),
        }
    }

    /// Routes URLs containing any of `patterns` into the priority lane
    pub fn with_priority_patterns(mut self, patterns: &[String]) -> Self {
        self.priority_patterns = patterns.iter().map(|p| p.to_lowercase()).collect();
        self
    }

    /// Returns the domain scope this frontier enforces
    pub fn scope(&self) -> &DomainScope {
        &self.scope
    }

    fn lock(&self) -> MutexGuard<'_, FrontierInner> {
        // A panicking worker must not take the frontier down with it
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Offers a raw href found on `base_url` (or the seed, with no base)
    ///
    /// Returns true if a new pending entry was created. Declines are recorded
    /// by reason; duplicates are counted separately.
    pub fn offer(&self, raw_href: &str, base_url: Option<&Url>, depth: u32) -> bool {
        let canonical = match canonicalize_with_reason(raw_href, base_url, &self.scope) {
            Ok(url) => url,
            Err(reason) => {
                let details = match reason {
                    RejectReason::CrossDomain => format!("outside scope {}", self.scope.host()),
                    _ => "canonicalization failed".to_string(),
                };
                self.lock().record_rejection(raw_href, reason, details);
                return false;
            }
        };

        if let Err(matched) = check_relevance(&canonical) {
            self.lock().record_rejection(
                canonical.as_str(),
                matched.reason,
                format!("matched rule {}", matched.rule),
            );
            return false;
        }

        if depth > self.max_depth {
            self.lock().record_rejection(
                canonical.as_str(),
                RejectReason::DepthExceeded,
                format!("depth {} > max depth {}", depth, self.max_depth),
            );
            return false;
        }

        let priority = self.is_priority(&canonical);
        let mut inner = self.lock();

        if inner.visited.contains_key(canonical.as_str()) {
            inner.duplicates += 1;
            tracing::trace!("Duplicate: {}", canonical);
            return false;
        }

        inner
            .visited
            .insert(canonical.to_string(), EntryState::Pending);
        inner.discovered += 1;

        tracing::trace!("Accepted {} at depth {}", canonical, depth);
        let entry = FrontierEntry {
            url: canonical,
            depth,
            discovered_from: base_url.cloned(),
        };
        if priority {
            inner.priority_lane.push_back(entry);
        } else {
            inner.normal_lane.push_back(entry);
        }

        true
    }

    fn is_priority(&self, url: &Url) -> bool {
        if self.priority_patterns.is_empty() {
            return false;
        }
        let lowered = url.as_str().to_lowercase();
        self.priority_patterns.iter().any(|p| lowered.contains(p))
    }

    /// Removes up to `max_size` pending entries and marks them dispatched
    ///
    /// The priority lane is drained first, then the normal lane, each in
    /// arrival order.
    pub fn take_batch(&self, max_size: usize) -> Vec<FrontierEntry> {
        let mut guard = self.lock();
        let inner = &mut *guard;
        let mut batch = Vec::with_capacity(max_size.min(inner.pending()));

        while batch.len() < max_size {
            let Some(entry) = inner.pop_next() else {
                break;
            };
            if let Some(state) = inner.visited.get_mut(entry.url.as_str()) {
                *state = EntryState::Dispatched;
            }
            inner.dispatched += 1;
            batch.push(entry);
        }

        batch
    }

    /// Marks a dispatched entry as done
    ///
    /// Returns false, changing nothing, if the URL is not currently dispatched.
    pub fn complete(&self, url: &Url) -> bool {
        let mut guard = self.lock();
        let inner = &mut *guard;
        match inner.visited.get_mut(url.as_str()) {
            Some(state) if state.can_transition_to(EntryState::Done) => {
                *state = EntryState::Done;
                inner.done += 1;
                true
            }
            _ => false,
        }
    }

    /// Returns true if at least one entry is waiting
    pub fn has_pending(&self) -> bool {
        self.lock().pending() > 0
    }

    /// Number of entries waiting in either lane
    pub fn pending_len(&self) -> usize {
        self.lock().pending()
    }

    /// Number of canonical URLs ever accepted
    pub fn visited_len(&self) -> usize {
        self.lock().visited.len()
    }

    /// Returns the lifecycle state of a canonical URL, if it was ever accepted
    pub fn state_of(&self, url: &Url) -> Option<EntryState> {
        self.lock().visited.get(url.as_str()).copied()
    }

    /// Returns a snapshot of the frontier counters
    pub fn stats(&self) -> FrontierStats {
        let inner = self.lock();
        FrontierStats {
            discovered: inner.discovered,
            dispatched: inner.dispatched,
            done: inner.done,
            duplicates: inner.duplicates,
            filtered: inner.filtered.clone(),
            pending: inner.pending(),
            priority_pending: inner.priority_lane.len(),
        }
    }

    /// Returns the audit log of declined URLs, optionally for one reason
    pub fn filtered_urls(&self, reason: Option<RejectReason>) -> Vec<FilteredUrl> {
        let inner = self.lock();
        inner
            .filtered_log
            .iter()
            .filter(|f| reason.map_or(true, |r| f.reason == r))
            .cloned()
            .collect()
    }
}
