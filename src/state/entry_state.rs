//! Frontier entry lifecycle
//!
//! Every URL in the visited set is in exactly one of these states.

use serde::Serialize;
use std::fmt;

/// Represents the lifecycle state of a frontier entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryState {
    /// Queued and waiting for a batch
    Pending,

    /// Handed to a fetch worker
    Dispatched,

    /// Result recorded; terminal
    Done,
}

impl EntryState {
    /// Returns true if this is the terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns true if moving from `self` to `next` is a legal transition
    ///
    /// Entries only move forward: pending → dispatched → done.
    pub fn can_transition_to(&self, next: EntryState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Dispatched) | (Self::Dispatched, Self::Done)
        )
    }

    /// Returns the state name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Dispatched => "dispatched",
            Self::Done => "done",
        }
    }

    /// Returns all possible entry states
    pub fn all_states() -> [Self; 3] {
        [Self::Pending, Self::Dispatched, Self::Done]
    }
}

impl fmt::Display for EntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
