//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `EntryState`: Tracks the lifecycle of a frontier entry (pending, dispatched, done)

mod entry_state;

// Re-export main types
pub use entry_state::EntryState;
