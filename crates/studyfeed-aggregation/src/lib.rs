//! StudyFeed Search Aggregation
//!
//! This crate merges the independently paginated primary and folder
//! collections of the upstream search into one deduplicated, incrementally
//! loaded feed:
//! - Duplicate tracking for primary items
//! - Folder exhaustion tracking
//! - The next-page / escalation decision
//! - Page sequencing per query session
//! - An async feed driver with debounced viewport triggers

pub mod debounce;
pub mod decider;
pub mod dedup;
pub mod error;
pub mod exhaustion;
pub mod feed;
pub mod sequencer;
pub mod session;
pub mod state;

pub use debounce::{DEFAULT_DEBOUNCE, ProximityDebouncer};
pub use decider::{FetchIntent, FetchPlan, NextAction, decide};
pub use dedup::DeduplicationTracker;
pub use error::{FeedError, Result};
pub use exhaustion::ExhaustionTracker;
pub use feed::{FeedHandle, FeedOptions, FeedSnapshot, SearchFeed};
pub use sequencer::{Completion, FetchTicket, PageSequencer, PendingFetch, SequencerSettings};
pub use session::{SessionId, SessionStatus};
pub use state::AggregationState;
