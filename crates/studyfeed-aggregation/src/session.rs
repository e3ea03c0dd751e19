//! Query session identity and lifecycle states
//!
//! A query session covers one query/filter combination. It moves through:
//! - NoData: started without a seed page, nothing fetched yet
//! - Fetching: exactly one upstream call in flight
//! - HasMore: idle, the decision says another page can be fetched
//! - Exhausted: idle and terminal, no further network activity
//! - Error: the last fetch failed; state is frozen until retried
//!
//! Transitions:
//! - NoData | HasMore → Fetching: next page requested
//! - Fetching → HasMore | Exhausted: fetch succeeded, per the decision
//! - Fetching → Error: fetch failed
//! - Error → Fetching: explicit retry of the same request
//!
//! A query change replaces the session instead of transitioning it.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity of a query session, attached to every fetch it issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    NoData,
    Fetching,
    HasMore,
    Exhausted,
    Error,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoData => "no_data",
            Self::Fetching => "fetching",
            Self::HasMore => "has_more",
            Self::Exhausted => "exhausted",
            Self::Error => "error",
        }
    }

    /// Terminal: no further fetch will ever be issued for the session
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Exhausted)
    }
}
