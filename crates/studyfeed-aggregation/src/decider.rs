//! Next-page and escalation decision
//!
//! Policy, in priority order:
//! 1. No page yet: fetch page 1.
//! 2. The last page reports `has_more`: fetch the following page.
//! 3. Exactly one page, escalation not attempted, the page is non-empty and
//!    holds at most `page_size` items: probe page 2 once, which makes the
//!    upstream fall back to its costlier search path.
//! 4. Otherwise stop.

use crate::dedup::DeduplicationTracker;
use studyfeed_core::ResultPage;

/// Why a fetch is issued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchIntent {
    Initial,
    NextPage,
    /// One-shot advanced search probe after a thin first page
    Escalation,
}

/// Parameters of the next fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPlan {
    pub page: u32,
    pub exclude_ids: Option<Vec<String>>,
    pub include_folders: bool,
    pub intent: FetchIntent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextAction {
    FetchPage(FetchPlan),
    Stop,
}

impl NextAction {
    pub fn is_stop(&self) -> bool {
        matches!(self, NextAction::Stop)
    }

    pub fn plan(&self) -> Option<&FetchPlan> {
        match self {
            NextAction::FetchPage(plan) => Some(plan),
            NextAction::Stop => None,
        }
    }
}

/// Decide what to do after the pages fetched so far.
///
/// Pure: marking the escalation as attempted is up to whoever issues the plan.
pub fn decide(
    pages: &[ResultPage],
    seen: &DeduplicationTracker,
    folder_exhausted: bool,
    escalation_attempted: bool,
    page_size: usize,
) -> NextAction {
    let include_folders = !folder_exhausted;

    let Some(last) = pages.last() else {
        return NextAction::FetchPage(FetchPlan {
            page: 1,
            exclude_ids: None,
            include_folders,
            intent: FetchIntent::Initial,
        });
    };

    if last.has_more {
        return NextAction::FetchPage(FetchPlan {
            page: last.page + 1,
            exclude_ids: seen.exclude_list(),
            include_folders,
            intent: FetchIntent::NextPage,
        });
    }

    if pages.len() == 1 && !escalation_attempted && !last.is_empty() && last.len() <= page_size {
        return NextAction::FetchPage(FetchPlan {
            page: 2,
            exclude_ids: seen.exclude_list(),
            include_folders,
            intent: FetchIntent::Escalation,
        });
    }

    NextAction::Stop
}
