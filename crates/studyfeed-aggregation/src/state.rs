//! Per-session aggregation state

use crate::{
    decider::{NextAction, decide},
    dedup::DeduplicationTracker,
    exhaustion::ExhaustionTracker,
};
use studyfeed_core::{ItemKind, ResultItem, ResultPage};

/// Everything accumulated for one query session.
///
/// Only the page sequencer mutates it, and only on a completed fetch (plus
/// flagging the escalation when that probe is issued). A query change
/// discards the whole value.
#[derive(Debug, Clone, Default)]
pub struct AggregationState {
    pages: Vec<ResultPage>,
    seen: DeduplicationTracker,
    folders: ExhaustionTracker,
    escalation_attempted: bool,
    cursor: u32,
}

/// What a page contributed to the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Absorbed {
    pub page: u32,
    pub primary_appended: usize,
    pub folders_appended: usize,
    pub duplicates_dropped: usize,
}

impl AggregationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fetched page, dropping primary items already in the feed
    pub(crate) fn absorb(&mut self, mut page: ResultPage) -> Absorbed {
        let (items, duplicates_dropped) = self.seen.retain_unseen(std::mem::take(&mut page.items));
        let primary_appended = self.seen.record(&items);
        let folders_appended = items.len() - primary_appended;

        self.folders.observe(page.folder_has_more);
        self.cursor = page.page;
        page.items = items;

        let absorbed = Absorbed {
            page: page.page,
            primary_appended,
            folders_appended,
            duplicates_dropped,
        };
        self.pages.push(page);
        absorbed
    }

    /// Flag the escalation probe as issued; false if it already was
    pub(crate) fn mark_escalation_attempted(&mut self) -> bool {
        !std::mem::replace(&mut self.escalation_attempted, true)
    }

    /// Decide the next action from the current state
    pub fn next_action(&self, page_size: usize) -> NextAction {
        decide(
            &self.pages,
            &self.seen,
            self.folders.is_exhausted(),
            self.escalation_attempted,
            page_size,
        )
    }

    pub fn pages(&self) -> &[ResultPage] {
        &self.pages
    }

    pub fn seen_primary_ids(&self) -> &DeduplicationTracker {
        &self.seen
    }

    pub fn folder_exhausted(&self) -> bool {
        self.folders.is_exhausted()
    }

    pub fn escalation_attempted(&self) -> bool {
        self.escalation_attempted
    }

    /// Number of the last page absorbed, 0 before the first
    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    /// All items across pages, in fetch order
    pub fn accumulated_items(&self) -> impl Iterator<Item = &ResultItem> {
        self.pages.iter().flat_map(|page| page.items.iter())
    }

    pub fn item_count(&self) -> usize {
        self.pages.iter().map(ResultPage::len).sum()
    }

    pub fn count_of(&self, kind: ItemKind) -> usize {
        self.accumulated_items()
            .filter(|item| item.kind() == kind)
            .count()
    }

    /// Whether any page came from the upstream's advanced search path
    pub fn used_advanced_search(&self) -> bool {
        self.pages.iter().any(|page| page.used_advanced_search)
    }

    /// Total hits reported by the most recent page
    pub fn total(&self) -> Option<u64> {
        self.pages.last().map(|page| page.total)
    }
}
