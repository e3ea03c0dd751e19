//! Primary item deduplication

use std::collections::HashSet;
use studyfeed_core::ResultItem;

/// Primary item ids seen so far in a session, in first-seen order.
///
/// Folder items are never tracked here; their ids live in a separate
/// namespace and the folder collection is only paged until exhaustion.
#[derive(Debug, Clone, Default)]
pub struct DeduplicationTracker {
    seen: HashSet<String>,
    order: Vec<String>,
}

impl DeduplicationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every primary item id not already present.
    ///
    /// Returns how many ids were inserted.
    pub fn record(&mut self, items: &[ResultItem]) -> usize {
        let mut inserted = 0;
        for item in items {
            if let ResultItem::Primary(primary) = item
                && self.seen.insert(primary.id.clone())
            {
                self.order.push(primary.id.clone());
                inserted += 1;
            }
        }
        inserted
    }

    /// Drop primary items already recorded, or repeated within `items`.
    ///
    /// Does not record anything. Returns the kept items and the number dropped.
    pub fn retain_unseen(&self, items: Vec<ResultItem>) -> (Vec<ResultItem>, usize) {
        let flags: Vec<bool> = {
            let mut batch: HashSet<&str> = HashSet::new();
            items
                .iter()
                .map(|item| match item {
                    ResultItem::Primary(primary) => {
                        !self.seen.contains(&primary.id) && batch.insert(primary.id.as_str())
                    }
                    ResultItem::Folder(_) => true,
                })
                .collect()
        };

        let mut keep = Vec::with_capacity(items.len());
        let mut dropped = 0;
        for (item, fresh) in items.into_iter().zip(flags) {
            if fresh {
                keep.push(item);
            } else {
                dropped += 1;
            }
        }
        (keep, dropped)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    /// Ids to exclude from the next fetch, `None` when nothing was seen yet
    pub fn exclude_list(&self) -> Option<Vec<String>> {
        if self.order.is_empty() {
            None
        } else {
            Some(self.order.clone())
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_ignores_folders_and_repeats() {
        let mut tracker = DeduplicationTracker::new();
        let inserted = tracker.record(&[
            ResultItem::primary("a", "A"),
            ResultItem::folder("a", "Folder A"),
            ResultItem::primary("b", "B"),
            ResultItem::primary("a", "A again"),
        ]);

        assert_eq!(inserted, 2);
        assert_eq!(tracker.len(), 2);
        assert!(tracker.contains("a"));
        assert!(tracker.contains("b"));
    }

    #[test]
    fn test_exclude_list_empty_is_none() {
        let mut tracker = DeduplicationTracker::new();
        assert_eq!(tracker.exclude_list(), None);

        tracker.record(&[ResultItem::folder("f1", "Only folders")]);
        assert_eq!(tracker.exclude_list(), None);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_exclude_list_keeps_first_seen_order() {
        let mut tracker = DeduplicationTracker::new();
        tracker.record(&[ResultItem::primary("z", "Z"), ResultItem::primary("m", "M")]);
        tracker.record(&[ResultItem::primary("a", "A"), ResultItem::primary("z", "Z")]);

        assert_eq!(
            tracker.exclude_list(),
            Some(vec!["z".to_string(), "m".to_string(), "a".to_string()])
        );
    }

    #[test]
    fn test_retain_unseen_drops_known_and_in_batch_duplicates() {
        let mut tracker = DeduplicationTracker::new();
        tracker.record(&[ResultItem::primary("a", "A")]);

        let (kept, dropped) = tracker.retain_unseen(vec![
            ResultItem::folder("a", "Folder sharing an id"),
            ResultItem::primary("a", "A"),
            ResultItem::primary("b", "B"),
            ResultItem::primary("b", "B twice"),
            ResultItem::primary("c", "C"),
        ]);

        assert_eq!(dropped, 2);
        let ids: Vec<_> = kept.iter().map(|item| (item.kind(), item.id())).collect();
        assert_eq!(
            ids,
            vec![
                (studyfeed_core::ItemKind::Folder, "a"),
                (studyfeed_core::ItemKind::Primary, "b"),
                (studyfeed_core::ItemKind::Primary, "c"),
            ]
        );
        // retain_unseen never records
        assert!(!tracker.contains("b"));
    }
}
