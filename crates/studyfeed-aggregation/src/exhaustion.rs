//! Folder collection exhaustion tracking

/// Records whether the folder collection has been drained for a session.
///
/// Monotonic: once exhausted it stays exhausted until the session is replaced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExhaustionTracker {
    exhausted: bool,
}

impl ExhaustionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update from a page's `folder_has_more`.
    ///
    /// `Some(false)` marks the collection exhausted; `None` means folders were
    /// not queried for that page and leaves the state unchanged.
    pub fn observe(&mut self, folder_has_more: Option<bool>) {
        if folder_has_more == Some(false) {
            self.exhausted = true;
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Whether the next request should ask for folder items
    pub fn include_folders(&self) -> bool {
        !self.exhausted
    }
}
