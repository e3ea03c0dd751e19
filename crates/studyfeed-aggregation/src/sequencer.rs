//! Page sequencing for one query session
//!
//! The sequencer owns the [`AggregationState`] of a session and drives the
//! fetch lifecycle. It can be used in two ways:
//! - split: [`PageSequencer::begin_fetch`] hands out a tagged request and
//!   [`PageSequencer::complete`] applies its outcome later, which is what an
//!   event loop with spawned fetches needs
//! - direct: [`PageSequencer::fetch_next`] does both around one awaited call
//!
//! The direct form is cancel-safe. Dropping its future before the source
//! answers fails the fetch with [`Error::Cancelled`], so it can be retried.

use crate::{
    decider::{FetchIntent, NextAction},
    session::{SessionId, SessionStatus},
    state::{Absorbed, AggregationState},
};
use studyfeed_core::{
    Error, FetchRequest, ItemKind, ResultItem, ResultPage, SearchQuery, SearchSource,
};
use tracing::{Instrument, debug, debug_span, info, warn};

/// Per-session request settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencerSettings {
    /// Page size requested from the upstream; also the escalation threshold
    pub page_size: usize,

    /// Passthrough flag sent with every request
    pub save_history: bool,
}

impl Default for SequencerSettings {
    fn default() -> Self {
        Self {
            page_size: 10,
            save_history: false,
        }
    }
}

/// Identity of one issued fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchTicket {
    pub session: SessionId,
    pub fetch_id: u64,
}

/// A fetch handed out by the sequencer and not yet completed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFetch {
    pub ticket: FetchTicket,
    pub intent: FetchIntent,
    /// Reissue of a failed fetch
    pub retry: bool,
    pub request: FetchRequest,
}

/// Outcome of applying a fetch result
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// The page was appended; `status` is the session state afterwards
    Appended {
        absorbed: Absorbed,
        status: SessionStatus,
    },
    /// The fetch failed and the state was left untouched
    Failed(Error),
    /// The result does not belong to the fetch in flight and was ignored
    Stale,
}

pub struct PageSequencer {
    session: SessionId,
    query: SearchQuery,
    settings: SequencerSettings,
    state: AggregationState,
    status: SessionStatus,
    next_action: NextAction,
    in_flight: Option<PendingFetch>,
    failed: Option<PendingFetch>,
    last_error: Option<Error>,
    fetch_seq: u64,
}

impl PageSequencer {
    /// Start a new session.
    ///
    /// A seed page (e.g. from an initial server-side fetch) is absorbed as
    /// page 1 without fetching it again.
    pub fn start(query: SearchQuery, settings: SequencerSettings, seed: Option<ResultPage>) -> Self {
        let state = AggregationState::new();
        let next_action = state.next_action(settings.page_size);
        let mut sequencer = Self {
            session: SessionId::new(),
            query,
            settings,
            state,
            status: SessionStatus::NoData,
            next_action,
            in_flight: None,
            failed: None,
            last_error: None,
            fetch_seq: 0,
        };

        info!(
            session = %sequencer.session,
            query = %sequencer.query.text,
            seeded = seed.is_some(),
            "Query session started"
        );

        if let Some(mut seed) = seed {
            seed.page = 1;
            let absorbed = sequencer.state.absorb(seed);
            sequencer.settle();
            debug!(
                session = %sequencer.session,
                primary = absorbed.primary_appended,
                folders = absorbed.folders_appended,
                status = sequencer.status.as_str(),
                "Seed page absorbed"
            );
        }

        sequencer
    }

    /// Discard everything and start a fresh session for `query`
    pub fn reset(&mut self, query: SearchQuery) {
        debug!(session = %self.session, "Discarding query session");
        *self = Self::start(query, self.settings, None);
    }

    /// Hand out the next fetch, or `None` when one is already in flight or the
    /// session is not idle with more to load.
    pub fn begin_fetch(&mut self) -> Option<PendingFetch> {
        if self.in_flight.is_some() {
            debug!(session = %self.session, "Fetch already in flight, ignoring");
            return None;
        }
        if !matches!(self.status, SessionStatus::NoData | SessionStatus::HasMore) {
            return None;
        }

        let plan = self.next_action.plan()?.clone();
        if plan.intent == FetchIntent::Escalation && self.state.mark_escalation_attempted() {
            info!(
                session = %self.session,
                first_page_items = self.state.item_count(),
                primary = self.state.count_of(ItemKind::Primary),
                folders = self.state.count_of(ItemKind::Folder),
                "Thin first page, escalating to advanced search"
            );
        }

        let request = FetchRequest {
            query: self.query.clone(),
            page: plan.page,
            limit: self.settings.page_size,
            exclude_ids: plan.exclude_ids,
            include_folders: plan.include_folders,
            save_history: self.settings.save_history,
        };
        Some(self.issue(plan.intent, request, false))
    }

    /// Reissue the request that failed, unchanged
    pub fn begin_retry(&mut self) -> Option<PendingFetch> {
        if self.in_flight.is_some() || self.status != SessionStatus::Error {
            return None;
        }
        let failed = self.failed.take()?;
        info!(session = %self.session, page = failed.request.page, "Retrying failed fetch");
        Some(self.issue(failed.intent, failed.request, true))
    }

    fn issue(&mut self, intent: FetchIntent, request: FetchRequest, retry: bool) -> PendingFetch {
        self.fetch_seq += 1;
        let pending = PendingFetch {
            ticket: FetchTicket {
                session: self.session,
                fetch_id: self.fetch_seq,
            },
            intent,
            retry,
            request,
        };

        debug!(
            session = %self.session,
            fetch_id = self.fetch_seq,
            page = pending.request.page,
            intent = ?intent,
            include_folders = pending.request.include_folders,
            "Issuing fetch"
        );

        self.status = SessionStatus::Fetching;
        self.last_error = None;
        self.in_flight = Some(pending.clone());
        pending
    }

    /// Apply the outcome of a fetch handed out earlier.
    ///
    /// Results for another session or for a fetch that is no longer in
    /// flight are ignored. A failure leaves the accumulated state untouched.
    pub fn complete(&mut self, ticket: FetchTicket, result: studyfeed_core::Result<ResultPage>) -> Completion {
        let pending = match self.in_flight.take() {
            Some(pending) if pending.ticket == ticket => pending,
            other => {
                self.in_flight = other;
                debug!(
                    session = %self.session,
                    stale_session = %ticket.session,
                    fetch_id = ticket.fetch_id,
                    "Discarding stale fetch result"
                );
                return Completion::Stale;
            }
        };

        let result = result.and_then(|page| {
            if page.page == pending.request.page {
                Ok(page)
            } else {
                Err(Error::MalformedResponse(format!(
                    "requested page {} but received page {}",
                    pending.request.page, page.page
                )))
            }
        });

        match result {
            Ok(page) => {
                let absorbed = self.state.absorb(page);
                self.settle();
                debug!(
                    session = %self.session,
                    page = absorbed.page,
                    primary = absorbed.primary_appended,
                    folders = absorbed.folders_appended,
                    dropped = absorbed.duplicates_dropped,
                    status = self.status.as_str(),
                    "Page appended"
                );
                Completion::Appended {
                    absorbed,
                    status: self.status,
                }
            }
            Err(err) => {
                warn!(
                    session = %self.session,
                    page = pending.request.page,
                    error = %err,
                    "Fetch failed"
                );
                self.status = SessionStatus::Error;
                self.last_error = Some(err.clone());
                self.failed = Some(pending);
                Completion::Failed(err)
            }
        }
    }

    /// Fail the fetch in flight as cancelled, e.g. after its task was aborted.
    ///
    /// The request is kept for [`PageSequencer::begin_retry`]. Returns whether
    /// a fetch was in flight.
    pub fn cancel_in_flight(&mut self) -> bool {
        match self.in_flight.as_ref().map(|pending| pending.ticket) {
            Some(ticket) => {
                self.complete(ticket, Err(Error::Cancelled));
                true
            }
            None => false,
        }
    }

    fn settle(&mut self) {
        self.next_action = self.state.next_action(self.settings.page_size);
        self.status = if self.next_action.is_stop() {
            SessionStatus::Exhausted
        } else {
            SessionStatus::HasMore
        };
    }

    /// Fetch the next page from `source` and apply it
    pub async fn fetch_next(&mut self, source: &dyn SearchSource) -> Option<Completion> {
        let span = debug_span!("fetch", source = source.name());
        let pending = span.in_scope(|| self.begin_fetch())?;
        Some(self.run(source, pending).instrument(span).await)
    }

    /// Retry the failed fetch against `source`
    pub async fn retry(&mut self, source: &dyn SearchSource) -> Option<Completion> {
        let span = debug_span!("fetch", source = source.name());
        let pending = span.in_scope(|| self.begin_retry())?;
        Some(self.run(source, pending).instrument(span).await)
    }

    async fn run(&mut self, source: &dyn SearchSource, pending: PendingFetch) -> Completion {
        let guard = InFlightGuard {
            sequencer: self,
            ticket: Some(pending.ticket),
        };
        let result = source.search(pending.request).await;
        guard.complete(result)
    }

    pub fn session_id(&self) -> SessionId {
        self.session
    }

    pub fn query(&self) -> &SearchQuery {
        &self.query
    }

    pub fn settings(&self) -> SequencerSettings {
        self.settings
    }

    pub fn state(&self) -> &AggregationState {
        &self.state
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn next_action(&self) -> &NextAction {
        &self.next_action
    }

    pub fn in_flight(&self) -> Option<&PendingFetch> {
        self.in_flight.as_ref()
    }

    /// Items across all fetched pages, in order
    pub fn accumulated_items(&self) -> impl Iterator<Item = &ResultItem> {
        self.state.accumulated_items()
    }

    pub fn has_more(&self) -> bool {
        !self.status.is_terminal()
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    /// Fetches issued in this session, retries included
    pub fn fetches_issued(&self) -> u64 {
        self.fetch_seq
    }
}

/// Fails the fetch as cancelled if the awaiting future is dropped first
struct InFlightGuard<'a> {
    sequencer: &'a mut PageSequencer,
    ticket: Option<FetchTicket>,
}

impl InFlightGuard<'_> {
    fn complete(mut self, result: studyfeed_core::Result<ResultPage>) -> Completion {
        match self.ticket.take() {
            Some(ticket) => self.sequencer.complete(ticket, result),
            None => Completion::Stale,
        }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            debug!(fetch_id = ticket.fetch_id, "Awaited fetch dropped before completing");
            self.sequencer.complete(ticket, Err(Error::Cancelled));
        }
    }
}
