//! Asynchronous search feed driver
//!
//! [`SearchFeed::spawn`] starts a task that owns the current query session.
//! Consumers talk to it through a [`FeedHandle`]: they set the query, report
//! viewport proximity and ask for retries, and observe [`FeedSnapshot`]s on a
//! watch channel. Fetches run as separate tasks and report back tagged with
//! their ticket, so a result that outlives its session is recognised and
//! dropped. While the end of the feed stays in view, every page that leaves
//! more to load schedules the next one.

use crate::{
    FeedError, Result,
    debounce::{DEFAULT_DEBOUNCE, ProximityDebouncer},
    decider::FetchIntent,
    sequencer::{Completion, FetchTicket, PageSequencer, PendingFetch, SequencerSettings},
    session::{SessionId, SessionStatus},
};
use std::{sync::Arc, time::Duration};
use studyfeed_core::{Error, ResultItem, ResultPage, SearchQuery, SearchSource};
use studyfeed_observability::{Metrics, metrics::FetchKind};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{Instant, sleep_until},
};
use tracing::{Instrument, Span, debug, info, info_span};

/// Feed configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedOptions {
    /// Page size requested from the upstream
    pub page_size: usize,

    /// Ask the upstream to record queries in the search history
    pub save_history: bool,

    /// Debounce window for viewport proximity
    pub debounce: Duration,
}

impl Default for FeedOptions {
    fn default() -> Self {
        let settings = SequencerSettings::default();
        Self {
            page_size: settings.page_size,
            save_history: settings.save_history,
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

impl FeedOptions {
    fn settings(&self) -> SequencerSettings {
        SequencerSettings {
            page_size: self.page_size,
            save_history: self.save_history,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(FeedError::InvalidOptions(
                "page_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Consumer view of the feed at one point in time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedSnapshot {
    pub session: Option<SessionId>,
    pub query: Option<SearchQuery>,
    /// All items fetched so far, in order
    pub items: Vec<ResultItem>,
    /// `None` until a query is set
    pub status: Option<SessionStatus>,
    pub has_more: bool,
    pub is_fetching: bool,
    pub last_error: Option<Error>,
    pub used_advanced_search: bool,
    pub total: Option<u64>,
    pub pages: usize,
    /// Fetches issued in the session, retries included
    pub fetches: u64,
}

impl FeedSnapshot {
    fn from_sequencer(sequencer: &PageSequencer) -> Self {
        let state = sequencer.state();
        Self {
            session: Some(sequencer.session_id()),
            query: Some(sequencer.query().clone()),
            items: sequencer.accumulated_items().cloned().collect(),
            status: Some(sequencer.status()),
            has_more: sequencer.has_more(),
            is_fetching: sequencer.is_fetching(),
            last_error: sequencer.last_error().cloned(),
            used_advanced_search: state.used_advanced_search(),
            total: state.total(),
            pages: state.pages().len(),
            fetches: sequencer.fetches_issued(),
        }
    }
}

enum Command {
    SetQuery {
        query: SearchQuery,
        seed: Option<ResultPage>,
    },
    Viewport(bool),
    Retry,
    Shutdown,
}

struct FetchDone {
    ticket: FetchTicket,
    result: studyfeed_core::Result<ResultPage>,
    elapsed: Duration,
}

/// Builder for a feed task
pub struct SearchFeed {
    source: Arc<dyn SearchSource>,
    options: FeedOptions,
    metrics: Option<Arc<Metrics>>,
}

impl SearchFeed {
    pub fn new(source: Arc<dyn SearchSource>, options: FeedOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            source,
            options,
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Start the feed task on the current tokio runtime
    pub fn spawn(self) -> FeedHandle {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        let (snapshots_tx, snapshots_rx) = watch::channel(FeedSnapshot::default());

        let worker = FeedWorker {
            source: self.source,
            settings: self.options.settings(),
            metrics: self.metrics,
            sequencer: None,
            fetch_task: None,
            debouncer: ProximityDebouncer::new(self.options.debounce),
            done_tx,
            snapshots: snapshots_tx,
        };
        let span = info_span!("search_feed", source = worker.source.name());
        let task = tokio::spawn(worker.run(commands_rx, done_rx).instrument(span));

        FeedHandle {
            commands: commands_tx,
            snapshots: snapshots_rx,
            task,
        }
    }
}

/// Handle to a running feed task
pub struct FeedHandle {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<FeedSnapshot>,
    task: JoinHandle<()>,
}

impl FeedHandle {
    /// Switch to `query`; starts a new session unless it is the active query
    pub fn set_query(&self, query: SearchQuery) -> Result<()> {
        self.send(Command::SetQuery { query, seed: None })
    }

    /// Start a new session for `query` with an already fetched first page
    pub fn set_query_with_seed(&self, query: SearchQuery, seed: ResultPage) -> Result<()> {
        self.send(Command::SetQuery {
            query,
            seed: Some(seed),
        })
    }

    /// Report whether the end of the rendered feed is near
    pub fn viewport(&self, near_end: bool) -> Result<()> {
        self.send(Command::Viewport(near_end))
    }

    /// Reissue the fetch that failed
    pub fn retry(&self) -> Result<()> {
        self.send(Command::Retry)
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedSnapshot> {
        self.snapshots.clone()
    }

    /// Wait until a snapshot satisfies `predicate`
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&FeedSnapshot) -> bool,
    ) -> Result<FeedSnapshot> {
        let mut snapshots = self.snapshots.clone();
        let snapshot = snapshots
            .wait_for(predicate)
            .await
            .map_err(|_| FeedError::Closed)?
            .clone();
        Ok(snapshot)
    }

    /// Stop the feed task, aborting any fetch in flight
    pub async fn shutdown(self) -> Result<()> {
        // The task also stops when the command channel closes
        let _ = self.commands.send(Command::Shutdown);
        self.task.await.map_err(|_| FeedError::Closed)
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands.send(command).map_err(|_| FeedError::Closed)
    }
}

struct FeedWorker {
    source: Arc<dyn SearchSource>,
    settings: SequencerSettings,
    metrics: Option<Arc<Metrics>>,
    sequencer: Option<PageSequencer>,
    fetch_task: Option<JoinHandle<()>>,
    debouncer: ProximityDebouncer,
    done_tx: mpsc::UnboundedSender<FetchDone>,
    snapshots: watch::Sender<FeedSnapshot>,
}

impl FeedWorker {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut done: mpsc::UnboundedReceiver<FetchDone>,
    ) {
        loop {
            let deadline = self.debouncer.deadline();

            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                Some(finished) = done.recv() => self.handle_done(finished),
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.handle_proximity();
                }
            }

            self.publish();
        }

        self.abort_fetch();
        debug!("Search feed stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::SetQuery { query, seed } => self.start_session(query, seed),
            Command::Viewport(near_end) => self.debouncer.observe(near_end, Instant::now()),
            Command::Retry => {
                let pending = self.sequencer.as_mut().and_then(PageSequencer::begin_retry);
                match pending {
                    Some(pending) => self.spawn_fetch(pending),
                    None => debug!("Retry ignored, no failed fetch"),
                }
            }
            Command::Shutdown => {}
        }
    }

    fn start_session(&mut self, query: SearchQuery, seed: Option<ResultPage>) {
        if seed.is_none()
            && self
                .sequencer
                .as_ref()
                .is_some_and(|sequencer| sequencer.query() == &query)
        {
            debug!("Query unchanged, keeping session");
            return;
        }

        self.abort_fetch();
        self.debouncer.reset();
        let sequencer = PageSequencer::start(query, self.settings, seed);
        let needs_first_page = sequencer.status() == SessionStatus::NoData;
        self.sequencer = Some(sequencer);

        if let Some(metrics) = &self.metrics {
            metrics.record_session_started();
        }
        if needs_first_page {
            self.dispatch_next();
        }
    }

    fn handle_proximity(&mut self) {
        if self.debouncer.fire(Instant::now()) {
            debug!("End of feed in view");
            self.dispatch_next();
        }
    }

    fn dispatch_next(&mut self) {
        let pending = self.sequencer.as_mut().and_then(PageSequencer::begin_fetch);
        if let Some(pending) = pending {
            self.spawn_fetch(pending);
        }
    }

    fn spawn_fetch(&mut self, pending: PendingFetch) {
        if let Some(metrics) = &self.metrics {
            metrics.record_fetch_issued(fetch_kind(&pending));
        }

        let source = Arc::clone(&self.source);
        let done = self.done_tx.clone();
        let fetch = async move {
            let started = Instant::now();
            let result = source.search(pending.request).await;
            // Only fails once the feed task is gone
            let _ = done.send(FetchDone {
                ticket: pending.ticket,
                result,
                elapsed: started.elapsed(),
            });
        };
        self.fetch_task = Some(tokio::spawn(fetch.instrument(Span::current())));
    }

    fn handle_done(&mut self, finished: FetchDone) {
        let completion = match self.sequencer.as_mut() {
            Some(sequencer) => sequencer.complete(finished.ticket, finished.result),
            None => Completion::Stale,
        };

        let elapsed = finished.elapsed.as_secs_f64();
        match &completion {
            Completion::Stale => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_stale_response();
                }
                return;
            }
            Completion::Appended { absorbed, status } => {
                if status.is_terminal() {
                    info!(
                        session = %finished.ticket.session,
                        pages = absorbed.page,
                        "Search results exhausted"
                    );
                } else if self.debouncer.is_near_end() {
                    debug!("End of feed still in view");
                    self.debouncer.rearm(Instant::now());
                }
                if let Some(metrics) = &self.metrics {
                    metrics.record_fetch_success(
                        elapsed,
                        absorbed.primary_appended,
                        absorbed.folders_appended,
                        absorbed.duplicates_dropped,
                    );
                }
            }
            Completion::Failed(err) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_fetch_failure(err.error_type(), elapsed);
                }
            }
        }
        self.fetch_task = None;
    }

    fn abort_fetch(&mut self) {
        if let Some(task) = self.fetch_task.take() {
            task.abort();
        }
    }

    fn publish(&self) {
        let snapshot = match &self.sequencer {
            Some(sequencer) => FeedSnapshot::from_sequencer(sequencer),
            None => FeedSnapshot::default(),
        };
        self.snapshots.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }
}

fn fetch_kind(pending: &PendingFetch) -> FetchKind {
    if pending.retry {
        return FetchKind::Retry;
    }
    match pending.intent {
        FetchIntent::Initial => FetchKind::Initial,
        FetchIntent::NextPage => FetchKind::NextPage,
        FetchIntent::Escalation => FetchKind::Escalation,
    }
}
