//! Metrics collection with Prometheus
//!
//! This module provides Prometheus metrics for the search feed:
//! - Session counts
//! - Fetch counts by kind (initial, next page, escalation, retry) and failures by error type
//! - Escalation probes and stale responses discarded after a query change
//! - Items appended to feeds and duplicates dropped
//! - Fetch latency

use prometheus::{Counter, CounterVec, Encoder, Histogram, HistogramOpts, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Metrics collector for StudyFeed
#[derive(Clone)]
pub struct Metrics {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Query sessions started
    pub sessions_total: Counter,
    /// Fetches issued, by kind
    pub fetches_total: CounterVec,
    /// Failed fetches, by error type
    pub fetch_failures_total: CounterVec,
    /// Escalation probes issued
    pub escalations_total: Counter,
    /// Responses discarded because their session was replaced
    pub stale_responses_total: Counter,
    /// Items appended to feeds, by item kind
    pub items_appended_total: CounterVec,
    /// Primary items dropped because they were already in the feed
    pub duplicates_dropped_total: Counter,
    /// Upstream fetch duration
    pub fetch_duration_seconds: Histogram,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let sessions_total = Counter::with_opts(Opts::new(
            "studyfeed_sessions_total",
            "Total number of query sessions started",
        ))?;

        let fetches_total = CounterVec::new(
            Opts::new("studyfeed_fetches_total", "Total number of upstream fetches issued"),
            &["kind"],
        )?;

        let fetch_failures_total = CounterVec::new(
            Opts::new(
                "studyfeed_fetch_failures_total",
                "Total number of failed upstream fetches",
            ),
            &["error_type"],
        )?;

        let escalations_total = Counter::with_opts(Opts::new(
            "studyfeed_escalations_total",
            "Total number of advanced search escalation probes",
        ))?;

        let stale_responses_total = Counter::with_opts(Opts::new(
            "studyfeed_stale_responses_total",
            "Responses discarded because the query changed while in flight",
        ))?;

        let items_appended_total = CounterVec::new(
            Opts::new(
                "studyfeed_items_appended_total",
                "Total number of items appended to search feeds",
            ),
            &["kind"],
        )?;

        let duplicates_dropped_total = Counter::with_opts(Opts::new(
            "studyfeed_duplicates_dropped_total",
            "Primary items dropped because they were already in the feed",
        ))?;

        let fetch_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "studyfeed_fetch_duration_seconds",
                "Upstream search fetch duration in seconds",
            )
            .buckets(vec![0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        )?;

        registry.register(Box::new(sessions_total.clone()))?;
        registry.register(Box::new(fetches_total.clone()))?;
        registry.register(Box::new(fetch_failures_total.clone()))?;
        registry.register(Box::new(escalations_total.clone()))?;
        registry.register(Box::new(stale_responses_total.clone()))?;
        registry.register(Box::new(items_appended_total.clone()))?;
        registry.register(Box::new(duplicates_dropped_total.clone()))?;
        registry.register(Box::new(fetch_duration_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            sessions_total,
            fetches_total,
            fetch_failures_total,
            escalations_total,
            stale_responses_total,
            items_appended_total,
            duplicates_dropped_total,
            fetch_duration_seconds,
        })
    }

    pub fn record_session_started(&self) {
        self.sessions_total.inc();
    }

    /// Record that a fetch of the given kind was issued
    pub fn record_fetch_issued(&self, kind: FetchKind) {
        self.fetches_total.with_label_values(&[kind.as_str()]).inc();
        if kind == FetchKind::Escalation {
            self.escalations_total.inc();
        }
    }

    /// Record a successful fetch and what it contributed to the feed
    pub fn record_fetch_success(
        &self,
        duration_secs: f64,
        primary_appended: usize,
        folders_appended: usize,
        duplicates_dropped: usize,
    ) {
        self.fetch_duration_seconds.observe(duration_secs);
        self.items_appended_total
            .with_label_values(&["primary"])
            .inc_by(primary_appended as f64);
        self.items_appended_total
            .with_label_values(&["folder"])
            .inc_by(folders_appended as f64);
        self.duplicates_dropped_total
            .inc_by(duplicates_dropped as f64);
    }

    /// Record a failed fetch
    pub fn record_fetch_failure(&self, error_type: &str, duration_secs: f64) {
        self.fetch_duration_seconds.observe(duration_secs);
        self.fetch_failures_total
            .with_label_values(&[error_type])
            .inc();
    }

    pub fn record_stale_response(&self) {
        self.stale_responses_total.inc();
    }

    /// Render all metrics in the Prometheus text exposition format
    pub fn gather_text(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Kind of upstream fetch, used as a metric label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    /// First page of a session
    Initial,
    /// Regular next page
    NextPage,
    /// One-shot advanced search probe
    Escalation,
    /// Consumer-initiated retry of a failed fetch
    Retry,
}

impl FetchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::NextPage => "next_page",
            Self::Escalation => "escalation",
            Self::Retry => "retry",
        }
    }
}
