//! Common test utilities for integration tests

use serde_json::{Value, json};
use std::{sync::Arc, time::Duration};
use studyfeed_aggregation::{FeedHandle, FeedOptions, FeedSnapshot, SearchFeed};
use studyfeed_egress::{SearchApiConfig, SearchApiConnector};
use studyfeed_observability::Metrics;
use wiremock::MockServer;

/// Debounce short enough to keep real-time tests fast
pub const TEST_DEBOUNCE: Duration = Duration::from_millis(20);

#[allow(dead_code)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("studyfeed=debug")
        .with_test_writer()
        .try_init();
}

/// Primary item objects `{prefix}{n}` for `n` in `range`
pub fn primaries(prefix: &str, range: std::ops::Range<usize>) -> Vec<Value> {
    range
        .map(|i| {
            json!({
                "kind": "primary",
                "id": format!("{}{}", prefix, i),
                "title": format!("Material {}{}", prefix, i),
            })
        })
        .collect()
}

#[allow(dead_code)]
pub fn folder(id: &str, name: &str) -> Value {
    json!({"kind": "folder", "id": id, "name": name, "itemCount": 3})
}

/// Upstream response body for one page
pub fn page_body(
    page: u32,
    items: Vec<Value>,
    has_more: bool,
    folder_has_more: Option<bool>,
    advanced: bool,
) -> Value {
    let mut pagination = json!({
        "page": page,
        "totalPages": if has_more { page + 1 } else { page },
        "total": 57,
        "hasMore": has_more,
    });
    if let Some(folder_has_more) = folder_has_more {
        pagination["folderHasMore"] = json!(folder_has_more);
    }
    json!({
        "items": items,
        "pagination": pagination,
        "isAdvancedSearch": advanced,
    })
}

/// Spawn a feed backed by the HTTP connector pointed at `server`
pub fn spawn_feed(server: &MockServer, metrics: Option<Arc<Metrics>>) -> FeedHandle {
    let connector = SearchApiConnector::new(
        SearchApiConfig::new(server.uri()).with_api_token("integration-token"),
    )
    .expect("connector");
    let options = FeedOptions {
        debounce: TEST_DEBOUNCE,
        ..Default::default()
    };
    let feed = SearchFeed::new(Arc::new(connector), options).expect("feed");
    match metrics {
        Some(metrics) => feed.with_metrics(metrics).spawn(),
        None => feed.spawn(),
    }
}

/// Wait up to five seconds for a snapshot matching `predicate`
pub async fn wait_until(
    handle: &FeedHandle,
    predicate: impl FnMut(&FeedSnapshot) -> bool,
) -> FeedSnapshot {
    tokio::time::timeout(Duration::from_secs(5), handle.wait_for(predicate))
        .await
        .expect("feed did not reach the expected state")
        .expect("feed closed")
}

/// Report the end of the feed coming into view
pub fn scroll_to_end(handle: &FeedHandle) {
    handle.viewport(false).expect("feed closed");
    handle.viewport(true).expect("feed closed");
}
