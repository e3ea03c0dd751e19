//! End-to-end integration tests for StudyFeed
//!
//! These tests wire the search feed to the HTTP connector and run it against
//! a mocked upstream to verify the full pagination flow.

#[cfg(test)]
mod e2e_tests {
    use serde_json::json;
    use std::{sync::Arc, time::Duration};
    use studyfeed_aggregation::{FeedOptions, SearchFeed, SessionStatus};
    use studyfeed_core::SearchQuery;
    use studyfeed_egress::{SearchApiConfig, SearchApiConnector};
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    #[tokio::test]
    async fn test_e2e_empty_results_exhaust_without_escalation() {
        let mock_server = MockServer::start().await;

        // Only the first page may be requested
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [],
                "pagination": {"page": 1, "totalPages": 0, "total": 0, "hasMore": false},
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let connector = SearchApiConnector::new(SearchApiConfig::new(mock_server.uri())).unwrap();
        let handle = SearchFeed::new(Arc::new(connector), FeedOptions::default())
            .unwrap()
            .spawn();

        handle.set_query(SearchQuery::new("quantum basket weaving")).unwrap();
        let snapshot = tokio::time::timeout(
            Duration::from_secs(5),
            handle.wait_for(|s| s.status == Some(SessionStatus::Exhausted)),
        )
        .await
        .unwrap()
        .unwrap();

        assert!(snapshot.items.is_empty());
        assert!(!snapshot.has_more);
        assert_eq!(snapshot.total, Some(0));

        // Scrolling an exhausted feed never reaches the upstream again
        handle.viewport(true).unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;
        handle.shutdown().await.unwrap();
    }
}
