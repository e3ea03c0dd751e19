//! Integration tests for the search API connector using wiremock
//!
//! These tests mock the upstream search endpoint to verify the connector's HTTP behavior.

use serde_json::json;
use studyfeed_core::{Error, FetchRequest, SearchQuery, SearchSource};
use studyfeed_egress::{SearchApiConfig, SearchApiConnector};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, header, method, path},
};

fn request(page: u32, exclude_ids: Option<Vec<String>>, include_folders: bool) -> FetchRequest {
    FetchRequest {
        query: SearchQuery::new("genetics"),
        page,
        limit: 10,
        exclude_ids,
        include_folders,
        save_history: false,
    }
}

#[tokio::test]
async fn test_search_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_json(json!({
            "query": "genetics",
            "page": 1,
            "limit": 10,
            "includeFolders": true,
            "saveHistory": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {"kind": "folder", "id": "1", "name": "Mendel"},
                {"kind": "primary", "id": "1", "title": "Punnett squares"}
            ],
            "pagination": {"page": 1, "totalPages": 4, "total": 37, "hasMore": true, "folderHasMore": true},
            "isAdvancedSearch": false
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let connector =
        SearchApiConnector::new(SearchApiConfig::new(mock_server.uri()).with_api_token("test-token"))
            .unwrap();

    let page = connector.search(request(1, None, true)).await.unwrap();
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.page, 1);
    assert_eq!(page.total, 37);
    assert!(page.has_more);
    assert_eq!(page.folder_has_more, Some(true));
}

#[tokio::test]
async fn test_search_sends_exclusions_and_folder_flag() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_json(json!({
            "query": "genetics",
            "page": 2,
            "limit": 10,
            "excludeIds": ["a", "b"],
            "includeFolders": false,
            "saveHistory": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"kind": "primary", "id": "c", "title": "Alleles"}],
            "pagination": {"page": 2, "totalPages": 2, "total": 3, "hasMore": false},
            "isAdvancedSearch": true
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let connector = SearchApiConnector::new(SearchApiConfig::new(mock_server.uri())).unwrap();
    let page = connector
        .search(request(
            2,
            Some(vec!["a".to_string(), "b".to_string()]),
            false,
        ))
        .await
        .unwrap();

    assert!(page.used_advanced_search);
    assert_eq!(page.folder_has_more, None);
}

#[tokio::test]
async fn test_search_server_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let connector = SearchApiConnector::new(SearchApiConfig::new(mock_server.uri())).unwrap();
    let err = connector.search(request(1, None, true)).await.unwrap_err();

    // Exactly one call: the connector does not retry
    assert_eq!(
        err,
        Error::Upstream {
            status_code: 503,
            message: "maintenance".to_string()
        }
    );
}

#[tokio::test]
async fn test_search_malformed_pagination() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [],
            "pagination": {"page": 1, "totalPages": 1, "total": 0}
        })))
        .mount(&mock_server)
        .await;

    let connector = SearchApiConnector::new(SearchApiConfig::new(mock_server.uri())).unwrap();
    let err = connector.search(request(1, None, true)).await.unwrap_err();
    assert!(matches!(err, Error::MalformedResponse(_)));
}

#[tokio::test]
async fn test_search_invalid_json_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&mock_server)
        .await;

    let connector = SearchApiConnector::new(SearchApiConfig::new(mock_server.uri())).unwrap();
    let err = connector.search(request(1, None, true)).await.unwrap_err();
    assert!(matches!(err, Error::MalformedResponse(_)));
}

#[tokio::test]
async fn test_search_connection_refused() {
    // Nothing listens on port 1
    let connector =
        SearchApiConnector::new(SearchApiConfig::new("http://127.0.0.1:1")).unwrap();
    let err = connector.search(request(1, None, true)).await.unwrap_err();
    assert_eq!(err.error_type(), "transport");
}
