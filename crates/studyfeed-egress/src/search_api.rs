//! Search API egress connector

use crate::{
    EgressError, Result,
    client::{HttpClientConfig, create_client},
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use studyfeed_core::{FetchRequest, ResultItem, ResultPage, SearchFilters, SearchSource};
use tracing::{debug, instrument, warn};

/// Search API connector configuration
#[derive(Debug, Clone)]
pub struct SearchApiConfig {
    /// Base URL of the materials API (e.g. https://api.example.edu/v1)
    pub base_url: String,

    /// Path of the search endpoint, appended to `base_url`
    pub search_path: String,

    /// Bearer token forwarded as-is when set
    pub api_token: Option<String>,

    /// HTTP client configuration
    pub client_config: HttpClientConfig,
}

impl SearchApiConfig {
    /// Create a new configuration pointing at `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            search_path: "/search".to_string(),
            api_token: None,
            client_config: HttpClientConfig::default(),
        }
    }

    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn with_search_path(mut self, path: impl Into<String>) -> Self {
        self.search_path = path.into();
        self
    }

    pub fn with_client_config(mut self, client_config: HttpClientConfig) -> Self {
        self.client_config = client_config;
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.search_path.trim_start_matches('/')
        )
    }
}

/// Connector issuing search calls against the upstream materials API
pub struct SearchApiConnector {
    config: SearchApiConfig,
    client: Client,
}

impl SearchApiConnector {
    /// Create a new connector
    pub fn new(config: SearchApiConfig) -> Result<Self> {
        if config.base_url.trim().is_empty() {
            return Err(EgressError::ConfigError("base_url is empty".to_string()));
        }
        let client = create_client(&config.client_config)?;
        Ok(Self { config, client })
    }

    /// Issue one search call and decode the page
    #[instrument(skip(self, request), fields(page = request.page, include_folders = request.include_folders))]
    pub async fn send_search(&self, request: &FetchRequest) -> Result<ResultPage> {
        let body = SearchRequestBody::from(request);
        debug!(
            excluded = body.exclude_ids.as_ref().map(Vec::len).unwrap_or(0),
            "Sending search request"
        );

        let mut builder = self.client.post(self.config.endpoint()).json(&body);
        if let Some(token) = &self.config.api_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                EgressError::Timeout(self.config.client_config.timeout_secs)
            } else {
                EgressError::HttpError(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let status_code = status.as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());
            warn!(status_code, "Search request rejected by upstream");
            return Err(EgressError::ProviderError {
                status_code,
                message,
            });
        }

        let bytes = response.bytes().await?;
        let decoded: SearchResponseBody = serde_json::from_slice(&bytes).map_err(|e| {
            EgressError::ParseError(format!("Failed to parse search response: {}", e))
        })?;

        let page = into_result_page(decoded, request.page)?;
        debug!(
            items = page.len(),
            primary = page.primary_count(),
            has_more = page.has_more,
            "Search page received"
        );
        Ok(page)
    }
}

#[async_trait]
impl SearchSource for SearchApiConnector {
    async fn search(&self, request: FetchRequest) -> studyfeed_core::Result<ResultPage> {
        self.send_search(&request).await.map_err(Into::into)
    }

    fn name(&self) -> &str {
        "search-api"
    }
}

/// Request body sent to the search endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchRequestBody {
    query: String,
    page: u32,
    limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    exclude_ids: Option<Vec<String>>,
    include_folders: bool,
    save_history: bool,
    #[serde(skip_serializing_if = "SearchFilters::is_empty")]
    filters: SearchFilters,
}

impl From<&FetchRequest> for SearchRequestBody {
    fn from(request: &FetchRequest) -> Self {
        Self {
            query: request.query.text.clone(),
            page: request.page,
            limit: request.limit,
            // An empty exclusion list is never sent
            exclude_ids: request.exclude_ids.clone().filter(|ids| !ids.is_empty()),
            include_folders: request.include_folders,
            save_history: request.save_history,
            filters: request.query.filters.clone(),
        }
    }
}

/// Response body of the search endpoint.
///
/// Required fields are optional here so that a missing one is reported as a
/// malformed response naming the field instead of being defaulted.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchResponseBody {
    items: Option<Vec<ResultItem>>,
    pagination: Option<WirePagination>,
    #[serde(default)]
    is_advanced_search: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePagination {
    page: Option<u32>,
    total_pages: Option<u32>,
    total: Option<u64>,
    has_more: Option<bool>,
    #[serde(default)]
    folder_has_more: Option<bool>,
}

fn required<T>(value: Option<T>, field: &str) -> Result<T> {
    value.ok_or_else(|| EgressError::MalformedResponse(format!("missing field `{}`", field)))
}

/// Validate a decoded body and turn it into a [`ResultPage`]
pub(crate) fn into_result_page(body: SearchResponseBody, requested_page: u32) -> Result<ResultPage> {
    let items = required(body.items, "items")?;
    let pagination = required(body.pagination, "pagination")?;
    let page = required(pagination.page, "pagination.page")?;
    let total_pages = required(pagination.total_pages, "pagination.totalPages")?;
    let total = required(pagination.total, "pagination.total")?;
    let has_more = required(pagination.has_more, "pagination.hasMore")?;

    if page != requested_page {
        return Err(EgressError::MalformedResponse(format!(
            "requested page {} but upstream answered page {}",
            requested_page, page
        )));
    }

    Ok(ResultPage {
        items,
        page,
        total_pages,
        total,
        has_more,
        used_advanced_search: body.is_advanced_search,
        folder_has_more: pagination.folder_has_more,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use studyfeed_core::{ItemKind, SearchQuery};

    fn fetch_request(page: u32, exclude_ids: Option<Vec<String>>) -> FetchRequest {
        FetchRequest {
            query: SearchQuery::new("photosynthesis"),
            page,
            limit: 10,
            exclude_ids,
            include_folders: true,
            save_history: true,
        }
    }

    fn decode(value: serde_json::Value) -> SearchResponseBody {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_config_builder() {
        let config = SearchApiConfig::new("https://api.example.edu/v1/")
            .with_api_token("token-1")
            .with_search_path("materials/search");

        assert_eq!(config.api_token, Some("token-1".to_string()));
        assert_eq!(
            config.endpoint(),
            "https://api.example.edu/v1/materials/search"
        );
    }

    #[test]
    fn test_connector_rejects_empty_base_url() {
        let result = SearchApiConnector::new(SearchApiConfig::new("  "));
        assert!(matches!(result, Err(EgressError::ConfigError(_))));
    }

    #[test]
    fn test_request_body_omits_empty_exclusions() {
        let body = SearchRequestBody::from(&fetch_request(1, Some(vec![])));
        let value = serde_json::to_value(&body).unwrap();

        assert!(value.get("excludeIds").is_none());
        assert!(value.get("filters").is_none());
        assert_eq!(value["query"], "photosynthesis");
        assert_eq!(value["includeFolders"], true);
        assert_eq!(value["saveHistory"], true);
        assert_eq!(value["limit"], 10);
    }

    #[test]
    fn test_request_body_keeps_exclusion_order() {
        let ids = vec!["b".to_string(), "a".to_string(), "c".to_string()];
        let body = SearchRequestBody::from(&fetch_request(2, Some(ids)));
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["excludeIds"], json!(["b", "a", "c"]));
        assert_eq!(value["page"], 2);
    }

    #[test]
    fn test_request_body_includes_filters() {
        let mut request = fetch_request(1, None);
        request.query.filters.subject = Some("chemistry".to_string());
        let value = serde_json::to_value(SearchRequestBody::from(&request)).unwrap();
        assert_eq!(value["filters"], json!({"subject": "chemistry"}));
    }

    #[test]
    fn test_into_result_page_success() {
        let body = decode(json!({
            "items": [
                {"kind": "folder", "id": "f1", "name": "Revision"},
                {"kind": "primary", "id": "p1", "title": "Light reactions"}
            ],
            "pagination": {"page": 1, "totalPages": 3, "total": 25, "hasMore": true, "folderHasMore": false},
            "isAdvancedSearch": true
        }));

        let page = into_result_page(body, 1).unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].kind(), ItemKind::Folder);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.total, 25);
        assert!(page.has_more);
        assert!(page.used_advanced_search);
        assert_eq!(page.folder_has_more, Some(false));
    }

    #[test]
    fn test_folder_has_more_absent_stays_none() {
        let body = decode(json!({
            "items": [],
            "pagination": {"page": 2, "totalPages": 2, "total": 0, "hasMore": false}
        }));
        let page = into_result_page(body, 2).unwrap();
        assert_eq!(page.folder_has_more, None);
        assert!(!page.used_advanced_search);
    }

    #[test]
    fn test_missing_has_more_is_malformed() {
        let body = decode(json!({
            "items": [],
            "pagination": {"page": 1, "totalPages": 1, "total": 0}
        }));
        let err = into_result_page(body, 1).unwrap_err();
        match err {
            EgressError::MalformedResponse(msg) => assert!(msg.contains("hasMore")),
            other => panic!("expected malformed response, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_pagination_is_malformed() {
        let body = decode(json!({"items": []}));
        assert!(matches!(
            into_result_page(body, 1),
            Err(EgressError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_page_mismatch_is_malformed() {
        let body = decode(json!({
            "items": [],
            "pagination": {"page": 1, "totalPages": 1, "total": 0, "hasMore": false}
        }));
        let err = into_result_page(body, 2).unwrap_err();
        assert!(err.to_string().contains("requested page 2"));
    }
}
