//! StudyFeed Egress Connectors
//!
//! This crate provides the connector to the upstream search API:
//! - Shared HTTP client construction
//! - Search API connector implementing [`studyfeed_core::SearchSource`]

pub mod client;
pub mod error;
pub mod search_api;

pub use error::{EgressError, Result};
pub use client::HttpClientConfig;
pub use search_api::{SearchApiConfig, SearchApiConnector};
