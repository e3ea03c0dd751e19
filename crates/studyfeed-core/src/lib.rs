//! StudyFeed Core Types and Traits
//!
//! This crate provides the fundamental types and traits used throughout StudyFeed:
//! - Search query, result item and result page types
//! - The upstream search source trait
//! - Core error types

pub mod error;
pub mod model;
pub mod source;

pub use error::{Error, Result};
pub use model::{
    FetchRequest, FolderItem, ItemKind, PrimaryItem, ResultItem, ResultPage, SearchFilters,
    SearchQuery,
};
pub use source::SearchSource;
