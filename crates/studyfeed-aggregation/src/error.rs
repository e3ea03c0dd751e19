//! Error types for the search feed

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Invalid feed options: {0}")]
    InvalidOptions(String),

    #[error("Feed task has shut down")]
    Closed,
}

pub type Result<T> = std::result::Result<T, FeedError>;
