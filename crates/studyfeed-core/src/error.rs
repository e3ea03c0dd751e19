//! Error types for StudyFeed Core

use thiserror::Error;

/// Errors surfaced by a search source.
///
/// Kept `Clone` so the last failure of a feed can be handed to every
/// snapshot observer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    #[error("Upstream error {status_code}: {message}")]
    Upstream { status_code: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Fetch cancelled before completing")]
    Cancelled,
}

impl Error {
    /// Short label used for logs and metric dimensions
    pub fn error_type(&self) -> &'static str {
        match self {
            Error::Upstream { .. } => "upstream",
            Error::Transport(_) => "transport",
            Error::MalformedResponse(_) => "malformed_response",
            Error::Serialization(_) => "serialization",
            Error::Config(_) => "config",
            Error::Internal(_) => "internal",
            Error::Cancelled => "cancelled",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
