//! Error types for egress connectors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EgressError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Upstream error {status_code}: {message}")]
    ProviderError { status_code: u16, message: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Request timeout after {0}s")]
    Timeout(u64),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

pub type Result<T> = std::result::Result<T, EgressError>;

impl From<EgressError> for studyfeed_core::Error {
    fn from(err: EgressError) -> Self {
        match err {
            EgressError::HttpError(e) => studyfeed_core::Error::Transport(e.to_string()),
            EgressError::ProviderError {
                status_code,
                message,
            } => studyfeed_core::Error::Upstream {
                status_code,
                message,
            },
            EgressError::ParseError(msg) | EgressError::MalformedResponse(msg) => {
                studyfeed_core::Error::MalformedResponse(msg)
            }
            EgressError::Timeout(secs) => {
                studyfeed_core::Error::Transport(format!("request timeout after {}s", secs))
            }
            EgressError::ConfigError(msg) => studyfeed_core::Error::Config(msg),
        }
    }
}
