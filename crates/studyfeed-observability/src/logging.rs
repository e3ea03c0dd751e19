//! Structured logging setup

use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Map a configured level name to a tracing level, defaulting to INFO
pub fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Build the filter for the configured level.
///
/// `RUST_LOG`, when set and valid, takes precedence over `level`.
pub fn build_filter(level: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    let mut filter = EnvFilter::new(parse_level(level).to_string().to_lowercase());

    // Connection pool chatter is noise at debug level
    match "hyper_util=warn".parse() {
        Ok(directive) => filter = filter.add_directive(directive),
        Err(e) => tracing::warn!("Failed to set hyper_util log filter: {}", e),
    }

    filter
}

/// Install the global tracing subscriber
pub fn init_logging(level: &str) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(build_filter(level))
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
}
