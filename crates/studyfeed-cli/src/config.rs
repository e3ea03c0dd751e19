use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};
use studyfeed_aggregation::FeedOptions;
use studyfeed_egress::{HttpClientConfig, SearchApiConfig};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub feed: FeedConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_search_path")]
    pub search_path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    #[serde(default)]
    pub http: HttpClientConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    #[serde(default = "default_false")]
    pub save_history: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            search_path: default_search_path(),
            api_token: None,
            http: HttpClientConfig::default(),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            debounce_ms: default_debounce_ms(),
            save_history: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl AppConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml::from_str(&contents)
                .with_context(|| format!("Invalid TOML in {}", path.display()))?
        } else {
            // Default to YAML
            serde_yaml::from_str(&contents)
                .with_context(|| format!("Invalid YAML in {}", path.display()))?
        };

        Ok(config)
    }

    /// Merge environment variables into config (env vars take precedence)
    pub fn merge_env(&mut self) {
        if let Ok(val) = std::env::var("STUDYFEED_BASE_URL") {
            self.upstream.base_url = val;
        }

        if let Ok(val) = std::env::var("STUDYFEED_API_TOKEN") {
            self.upstream.api_token = Some(val);
        }

        if let Ok(val) = std::env::var("STUDYFEED_TIMEOUT_SECS") {
            match val.parse::<u64>() {
                Ok(secs) => self.upstream.http.timeout_secs = secs,
                Err(_) => eprintln!("Warning: Invalid STUDYFEED_TIMEOUT_SECS '{}', ignoring", val),
            }
        }

        if let Ok(val) = std::env::var("STUDYFEED_PAGE_SIZE") {
            match val.parse::<usize>() {
                Ok(size) => self.feed.page_size = size,
                Err(_) => eprintln!("Warning: Invalid STUDYFEED_PAGE_SIZE '{}', ignoring", val),
            }
        }

        if let Ok(val) = std::env::var("STUDYFEED_DEBOUNCE_MS") {
            match val.parse::<u64>() {
                Ok(ms) => self.feed.debounce_ms = ms,
                Err(_) => eprintln!("Warning: Invalid STUDYFEED_DEBOUNCE_MS '{}', ignoring", val),
            }
        }

        if let Ok(val) = std::env::var("STUDYFEED_SAVE_HISTORY") {
            if let Ok(enabled) = val.parse::<bool>() {
                self.feed.save_history = enabled;
            }
        }

        if let Ok(val) = std::env::var("STUDYFEED_LOG_LEVEL") {
            self.logging.level = val;
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.upstream.base_url.trim().is_empty() {
            bail!("upstream.base_url must not be empty");
        }
        if self.feed.page_size == 0 {
            bail!("feed.page_size must be at least 1");
        }
        if self.upstream.http.timeout_secs == 0 {
            bail!("upstream.http.timeout_secs must be greater than zero");
        }
        Ok(())
    }

    pub fn feed_options(&self) -> FeedOptions {
        FeedOptions {
            page_size: self.feed.page_size,
            save_history: self.feed.save_history,
            debounce: Duration::from_millis(self.feed.debounce_ms),
        }
    }

    pub fn search_api_config(&self) -> SearchApiConfig {
        let mut config = SearchApiConfig::new(&self.upstream.base_url)
            .with_search_path(&self.upstream.search_path)
            .with_client_config(self.upstream.http.clone());
        if let Some(token) = &self.upstream.api_token {
            config = config.with_api_token(token);
        }
        config
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8080/api".to_string()
}

fn default_search_path() -> String {
    "/search".to_string()
}

fn default_page_size() -> usize {
    10
}

fn default_debounce_ms() -> u64 {
    400
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_false() -> bool {
    false
}
