//! StudyFeed CLI
//!
//! Command-line browser for the aggregated study material search

mod config;

use anyhow::Context;
use clap::{Parser, Subcommand};
use config::AppConfig;
use std::{path::PathBuf, sync::Arc};
use studyfeed_aggregation::{FeedHandle, FeedSnapshot, SearchFeed, SessionStatus};
use studyfeed_core::{ResultItem, SearchFilters, SearchQuery};
use studyfeed_egress::SearchApiConnector;
use studyfeed_observability::{Metrics, logging};
use tracing::{info, warn};

const DEFAULT_CONFIG_PATH: &str = "~/.studyfeed/config.yaml";

#[derive(Parser)]
#[command(name = "studyfeed")]
#[command(about = "StudyFeed - incremental study material search", long_about = None)]
struct Cli {
    /// Path to a YAML or TOML configuration file
    #[arg(long, global = true, env = "STUDYFEED_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search and page through results as if scrolling the feed
    Search {
        /// Free-text query
        query: String,

        /// Filter by subject
        #[arg(long)]
        subject: Option<String>,

        /// Filter by course
        #[arg(long)]
        course: Option<String>,

        /// Filter by material type
        #[arg(long = "type")]
        material_type: Option<String>,

        /// Filter by tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Stop after this many pages
        #[arg(long, default_value = "5")]
        pages: usize,

        /// Items per page (overrides config)
        #[arg(long)]
        page_size: Option<usize>,

        /// Record the query in the upstream search history
        #[arg(long, default_value = "false")]
        save_history: bool,

        /// Retries per failed fetch
        #[arg(long, default_value = "1")]
        retries: u32,

        /// Print Prometheus metrics when done
        #[arg(long, default_value = "false")]
        metrics: bool,
    },
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Config => {
            if config.upstream.api_token.is_some() {
                config.upstream.api_token = Some("<redacted>".to_string());
            }
            print!("{}", serde_yaml::to_string(&config)?);
        }
        Commands::Search {
            query,
            subject,
            course,
            material_type,
            tags,
            pages,
            page_size,
            save_history,
            retries,
            metrics,
        } => {
            if let Some(page_size) = page_size {
                config.feed.page_size = page_size;
            }
            if save_history {
                config.feed.save_history = true;
            }
            config.validate()?;
            logging::init_logging(&config.logging.level)
                .context("Failed to initialise logging")?;

            let query = SearchQuery::new(query).with_filters(SearchFilters {
                subject,
                course,
                material_type,
                tags,
            });
            let search = BrowseSettings {
                max_pages: pages,
                retries,
                print_metrics: metrics,
            };
            run_search(&config, query, search).await?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<AppConfig> {
    let explicit = path.is_some();
    let path = match path {
        Some(path) => path.to_string_lossy().to_string(),
        None => DEFAULT_CONFIG_PATH.to_string(),
    };
    // Expand tilde in paths
    let path = PathBuf::from(shellexpand::tilde(&path).to_string());

    let mut config = if explicit || path.exists() {
        AppConfig::from_file(&path)?
    } else {
        AppConfig::default()
    };
    config.merge_env();
    Ok(config)
}

struct BrowseSettings {
    max_pages: usize,
    retries: u32,
    print_metrics: bool,
}

async fn run_search(
    config: &AppConfig,
    query: SearchQuery,
    settings: BrowseSettings,
) -> anyhow::Result<()> {
    let connector = SearchApiConnector::new(config.search_api_config())?;
    let metrics = Arc::new(Metrics::new()?);
    let handle = SearchFeed::new(Arc::new(connector), config.feed_options())?
        .with_metrics(Arc::clone(&metrics))
        .spawn();

    info!(query = %query.text, "Starting search");
    handle.set_query(query)?;

    let mut printed = 0;
    let mut retries_left = settings.retries;
    loop {
        let snapshot = handle
            .wait_for(|s| s.status.is_some_and(|status| status != SessionStatus::Fetching))
            .await?;

        for item in &snapshot.items[printed..] {
            print_item(item);
        }
        printed = snapshot.items.len();

        match snapshot.status {
            Some(SessionStatus::Exhausted) => {
                println!("-- end of results ({} items)", printed);
                break;
            }
            Some(SessionStatus::Error) => {
                let reason = snapshot
                    .last_error
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default();
                if retries_left == 0 {
                    println!("-- stopped after error: {}", reason);
                    break;
                }
                retries_left -= 1;
                warn!(error = %reason, "Fetch failed, retrying");
                handle.retry()?;
            }
            _ if snapshot.pages >= settings.max_pages => {
                println!(
                    "-- stopped after {} pages ({} items, more available)",
                    snapshot.pages, printed
                );
                break;
            }
            _ => {
                // Bring the end of the feed into view
                handle.viewport(false)?;
                handle.viewport(true)?;
            }
        }

        wait_for_progress(&handle, &snapshot).await?;
    }

    let last = handle.snapshot();
    if last.used_advanced_search {
        println!(
            "-- includes advanced search results (total reported: {})",
            last.total.unwrap_or(0)
        );
    }
    if settings.print_metrics {
        print!("{}", metrics.gather_text()?);
    }

    handle.shutdown().await?;
    Ok(())
}

/// Wait until the feed issues the fetch requested by the last command
async fn wait_for_progress(handle: &FeedHandle, before: &FeedSnapshot) -> anyhow::Result<()> {
    handle
        .wait_for(|s| s.session != before.session || s.fetches > before.fetches)
        .await?;
    Ok(())
}

fn print_item(item: &ResultItem) {
    match item {
        ResultItem::Primary(material) => match &material.description {
            Some(description) => println!("  {}  [{}]  {}", item.label(), item.id(), description),
            None => println!("  {}  [{}]", item.label(), item.id()),
        },
        ResultItem::Folder(folder) => match folder.item_count {
            Some(count) => println!("  [folder] {} ({} items)  [{}]", item.label(), count, item.id()),
            None => println!("  [folder] {}  [{}]", item.label(), item.id()),
        },
    }
}
