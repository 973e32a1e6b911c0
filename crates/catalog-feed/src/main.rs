//! Catalog feed CLI: drives the paging controllers against a read API.

use anyhow::{Context, Result};
use catalog_feed::{
    json_item_key, ApiClient, Debouncer, EpochCounter, FetchOutcome, FilterQueryController,
    HttpPageSource, HttpQuerySource, PageSource, PagedFetchController, Tagged,
};
use clap::{Parser, Subcommand};
use serde_json::Value;
use shared::{Config, LogConfig, MediaFilters, MediaSeason, MediaType};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Read API base URL (overrides [feed].base_url)
    #[arg(long)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Page through a browse category
    Browse {
        /// ANIME or MANGA
        #[arg(long = "type", default_value = "ANIME")]
        media_type: String,

        /// trending, top, airing, upcoming or season
        #[arg(long, default_value = "trending")]
        category: String,

        /// Stop after this many pages
        #[arg(long, default_value_t = 3)]
        pages: u32,
    },

    /// Page through a filtered listing
    Filter {
        #[arg(long = "type", default_value = "ANIME")]
        media_type: String,
        #[arg(long)]
        genre: Option<String>,
        #[arg(long)]
        format: Option<String>,
        #[arg(long)]
        status: Option<String>,
        /// WINTER, SPRING, SUMMER or FALL
        #[arg(long)]
        season: Option<String>,
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        sort: Option<String>,
        #[arg(long, default_value_t = 3)]
        pages: u32,
    },

    /// Debounced quick search, one query per stdin line
    Search,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    if let Some(base_url) = args.base_url {
        config.feed.base_url = base_url;
    }

    // Initialize logging
    shared::logging::init(LogConfig::for_component(
        "catalog-feed",
        &config.logging,
        args.verbose,
    ))?;

    info!(base_url = %config.feed.base_url, "Catalog feed starting");

    let client = ApiClient::from_config(&config.feed).context("Failed to create API client")?;

    match args.command {
        Command::Browse {
            media_type,
            category,
            pages,
        } => browse(client, &config, &media_type, &category, pages).await,
        Command::Filter {
            media_type,
            genre,
            format,
            status,
            season,
            year,
            sort,
            pages,
        } => {
            let season = season
                .map(|s| s.to_uppercase().parse::<MediaSeason>())
                .transpose()?;
            let filters = MediaFilters {
                genre,
                format,
                status,
                season,
                year,
                sort,
            };
            filter(client, &config, &media_type, filters, pages).await
        }
        Command::Search => search(client, &config).await,
    }
}

/// Load the first page up front, then let the controller take over
async fn browse(
    client: ApiClient,
    config: &Config,
    media_type: &str,
    category: &str,
    pages: u32,
) -> Result<()> {
    let media_type = MediaType::from_param(Some(media_type.to_uppercase().as_str()));
    let source = HttpPageSource::browse(client, media_type, category);

    let first = source
        .fetch_page(1)
        .await
        .context("Failed to load first page")?;
    let has_more = first.has_next();

    let mut controller = PagedFetchController::keyed(source, first.results, has_more, json_item_key);
    if let Some(timeout) = config.feed.fetch_timeout() {
        controller = controller.with_fetch_timeout(timeout);
    }

    while controller.current_page() < pages {
        if !keep_paging(controller.request_more().await) {
            break;
        }
    }

    info!(
        pages = controller.current_page(),
        items = controller.len(),
        exhausted = controller.is_exhausted(),
        "Browse finished"
    );
    controller.with_items(print_items);
    Ok(())
}

async fn filter(
    client: ApiClient,
    config: &Config,
    media_type: &str,
    filters: MediaFilters,
    pages: u32,
) -> Result<()> {
    let media_type = MediaType::from_param(Some(media_type.to_uppercase().as_str()));
    let source = HttpQuerySource::new(client, media_type);

    let mut controller = FilterQueryController::keyed(source, filters, json_item_key);
    if let Some(timeout) = config.feed.fetch_timeout() {
        controller = controller.with_fetch_timeout(timeout);
    }

    if keep_paging(controller.mount().await) {
        while controller.sequence().current_page() < pages {
            if !keep_paging(controller.request_more().await) {
                break;
            }
        }
    }

    let sequence = controller.sequence();
    info!(
        filters = ?controller.filters(),
        pages = sequence.current_page(),
        items = sequence.len(),
        total = ?sequence.total(),
        "Filter listing finished"
    );
    sequence.with_items(print_items);
    Ok(())
}

/// Debounce stdin lines into searches, printing only current results
async fn search(client: ApiClient, config: &Config) -> Result<()> {
    let epochs = Arc::new(EpochCounter::new());

    let debouncer = Debouncer::new(config.feed.debounce(), move |text: String| {
        let epoch = epochs.advance();
        let epochs = Arc::clone(&epochs);
        let client = client.clone();
        async move {
            let result = client.search(&text).await;
            match epochs.accept(Tagged::new(epoch, result)) {
                None => debug!(query = %text, epoch = %epoch, "Dropping stale search results"),
                Some(Ok(response)) => {
                    if let Some(error) = response.error {
                        warn!(query = %text, error = %error, "Search rejected");
                    }
                    println!("-- {} ({} hits)", text, response.results.len());
                    for hit in response.results {
                        println!("{:>9}  {:<9}  {}", hit.id, format!("{:?}", hit.kind).to_lowercase(), hit.title);
                    }
                }
                Some(Err(e)) => warn!(query = %text, error = %e, "Search failed"),
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        debouncer.push(line.trim().to_string());
    }
    debouncer.finish().await;

    Ok(())
}

/// Whether another `request_more` is worth issuing
fn keep_paging(outcome: FetchOutcome) -> bool {
    match outcome {
        FetchOutcome::Merged { page, added, .. } => {
            debug!(page, added, "Page merged");
            true
        }
        FetchOutcome::Skipped(reason) => {
            debug!(reason = ?reason, "Paging stopped");
            false
        }
        FetchOutcome::Failed(e) => {
            if let Some(retry_after) = e.retry_after() {
                warn!(retry_after_secs = retry_after.as_secs(), "Rate limited, stopping");
            }
            false
        }
        FetchOutcome::Stale => false,
    }
}

fn print_items(items: &[Value]) {
    for item in items {
        println!("{:>9}  {}", json_item_key(item), display_title(item));
    }
}

/// Best human-readable name of a media, character, staff or studio item
fn display_title(item: &Value) -> String {
    let candidates = [
        &item["title"]["english"],
        &item["title"]["romaji"],
        &item["title"],
        &item["name"]["full"],
        &item["name"],
        &item["media"]["title"]["romaji"],
    ];
    candidates
        .iter()
        .find_map(|v| v.as_str())
        .unwrap_or("?")
        .to_string()
}
