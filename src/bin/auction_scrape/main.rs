//! Auction data collector - fetches listings and writes flattened rows to CSV

use anyhow::{ensure, Context, Result};
use auction_aggregator::ingestion::pipeline::{self, DEFAULT_MAX_WORKERS};
use auction_aggregator::ingestion::utils::{ApiClient, Endpoints, HttpClient, LocationSelection};
use auction_aggregator::ingestion::write::CsvSink;
use chrono::Local;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .init();

    info!("Starting auction data collection");

    let config = Config::from_env()?;
    info!("Configuration loaded");

    // Location selection from command line args, else from the environment
    let args: Vec<String> = env::args().skip(1).collect();
    let selection_text = if args.is_empty() {
        config.location_selection.clone()
    } else {
        args.join(",")
    };
    let selection: LocationSelection = selection_text
        .parse()
        .with_context(|| format!("Invalid location selection '{}'", selection_text))?;

    let endpoints = Arc::new(Endpoints::new(
        &config.api_base_url,
        &config.site_base_url,
    ));
    let client: Arc<dyn ApiClient> = Arc::new(HttpClient::new(
        &config.site_base_url,
        config.request_timeout,
        config.max_workers,
    )?);

    // Step 1: Locations
    info!("Step 1/3: Fetching all locations information...");
    let locations = pipeline::load_locations(client.as_ref(), &endpoints).await?;
    info!("✓ Loaded {} locations", locations.len());

    if let LocationSelection::Regions(regions) = &selection {
        let names: Vec<String> = regions.iter().map(|r| r.to_string()).collect();
        info!("Selected regions: {}", names.join(", "));
    }
    let location_ids = selection.resolve(&locations);
    if location_ids.is_empty() {
        warn!("Selection '{}' matched no locations, nothing to do", selection_text);
        return Ok(());
    }
    for id in location_ids.iter().filter(|id| !locations.contains_key(*id)) {
        warn!("Location {} is not in the location list", id);
    }

    // Step 2: Sink
    let csv_path = config.output_dir.join(format!(
        "auction_data_{}.csv",
        Local::now().format("%Y-%m-%d_%H-%M-%S")
    ));
    info!("Step 2/3: Opening output {:?}...", csv_path);
    let sink = Arc::new(CsvSink::open(&csv_path)?);

    // Step 3: Auctions and items
    info!(
        "Step 3/3: Collecting auctions for {} locations...",
        location_ids.len()
    );
    let result = pipeline::run_with_locations(
        client,
        endpoints,
        sink.clone(),
        Arc::new(locations),
        &location_ids,
        config.max_workers,
    )
    .await;

    match result {
        Ok(stats) => {
            info!("✓ Data collection completed: {}", stats);
            info!("✓ Rows written to {:?}", sink.path());
            Ok(())
        }
        Err(e) => {
            error!(
                "✗ Data collection failed: {} (rows written so far are kept in {:?})",
                e,
                sink.path()
            );
            Err(e.into())
        }
    }
}

/// Configuration loaded from environment variables
#[derive(Debug, Clone)]
struct Config {
    api_base_url: String,
    site_base_url: String,
    output_dir: PathBuf,
    location_selection: String,
    max_workers: usize,
    request_timeout: Duration,
}

impl Config {
    fn from_env() -> Result<Self> {
        Ok(Config {
            api_base_url: env::var("AUCTION_API_BASE_URL")
                .unwrap_or_else(|_| "https://auction.bidfta.io/api".to_string()),

            site_base_url: env::var("AUCTION_SITE_BASE_URL")
                .unwrap_or_else(|_| "https://www.bidfta.com".to_string()),

            output_dir: env::var("OUTPUT_DIR")
                .unwrap_or_else(|_| "./data".to_string())
                .into(),

            location_selection: env::var("LOCATION_IDS")
                .unwrap_or_else(|_| "637,4,345,515,2,520,24,581,25,21,374".to_string()),

            max_workers: match env::var("MAX_WORKERS") {
                Ok(raw) => parse_max_workers(&raw)?,
                Err(_) => DEFAULT_MAX_WORKERS,
            },

            request_timeout: Duration::from_secs(
                env::var("REQUEST_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .context("REQUEST_TIMEOUT_SECS must be a number of seconds")?,
            ),
        })
    }
}

fn parse_max_workers(raw: &str) -> Result<usize> {
    let max_workers: usize = raw
        .trim()
        .parse()
        .context("MAX_WORKERS must be a positive integer")?;
    ensure!(max_workers > 0, "MAX_WORKERS must be a positive integer, got 0");
    Ok(max_workers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_max_workers() {
        assert_eq!(parse_max_workers("4").unwrap(), 4);
        assert_eq!(parse_max_workers(" 12 ").unwrap(), 12);
        assert!(parse_max_workers("0").is_err());
        assert!(parse_max_workers("-1").is_err());
        assert!(parse_max_workers("many").is_err());
    }
}
