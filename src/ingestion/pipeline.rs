//! Aggregation driver - fans out one task per auction over a bounded pool
//!
//! Failure policy is fail-fast: the first auction task that errors aborts
//! every remaining task and the error is returned. Rows already appended
//! stay in the sink.

use crate::ingestion::cache::PickupDateCache;
use crate::ingestion::enrich::build_rows;
use crate::ingestion::error::{IngestionError, Result};
use crate::ingestion::fetch::{fetch_auctions, fetch_locations};
use crate::ingestion::types::{Auction, LocationMap, RunStats};
use crate::ingestion::utils::{ApiClient, Endpoints};
use crate::ingestion::write::RowSink;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

/// Default number of auctions processed concurrently
pub const DEFAULT_MAX_WORKERS: usize = 10;

/// Load the location map (single request)
pub async fn load_locations(client: &dyn ApiClient, endpoints: &Endpoints) -> Result<LocationMap> {
    let locations = fetch_locations(client, endpoints).await?;
    info!("Loaded {} locations", locations.len());
    Ok(locations)
}

/// Run the whole pipeline: locations, auctions, then per-auction fan-out
pub async fn run(
    client: Arc<dyn ApiClient>,
    endpoints: Arc<Endpoints>,
    sink: Arc<dyn RowSink>,
    location_ids: &[u64],
    max_workers: usize,
) -> Result<RunStats> {
    let locations = load_locations(client.as_ref(), &endpoints).await?;
    run_with_locations(
        client,
        endpoints,
        sink,
        Arc::new(locations),
        location_ids,
        max_workers,
    )
    .await
}

/// Run the pipeline against an already loaded location map
pub async fn run_with_locations(
    client: Arc<dyn ApiClient>,
    endpoints: Arc<Endpoints>,
    sink: Arc<dyn RowSink>,
    locations: Arc<LocationMap>,
    location_ids: &[u64],
    max_workers: usize,
) -> Result<RunStats> {
    let auctions = fetch_auctions(client.as_ref(), &endpoints, location_ids).await?;
    info!("Found {} total auctions", auctions.len());

    let max_workers = max_workers.max(1);
    let semaphore = Arc::new(Semaphore::new(max_workers));
    let pickup_cache = Arc::new(PickupDateCache::new());
    let mut tasks: JoinSet<Result<RunStats>> = JoinSet::new();

    info!(
        "Fetching items from {} auctions ({} workers)",
        auctions.len(),
        max_workers
    );

    for auction in auctions {
        let client = client.clone();
        let endpoints = endpoints.clone();
        let sink = sink.clone();
        let locations = locations.clone();
        let pickup_cache = pickup_cache.clone();
        let semaphore = semaphore.clone();

        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await?;
            process_auction(
                client.as_ref(),
                &endpoints,
                sink.as_ref(),
                &auction,
                &locations,
                &pickup_cache,
            )
            .await
        });
    }

    // Collect in completion order
    let mut stats = RunStats::default();
    while let Some(joined) = tasks.join_next().await {
        let outcome = joined.map_err(IngestionError::from).and_then(|result| result);
        match outcome {
            Ok(auction_stats) => stats.merge(&auction_stats),
            Err(e) => {
                error!(
                    "Aborting run after {} auctions ({} rows written): {}",
                    stats.auctions, stats.rows, e
                );
                tasks.abort_all();
                return Err(e);
            }
        }
    }

    info!(
        "Data collection completed. {} items processed total.",
        stats.rows
    );

    Ok(stats)
}

/// Build one auction's rows and append them to the sink
async fn process_auction(
    client: &dyn ApiClient,
    endpoints: &Endpoints,
    sink: &dyn RowSink,
    auction: &Auction,
    locations: &LocationMap,
    pickup_cache: &PickupDateCache,
) -> Result<RunStats> {
    let rows = build_rows(client, endpoints, auction, locations, pickup_cache).await?;
    sink.append(&rows).await?;
    debug!("Auction {} wrote {} rows", auction.id, rows.len());
    Ok(RunStats::for_auction(&rows))
}
