//! Fetch functions - retrieve raw records from the marketplace API

use crate::ingestion::error::Result;
use crate::ingestion::types::{Auction, Item, Location, LocationMap};
use crate::ingestion::utils::{decode, ApiClient, Endpoints};
use std::future::Future;
use tracing::{debug, info};

/// Walk pages 1, 2, 3... until one comes back empty.
///
/// Only an empty page ends the walk; short pages do not, and no total
/// count from the server is trusted.
pub async fn fetch_all_pages<T, F, Fut>(mut fetch_page: F) -> Result<Vec<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    let mut all = Vec::new();
    let mut page = 1;

    loop {
        let batch = fetch_page(page).await?;
        if batch.is_empty() {
            break;
        }
        all.extend(batch);
        page += 1;
    }

    Ok(all)
}

/// Fetch every pickup location, keyed by id
pub async fn fetch_locations(client: &dyn ApiClient, endpoints: &Endpoints) -> Result<LocationMap> {
    let url = endpoints.locations();
    info!("Fetching all locations from {}", url);

    let locations: Vec<Location> = decode(&url, client.get_json(&url).await?)?;

    Ok(locations.into_iter().map(|l| (l.id, l)).collect())
}

/// Fetch the full auction listing for the given locations
pub async fn fetch_auctions(
    client: &dyn ApiClient,
    endpoints: &Endpoints,
    location_ids: &[u64],
) -> Result<Vec<Auction>> {
    info!("Collecting auctions for {} locations", location_ids.len());

    fetch_all_pages(move |page| async move {
        let url = endpoints.auctions(location_ids, page);
        let auctions: Vec<Auction> = decode(&url, client.get_json(&url).await?)?;
        debug!("Auction page {}: {} auctions", page, auctions.len());
        Ok(auctions)
    })
    .await
}

/// Fetch all items of one auction, page by page
pub async fn fetch_items(
    client: &dyn ApiClient,
    endpoints: &Endpoints,
    auction_id: u64,
) -> Result<Vec<Item>> {
    fetch_all_pages(move |page| async move {
        let url = endpoints.items(auction_id, page);
        let items: Vec<Item> = decode(&url, client.get_json(&url).await?)?;
        debug!("Auction {} page {}: {} items", auction_id, page, items.len());
        Ok(items)
    })
    .await
}

/// Fetch pickup dates for one location (uncached)
pub async fn fetch_pickup_dates(
    client: &dyn ApiClient,
    endpoints: &Endpoints,
    location_id: u64,
) -> Result<Vec<String>> {
    let url = endpoints.pickup_dates(location_id);
    debug!("Fetching pickup dates for location {}", location_id);

    decode(&url, client.get_json(&url).await?)
}
