//! Enrichment functions - join an auction with its items, location and
//! pickup dates into flat output rows

use crate::calculate_bid_ratio;
use crate::ingestion::cache::PickupDateCache;
use crate::ingestion::error::Result;
use crate::ingestion::fetch::fetch_items;
use crate::ingestion::types::{Auction, Item, Location, LocationMap, OutputRow, PickupDates};
use crate::ingestion::utils::{ApiClient, Endpoints};
use tracing::{debug, warn};

/// Separator used when flattening pickup dates into one column
pub const PICKUP_DATE_SEPARATOR: &str = "; ";

/// Build every output row for one auction.
///
/// Resolves pickup dates through the shared cache (fetching them on first
/// sight of the location) and walks all item pages for the auction.
pub async fn build_rows(
    client: &dyn ApiClient,
    endpoints: &Endpoints,
    auction: &Auction,
    locations: &LocationMap,
    pickup_cache: &PickupDateCache,
) -> Result<Vec<OutputRow>> {
    let location = auction.location_id.and_then(|id| locations.get(&id));
    if let (Some(location_id), None) = (auction.location_id, location) {
        warn!(
            "Auction {} has unknown location {}, leaving location fields empty",
            auction.id, location_id
        );
    }

    let pickup_dates = match auction.location_id {
        Some(location_id) => {
            pickup_cache
                .get_or_fetch(client, endpoints, location_id)
                .await?
        }
        None => PickupDates::default(),
    };

    let items = fetch_items(client, endpoints, auction.id).await?;
    debug!("Auction {}: {} items", auction.id, items.len());

    let joined_dates = pickup_dates.join(PICKUP_DATE_SEPARATOR);

    Ok(items
        .into_iter()
        .map(|item| flatten_item(endpoints, auction, location, &joined_dates, item))
        .collect())
}

fn text(value: Option<&Option<String>>) -> String {
    value.cloned().flatten().unwrap_or_default()
}

/// Flatten one item into a row. Pure function - missing fields become
/// empty strings or zero.
pub fn flatten_item(
    endpoints: &Endpoints,
    auction: &Auction,
    location: Option<&Location>,
    pickup_dates: &str,
    item: Item,
) -> OutputRow {
    let current_bid = item.current_bid.unwrap_or(0.0);
    let msrp = item.msrp.unwrap_or(0.0);

    OutputRow {
        auction_id: auction.id,
        auction_number: auction.auction_number.clone().unwrap_or_default(),
        auction_title: auction.title.clone().unwrap_or_default(),
        auction_category: auction.category.clone().unwrap_or_default(),
        auction_start_datetime: auction.start_time.clone().unwrap_or_default(),
        auction_end_datetime: auction.end_time.clone().unwrap_or_default(),
        auction_location_id: auction.location_id,
        auction_location_nickname: text(location.map(|l| &l.nickname)),
        auction_location_address: text(location.map(|l| &l.address)),
        auction_location_city: text(location.map(|l| &l.city)),
        auction_location_state: text(location.map(|l| &l.state)),
        auction_location_zip: text(location.map(|l| &l.zip)),
        pickup_dates: pickup_dates.to_string(),
        item_id: item.id,
        lot_code: item.lot_code.unwrap_or_default(),
        current_bid,
        msrp,
        condition: item.condition.unwrap_or_default(),
        brand: item.brand.unwrap_or_default(),
        item_title: item.title.unwrap_or_default(),
        item_category1: item.category1.unwrap_or_default(),
        item_category2: item.category2.unwrap_or_default(),
        bid_count: item.bid_count.unwrap_or(0),
        ratio_bid_to_msrp: calculate_bid_ratio(current_bid, msrp),
        item_url: endpoints.item_url(auction.id, item.id),
        image_url: item.image_url.unwrap_or_default(),
    }
}
