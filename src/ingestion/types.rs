//! Core data types for the aggregation pipeline
//! Pure data structures with no behavior

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Pickup dates for one location, shared across auction tasks
pub type PickupDates = Arc<Vec<String>>;

/// Locations keyed by id, loaded once per run
pub type LocationMap = HashMap<u64, Location>;

/// Accept a string, a number or null for free-text fields.
/// The marketplace is not consistent about e.g. zip codes and auction numbers.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

/// Pickup location
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: u64,
    #[serde(default, rename = "nickName", deserialize_with = "lenient_text")]
    pub nickname: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub zip: Option<String>,
}

/// Auction record from the paginated listing
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Auction {
    pub id: u64,
    #[serde(default, deserialize_with = "lenient_text")]
    pub auction_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub category: Option<String>,
    #[serde(default)]
    pub location_id: Option<u64>,
    #[serde(default, rename = "utcStartDateTime", deserialize_with = "lenient_text")]
    pub start_time: Option<String>,
    #[serde(default, rename = "utcEndDateTime", deserialize_with = "lenient_text")]
    pub end_time: Option<String>,
}

/// Single lot within an auction
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub lot_code: Option<String>,
    #[serde(default)]
    pub current_bid: Option<f64>,
    #[serde(default)]
    pub msrp: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub condition: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub brand: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub category1: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub category2: Option<String>,
    #[serde(default, rename = "bidsCount")]
    pub bid_count: Option<i64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub image_url: Option<String>,
}

/// Column order of the CSV output
pub const OUTPUT_FIELDS: [&str; 25] = [
    "auction_id",
    "auction_number",
    "auction_title",
    "auction_category",
    "auction_start_datetime",
    "auction_end_datetime",
    "auction_location_id",
    "auction_location_nickname",
    "auction_location_address",
    "auction_location_city",
    "auction_location_state",
    "auction_location_zip",
    "pickup_dates",
    "item_id",
    "lot_code",
    "current_bid",
    "msrp",
    "condition",
    "brand",
    "item_title",
    "item_category1",
    "item_category2",
    "bid_count",
    "ratio_bid_to_msrp",
    "item_url",
];

/// Flattened item + auction + location + pickup dates.
/// Field order matches `OUTPUT_FIELDS`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputRow {
    pub auction_id: u64,
    pub auction_number: String,
    pub auction_title: String,
    pub auction_category: String,
    pub auction_start_datetime: String,
    pub auction_end_datetime: String,
    pub auction_location_id: Option<u64>,
    pub auction_location_nickname: String,
    pub auction_location_address: String,
    pub auction_location_city: String,
    pub auction_location_state: String,
    pub auction_location_zip: String,
    pub pickup_dates: String,
    pub item_id: Option<u64>,
    pub lot_code: String,
    pub current_bid: f64,
    pub msrp: f64,
    pub condition: String,
    pub brand: String,
    pub item_title: String,
    pub item_category1: String,
    pub item_category2: String,
    pub bid_count: i64,
    pub ratio_bid_to_msrp: f64,
    pub item_url: String,

    // Kept for in-memory consumers, not part of the file schema
    #[serde(skip_serializing)]
    pub image_url: String,
}

/// Location groups used for quick selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Region {
    Kentucky,
    Ohio,
    Other,
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Region::Kentucky => write!(f, "Kentucky"),
            Region::Ohio => write!(f, "Ohio"),
            Region::Other => write!(f, "All Other States"),
        }
    }
}

/// Aggregation run statistics
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunStats {
    pub auctions: usize,
    pub rows: usize,
    pub msrp_total: f64,
    pub bid_total: f64,
    pub ratio_total: f64,
    /// Rows with a positive bid/MSRP ratio
    pub ratio_rows: usize,
}

impl RunStats {
    /// Stats for a single processed auction
    pub fn for_auction(rows: &[OutputRow]) -> Self {
        let mut stats = RunStats {
            auctions: 1,
            rows: rows.len(),
            ..Default::default()
        };
        for row in rows {
            stats.msrp_total += row.msrp;
            stats.bid_total += row.current_bid;
            if row.ratio_bid_to_msrp > 0.0 {
                stats.ratio_total += row.ratio_bid_to_msrp;
                stats.ratio_rows += 1;
            }
        }
        stats
    }

    pub fn merge(&mut self, other: &RunStats) {
        self.auctions += other.auctions;
        self.rows += other.rows;
        self.msrp_total += other.msrp_total;
        self.bid_total += other.bid_total;
        self.ratio_total += other.ratio_total;
        self.ratio_rows += other.ratio_rows;
    }

    pub fn average_msrp(&self) -> Option<f64> {
        (self.rows > 0).then(|| self.msrp_total / self.rows as f64)
    }

    pub fn average_bid(&self) -> Option<f64> {
        (self.rows > 0).then(|| self.bid_total / self.rows as f64)
    }

    pub fn average_ratio(&self) -> Option<f64> {
        (self.ratio_rows > 0).then(|| self.ratio_total / self.ratio_rows as f64)
    }
}

impl std::fmt::Display for RunStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "auctions: {}, items: {}, avg msrp: ${:.2}, avg bid: ${:.2}, avg bid/msrp: {:.1}%",
            self.auctions,
            self.rows,
            self.average_msrp().unwrap_or(0.0),
            self.average_bid().unwrap_or(0.0),
            self.average_ratio().unwrap_or(0.0) * 100.0
        )
    }
}
