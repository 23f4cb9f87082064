//! Utility functions for common operations

use crate::ingestion::error::{IngestionError, Result};
use crate::ingestion::types::{Location, LocationMap, Region};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ORIGIN, REFERER};
use reqwest::Client;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Anything that can answer a GET with a JSON document
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// GET `url` and parse the body as JSON.
    /// Non-success statuses are errors.
    async fn get_json(&self, url: &str) -> Result<serde_json::Value>;
}

/// reqwest-backed client shared by every auction task
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(site_base_url: &str, timeout: Duration, max_workers: usize) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );
        if let Ok(origin) = HeaderValue::from_str(site_base_url.trim_end_matches('/')) {
            headers.insert(ORIGIN, origin);
        }
        if let Ok(referer) = HeaderValue::from_str(&format!("{}/", site_base_url.trim_end_matches('/'))) {
            headers.insert(REFERER, referer);
        }

        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(max_workers)
            .default_headers(headers)
            .build()
            .map_err(|source| IngestionError::Transport {
                url: site_base_url.to_string(),
                source,
            })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl ApiClient for HttpClient {
    async fn get_json(&self, url: &str) -> Result<serde_json::Value> {
        debug!("GET {}", url);

        let transport = |source| IngestionError::Transport {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(transport)?;
        let status = response.status();

        if !status.is_success() {
            return Err(IngestionError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(transport)?;
        serde_json::from_str(&body).map_err(|source| IngestionError::Parse {
            url: url.to_string(),
            source,
        })
    }
}

/// Decode a JSON document fetched from `url` into `T`
pub fn decode<T: serde::de::DeserializeOwned>(url: &str, value: serde_json::Value) -> Result<T> {
    serde_json::from_value(value).map_err(|source| IngestionError::Parse {
        url: url.to_string(),
        source,
    })
}

/// Endpoint URL builders for the marketplace API
#[derive(Debug, Clone)]
pub struct Endpoints {
    api_base: String,
    site_base: String,
}

impl Endpoints {
    pub fn new(api_base: &str, site_base: &str) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            site_base: site_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn locations(&self) -> String {
        format!("{}/location/getAllLocations", self.api_base)
    }

    pub fn auctions(&self, location_ids: &[u64], page: u32) -> String {
        let ids = location_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        format!(
            "{}/auction/getAuctions?pageId={}&categories=Categories+-+All&pastAuction=false&selectedLocationIds={}",
            self.api_base, page, ids
        )
    }

    pub fn items(&self, auction_id: u64, page: u32) -> String {
        format!(
            "{}/item/getItemsByAuctionId/{}?pageId={}&auctionId={}",
            self.api_base, auction_id, page, auction_id
        )
    }

    pub fn pickup_dates(&self, location_id: u64) -> String {
        format!(
            "{}/auction/getAuctionPickupDate?categories=Categories%20-%20All&locationIds={}",
            self.api_base, location_id
        )
    }

    /// Public detail page for an item
    pub fn item_url(&self, auction_id: u64, item_id: Option<u64>) -> String {
        let item = item_id.map(|id| id.to_string()).unwrap_or_default();
        format!("{}/{}/item-detail/{}", self.site_base, auction_id, item)
    }
}

/// Region a location belongs to, by its state code
pub fn region_of(location: &Location) -> Option<Region> {
    match location.state.as_deref().map(str::trim) {
        Some("KY") => Some(Region::Kentucky),
        Some("OH") => Some(Region::Ohio),
        // Neighbouring states are listed under neither group
        Some("IN") | Some("TN") | Some("WV") => None,
        _ => Some(Region::Other),
    }
}

/// Group locations by region, each group sorted by city
pub fn group_locations(locations: &LocationMap) -> BTreeMap<Region, Vec<Location>> {
    let mut groups: BTreeMap<Region, Vec<Location>> = BTreeMap::new();

    for location in locations.values() {
        if let Some(region) = region_of(location) {
            groups.entry(region).or_default().push(location.clone());
        }
    }

    for group in groups.values_mut() {
        group.sort_by(|a, b| {
            a.city
                .as_deref()
                .unwrap_or("")
                .cmp(b.city.as_deref().unwrap_or(""))
                .then(a.id.cmp(&b.id))
        });
    }

    groups
}

/// Which locations to aggregate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationSelection {
    Ids(Vec<u64>),
    Regions(Vec<Region>),
}

impl FromStr for LocationSelection {
    type Err = IngestionError;

    fn from_str(s: &str) -> Result<Self> {
        let preset = match s.trim().to_lowercase().as_str() {
            "ky" | "kentucky" => Some(vec![Region::Kentucky]),
            "oh" | "ohio" => Some(vec![Region::Ohio]),
            "ky-oh" | "kentucky-ohio" => Some(vec![Region::Kentucky, Region::Ohio]),
            "other" => Some(vec![Region::Other]),
            _ => None,
        };
        if let Some(regions) = preset {
            return Ok(LocationSelection::Regions(regions));
        }

        let ids = s
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|token| !token.is_empty())
            .map(|token| {
                token
                    .parse::<u64>()
                    .map_err(|_| IngestionError::InvalidSelection(token.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        if ids.is_empty() {
            return Err(IngestionError::InvalidSelection(s.to_string()));
        }

        Ok(LocationSelection::Ids(ids))
    }
}

impl LocationSelection {
    /// Resolve to location ids. Explicit ids pass through unchecked.
    pub fn resolve(&self, locations: &LocationMap) -> Vec<u64> {
        match self {
            LocationSelection::Ids(ids) => ids.clone(),
            LocationSelection::Regions(regions) => {
                let groups = group_locations(locations);
                regions
                    .iter()
                    .filter_map(|region| groups.get(region))
                    .flatten()
                    .map(|location| location.id)
                    .collect()
            }
        }
    }
}
