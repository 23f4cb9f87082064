//! Pickup-date cache shared by all auction tasks of a run

use crate::ingestion::error::{IngestionError, Result};
use crate::ingestion::fetch::fetch_pickup_dates;
use crate::ingestion::types::PickupDates;
use crate::ingestion::utils::{ApiClient, Endpoints};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

/// Memoizing lookup of pickup dates by location id.
///
/// Each location gets its own once-cell, so concurrent first callers for
/// the same id wait on a single fetch instead of racing. A failed fetch
/// leaves the cell empty and the next caller tries again.
#[derive(Default)]
pub struct PickupDateCache {
    entries: Mutex<HashMap<u64, Arc<OnceCell<PickupDates>>>>,
}

impl PickupDateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_fetch(
        &self,
        client: &dyn ApiClient,
        endpoints: &Endpoints,
        location_id: u64,
    ) -> Result<PickupDates> {
        // Map lock is only held long enough to find or insert the cell
        let cell = {
            let mut entries = self.entries.lock().await;
            entries.entry(location_id).or_default().clone()
        };

        let dates = cell
            .get_or_try_init(|| async {
                let dates = fetch_pickup_dates(client, endpoints, location_id).await?;
                debug!(
                    "Cached {} pickup dates for location {}",
                    dates.len(),
                    location_id
                );
                Ok::<_, IngestionError>(Arc::new(dates))
            })
            .await?;

        Ok(dates.clone())
    }

    /// Number of locations with a resolved value
    pub async fn len(&self) -> usize {
        let entries = self.entries.lock().await;
        entries.values().filter(|cell| cell.initialized()).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::testing::{endpoints, FakeApi};
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_access_fetches_once() {
        let endpoints = Arc::new(endpoints());
        let api = Arc::new(
            FakeApi::new()
                .with(
                    &endpoints.pickup_dates(5),
                    json!(["2024-05-06", "2024-05-07"]),
                )
                .with_latency(Duration::from_millis(25)),
        );
        let cache = Arc::new(PickupDateCache::new());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let (api, endpoints, cache) = (api.clone(), endpoints.clone(), cache.clone());
            handles.push(tokio::spawn(async move {
                cache.get_or_fetch(&*api, &endpoints, 5).await
            }));
        }

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(api.calls(&endpoints.pickup_dates(5)), 1);
        for dates in &results {
            assert_eq!(dates.as_slice(), ["2024-05-06", "2024-05-07"]);
        }
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_distinct_locations_fetched_separately() {
        let endpoints = endpoints();
        let api = FakeApi::new()
            .with(&endpoints.pickup_dates(1), json!(["2024-01-01"]))
            .with(&endpoints.pickup_dates(2), json!([]));
        let cache = PickupDateCache::new();

        let first = cache.get_or_fetch(&api, &endpoints, 1).await.unwrap();
        let second = cache.get_or_fetch(&api, &endpoints, 2).await.unwrap();
        let again = cache.get_or_fetch(&api, &endpoints, 1).await.unwrap();

        assert_eq!(first.as_slice(), ["2024-01-01"]);
        assert!(second.is_empty());
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(api.total_calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_cached() {
        let endpoints = endpoints();
        let api = FakeApi::new().failing(&endpoints.pickup_dates(9), 500);
        let cache = PickupDateCache::new();

        assert!(cache.get_or_fetch(&api, &endpoints, 9).await.is_err());
        assert!(cache.get_or_fetch(&api, &endpoints, 9).await.is_err());

        assert_eq!(api.calls(&endpoints.pickup_dates(9)), 2);
        assert!(cache.is_empty().await);
    }
}
