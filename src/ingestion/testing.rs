//! Scripted API client for unit tests

use crate::ingestion::error::{IngestionError, Result};
use crate::ingestion::utils::{ApiClient, Endpoints};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn endpoints() -> Endpoints {
    Endpoints::new("http://api.test/api", "http://site.test")
}

/// Serves canned JSON per URL and counts every request.
/// Unknown URLs answer 404. Also records the highest number of requests
/// in flight at once.
#[derive(Default)]
pub struct FakeApi {
    responses: HashMap<String, Value>,
    failures: HashMap<String, u16>,
    latency: Option<Duration>,
    calls: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, body: Value) -> Self {
        self.responses.insert(url.to_string(), body);
        self
    }

    /// Register pages 1..=n and a trailing empty page n+1
    pub fn with_pages(mut self, url_for: impl Fn(u32) -> String, pages: Vec<Value>) -> Self {
        let count = pages.len() as u32;
        for (idx, page) in pages.into_iter().enumerate() {
            self.responses.insert(url_for(idx as u32 + 1), page);
        }
        self.responses.insert(url_for(count + 1), json!([]));
        self
    }

    pub fn failing(mut self, url: &str, status: u16) -> Self {
        self.failures.insert(url.to_string(), status);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    async fn respond(&self, url: &str) -> Result<Value> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if let Some(status) = self.failures.get(url) {
            return Err(IngestionError::Status {
                url: url.to_string(),
                status: *status,
            });
        }

        self.responses
            .get(url)
            .cloned()
            .ok_or_else(|| IngestionError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}

#[async_trait]
impl ApiClient for FakeApi {
    async fn get_json(&self, url: &str) -> Result<Value> {
        *self.calls.lock().unwrap().entry(url.to_string()).or_insert(0) += 1;

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        let result = self.respond(url).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        result
    }
}
