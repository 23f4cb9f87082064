//! Error types for the aggregation pipeline

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("HTTP request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP request to {url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("Malformed JSON from {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Auction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Worker pool closed: {0}")]
    PoolClosed(#[from] tokio::sync::AcquireError),

    #[error("Invalid location selection: {0}")]
    InvalidSelection(String),
}

impl IngestionError {
    /// True for network failures and non-success HTTP statuses
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            IngestionError::Transport { .. } | IngestionError::Status { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, IngestionError>;
