//! Data ingestion module - concurrent aggregation pipeline for auction listings

pub mod cache;
pub mod enrich;
pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod types;
pub mod utils;
pub mod write;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{IngestionError, Result};
pub use types::*;
