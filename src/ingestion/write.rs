//! Write functions - append flattened rows to a CSV file or memory

use crate::ingestion::error::Result;
use crate::ingestion::types::{OutputRow, OUTPUT_FIELDS};
use async_trait::async_trait;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Append-only row destination, shared by all auction tasks
#[async_trait]
pub trait RowSink: Send + Sync {
    /// Append one batch of rows. Batches from concurrent callers never interleave.
    async fn append(&self, rows: &[OutputRow]) -> Result<()>;
}

/// CSV file sink. Writes the header only when the file is new.
pub struct CsvSink {
    path: PathBuf,
    writer: Mutex<csv::Writer<File>>,
}

impl CsvSink {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let write_header = !path.exists();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        // Header goes out on open so a run with no rows still leaves a valid file
        if write_header {
            writer.write_record(OUTPUT_FIELDS)?;
            writer.flush()?;
        }

        info!(
            "Writing rows to {:?} ({})",
            path,
            if write_header { "new file" } else { "appending" }
        );

        Ok(Self {
            path,
            writer: Mutex::new(writer),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RowSink for CsvSink {
    async fn append(&self, rows: &[OutputRow]) -> Result<()> {
        let mut writer = self.writer.lock().await;
        for row in rows {
            writer.serialize(row)?;
        }
        // Flush per batch so an aborted run leaves complete rows on disk
        writer.flush()?;
        debug!("Appended {} rows to {:?}", rows.len(), self.path);
        Ok(())
    }
}

/// In-memory table sink
#[derive(Default)]
pub struct MemorySink {
    rows: Mutex<Vec<OutputRow>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every row appended so far
    pub async fn rows(&self) -> Vec<OutputRow> {
        self.rows.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn into_rows(self) -> Vec<OutputRow> {
        self.rows.into_inner()
    }
}

#[async_trait]
impl RowSink for MemorySink {
    async fn append(&self, rows: &[OutputRow]) -> Result<()> {
        self.rows.lock().await.extend_from_slice(rows);
        Ok(())
    }
}
