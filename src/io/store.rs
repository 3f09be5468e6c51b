//! Booking store backends
//!
//! The store assigns each booking a UUIDv7 identifier and a creation time.
//! There is no uniqueness constraint: identical bookings become separate
//! records.
//!
//! - `MemoryStore` keeps records for the life of the process.
//! - `JsonlStore` appends one JSON record per line to a file and reloads
//!   existing lines when opened.

use crate::domain::booking::{BookingRecord, NewBooking};
use crate::domain::types::new_uuid_v7;
use chrono::Utc;
use parking_lot::Mutex;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write booking store {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode booking: {0}")]
    Encode(#[from] serde_json::Error),
}

pub trait BookingStore: Send + Sync {
    /// Persist a booking and return it with its assigned id
    fn insert(&self, booking: NewBooking) -> Result<BookingRecord, StoreError>;

    fn get(&self, id: &str) -> Option<BookingRecord>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-local store
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<BookingRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BookingStore for MemoryStore {
    fn insert(&self, booking: NewBooking) -> Result<BookingRecord, StoreError> {
        let record = booking.into_record(new_uuid_v7(), Utc::now());
        self.records.lock().push(record.clone());
        Ok(record)
    }

    fn get(&self, id: &str) -> Option<BookingRecord> {
        self.records.lock().iter().find(|r| r.id == id).cloned()
    }

    fn len(&self) -> usize {
        self.records.lock().len()
    }
}

/// Append-only JSONL file store
pub struct JsonlStore {
    path: PathBuf,
    records: Mutex<Vec<BookingRecord>>,
}

impl JsonlStore {
    /// Open the store, loading any records already in the file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let records = if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|source| StoreError::Io { path: path.display().to_string(), source })?;
            parse_lines(&content, &path)
        } else {
            Vec::new()
        };

        info!(file_path = %path.display(), records = %records.len(), "booking_store_opened");
        Ok(Self { path, records: Mutex::new(records) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a line to the store file
    fn append_line(&self, line: &str) -> std::io::Result<()> {
        // Create parent directories if they don't exist
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{}", line)?;
        debug!(file = %self.path.display(), bytes = %line.len(), "booking_store_written");
        Ok(())
    }
}

fn parse_lines(content: &str, path: &Path) -> Vec<BookingRecord> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(idx, line)| match serde_json::from_str::<BookingRecord>(line) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(file = %path.display(), line = %(idx + 1), error = %e, "booking_store_skipped_line");
                None
            }
        })
        .collect()
}

impl BookingStore for JsonlStore {
    fn insert(&self, booking: NewBooking) -> Result<BookingRecord, StoreError> {
        let record = booking.into_record(new_uuid_v7(), Utc::now());
        let line = serde_json::to_string(&record)?;

        // Hold the lock across the write so lines are appended in insert order
        let mut records = self.records.lock();
        self.append_line(&line)
            .map_err(|source| StoreError::Io { path: self.path.display().to_string(), source })?;
        records.push(record.clone());
        Ok(record)
    }

    fn get(&self, id: &str) -> Option<BookingRecord> {
        self.records.lock().iter().find(|r| r.id == id).cloned()
    }

    fn len(&self) -> usize {
        self.records.lock().len()
    }
}
