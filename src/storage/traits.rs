//! Journal trait and error types

use crate::records::DatasetKind;
use crate::storage::{RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during journal operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for journal operations
pub type StorageResult<T> = Result<T, StorageError>;

/// One serialized record waiting to be journaled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    pub dataset: DatasetKind,
    pub payload: String,
}

/// Persistence for datasets, cursors and processed identifiers
///
/// The sink writes records through `record_detail` before they can be delivered, and
/// saves a cursor only after the matching remote write is confirmed, so a journaled
/// cursor never points past the journaled records.
pub trait Journal {
    // ===== Run Management =====

    /// Opens a new session run and returns its id
    fn begin_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Closes a run with its final status
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    /// Gets the most recent run
    fn latest_run(&self) -> StorageResult<Option<RunRecord>>;

    // ===== Records =====

    /// Appends a detail page's records and marks the identifier processed, atomically
    fn record_detail(&mut self, identifier: &str, entries: &[JournalEntry]) -> StorageResult<()>;

    /// Loads the payloads of one dataset in discovery order
    fn load_payloads(&self, dataset: DatasetKind) -> StorageResult<Vec<String>>;

    /// Counts journaled records of one dataset
    fn count_records(&self, dataset: DatasetKind) -> StorageResult<u64>;

    // ===== Cursors =====

    fn load_cursor(&self, dataset: DatasetKind) -> StorageResult<usize>;

    fn save_cursor(&mut self, dataset: DatasetKind, delivered: usize) -> StorageResult<()>;

    // ===== Processed identifiers =====

    fn is_processed(&self, identifier: &str) -> StorageResult<bool>;

    fn count_processed(&self) -> StorageResult<u64>;

    /// Drops every record, cursor and processed identifier (runs are kept)
    fn clear(&mut self) -> StorageResult<()>;
}
