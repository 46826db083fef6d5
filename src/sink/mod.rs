//! Incremental output sinks
//!
//! This module owns the three append-only datasets and delivers them to:
//! - a remote tabular store (one sub-table per dataset, addressed by row range)
//! - local CSV snapshots (one complete mirror file per dataset)
//!
//! Each dataset carries a delivered cursor. Only the slice past the cursor is sent to
//! the remote store, and the cursor moves only after the remote write is confirmed,
//! so a failed or retried flush targets exactly the same rows again.

mod dataset;
mod incremental;
mod remote;
mod snapshot;

pub use dataset::Dataset;
pub use incremental::{FlushReport, IncrementalSink};
pub use remote::{
    RemoteError, RetryPolicy, SheetRange, SheetsStore, TabularStore, UpdateSummary,
};
pub use snapshot::{SnapshotError, SnapshotWriter};

use crate::records::DatasetKind;
use crate::storage::StorageError;
use thiserror::Error;

/// Errors that can occur while flushing a dataset
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Remote write of {dataset} failed: {source}")]
    Remote {
        dataset: DatasetKind,
        source: RemoteError,
    },

    #[error("Snapshot of {dataset} failed: {source}")]
    Snapshot {
        dataset: DatasetKind,
        source: SnapshotError,
    },

    #[error("Cursor of {dataset} would pass the end of the dataset ({cursor} + {advance} > {len})")]
    CursorOverrun {
        dataset: DatasetKind,
        cursor: usize,
        advance: usize,
        len: usize,
    },

    #[error("Journal error: {0}")]
    Journal(#[from] StorageError),

    #[error("Corrupt journal payload for {dataset}: {message}")]
    CorruptPayload {
        dataset: DatasetKind,
        message: String,
    },
}

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;
