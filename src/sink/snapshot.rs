//! Local CSV snapshots
//!
//! Every flush rewrites the whole snapshot of a dataset. The file is produced under a
//! temporary name and renamed over the previous one, so readers only ever observe a
//! complete mirror.

use crate::records::{DatasetKind, Record};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while writing a snapshot
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Writes one CSV file per dataset into a directory
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    dir: PathBuf,
}

impl SnapshotWriter {
    /// Creates the writer, creating the directory when missing
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, SnapshotError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Location of a dataset's snapshot
    pub fn path_for(&self, kind: DatasetKind) -> PathBuf {
        self.dir.join(kind.snapshot_file())
    }

    /// Replaces the snapshot of `T`'s dataset with the header row and `records`
    pub fn write<T: Record>(&self, records: &[T]) -> Result<PathBuf, SnapshotError> {
        let target = self.path_for(T::KIND);
        let staging = self.dir.join(format!(".{}.tmp", T::KIND.snapshot_file()));

        {
            let mut writer = csv::Writer::from_path(&staging)?;
            writer.write_record(T::headers())?;
            for record in records {
                writer.write_record(record.to_row())?;
            }
            writer.flush()?;
        }

        std::fs::rename(&staging, &target)?;
        tracing::debug!(
            "Snapshot {} rewritten with {} records",
            target.display(),
            records.len()
        );

        Ok(target)
    }
}
