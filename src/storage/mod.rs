//! Durable journal for resumable sessions
//!
//! The journal records:
//! - every appended record, per dataset, as a JSON payload
//! - the delivered cursor of each dataset
//! - detail identifiers already processed
//! - session runs and how they ended

mod memory;
mod schema;
mod sqlite;
mod traits;

pub use memory::MemoryJournal;
pub use sqlite::SqliteJournal;
pub use traits::{Journal, JournalEntry, StorageError, StorageResult};

use std::path::Path;

/// Opens the configured journal, or an in-memory one when no path is set
pub fn open_journal(path: Option<&Path>) -> StorageResult<Box<dyn Journal + Send>> {
    match path {
        Some(path) => {
            tracing::info!("Opening journal at {}", path.display());
            Ok(Box::new(SqliteJournal::new(path)?))
        }
        None => Ok(Box::new(MemoryJournal::new())),
    }
}

/// Represents a session run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of a session run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
