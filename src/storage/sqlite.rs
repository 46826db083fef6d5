//! SQLite journal implementation

use crate::records::DatasetKind;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Journal, JournalEntry, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQLite-backed journal
pub struct SqliteJournal {
    conn: Connection,
}

impl SqliteJournal {
    /// Opens or creates the journal at `path`
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory journal (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn read_run(row: &rusqlite::Row<'_>) -> rusqlite::Result<RunRecord> {
        Ok(RunRecord {
            id: row.get(0)?,
            started_at: row.get(1)?,
            finished_at: row.get(2)?,
            config_hash: row.get(3)?,
            status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
                .unwrap_or(RunStatus::Running),
        })
    }
}

impl Journal for SqliteJournal {
    // ===== Run Management =====

    fn begin_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs ORDER BY id DESC LIMIT 1",
                [],
                Self::read_run,
            )
            .optional()?;
        Ok(run)
    }

    // ===== Records =====

    fn record_detail(&mut self, identifier: &str, entries: &[JournalEntry]) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO records (dataset, identifier, payload, recorded_at) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for entry in entries {
                insert.execute(params![
                    entry.dataset.to_db_string(),
                    identifier,
                    entry.payload,
                    now
                ])?;
            }
        }
        tx.execute(
            "INSERT OR IGNORE INTO processed (identifier, processed_at) VALUES (?1, ?2)",
            params![identifier, now],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn load_payloads(&self, dataset: DatasetKind) -> StorageResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT payload FROM records WHERE dataset = ?1 ORDER BY id")?;
        let payloads = stmt
            .query_map(params![dataset.to_db_string()], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(payloads)
    }

    fn count_records(&self, dataset: DatasetKind) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM records WHERE dataset = ?1",
            params![dataset.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ===== Cursors =====

    fn load_cursor(&self, dataset: DatasetKind) -> StorageResult<usize> {
        let delivered: Option<i64> = self
            .conn
            .query_row(
                "SELECT delivered FROM cursors WHERE dataset = ?1",
                params![dataset.to_db_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(delivered.unwrap_or(0).max(0) as usize)
    }

    fn save_cursor(&mut self, dataset: DatasetKind, delivered: usize) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO cursors (dataset, delivered, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(dataset) DO UPDATE SET delivered = excluded.delivered, updated_at = excluded.updated_at",
            params![dataset.to_db_string(), delivered as i64, now],
        )?;
        Ok(())
    }

    // ===== Processed identifiers =====

    fn is_processed(&self, identifier: &str) -> StorageResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM processed WHERE identifier = ?1",
                params![identifier],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn count_processed(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM processed", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn clear(&mut self) -> StorageResult<()> {
        self.conn.execute_batch(
            "
            DELETE FROM records;
            DELETE FROM cursors;
            DELETE FROM processed;
        ",
        )?;
        Ok(())
    }
}
