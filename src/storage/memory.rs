//! In-memory journal, used when no journal path is configured
//!
//! State lives only as long as the session, which gives the plain session-lifetime
//! cursor behaviour.

use crate::records::DatasetKind;
use crate::storage::traits::{Journal, JournalEntry, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use chrono::Utc;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
pub struct MemoryJournal {
    runs: Vec<RunRecord>,
    payloads: HashMap<DatasetKind, Vec<String>>,
    cursors: HashMap<DatasetKind, usize>,
    processed: HashSet<String>,
}

impl MemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Journal for MemoryJournal {
    fn begin_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let id = self.runs.len() as i64 + 1;
        self.runs.push(RunRecord {
            id,
            started_at: Utc::now().to_rfc3339(),
            finished_at: None,
            config_hash: config_hash.to_string(),
            status: RunStatus::Running,
        });
        Ok(id)
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let run = self
            .runs
            .iter_mut()
            .find(|run| run.id == run_id)
            .ok_or(StorageError::RunNotFound(run_id))?;
        run.status = status;
        run.finished_at = Some(Utc::now().to_rfc3339());
        Ok(())
    }

    fn latest_run(&self) -> StorageResult<Option<RunRecord>> {
        Ok(self.runs.last().cloned())
    }

    fn record_detail(&mut self, identifier: &str, entries: &[JournalEntry]) -> StorageResult<()> {
        for entry in entries {
            self.payloads
                .entry(entry.dataset)
                .or_default()
                .push(entry.payload.clone());
        }
        self.processed.insert(identifier.to_string());
        Ok(())
    }

    fn load_payloads(&self, dataset: DatasetKind) -> StorageResult<Vec<String>> {
        Ok(self.payloads.get(&dataset).cloned().unwrap_or_default())
    }

    fn count_records(&self, dataset: DatasetKind) -> StorageResult<u64> {
        Ok(self.payloads.get(&dataset).map_or(0, Vec::len) as u64)
    }

    fn load_cursor(&self, dataset: DatasetKind) -> StorageResult<usize> {
        Ok(self.cursors.get(&dataset).copied().unwrap_or(0))
    }

    fn save_cursor(&mut self, dataset: DatasetKind, delivered: usize) -> StorageResult<()> {
        self.cursors.insert(dataset, delivered);
        Ok(())
    }

    fn is_processed(&self, identifier: &str) -> StorageResult<bool> {
        Ok(self.processed.contains(identifier))
    }

    fn count_processed(&self) -> StorageResult<u64> {
        Ok(self.processed.len() as u64)
    }

    fn clear(&mut self) -> StorageResult<()> {
        self.payloads.clear();
        self.cursors.clear();
        self.processed.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_journal_tracks_state() {
        let mut journal = MemoryJournal::new();
        let run = journal.begin_run("hash").unwrap();
        journal
            .record_detail(
                "a",
                &[JournalEntry {
                    dataset: DatasetKind::Movies,
                    payload: "{}".into(),
                }],
            )
            .unwrap();
        journal.save_cursor(DatasetKind::Movies, 1).unwrap();
        journal.finish_run(run, RunStatus::Completed).unwrap();

        assert!(journal.is_processed("a").unwrap());
        assert_eq!(journal.count_records(DatasetKind::Movies).unwrap(), 1);
        assert_eq!(journal.load_cursor(DatasetKind::Movies).unwrap(), 1);
        assert_eq!(
            journal.latest_run().unwrap().unwrap().status,
            RunStatus::Completed
        );

        journal.clear().unwrap();
        assert!(!journal.is_processed("a").unwrap());
        assert_eq!(journal.load_cursor(DatasetKind::Movies).unwrap(), 0);
    }
}
