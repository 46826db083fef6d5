//! The incremental sink
//!
//! `IncrementalSink` owns the three datasets and their delivery. A flush of one dataset:
//!
//! 1. takes the delta past the delivered cursor (nothing to do when it is empty)
//! 2. rewrites the dataset's local snapshot (a failure is logged, never fatal)
//! 3. writes the delta to the remote row range it maps to, with retries
//! 4. advances the cursor by the delta length, only once the write is confirmed
//! 5. persists the new cursor to the journal
//!
//! A failed flush leaves the cursor untouched, so the next flush re-targets the same
//! rows plus anything appended since. Overwriting a range with the same rows is
//! idempotent, so a write that landed but was reported as failed cannot duplicate rows.

use super::dataset::Dataset;
use super::remote::{RetryPolicy, SheetRange, TabularStore};
use super::snapshot::SnapshotWriter;
use super::{SinkError, SinkResult};
use crate::records::{CastRecord, DatasetKind, DetailBatch, MovieRecord, Record, ReviewRecord};
use crate::storage::{Journal, JournalEntry, MemoryJournal, RunStatus, StorageResult};
use std::collections::HashSet;

/// Outcome of flushing every dataset once
#[derive(Debug, Default)]
pub struct FlushReport {
    /// Records newly confirmed across all datasets
    pub delivered: usize,
    pub failures: Vec<SinkError>,
}

impl FlushReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Journal wrapper that stops using the journal after its first failure
///
/// Once a journal write is lost, later cursor writes could describe records the journal
/// never stored. Disabling it keeps the persisted cursor behind the persisted records.
struct JournalHandle {
    inner: Box<dyn Journal + Send>,
    healthy: bool,
}

impl JournalHandle {
    fn new(inner: Box<dyn Journal + Send>) -> Self {
        Self {
            inner,
            healthy: true,
        }
    }

    fn apply<R>(
        &mut self,
        action: &str,
        op: impl FnOnce(&mut dyn Journal) -> StorageResult<R>,
    ) -> Option<R> {
        if !self.healthy {
            return None;
        }
        match op(self.inner.as_mut()) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!(
                    "Journal failed to {}: {}; journaling disabled for this session",
                    action,
                    e
                );
                self.healthy = false;
                None
            }
        }
    }
}

/// Owns the datasets and synchronizes them to a remote store and local snapshots
pub struct IncrementalSink<S> {
    store: S,
    snapshots: SnapshotWriter,
    retry: RetryPolicy,
    journal: JournalHandle,
    processed: HashSet<String>,
    cast: Dataset<CastRecord>,
    movies: Dataset<MovieRecord>,
    reviews: Dataset<ReviewRecord>,
}

impl<S: TabularStore> IncrementalSink<S> {
    /// Creates a sink with empty datasets and a session-lifetime journal
    pub fn new(store: S, snapshots: SnapshotWriter, retry: RetryPolicy) -> Self {
        Self {
            store,
            snapshots,
            retry,
            journal: JournalHandle::new(Box::new(MemoryJournal::new())),
            processed: HashSet::new(),
            cast: Dataset::new(),
            movies: Dataset::new(),
            reviews: Dataset::new(),
        }
    }

    /// Creates a sink whose datasets and cursors are restored from `journal`
    pub fn with_journal(
        store: S,
        snapshots: SnapshotWriter,
        retry: RetryPolicy,
        journal: Box<dyn Journal + Send>,
    ) -> SinkResult<Self> {
        let cast = restore_dataset(journal.as_ref())?;
        let movies = restore_dataset(journal.as_ref())?;
        let reviews = restore_dataset(journal.as_ref())?;

        tracing::info!(
            "Restored datasets: cast {}/{}, movies {}/{}, reviews {}/{} delivered",
            cast.delivered_cursor(),
            cast.len(),
            movies.delivered_cursor(),
            movies.len(),
            reviews.delivered_cursor(),
            reviews.len()
        );

        Ok(Self {
            store,
            snapshots,
            retry,
            journal: JournalHandle::new(journal),
            processed: HashSet::new(),
            cast,
            movies,
            reviews,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Whether the detail page at `identifier` was already ingested
    pub fn is_processed(&mut self, identifier: &str) -> bool {
        if self.processed.contains(identifier) {
            return true;
        }
        self.journal
            .apply("look up an identifier", |j| j.is_processed(identifier))
            .unwrap_or(false)
    }

    /// Appends one detail page's records to the datasets
    ///
    /// Returns the number of records appended.
    pub fn ingest(&mut self, identifier: &str, batch: DetailBatch) -> SinkResult<usize> {
        let DetailBatch {
            cast,
            movie,
            reviews,
        } = batch;

        let mut entries = Vec::with_capacity(cast.len() + reviews.len() + 1);
        entries.extend(journal_entries(&cast)?);
        if let Some(movie) = &movie {
            entries.extend(journal_entries(std::slice::from_ref(movie))?);
        }
        entries.extend(journal_entries(&reviews)?);

        self.journal
            .apply("record a detail page", |j| j.record_detail(identifier, &entries));
        self.processed.insert(identifier.to_string());

        let appended =
            self.cast.append(cast) + self.movies.append(movie) + self.reviews.append(reviews);
        tracing::debug!("Ingested {} records from {}", appended, identifier);
        Ok(appended)
    }

    /// Flushes the delta of one dataset, returning how many records were delivered
    pub async fn flush(&mut self, kind: DatasetKind) -> SinkResult<usize> {
        match kind {
            DatasetKind::Cast => {
                flush_dataset(
                    &self.store,
                    &self.snapshots,
                    &self.retry,
                    &mut self.journal,
                    &mut self.cast,
                )
                .await
            }
            DatasetKind::Movies => {
                flush_dataset(
                    &self.store,
                    &self.snapshots,
                    &self.retry,
                    &mut self.journal,
                    &mut self.movies,
                )
                .await
            }
            DatasetKind::Reviews => {
                flush_dataset(
                    &self.store,
                    &self.snapshots,
                    &self.retry,
                    &mut self.journal,
                    &mut self.reviews,
                )
                .await
            }
        }
    }

    /// Flushes every dataset; one dataset failing does not stop the others
    pub async fn flush_all(&mut self) -> FlushReport {
        let mut report = FlushReport::default();
        for kind in DatasetKind::ALL {
            match self.flush(kind).await {
                Ok(count) => report.delivered += count,
                Err(e) => {
                    tracing::error!("Flush of {} failed: {}", kind, e);
                    report.failures.push(e);
                }
            }
        }
        report
    }

    /// Records confirmed delivered for a dataset
    pub fn delivered(&self, kind: DatasetKind) -> usize {
        match kind {
            DatasetKind::Cast => self.cast.delivered_cursor(),
            DatasetKind::Movies => self.movies.delivered_cursor(),
            DatasetKind::Reviews => self.reviews.delivered_cursor(),
        }
    }

    /// Records held for a dataset, delivered or not
    pub fn len(&self, kind: DatasetKind) -> usize {
        match kind {
            DatasetKind::Cast => self.cast.len(),
            DatasetKind::Movies => self.movies.len(),
            DatasetKind::Reviews => self.reviews.len(),
        }
    }

    pub fn pending(&self, kind: DatasetKind) -> usize {
        self.len(kind) - self.delivered(kind)
    }

    pub fn cast(&self) -> &Dataset<CastRecord> {
        &self.cast
    }

    pub fn movies(&self) -> &Dataset<MovieRecord> {
        &self.movies
    }

    pub fn reviews(&self) -> &Dataset<ReviewRecord> {
        &self.reviews
    }

    /// Opens a journaled run; `None` when the journal is unavailable
    pub fn begin_run(&mut self, config_hash: &str) -> Option<i64> {
        self.journal.apply("open a run", |j| j.begin_run(config_hash))
    }

    pub fn finish_run(&mut self, run_id: i64, status: RunStatus) {
        self.journal
            .apply("close a run", |j| j.finish_run(run_id, status));
    }
}

async fn flush_dataset<T, S>(
    store: &S,
    snapshots: &SnapshotWriter,
    retry: &RetryPolicy,
    journal: &mut JournalHandle,
    dataset: &mut Dataset<T>,
) -> SinkResult<usize>
where
    T: Record,
    S: TabularStore,
{
    let kind = T::KIND;
    let delta_len = dataset.delta().len();
    if delta_len == 0 {
        tracing::trace!("{}: nothing to flush", kind);
        return Ok(0);
    }

    if let Err(source) = snapshots.write(dataset.records()) {
        let e = SinkError::Snapshot {
            dataset: kind,
            source,
        };
        tracing::warn!("{}", e);
    }

    let cursor = dataset.delivered_cursor();
    let range = SheetRange::for_delta(kind, cursor, delta_len);
    let mut rows = Vec::with_capacity(delta_len + 1);
    if cursor == 0 {
        rows.push(T::headers().iter().map(|h| h.to_string()).collect::<Vec<_>>());
    }
    rows.extend(dataset.delta().iter().map(Record::to_row));

    tracing::debug!("{}: writing {} records to {}", kind, delta_len, range);

    let range_ref = &range;
    let rows_ref = &rows;
    let summary = retry
        .run(move || async move { store.update_range(range_ref, rows_ref.clone()).await })
        .await
        .map_err(|source| SinkError::Remote {
            dataset: kind,
            source,
        })?;

    let delivered = dataset.advance(delta_len)?;
    journal.apply("save a cursor", |j| j.save_cursor(kind, delivered));

    tracing::info!(
        "{}: delivered {} records ({} rows confirmed), cursor now {}",
        kind,
        delta_len,
        summary.updated_rows,
        delivered
    );

    Ok(delta_len)
}

fn restore_dataset<T: Record>(journal: &(dyn Journal + Send)) -> SinkResult<Dataset<T>> {
    let payloads = journal.load_payloads(T::KIND)?;
    let records = payloads
        .iter()
        .map(|payload| {
            serde_json::from_str(payload).map_err(|e| SinkError::CorruptPayload {
                dataset: T::KIND,
                message: e.to_string(),
            })
        })
        .collect::<SinkResult<Vec<T>>>()?;
    let cursor = journal.load_cursor(T::KIND)?;
    Ok(Dataset::restore(records, cursor))
}

fn journal_entries<T: Record>(records: &[T]) -> SinkResult<Vec<JournalEntry>> {
    records
        .iter()
        .map(|record| {
            serde_json::to_string(record)
                .map(|payload| JournalEntry {
                    dataset: T::KIND,
                    payload,
                })
                .map_err(|e| SinkError::CorruptPayload {
                    dataset: T::KIND,
                    message: e.to_string(),
                })
        })
        .collect()
}
