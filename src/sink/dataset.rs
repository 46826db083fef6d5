//! Append-only dataset with a delivered cursor

use super::{SinkError, SinkResult};
use crate::records::{DatasetKind, Record};

/// Ordered, append-only sequence of one record type
///
/// `delivered` counts the records already confirmed by the remote store. It never
/// exceeds `len()`, and `records[delivered..]` is exactly the undelivered delta.
#[derive(Debug, Clone)]
pub struct Dataset<T> {
    records: Vec<T>,
    delivered: usize,
}

impl<T: Record> Default for Dataset<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> Dataset<T> {
    /// Creates an empty dataset with its cursor at zero
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            delivered: 0,
        }
    }

    /// Rebuilds a dataset from persisted records and cursor
    ///
    /// A cursor past the end is clamped, since rows cannot have been delivered before
    /// they were recorded.
    pub fn restore(records: Vec<T>, delivered: usize) -> Self {
        let clamped = delivered.min(records.len());
        if clamped != delivered {
            tracing::warn!(
                "{} cursor {} exceeds {} journaled records, clamping",
                T::KIND,
                delivered,
                records.len()
            );
        }
        Self {
            records,
            delivered: clamped,
        }
    }

    pub fn kind(&self) -> DatasetKind {
        T::KIND
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Count of records confirmed delivered to the remote store
    pub fn delivered_cursor(&self) -> usize {
        self.delivered
    }

    /// All records, in discovery order
    pub fn records(&self) -> &[T] {
        &self.records
    }

    /// Records not yet confirmed delivered
    pub fn delta(&self) -> &[T] {
        &self.records[self.delivered..]
    }

    /// Appends records at the end, returning how many were added
    pub fn append<I>(&mut self, records: I) -> usize
    where
        I: IntoIterator<Item = T>,
    {
        let before = self.records.len();
        self.records.extend(records);
        self.records.len() - before
    }

    /// Moves the cursor forward after a confirmed delivery
    pub fn advance(&mut self, count: usize) -> SinkResult<usize> {
        if self.delivered + count > self.records.len() {
            return Err(SinkError::CursorOverrun {
                dataset: T::KIND,
                cursor: self.delivered,
                advance: count,
                len: self.records.len(),
            });
        }
        self.delivered += count;
        Ok(self.delivered)
    }
}
