use crate::error::OrmResult;
use crate::row::{Record, Row};
use std::marker::PhantomData;

/// Lazily decodes fetched rows into records.
///
/// Yields `Err` at most once: after a decode failure the iterator is exhausted.
pub struct RecordIter<T> {
    rows: std::vec::IntoIter<Row>,
    failed: bool,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> RecordIter<T> {
    pub(crate) fn new(rows: Vec<Row>) -> Self {
        Self {
            rows: rows.into_iter(),
            failed: false,
            _record: PhantomData,
        }
    }

    /// Rows not yet decoded.
    pub fn remaining(&self) -> usize {
        if self.failed { 0 } else { self.rows.len() }
    }
}

impl<T: Record> Iterator for RecordIter<T> {
    type Item = OrmResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let row = self.rows.next()?;
        let record = T::from_row(&row);
        if record.is_err() {
            self.failed = true;
        }
        Some(record)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining()))
    }
}

impl<T: Record> std::iter::FusedIterator for RecordIter<T> {}
