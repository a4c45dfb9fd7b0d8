use std::collections::BTreeMap;

use crate::{PzipError, Result};

/// Releases items submitted out of order as an in-order stream.
///
/// Items wait in a `BTreeMap` until the next expected index arrives, at which
/// point it and every contiguous successor are released together.
#[derive(Debug)]
pub struct ReorderBuffer<T> {
    next_index: usize,
    pending: BTreeMap<usize, T>,
    max_pending: usize,
}

impl<T> ReorderBuffer<T> {
    /// Creates a buffer holding at most `max_pending` out-of-order items.
    pub fn with_limit(max_pending: usize) -> Self {
        Self {
            next_index: 0,
            pending: BTreeMap::new(),
            max_pending: max_pending.max(1),
        }
    }

    /// Submits `item` under `index` and returns the items now ready, in order.
    ///
    /// # Errors
    /// Returns [`PzipError::InvalidChunkIndex`] if `index` was already
    /// released, [`PzipError::DuplicateChunk`] if it is already pending, and
    /// [`PzipError::ReorderCapacity`] if holding it would exceed the pending
    /// limit.
    pub fn push(&mut self, index: usize, item: T) -> Result<Vec<T>> {
        if index < self.next_index {
            return Err(PzipError::InvalidChunkIndex {
                expected: self.next_index,
                actual: index,
            });
        }
        if self.pending.contains_key(&index) {
            return Err(PzipError::DuplicateChunk(index));
        }
        if index != self.next_index && self.pending.len() >= self.max_pending {
            return Err(PzipError::ReorderCapacity {
                limit: self.max_pending,
                index,
            });
        }

        self.pending.insert(index, item);

        let mut ready = Vec::new();
        while let Some(item) = self.pending.remove(&self.next_index) {
            ready.push(item);
            self.next_index += 1;
        }
        Ok(ready)
    }

    pub fn next_expected(&self) -> usize {
        self.next_index
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn max_pending(&self) -> usize {
        self.max_pending
    }

    /// True when nothing is waiting for a missing predecessor.
    pub fn is_drained(&self) -> bool {
        self.pending.is_empty()
    }
}
