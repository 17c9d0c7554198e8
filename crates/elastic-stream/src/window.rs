//! FIFO window over resident identifiers.

use serde::{Deserialize, Serialize};

use elastic_vector::IdRange;

/// Half-open range `[min_id, max_id)` of resident identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowState {
    pub min_id: u64,
    pub max_id: u64,
}

impl WindowState {
    pub fn len(&self) -> usize {
        (self.max_id - self.min_id) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.min_id == self.max_id
    }

    pub fn as_range(&self) -> IdRange {
        IdRange {
            start: self.min_id,
            end: self.max_id,
        }
    }
}

/// Tracks which identifiers are resident and which leave next.
///
/// State is in-memory only and starts from the pre-fill range.
#[derive(Debug, Clone)]
pub struct WindowTracker {
    initial_min_id: u64,
    state: WindowState,
}

impl WindowTracker {
    pub fn new(prefill: IdRange) -> Self {
        Self {
            initial_min_id: prefill.start,
            state: WindowState {
                min_id: prefill.start,
                max_id: prefill.end,
            },
        }
    }

    pub fn state(&self) -> WindowState {
        self.state
    }

    pub fn min_id(&self) -> u64 {
        self.state.min_id
    }

    pub fn max_id(&self) -> u64 {
        self.state.max_id
    }

    /// The identifiers the next `advance(batch_size)` will return.
    pub fn peek_eviction(&self, batch_size: usize) -> IdRange {
        IdRange::with_len(self.state.min_id, batch_size)
    }

    /// Return the oldest `batch_size` identifiers and slide the window.
    pub fn advance(&mut self, batch_size: usize) -> IdRange {
        let evicted = self.peek_eviction(batch_size);
        self.state.min_id += batch_size as u64;
        self.state.max_id += batch_size as u64;
        evicted
    }

    /// Every identifier evicted so far: `[initial_min_id, min_id)`.
    pub fn evicted(&self) -> IdRange {
        IdRange {
            start: self.initial_min_id,
            end: self.state.min_id,
        }
    }
}
