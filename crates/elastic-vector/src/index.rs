//! Index contract shared by the host and accelerator copies.
//!
//! Removal on the accelerator is a capability of the concrete index
//! configuration. Callers discover it by attempting removal and inspecting
//! the [`RemoveOutcome`]; real failures come back as `Err`.

use crate::batch::{IdRange, VectorBatch};
use crate::error::VectorError;

/// Result of a native removal attempt on an accelerator-resident index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// The index removed this many resident vectors
    Removed(usize),
    /// This index configuration cannot remove on the accelerator
    Unsupported,
}

/// Host-memory copy of an index.
pub trait HostIndex {
    /// Number of resident vectors
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every resident vector whose identifier falls in `ids`.
    /// Returns how many were removed.
    fn remove(&mut self, ids: &IdRange) -> Result<usize, VectorError>;
}

/// Accelerator-resident index.
pub trait AcceleratorIndex: Sized {
    type Host: HostIndex;

    /// Vector width
    fn dimension(&self) -> usize;

    /// Number of resident vectors
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Identifier the next admitted vector will receive
    fn next_id(&self) -> u64;

    /// Append a batch. Returns the identifiers assigned to it, in order.
    fn admit(&mut self, batch: &VectorBatch<'_>) -> Result<IdRange, VectorError>;

    /// Try to remove `ids` without leaving the accelerator.
    fn attempt_remove(&mut self, ids: &IdRange) -> Result<RemoveOutcome, VectorError>;

    /// Copy the whole index into host memory.
    fn export_to_host(&self) -> Result<Self::Host, VectorError>;

    /// Build a new accelerator-resident index from a host copy, on the
    /// same device as `self`. `self` is left untouched.
    fn import_from_host(&self, host: &Self::Host) -> Result<Self, VectorError>;
}
