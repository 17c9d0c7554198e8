//! Identifier ranges and borrowed vector batches.

use std::ops::Range;

use crate::error::VectorError;

/// Half-open range of identifiers `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdRange {
    pub start: u64,
    pub end: u64,
}

impl IdRange {
    /// Build a range, rejecting `start > end`.
    pub fn new(start: u64, end: u64) -> Result<Self, VectorError> {
        if start > end {
            return Err(VectorError::InvalidIdentifier(format!(
                "range start {start} exceeds end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// `len` identifiers starting at `start`.
    pub fn with_len(start: u64, len: usize) -> Self {
        Self {
            start,
            end: start + len as u64,
        }
    }

    pub fn empty_at(start: u64) -> Self {
        Self { start, end: start }
    }

    pub fn len(&self) -> usize {
        (self.end - self.start) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, id: u64) -> bool {
        id >= self.start && id < self.end
    }

    /// True when the two ranges share no identifier.
    pub fn is_disjoint(&self, other: &IdRange) -> bool {
        self.is_empty() || other.is_empty() || self.end <= other.start || other.end <= self.start
    }

    pub fn iter(&self) -> Range<u64> {
        self.start..self.end
    }
}

/// An ordered run of vectors borrowed from a dataset.
///
/// `offset` is the position of the first vector in the source set.
#[derive(Debug, Clone, Copy)]
pub struct VectorBatch<'a> {
    offset: usize,
    dim: usize,
    data: &'a [f32],
}

impl<'a> VectorBatch<'a> {
    /// Wrap a flat buffer of `data.len() / dim` vectors.
    pub fn new(offset: usize, dim: usize, data: &'a [f32]) -> Result<Self, VectorError> {
        if dim == 0 || data.len() % dim != 0 {
            return Err(VectorError::Format(format!(
                "buffer of {} floats is not a whole number of {}-d vectors",
                data.len(),
                dim
            )));
        }
        Ok(Self { offset, dim, data })
    }

    /// Caller guarantees `dim > 0` and `data.len() % dim == 0`.
    pub(crate) fn from_validated(offset: usize, dim: usize, data: &'a [f32]) -> Self {
        Self { offset, dim, data }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn dimension(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.data.len() / self.dim
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &'a [f32] {
        self.data
    }

    pub fn vector(&self, i: usize) -> Option<&'a [f32]> {
        self.data.get(i * self.dim..(i + 1) * self.dim)
    }

    pub fn vectors(&self) -> impl Iterator<Item = &'a [f32]> {
        self.data.chunks_exact(self.dim)
    }
}
