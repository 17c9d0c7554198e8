//! Vector index error types.

use std::fmt;

use thiserror::Error;

/// Direction of a host/accelerator copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    ToHost,
    ToDevice,
}

impl fmt::Display for TransferDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferDirection::ToHost => f.write_str("device->host"),
            TransferDirection::ToDevice => f.write_str("host->device"),
        }
    }
}

/// Errors that can occur during vector operations.
///
/// Native removal being unavailable on the accelerator is not an error;
/// see [`crate::RemoveOutcome::Unsupported`].
#[derive(Debug, Error)]
pub enum VectorError {
    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Identifier that was never assigned, or a malformed range
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Copy between host and accelerator failed
    #[error("Transfer {direction} failed: {reason}")]
    Transfer {
        direction: TransferDirection,
        reason: String,
    },

    /// Accelerator memory exhausted
    #[error("Device {device_id} out of memory: requested {requested} bytes, {available} available")]
    DeviceMemory {
        device_id: u32,
        requested: u64,
        available: u64,
    },

    /// Partition training failed
    #[error("Training error: {0}")]
    Training(String),

    /// Malformed vector file
    #[error("Format error: {0}")]
    Format(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
