//! Streaming benchmark error types.
//!
//! Every variant names the stage that failed. Native removal being
//! unsupported never shows up here; it only switches the eviction strategy.

use elastic_vector::VectorError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StreamError {
    /// Settings the benchmark cannot run with
    #[error("Configuration error: {0}")]
    Config(String),

    /// Dataset width does not match the trained index
    #[error("Dimension mismatch: index expects {expected}, dataset has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Not enough vectors to fill the window
    #[error("Insufficient data: pre-fill needs {required} vectors, dataset has {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("Pre-fill failed: {0}")]
    Prefill(#[source] VectorError),

    #[error("Step {step}: admit failed: {source}")]
    Admit { step: usize, source: VectorError },

    #[error("Step {step}: evict failed: {source}")]
    Evict { step: usize, source: VectorError },

    /// The index assigned identifiers that do not continue the window
    #[error("Step {step}: index assigned ids from {actual}, window expected {expected}")]
    IdentifierGap {
        step: usize,
        expected: u64,
        actual: u64,
    },

    /// Writing the step report failed
    #[error("Report output failed: {0}")]
    Report(#[from] std::io::Error),
}
