//! # elastic-stream
//!
//! Sliding-window streaming benchmark over an accelerator-resident index.
//!
//! A fixed-capacity window is pre-filled, then every step admits one new
//! batch and evicts the oldest one (FIFO), timing both paths. Eviction
//! starts on the accelerator and latches to a host roundtrip the first time
//! the index reports that native removal is unsupported.
//!
//! ## Modules
//! - [`adapter`]: admit/evict over an [`elastic_vector::AcceleratorIndex`]
//! - [`window`]: FIFO identifier window
//! - [`driver`]: pre-fill and step loop
//! - [`metrics`]: step records, summaries, table output

pub mod adapter;
pub mod driver;
pub mod error;
pub mod metrics;
pub mod window;

pub use adapter::{AdmitOutcome, EvictOutcome, IndexLifecycleAdapter, RoundtripTiming, Strategy};
pub use driver::{BenchmarkConfig, BenchmarkDriver, BenchmarkOutcome};
pub use error::StreamError;
pub use metrics::{BenchmarkSummary, LatencyStats, MetricsReporter, StepRecord};
pub use window::{WindowState, WindowTracker};
