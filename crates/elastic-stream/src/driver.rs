//! Benchmark driver: pre-fill, then a strictly sequential admit/evict loop.

use tracing::{debug, info};

use elastic_types::Settings;
use elastic_vector::{AcceleratorIndex, VectorSet};

use crate::adapter::IndexLifecycleAdapter;
use crate::error::StreamError;
use crate::metrics::{MetricsReporter, StepRecord};
use crate::window::{WindowState, WindowTracker};

/// Sizing for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BenchmarkConfig {
    /// Resident capacity
    pub window_size: usize,
    /// Vectors admitted and evicted per step
    pub batch_size: usize,
    /// Upper bound on steps; the dataset may end the run sooner
    pub steps: usize,
}

impl BenchmarkConfig {
    pub fn new(window_size: usize, batch_size: usize, steps: usize) -> Self {
        Self {
            window_size,
            batch_size,
            steps,
        }
    }

    pub fn validate(&self) -> Result<(), StreamError> {
        if self.window_size == 0 {
            return Err(StreamError::Config("window_size must be > 0".to_string()));
        }
        if self.batch_size == 0 {
            return Err(StreamError::Config("batch_size must be > 0".to_string()));
        }
        Ok(())
    }
}

impl From<&Settings> for BenchmarkConfig {
    fn from(settings: &Settings) -> Self {
        Self::new(settings.window_size, settings.batch_size, settings.steps)
    }
}

/// What a completed run looked like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BenchmarkOutcome {
    pub steps_completed: usize,
    /// True when the loop stopped because the dataset ran out
    pub exhausted: bool,
    pub window: WindowState,
    pub strategy_changes: usize,
}

pub struct BenchmarkDriver {
    config: BenchmarkConfig,
}

impl BenchmarkDriver {
    pub fn new(config: BenchmarkConfig) -> Result<Self, StreamError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// Admit the first `window_size` vectors in one call. Not timed.
    pub fn prefill<I: AcceleratorIndex>(
        &self,
        adapter: &mut IndexLifecycleAdapter<I>,
        dataset: &VectorSet,
    ) -> Result<WindowTracker, StreamError> {
        if dataset.dimension() != adapter.dimension() {
            return Err(StreamError::DimensionMismatch {
                expected: adapter.dimension(),
                actual: dataset.dimension(),
            });
        }
        let batch = dataset.batch(0, self.config.window_size).ok_or(
            StreamError::InsufficientData {
                required: self.config.window_size,
                available: dataset.len(),
            },
        )?;

        info!(vectors = batch.len(), "Pre-filling window");
        let admitted = adapter.admit(&batch).map_err(StreamError::Prefill)?;
        info!(
            min_id = admitted.ids.start,
            max_id = admitted.ids.end,
            resident = adapter.resident(),
            "Window pre-filled"
        );
        Ok(WindowTracker::new(admitted.ids))
    }

    /// Pre-fill, then run up to `steps` admit/evict cycles.
    pub fn run<I: AcceleratorIndex>(
        &self,
        adapter: &mut IndexLifecycleAdapter<I>,
        dataset: &VectorSet,
        reporter: &mut MetricsReporter,
    ) -> Result<BenchmarkOutcome, StreamError> {
        let mut window = self.prefill(adapter, dataset)?;
        let BenchmarkConfig {
            window_size,
            batch_size,
            steps,
        } = self.config;

        info!(window_size, batch_size, steps, "Starting streaming benchmark");

        let mut steps_completed = 0;
        let mut exhausted = false;

        for step in 0..steps {
            let offset = window_size + step * batch_size;
            let Some(batch) = dataset.batch(offset, batch_size) else {
                info!(step, offset, available = dataset.len(), "Dataset exhausted");
                exhausted = true;
                break;
            };

            let admitted = adapter
                .admit(&batch)
                .map_err(|source| StreamError::Admit { step, source })?;
            if admitted.ids.start != window.max_id() || admitted.ids.len() != batch_size {
                return Err(StreamError::IdentifierGap {
                    step,
                    expected: window.max_id(),
                    actual: admitted.ids.start,
                });
            }

            let ids_to_evict = window.peek_eviction(batch_size);
            let evicted = adapter
                .evict(&ids_to_evict)
                .map_err(|source| StreamError::Evict { step, source })?;
            window.advance(batch_size);

            debug!(
                step,
                evicted_start = ids_to_evict.start,
                evicted_end = ids_to_evict.end,
                removed = evicted.removed,
                "Step complete"
            );

            reporter.record(StepRecord {
                step,
                add_ms: admitted.latency.as_secs_f64() * 1000.0,
                remove_ms: evicted.latency.as_secs_f64() * 1000.0,
                strategy: evicted.strategy,
                resident: adapter.resident(),
            })?;
            steps_completed += 1;
        }

        info!(
            steps_completed,
            exhausted,
            strategy = %adapter.strategy(),
            "Streaming benchmark finished"
        );

        Ok(BenchmarkOutcome {
            steps_completed,
            exhausted,
            window: window.state(),
            strategy_changes: adapter.strategy_changes(),
        })
    }
}
