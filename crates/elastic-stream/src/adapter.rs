//! Index lifecycle adapter.
//!
//! Presents one admit/evict contract over an accelerator-resident index
//! whether or not it can remove vectors natively. Eviction starts in
//! [`Strategy::Direct`]; the first [`RemoveOutcome::Unsupported`] latches
//! [`Strategy::Roundtrip`] for the rest of the run and the same request is
//! served by the roundtrip path.

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use elastic_vector::{
    AcceleratorIndex, HostIndex, IdRange, RemoveOutcome, VectorBatch, VectorError,
};

/// Which removal path serves evictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Remove on the accelerator-resident index
    Direct,
    /// Copy to host, remove there, copy back
    Roundtrip,
}

impl Strategy {
    pub fn label(&self) -> &'static str {
        match self {
            Strategy::Direct => "Direct",
            Strategy::Roundtrip => "CPU_Roundtrip",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// Time spent in each leg of a roundtrip eviction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundtripTiming {
    pub to_host: Duration,
    pub host_remove: Duration,
    pub to_device: Duration,
}

impl RoundtripTiming {
    pub fn total(&self) -> Duration {
        self.to_host + self.host_remove + self.to_device
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AdmitOutcome {
    pub latency: Duration,
    /// Identifiers the index assigned to the batch
    pub ids: IdRange,
}

#[derive(Debug, Clone, Copy)]
pub struct EvictOutcome {
    /// Wall time of the whole call, including a failed direct attempt
    pub latency: Duration,
    pub strategy: Strategy,
    pub removed: usize,
    /// Present when the roundtrip path ran
    pub roundtrip: Option<RoundtripTiming>,
}

/// Exclusive owner of the accelerator-resident index.
pub struct IndexLifecycleAdapter<I: AcceleratorIndex> {
    index: I,
    strategy: Strategy,
    strategy_changes: usize,
}

impl<I: AcceleratorIndex> IndexLifecycleAdapter<I> {
    pub fn new(index: I) -> Self {
        Self {
            index,
            strategy: Strategy::Direct,
            strategy_changes: 0,
        }
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    pub fn into_inner(self) -> I {
        self.index
    }

    /// Strategy the next eviction will start with.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Number of DIRECT -> ROUNDTRIP transitions (0 or 1).
    pub fn strategy_changes(&self) -> usize {
        self.strategy_changes
    }

    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    /// Vectors currently resident.
    pub fn resident(&self) -> usize {
        self.index.len()
    }

    /// Append a batch on the accelerator.
    pub fn admit(&mut self, batch: &VectorBatch<'_>) -> Result<AdmitOutcome, VectorError> {
        let start = Instant::now();
        let ids = self.index.admit(batch)?;
        let latency = start.elapsed();
        debug!(start = ids.start, end = ids.end, ?latency, "Admitted batch");
        Ok(AdmitOutcome { latency, ids })
    }

    /// Remove `ids`, falling back to a host roundtrip when the index
    /// cannot remove on the accelerator.
    pub fn evict(&mut self, ids: &IdRange) -> Result<EvictOutcome, VectorError> {
        let start = Instant::now();

        if self.strategy == Strategy::Direct {
            match self.index.attempt_remove(ids)? {
                RemoveOutcome::Removed(removed) => {
                    let latency = start.elapsed();
                    debug!(removed, ?latency, "Evicted on device");
                    return Ok(EvictOutcome {
                        latency,
                        strategy: Strategy::Direct,
                        removed,
                        roundtrip: None,
                    });
                }
                RemoveOutcome::Unsupported => {
                    self.strategy = Strategy::Roundtrip;
                    self.strategy_changes += 1;
                    warn!(
                        from = %Strategy::Direct,
                        to = %Strategy::Roundtrip,
                        "Native removal unsupported on device; switching eviction strategy"
                    );
                }
            }
        }

        let (removed, timing) = self.roundtrip_remove(ids)?;
        let latency = start.elapsed();
        debug!(removed, ?latency, ?timing, "Evicted via host roundtrip");
        Ok(EvictOutcome {
            latency,
            strategy: Strategy::Roundtrip,
            removed,
            roundtrip: Some(timing),
        })
    }

    /// Export, remove on host, import. The held index is replaced only after
    /// the import succeeds; on any error it is left as it was.
    fn roundtrip_remove(&mut self, ids: &IdRange) -> Result<(usize, RoundtripTiming), VectorError> {
        let t = Instant::now();
        let mut host = self.index.export_to_host()?;
        let to_host = t.elapsed();

        let t = Instant::now();
        let removed = host.remove(ids)?;
        let host_remove = t.elapsed();

        let t = Instant::now();
        let replacement = self.index.import_from_host(&host)?;
        let previous = std::mem::replace(&mut self.index, replacement);
        drop(previous);
        let to_device = t.elapsed();

        Ok((
            removed,
            RoundtripTiming {
                to_host,
                host_remove,
                to_device,
            },
        ))
    }
}
