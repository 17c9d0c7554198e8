//! # elastic-vector
//!
//! Vector data and the index collaborator for the elastic-ivf streaming benchmark.
//!
//! ## Features
//! - fvecs/ivecs decoding and encoding
//! - Lloyd's k-means for coarse partitioning
//! - Host-memory IVF-flat index with monotonic identifier allocation
//! - Simulated accelerator residency with byte accounting and host/device transfers
//! - [`AcceleratorIndex`] contract consumed by the streaming adapter

pub mod batch;
pub mod dataset;
pub mod device;
pub mod error;
pub mod index;
pub mod ivf;
pub mod kmeans;

pub use batch::{IdRange, VectorBatch};
pub use dataset::{read_fvecs, read_ivecs, synthetic, write_fvecs, IvecsSet, VectorSet};
pub use device::{build_on_device, DeviceIvfIndex, DeviceReservation, DeviceResources};
pub use error::{TransferDirection, VectorError};
pub use index::{AcceleratorIndex, HostIndex, RemoveOutcome};
pub use ivf::{HostIvfIndex, IvfParams};
