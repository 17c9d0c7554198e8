//! Simulated accelerator residency.
//!
//! [`DeviceResources`] stands in for a device context: it tracks how many
//! bytes resident indexes hold against a fixed capacity. A
//! [`DeviceReservation`] returns its bytes when dropped, so an index
//! replaced by a fresh import frees its memory only once the replacement
//! exists.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use elastic_types::IndexKind;

use crate::batch::{IdRange, VectorBatch};
use crate::dataset::VectorSet;
use crate::error::{TransferDirection, VectorError};
use crate::index::{AcceleratorIndex, HostIndex, RemoveOutcome};
use crate::ivf::{HostIvfIndex, IvfParams};

/// Memory bookkeeping for one accelerator.
#[derive(Debug)]
pub struct DeviceResources {
    device_id: u32,
    /// 0 = unlimited
    capacity_bytes: u64,
    used: AtomicU64,
}

impl DeviceResources {
    pub fn new(device_id: u32, capacity_bytes: u64) -> Arc<Self> {
        Arc::new(Self {
            device_id,
            capacity_bytes,
            used: AtomicU64::new(0),
        })
    }

    pub fn unlimited(device_id: u32) -> Arc<Self> {
        Self::new(device_id, 0)
    }

    pub fn device_id(&self) -> u32 {
        self.device_id
    }

    pub fn used_bytes(&self) -> u64 {
        self.used.load(Ordering::Acquire)
    }

    pub fn capacity_bytes(&self) -> u64 {
        self.capacity_bytes
    }

    /// Reserve `bytes` of device memory.
    pub fn reserve(self: &Arc<Self>, bytes: u64) -> Result<DeviceReservation, VectorError> {
        self.acquire(bytes)?;
        Ok(DeviceReservation {
            resources: Arc::clone(self),
            bytes,
        })
    }

    fn acquire(&self, bytes: u64) -> Result<(), VectorError> {
        let mut current = self.used.load(Ordering::Acquire);
        loop {
            let next = current + bytes;
            if self.capacity_bytes > 0 && next > self.capacity_bytes {
                return Err(VectorError::DeviceMemory {
                    device_id: self.device_id,
                    requested: bytes,
                    available: self.capacity_bytes.saturating_sub(current),
                });
            }
            match self
                .used
                .compare_exchange(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return Ok(()),
                Err(actual) => current = actual,
            }
        }
    }

    fn release(&self, bytes: u64) {
        self.used.fetch_sub(bytes, Ordering::AcqRel);
    }
}

/// Bytes held on a device; released on drop.
#[derive(Debug)]
pub struct DeviceReservation {
    resources: Arc<DeviceResources>,
    bytes: u64,
}

impl DeviceReservation {
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Grow or shrink the reservation. On failure the old size is kept.
    pub fn resize(&mut self, bytes: u64) -> Result<(), VectorError> {
        if bytes > self.bytes {
            self.resources.acquire(bytes - self.bytes)?;
        } else {
            self.resources.release(self.bytes - bytes);
        }
        self.bytes = bytes;
        Ok(())
    }
}

impl Drop for DeviceReservation {
    fn drop(&mut self) {
        self.resources.release(self.bytes);
    }
}

/// IVF-flat index resident on a (simulated) accelerator.
///
/// Native removal is only available for [`IndexKind::Flat`]; the partitioned
/// layout reports [`RemoveOutcome::Unsupported`].
#[derive(Debug)]
pub struct DeviceIvfIndex {
    resources: Arc<DeviceResources>,
    reservation: DeviceReservation,
    store: HostIvfIndex,
}

impl DeviceIvfIndex {
    /// Copy a host index onto the device.
    pub fn from_host(
        resources: &Arc<DeviceResources>,
        host: &HostIvfIndex,
    ) -> Result<Self, VectorError> {
        let reservation =
            resources
                .reserve(host.memory_bytes())
                .map_err(|e| VectorError::Transfer {
                    direction: TransferDirection::ToDevice,
                    reason: e.to_string(),
                })?;
        let store = host.clone();
        debug!(
            device = resources.device_id(),
            vectors = store.len(),
            bytes = reservation.bytes(),
            "Copied index to device"
        );
        Ok(Self {
            resources: Arc::clone(resources),
            reservation,
            store,
        })
    }

    pub fn kind(&self) -> IndexKind {
        self.store.kind()
    }

    pub fn device_id(&self) -> u32 {
        self.resources.device_id()
    }

    /// Bytes this index holds on the device.
    pub fn resident_bytes(&self) -> u64 {
        self.reservation.bytes()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.store.contains(id)
    }

    pub fn id_bounds(&self) -> Option<IdRange> {
        self.store.id_bounds()
    }

    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        nprobe: usize,
    ) -> Result<Vec<(u64, f32)>, VectorError> {
        self.store.search(query, k, nprobe)
    }
}

impl AcceleratorIndex for DeviceIvfIndex {
    type Host = HostIvfIndex;

    fn dimension(&self) -> usize {
        self.store.dimension()
    }

    fn len(&self) -> usize {
        self.store.len()
    }

    fn next_id(&self) -> u64 {
        self.store.next_id()
    }

    fn admit(&mut self, batch: &VectorBatch<'_>) -> Result<IdRange, VectorError> {
        if batch.dimension() != self.dimension() {
            return Err(VectorError::DimensionMismatch {
                expected: self.dimension(),
                actual: batch.dimension(),
            });
        }
        let grown = self.reservation.bytes() + self.store.batch_bytes(batch.len());
        self.reservation.resize(grown)?;
        self.store.add(batch)
    }

    fn attempt_remove(&mut self, ids: &IdRange) -> Result<RemoveOutcome, VectorError> {
        match self.store.kind() {
            IndexKind::IvfFlat => Ok(RemoveOutcome::Unsupported),
            IndexKind::Flat => {
                let removed = self.store.remove(ids)?;
                self.reservation.resize(self.store.memory_bytes())?;
                Ok(RemoveOutcome::Removed(removed))
            }
        }
    }

    fn export_to_host(&self) -> Result<HostIvfIndex, VectorError> {
        let host = self.store.clone();
        debug!(
            device = self.device_id(),
            vectors = host.len(),
            "Copied index to host"
        );
        Ok(host)
    }

    fn import_from_host(&self, host: &HostIvfIndex) -> Result<Self, VectorError> {
        if host.dimension() != self.dimension() {
            return Err(VectorError::DimensionMismatch {
                expected: self.dimension(),
                actual: host.dimension(),
            });
        }
        Self::from_host(&self.resources, host)
    }
}

/// Train on the host, then move the empty index to the device.
pub fn build_on_device(
    resources: &Arc<DeviceResources>,
    params: &IvfParams,
    train: &VectorSet,
) -> Result<DeviceIvfIndex, VectorError> {
    let host = HostIvfIndex::train(params, train)?;
    let index = DeviceIvfIndex::from_host(resources, &host)?;
    info!(
        device = resources.device_id(),
        kind = %index.kind(),
        nlist = host.nlist(),
        "Index resident on device"
    );
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::synthetic;

    fn ivf_on(resources: &Arc<DeviceResources>) -> DeviceIvfIndex {
        let train = synthetic(64, 8, 3).unwrap();
        let params = IvfParams::new(IndexKind::IvfFlat, 8, 4).with_training(3, 0);
        build_on_device(resources, &params, &train).unwrap()
    }

    #[test]
    fn test_reservation_released_on_drop() {
        let resources = DeviceResources::new(0, 1000);
        {
            let _a = resources.reserve(600).unwrap();
            assert_eq!(resources.used_bytes(), 600);
            assert!(matches!(
                resources.reserve(500),
                Err(VectorError::DeviceMemory { available: 400, .. })
            ));
        }
        assert_eq!(resources.used_bytes(), 0);
        assert!(resources.reserve(1000).is_ok());
    }

    #[test]
    fn test_reservation_resize() {
        let resources = DeviceResources::new(1, 100);
        let mut r = resources.reserve(10).unwrap();
        r.resize(90).unwrap();
        assert_eq!(resources.used_bytes(), 90);
        assert!(r.resize(101).is_err());
        assert_eq!(r.bytes(), 90);
        r.resize(5).unwrap();
        assert_eq!(resources.used_bytes(), 5);
    }

    #[test]
    fn test_ivf_remove_unsupported() {
        let resources = DeviceResources::unlimited(0);
        let mut index = ivf_on(&resources);
        let data = synthetic(10, 8, 4).unwrap();
        index.admit(&data.all()).unwrap();

        let outcome = index.attempt_remove(&IdRange::with_len(0, 5)).unwrap();
        assert_eq!(outcome, RemoveOutcome::Unsupported);
        assert_eq!(index.len(), 10);
    }

    #[test]
    fn test_flat_remove_native() {
        let resources = DeviceResources::unlimited(0);
        let mut index = DeviceIvfIndex::from_host(&resources, &HostIvfIndex::flat(8)).unwrap();
        let data = synthetic(10, 8, 4).unwrap();
        index.admit(&data.all()).unwrap();
        let before = resources.used_bytes();

        let outcome = index.attempt_remove(&IdRange::with_len(0, 4)).unwrap();
        assert_eq!(outcome, RemoveOutcome::Removed(4));
        assert_eq!(index.len(), 6);
        assert!(resources.used_bytes() < before);
    }

    #[test]
    fn test_export_import_preserves_ids() {
        let resources = DeviceResources::unlimited(0);
        let mut index = ivf_on(&resources);
        let data = synthetic(30, 8, 4).unwrap();
        index.admit(&data.all()).unwrap();

        let host = index.export_to_host().unwrap();
        let copy = index.import_from_host(&host).unwrap();
        assert_eq!(copy.len(), 30);
        assert_eq!(copy.next_id(), 30);
        assert_eq!(copy.id_bounds(), index.id_bounds());
        assert_eq!(resources.used_bytes(), 2 * index.resident_bytes());

        drop(index);
        assert_eq!(resources.used_bytes(), copy.resident_bytes());
    }

    #[test]
    fn test_import_without_room_is_transfer_error() {
        let resources = DeviceResources::new(0, 0);
        let index = ivf_on(&resources);
        let host = index.export_to_host().unwrap();

        let tight = DeviceResources::new(0, index.resident_bytes() / 2);
        let result = DeviceIvfIndex::from_host(&tight, &host);
        assert!(matches!(
            result,
            Err(VectorError::Transfer {
                direction: TransferDirection::ToDevice,
                ..
            })
        ));
        assert_eq!(tight.used_bytes(), 0);
    }

    #[test]
    fn test_admit_respects_capacity() {
        let resources = DeviceResources::new(0, 4 * (8 * 4 + 8));
        let mut index = DeviceIvfIndex::from_host(&resources, &HostIvfIndex::flat(8)).unwrap();
        let data = synthetic(5, 8, 4).unwrap();

        index.admit(&data.batch(0, 4).unwrap()).unwrap();
        let result = index.admit(&data.batch(4, 1).unwrap());
        assert!(matches!(result, Err(VectorError::DeviceMemory { .. })));
        assert_eq!(index.len(), 4);
    }

    #[test]
    fn test_device_search() {
        let resources = DeviceResources::unlimited(2);
        let mut index = ivf_on(&resources);
        let data = synthetic(20, 8, 4).unwrap();
        index.admit(&data.all()).unwrap();

        let query = data.batch(9, 1).unwrap().vector(0).unwrap().to_vec();
        let hits = index.search(&query, 1, 4).unwrap();
        assert_eq!(hits[0].0, 9);
        assert_eq!(index.device_id(), 2);
    }
}
