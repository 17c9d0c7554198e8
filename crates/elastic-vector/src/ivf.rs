//! Host-memory IVF-flat index.
//!
//! Vectors are grouped into inverted lists by nearest coarse centroid.
//! Identifiers are assigned sequentially and never reused: removal does not
//! rewind `next_id`.

use rayon::prelude::*;
use tracing::{debug, info};

use elastic_types::IndexKind;

use crate::batch::{IdRange, VectorBatch};
use crate::dataset::VectorSet;
use crate::error::VectorError;
use crate::index::HostIndex;
use crate::kmeans;

/// Construction parameters
#[derive(Debug, Clone)]
pub struct IvfParams {
    pub kind: IndexKind,
    /// Vector width
    pub dim: usize,
    /// Partition count (ignored for `Flat`)
    pub nlist: usize,
    /// Lloyd iterations
    pub train_iterations: usize,
    /// Training sample cap (0 = all)
    pub max_train_points: usize,
    pub seed: u64,
}

impl IvfParams {
    pub fn new(kind: IndexKind, dim: usize, nlist: usize) -> Self {
        Self {
            kind,
            dim,
            nlist,
            train_iterations: 10,
            max_train_points: 0,
            seed: 1337,
        }
    }

    pub fn with_training(mut self, iterations: usize, max_points: usize) -> Self {
        self.train_iterations = iterations;
        self.max_train_points = max_points;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

#[derive(Debug, Clone, Default)]
struct InvertedList {
    ids: Vec<u64>,
    vectors: Vec<f32>,
}

/// IVF-flat index held in host memory.
#[derive(Debug, Clone)]
pub struct HostIvfIndex {
    kind: IndexKind,
    dim: usize,
    /// Empty for `Flat`
    centroids: Vec<f32>,
    lists: Vec<InvertedList>,
    next_id: u64,
    len: usize,
}

impl HostIvfIndex {
    /// Train partitions on `train` and return an empty index.
    pub fn train(params: &IvfParams, train: &VectorSet) -> Result<Self, VectorError> {
        if train.dimension() != params.dim {
            return Err(VectorError::DimensionMismatch {
                expected: params.dim,
                actual: train.dimension(),
            });
        }
        match params.kind {
            IndexKind::Flat => Ok(Self::flat(params.dim)),
            IndexKind::IvfFlat => {
                let centroids = kmeans::train(
                    train.as_slice(),
                    params.dim,
                    params.nlist,
                    params.train_iterations,
                    params.max_train_points,
                    params.seed,
                )?;
                Ok(Self::from_centroids(params.dim, centroids))
            }
        }
    }

    /// Empty exhaustive index with a single list.
    pub fn flat(dim: usize) -> Self {
        Self {
            kind: IndexKind::Flat,
            dim,
            centroids: Vec::new(),
            lists: vec![InvertedList::default()],
            next_id: 0,
            len: 0,
        }
    }

    /// Empty IVF index over pre-trained centroids.
    pub fn from_centroids(dim: usize, centroids: Vec<f32>) -> Self {
        let nlist = centroids.len() / dim.max(1);
        info!(dim, nlist, "Created IVF-flat index");
        Self {
            kind: IndexKind::IvfFlat,
            dim,
            centroids,
            lists: vec![InvertedList::default(); nlist],
            next_id: 0,
            len: 0,
        }
    }

    pub fn kind(&self) -> IndexKind {
        self.kind
    }

    pub fn dimension(&self) -> usize {
        self.dim
    }

    pub fn nlist(&self) -> usize {
        self.lists.len()
    }

    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Append a batch, assigning identifiers `[next_id, next_id + len)`.
    pub fn add(&mut self, batch: &VectorBatch<'_>) -> Result<IdRange, VectorError> {
        if batch.dimension() != self.dim {
            return Err(VectorError::DimensionMismatch {
                expected: self.dim,
                actual: batch.dimension(),
            });
        }

        let assignment = if self.centroids.is_empty() {
            vec![0; batch.len()]
        } else {
            kmeans::assign(&self.centroids, self.dim, batch.as_slice())
        };

        let first = self.next_id;
        for (i, (v, &list)) in batch.vectors().zip(assignment.iter()).enumerate() {
            let inv = &mut self.lists[list];
            inv.ids.push(first + i as u64);
            inv.vectors.extend_from_slice(v);
        }

        let range = IdRange::with_len(first, batch.len());
        self.next_id = range.end;
        self.len += batch.len();
        debug!(start = range.start, end = range.end, "Added batch");
        Ok(range)
    }

    /// True when `id` is resident.
    pub fn contains(&self, id: u64) -> bool {
        self.lists.par_iter().any(|l| l.ids.contains(&id))
    }

    /// Smallest range covering every resident identifier.
    pub fn id_bounds(&self) -> Option<IdRange> {
        let min = self.lists.iter().filter_map(|l| l.ids.iter().min()).min()?;
        let max = self.lists.iter().filter_map(|l| l.ids.iter().max()).max()?;
        Some(IdRange::with_len(*min, (max - min + 1) as usize))
    }

    /// Bytes a device copy of this index occupies.
    pub fn memory_bytes(&self) -> u64 {
        let centroid_bytes = (self.centroids.len() * 4) as u64;
        let per_vector = (self.dim * 4 + 8) as u64;
        centroid_bytes + per_vector * self.len as u64
    }

    /// Bytes one more batch of `n` vectors adds.
    pub fn batch_bytes(&self, n: usize) -> u64 {
        ((self.dim * 4 + 8) * n) as u64
    }

    /// The `k` nearest resident vectors to `query`, scanning the `nprobe`
    /// closest lists. Returns `(id, squared distance)` pairs, closest first.
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        nprobe: usize,
    ) -> Result<Vec<(u64, f32)>, VectorError> {
        if query.len() != self.dim {
            return Err(VectorError::DimensionMismatch {
                expected: self.dim,
                actual: query.len(),
            });
        }

        let probe: Vec<usize> = if self.centroids.is_empty() {
            vec![0]
        } else {
            let mut order: Vec<(usize, f32)> = self
                .centroids
                .chunks_exact(self.dim)
                .enumerate()
                .map(|(i, c)| (i, kmeans::l2_squared(c, query)))
                .collect();
            order.sort_by(|a, b| a.1.total_cmp(&b.1));
            order
                .into_iter()
                .take(nprobe.max(1))
                .map(|(i, _)| i)
                .collect()
        };

        let dim = self.dim;
        let lists = &self.lists;
        let mut hits: Vec<(u64, f32)> = probe
            .par_iter()
            .flat_map_iter(move |&list| {
                let inv = &lists[list];
                inv.ids
                    .iter()
                    .zip(inv.vectors.chunks_exact(dim))
                    .map(move |(&id, v)| (id, kmeans::l2_squared(v, query)))
            })
            .collect();
        hits.sort_by(|a, b| a.1.total_cmp(&b.1));
        hits.truncate(k);
        Ok(hits)
    }
}

impl HostIndex for HostIvfIndex {
    fn len(&self) -> usize {
        self.len
    }

    fn remove(&mut self, ids: &IdRange) -> Result<usize, VectorError> {
        if ids.end > self.next_id {
            return Err(VectorError::InvalidIdentifier(format!(
                "range [{}, {}) reaches past last assigned id {}",
                ids.start, ids.end, self.next_id
            )));
        }

        let dim = self.dim;
        let removed: usize = self
            .lists
            .par_iter_mut()
            .map(|inv| {
                let before = inv.ids.len();
                let mut keep = 0;
                for i in 0..before {
                    if ids.contains(inv.ids[i]) {
                        continue;
                    }
                    if keep != i {
                        inv.ids[keep] = inv.ids[i];
                        inv.vectors.copy_within(i * dim..(i + 1) * dim, keep * dim);
                    }
                    keep += 1;
                }
                inv.ids.truncate(keep);
                inv.vectors.truncate(keep * dim);
                before - keep
            })
            .sum();

        self.len -= removed;
        debug!(start = ids.start, end = ids.end, removed, "Removed ids");
        Ok(removed)
    }
}
