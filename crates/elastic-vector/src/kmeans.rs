//! Lloyd's k-means for coarse partitioning.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::VectorError;

/// Squared Euclidean distance.
#[inline]
pub fn l2_squared(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Index of the centroid closest to `v`. `centroids` must be non-empty.
pub fn nearest(centroids: &[f32], dim: usize, v: &[f32]) -> usize {
    let mut best = 0;
    let mut best_dist = f32::INFINITY;
    for (i, c) in centroids.chunks_exact(dim).enumerate() {
        let d = l2_squared(c, v);
        if d < best_dist {
            best_dist = d;
            best = i;
        }
    }
    best
}

/// Assign every vector in `data` to its nearest centroid.
pub fn assign(centroids: &[f32], dim: usize, data: &[f32]) -> Vec<usize> {
    data.par_chunks_exact(dim)
        .map(|v| nearest(centroids, dim, v))
        .collect()
}

/// Train `k` centroids over `data` (row-major, `dim` wide).
///
/// `max_points` caps the sample used for training (0 = all).
pub fn train(
    data: &[f32],
    dim: usize,
    k: usize,
    iterations: usize,
    max_points: usize,
    seed: u64,
) -> Result<Vec<f32>, VectorError> {
    if dim == 0 || data.len() % dim != 0 {
        return Err(VectorError::Training(format!(
            "{} floats do not form {}-d vectors",
            data.len(),
            dim
        )));
    }
    let n = data.len() / dim;
    if k == 0 || n < k {
        return Err(VectorError::Training(format!(
            "need at least {k} training points, got {n}"
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);

    let sample: Vec<f32> = if max_points > 0 && n > max_points.max(k) {
        let picked = rand::seq::index::sample(&mut rng, n, max_points.max(k));
        let mut out = Vec::with_capacity(picked.len() * dim);
        for i in picked.iter() {
            out.extend_from_slice(&data[i * dim..(i + 1) * dim]);
        }
        debug!(from = n, to = picked.len(), "Subsampled training set");
        out
    } else {
        data.to_vec()
    };
    let n = sample.len() / dim;

    let mut centroids = Vec::with_capacity(k * dim);
    for i in rand::seq::index::sample(&mut rng, n, k).iter() {
        centroids.extend_from_slice(&sample[i * dim..(i + 1) * dim]);
    }

    for iteration in 0..iterations {
        let assignment = assign(&centroids, dim, &sample);

        let mut sums = vec![0.0f64; k * dim];
        let mut counts = vec![0usize; k];
        for (v, &c) in sample.chunks_exact(dim).zip(assignment.iter()) {
            counts[c] += 1;
            for (s, &x) in sums[c * dim..(c + 1) * dim].iter_mut().zip(v) {
                *s += x as f64;
            }
        }

        let mut reseeded = 0;
        for c in 0..k {
            let target = &mut centroids[c * dim..(c + 1) * dim];
            if counts[c] == 0 {
                let pick = rng.random_range(0..n);
                target.copy_from_slice(&sample[pick * dim..(pick + 1) * dim]);
                reseeded += 1;
                continue;
            }
            let inv = 1.0 / counts[c] as f64;
            for (t, s) in target.iter_mut().zip(&sums[c * dim..(c + 1) * dim]) {
                *t = (s * inv) as f32;
            }
        }
        debug!(iteration, reseeded, "k-means iteration");
    }

    info!(k, dim, points = n, iterations, "Trained coarse centroids");
    Ok(centroids)
}
