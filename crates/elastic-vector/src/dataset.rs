//! Fixed-record vector files (`.fvecs` / `.ivecs`).
//!
//! Each record is a little-endian `i32` dimension `d` followed by `d`
//! little-endian 4-byte values. Records are packed with no padding.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::batch::VectorBatch;
use crate::error::VectorError;

/// Dense set of `f32` vectors, stored row-major.
#[derive(Debug, Clone)]
pub struct VectorSet {
    dim: usize,
    data: Vec<f32>,
}

impl VectorSet {
    pub fn new(dim: usize, data: Vec<f32>) -> Result<Self, VectorError> {
        if dim == 0 || data.len() % dim != 0 {
            return Err(VectorError::Format(format!(
                "{} floats do not form {}-d vectors",
                data.len(),
                dim
            )));
        }
        Ok(Self { dim, data })
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

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Borrow `count` vectors starting at `offset`.
    ///
    /// Returns `None` when the set holds fewer than `offset + count` vectors.
    pub fn batch(&self, offset: usize, count: usize) -> Option<VectorBatch<'_>> {
        let end = offset.checked_add(count)?;
        if end > self.len() {
            return None;
        }
        let slice = &self.data[offset * self.dim..end * self.dim];
        Some(VectorBatch::from_validated(offset, self.dim, slice))
    }

    /// Borrow the whole set as one batch.
    pub fn all(&self) -> VectorBatch<'_> {
        VectorBatch::from_validated(0, self.dim, &self.data)
    }
}

/// Dense set of `i32` rows, e.g. ground-truth neighbor lists.
#[derive(Debug, Clone)]
pub struct IvecsSet {
    pub dim: usize,
    pub data: Vec<i32>,
}

impl IvecsSet {
    pub fn len(&self) -> usize {
        self.data.len() / self.dim
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn row(&self, i: usize) -> Option<&[i32]> {
        self.data.get(i * self.dim..(i + 1) * self.dim)
    }
}

/// Read up to `limit` records as raw 32-bit words.
fn read_records(path: &Path, limit: Option<usize>) -> Result<(usize, Vec<u32>), VectorError> {
    let file = File::open(path)?;
    let file_len = file.metadata()?.len();
    if file_len < 4 {
        return Err(VectorError::Format(format!(
            "{}: file too short ({} bytes)",
            path.display(),
            file_len
        )));
    }

    let mut reader = BufReader::new(file);
    let dim = reader.read_i32::<LittleEndian>()?;
    if dim <= 0 {
        return Err(VectorError::Format(format!(
            "{}: invalid dimension {}",
            path.display(),
            dim
        )));
    }
    let dim = dim as usize;
    let record_bytes = ((dim + 1) * 4) as u64;
    if file_len % record_bytes != 0 {
        return Err(VectorError::Format(format!(
            "{}: length {} is not a multiple of record size {}",
            path.display(),
            file_len,
            record_bytes
        )));
    }

    let available = (file_len / record_bytes) as usize;
    let count = limit.map_or(available, |l| l.min(available));
    let mut words = vec![0u32; count * dim];

    for (i, row) in words.chunks_exact_mut(dim).enumerate() {
        if i > 0 {
            let d = reader.read_i32::<LittleEndian>()?;
            if d as usize != dim {
                return Err(VectorError::Format(format!(
                    "{}: record {} has dimension {}, expected {}",
                    path.display(),
                    i,
                    d,
                    dim
                )));
            }
        }
        reader.read_u32_into::<LittleEndian>(row)?;
    }

    debug!(path = ?path, dim, count, available, "Read vector records");
    Ok((dim, words))
}

/// Read an `.fvecs` file, reinterpreting each value's bits as `f32`.
pub fn read_fvecs(path: impl AsRef<Path>, limit: Option<usize>) -> Result<VectorSet, VectorError> {
    let path = path.as_ref();
    let (dim, words) = read_records(path, limit)?;
    let data = words.into_iter().map(f32::from_bits).collect();
    let set = VectorSet::new(dim, data)?;
    info!(path = ?path, dim, vectors = set.len(), "Loaded fvecs");
    Ok(set)
}

/// Read an `.ivecs` file.
pub fn read_ivecs(path: impl AsRef<Path>, limit: Option<usize>) -> Result<IvecsSet, VectorError> {
    let (dim, words) = read_records(path.as_ref(), limit)?;
    Ok(IvecsSet {
        dim,
        data: words.into_iter().map(|w| w as i32).collect(),
    })
}

/// Write a set in `.fvecs` layout.
pub fn write_fvecs(path: impl AsRef<Path>, set: &VectorSet) -> Result<(), VectorError> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    for row in set.as_slice().chunks_exact(set.dim) {
        writer.write_i32::<LittleEndian>(set.dim as i32)?;
        for &value in row {
            writer.write_f32::<LittleEndian>(value)?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Reproducible clustered data for runs without SIFT files.
///
/// Points are scattered around 32 random centers in `[0, 128)^dim`.
pub fn synthetic(n: usize, dim: usize, seed: u64) -> Result<VectorSet, VectorError> {
    const CENTERS: usize = 32;
    let mut rng = StdRng::seed_from_u64(seed);
    let centers: Vec<f32> = (0..CENTERS * dim)
        .map(|_| rng.random_range(0.0..128.0))
        .collect();

    let mut data = Vec::with_capacity(n * dim);
    for _ in 0..n {
        let c = rng.random_range(0..CENTERS);
        for j in 0..dim {
            let noise: f32 = rng.random_range(-8.0..8.0);
            data.push(centers[c * dim + j] + noise);
        }
    }
    VectorSet::new(dim, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_raw(path: &Path, records: &[(i32, Vec<u32>)]) {
        let mut bytes = Vec::new();
        for (d, values) in records {
            bytes.extend_from_slice(&d.to_le_bytes());
            for v in values {
                bytes.extend_from_slice(&v.to_le_bytes());
            }
        }
        std::fs::write(path, bytes).unwrap();
    }

    #[test]
    fn test_fvecs_write_then_read() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("base.fvecs");
        let set = synthetic(20, 8, 7).unwrap();
        write_fvecs(&path, &set).unwrap();

        let loaded = read_fvecs(&path, None).unwrap();
        assert_eq!(loaded.dimension(), 8);
        assert_eq!(loaded.len(), 20);
        assert_eq!(loaded.as_slice(), set.as_slice());
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 20 * 9 * 4);
    }

    #[test]
    fn test_fvecs_limit() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("base.fvecs");
        write_fvecs(&path, &synthetic(10, 4, 1).unwrap()).unwrap();

        assert_eq!(read_fvecs(&path, Some(3)).unwrap().len(), 3);
        assert_eq!(read_fvecs(&path, Some(100)).unwrap().len(), 10);
    }

    #[test]
    fn test_ivecs_read() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("gt.ivecs");
        write_raw(&path, &[(2, vec![5, 9]), (2, vec![1, 0xFFFF_FFFF])]);

        let set = read_ivecs(&path, None).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.row(0), Some(&[5, 9][..]));
        assert_eq!(set.row(1), Some(&[1, -1][..]));
    }

    #[test]
    fn test_fvecs_bit_reinterpretation() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bits.fvecs");
        write_raw(&path, &[(2, vec![1.5f32.to_bits(), (-2.0f32).to_bits()])]);

        let set = read_fvecs(&path, None).unwrap();
        assert_eq!(set.as_slice(), &[1.5, -2.0]);
    }

    #[test]
    fn test_truncated_file_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.fvecs");
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&2i32.to_le_bytes());
        bytes.extend_from_slice(&1.0f32.to_le_bytes());
        bytes.extend_from_slice(&2.0f32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 5]);
        std::fs::write(&path, bytes).unwrap();

        assert!(matches!(
            read_fvecs(&path, None),
            Err(VectorError::Format(_))
        ));
    }

    #[test]
    fn test_inconsistent_dimension_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("mixed.fvecs");
        // Same byte length per record, but the second header lies.
        write_raw(&path, &[(2, vec![0, 0]), (3, vec![0, 0])]);

        assert!(matches!(
            read_fvecs(&path, None),
            Err(VectorError::Format(_))
        ));
    }

    #[test]
    fn test_empty_file_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("empty.fvecs");
        std::fs::write(&path, b"").unwrap();

        assert!(matches!(
            read_fvecs(&path, None),
            Err(VectorError::Format(_))
        ));
    }

    #[test]
    fn test_zero_dimension_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("zero.fvecs");
        write_raw(&path, &[(0, vec![]), (0, vec![])]);

        assert!(matches!(
            read_fvecs(&path, None),
            Err(VectorError::Format(_))
        ));
        assert!(matches!(
            read_ivecs(&path, None),
            Err(VectorError::Format(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            read_fvecs("/nonexistent/sift_base.fvecs", None),
            Err(VectorError::Io(_))
        ));
    }

    #[test]
    fn test_batch_bounds() {
        let set = synthetic(10, 4, 3).unwrap();
        let batch = set.batch(6, 4).unwrap();
        assert_eq!(batch.len(), 4);
        assert_eq!(batch.offset(), 6);
        assert_eq!(batch.vector(0).unwrap(), &set.as_slice()[24..28]);
        assert!(set.batch(7, 4).is_none());
        assert!(set.batch(usize::MAX, 2).is_none());
        assert_eq!(set.all().len(), 10);
    }

    #[test]
    fn test_synthetic_is_reproducible() {
        let a = synthetic(50, 16, 42).unwrap();
        let b = synthetic(50, 16, 42).unwrap();
        let c = synthetic(50, 16, 43).unwrap();
        assert_eq!(a.as_slice(), b.as_slice());
        assert_ne!(a.as_slice(), c.as_slice());
    }
}
