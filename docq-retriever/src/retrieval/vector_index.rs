//! Flat brute-force vector index.
//!
//! Vectors live in one contiguous `Vec<f32>` and search is an exact
//! squared-L2 scan over every stored vector. Positions are stable:
//! the index is append-only, so position `i` always refers to the
//! `i`-th vector ever added.

use std::path::Path;

use tracing::debug;

use crate::error::{RetrieverError, Result};

/// Position filler for result slots beyond the stored vector count.
pub const NO_MATCH: i64 = -1;

/// Append-only flat index over fixed-dimension embeddings.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimension: usize,
    data: Vec<f32>,
    count: usize,
}

impl FlatIndex {
    pub fn new(dimension: usize) -> Self {
        assert!(dimension > 0, "index dimension must be positive");
        Self {
            dimension,
            data: Vec::new(),
            count: 0,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Appends a batch of vectors. Fails on the first vector whose
    /// length differs from the index dimension, without storing any
    /// vector from the batch.
    pub fn add(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        for vector in vectors {
            if vector.len() != self.dimension {
                return Err(RetrieverError::DimensionMismatch {
                    expected: self.dimension,
                    actual: vector.len(),
                });
            }
        }
        for vector in vectors {
            self.data.extend_from_slice(vector);
        }
        self.count += vectors.len();
        Ok(())
    }

    /// Returns the `k` nearest stored vectors as `(squared_distance,
    /// position)` pairs in ascending distance order. When fewer than
    /// `k` vectors are stored the result is padded to length `k`
    /// with `(f32::INFINITY, NO_MATCH)` sentinels.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(f32, i64)>> {
        if query.len() != self.dimension {
            return Err(RetrieverError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        let mut hits: Vec<(f32, i64)> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(pos, stored)| {
                let dist: f32 = query
                    .iter()
                    .zip(stored)
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum();
                (dist, pos as i64)
            })
            .collect();
        hits.sort_by(|a, b| a.0.total_cmp(&b.0));
        hits.truncate(k);
        hits.resize(k, (f32::INFINITY, NO_MATCH));
        Ok(hits)
    }

    /// Writes the index as a `u32` count, a `u32` dimension, then the
    /// raw `f32` vector data.
    pub async fn save(&self, path: &Path) -> std::io::Result<()> {
        let mut buf = Vec::with_capacity(8 + self.data.len() * 4);
        buf.extend_from_slice(&(self.count as u32).to_le_bytes());
        buf.extend_from_slice(&(self.dimension as u32).to_le_bytes());
        buf.extend_from_slice(bytemuck::cast_slice(&self.data));
        tokio::fs::write(path, buf).await
    }

    /// Reads an index previously written by [`FlatIndex::save`].
    pub async fn load(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        if bytes.len() < 8 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "index file shorter than header",
            ));
        }
        let count = u32::from_le_bytes(bytes[0..4].try_into().unwrap()) as usize;
        let dimension = u32::from_le_bytes(bytes[4..8].try_into().unwrap()) as usize;
        let expected = 8 + count * dimension * 4;
        if dimension == 0 || bytes.len() != expected {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!(
                    "index file length {} does not match header ({count} x {dimension})",
                    bytes.len()
                ),
            ));
        }
        let mut data = vec![0.0f32; count * dimension];
        bytemuck::cast_slice_mut::<f32, u8>(&mut data).copy_from_slice(&bytes[8..]);
        debug!(count, dimension, "loaded vector index");
        Ok(Self {
            dimension,
            data,
            count,
        })
    }
}
