//! # Chunk Iteration Module
//!
//! Walks every local position of a chunk in the grid's storage order: `x`
//! outermost, then `y`, then `z` innermost. The region file format and the flat
//! block grid both use this order, so the n-th position yielded is always the
//! n-th entry of the grid.

use cgmath::Point3;

use super::{CHUNK_DIMENSION, CHUNK_SIZE};

/// An iterator over all local block positions of a chunk.
pub struct ChunkPositionIterator {
    /// Flat index of the next position to yield
    next_index: usize,
}

impl ChunkPositionIterator {
    /// Starts at local position `(0, 0, 0)`.
    pub fn new() -> Self {
        ChunkPositionIterator { next_index: 0 }
    }
}

impl Default for ChunkPositionIterator {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for ChunkPositionIterator {
    type Item = Point3<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_index >= CHUNK_SIZE as usize {
            return None;
        }

        let dimension = CHUNK_DIMENSION as usize;
        let index = self.next_index;
        self.next_index += 1;

        Some(Point3::new(
            index / (dimension * dimension),
            (index / dimension) % dimension,
            index % dimension,
        ))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = CHUNK_SIZE as usize - self.next_index.min(CHUNK_SIZE as usize);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ChunkPositionIterator {}
