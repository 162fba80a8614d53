//! # Chunk Neighbors
//!
//! Cross-chunk addressing for the mesher. Before a chunk is meshed, the block
//! types of the six facing layers of its neighbors are copied out of the world.
//! The mesher then answers "what is across this face?" without holding any
//! neighbor lock, and a missing or unpopulated neighbor reads as open air.

use cgmath::Point3;

use super::{Chunk, CHUNK_DIMENSION, CHUNK_PLANE_SIZE};
use crate::voxels::block::block_side::BlockSide;
use crate::voxels::block::block_type::BlockType;
use crate::voxels::world::WorldHandle;

/// Block types of one face-layer of a chunk.
pub type BoundaryLayer = [BlockType; CHUNK_PLANE_SIZE as usize];

/// Index of an in-grid position within the layer perpendicular to `side`.
///
/// The two in-plane coordinates are taken in x, y, z order with the axis of
/// `side` dropped.
pub fn layer_index(side: BlockSide, local: Point3<usize>) -> usize {
    let dimension = CHUNK_DIMENSION as usize;
    let (a, b) = match side {
        BlockSide::LEFT | BlockSide::RIGHT => (local.y, local.z),
        BlockSide::BOTTOM | BlockSide::TOP => (local.x, local.z),
        BlockSide::BACK | BlockSide::FRONT => (local.x, local.y),
    };
    a * dimension + b
}

/// The side of a neighbor that faces back towards us.
fn facing(side: BlockSide) -> BlockSide {
    match side {
        BlockSide::FRONT => BlockSide::BACK,
        BlockSide::BACK => BlockSide::FRONT,
        BlockSide::BOTTOM => BlockSide::TOP,
        BlockSide::TOP => BlockSide::BOTTOM,
        BlockSide::LEFT => BlockSide::RIGHT,
        BlockSide::RIGHT => BlockSide::LEFT,
    }
}

/// A snapshot of the six layers bordering a chunk.
#[derive(Default)]
pub struct NeighborLayers {
    layers: [Option<Box<BoundaryLayer>>; 6],
}

impl NeighborLayers {
    /// A snapshot in which every neighbor is missing.
    pub fn open() -> Self {
        Self::default()
    }

    /// Copies the facing layers of every live, populated neighbor of `position`.
    ///
    /// Neighbor handles are cloned out of the world map first and locked one at
    /// a time afterwards, so the world lock is never held while a chunk lock is
    /// taken.
    pub fn gather(world: &WorldHandle, position: Point3<i32>) -> Self {
        let mut snapshot = Self::default();
        let Some(world) = world.upgrade() else {
            return snapshot;
        };

        let handles = {
            let data = world.get();
            BlockSide::all().map(|side| data.chunk_at(position + side.offset()))
        };

        for (side, handle) in BlockSide::all().into_iter().zip(handles) {
            if let Some(handle) = handle {
                snapshot.layers[side as usize] = handle.get().boundary_layer(facing(side));
            }
        }

        snapshot
    }

    /// Installs a neighbor layer directly.
    pub fn set(&mut self, side: BlockSide, neighbor: &Chunk) {
        self.layers[side as usize] = neighbor.boundary_layer(facing(side));
    }

    /// The block type on the far side of `side` from the edge cell `local`.
    ///
    /// `None` when that neighbor is missing or unpopulated.
    pub fn across(&self, side: BlockSide, local: Point3<usize>) -> Option<BlockType> {
        self.layers[side as usize]
            .as_ref()
            .map(|layer| layer[layer_index(side, local)])
    }
}
