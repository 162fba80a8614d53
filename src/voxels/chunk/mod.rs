//! # Chunk Module
//!
//! This module provides the `Chunk` struct: a cubic grid of
//! `CHUNK_DIMENSION`³ blocks addressed by a chunk-grid position.
//!
//! ## Lifecycle
//!
//! A chunk starts out unpopulated (no grid). It is populated exactly once,
//! from the cache, the region store, or the terrain generator, after which
//! gameplay edits mutate it in place. Populating twice is a reported no-op.
//!
//! ## Storage
//!
//! Blocks live in a flat, boxed array indexed `x * PLANE + y * DIM + z`. This
//! is the same nested x, y, z order the region file uses, so a record is the
//! grid written front to back.
//!
//! ## World back-reference
//!
//! Each chunk keeps a weak [`WorldHandle`] to the world that owns it. The
//! handle is only used for neighbor lookups and dirty marking; it never keeps
//! the world alive.
//!
//! ## Identity
//!
//! Every `Chunk` value gets a process-unique [`Chunk::id`] when it is created.
//! A chunk pruned and later reloaded at the same position is a new instance
//! with a new id, which lets results computed for the old instance be told
//! apart from those of the new one.

use std::sync::atomic::{AtomicU64, Ordering};

use cgmath::{Point3, Vector3};

use super::block::block_overlay::BlockOverlay;
use super::block::block_side::BlockSide;
use super::block::block_type::BlockType;
use super::block::Block;
use super::world::WorldHandle;
use crate::error::{Result, StreamError};

pub mod chunk_iteration;
pub mod neighbors;

/// The dimension (width, height, depth) of a chunk in blocks.
pub const CHUNK_DIMENSION: i32 = 16;
/// The number of blocks in a single 2D plane of a chunk (CHUNK_DIMENSION²).
pub const CHUNK_PLANE_SIZE: i32 = CHUNK_DIMENSION * CHUNK_DIMENSION;
/// The total number of blocks in a chunk (CHUNK_DIMENSION³).
pub const CHUNK_SIZE: i32 = CHUNK_PLANE_SIZE * CHUNK_DIMENSION;

/// The flat block storage of one chunk.
pub type BlockGrid = [Block; CHUNK_SIZE as usize];

static NEXT_CHUNK_ID: AtomicU64 = AtomicU64::new(1);

/// Allocates a grid filled with air.
pub fn empty_grid() -> Box<BlockGrid> {
    Box::new([Block::AIR; CHUNK_SIZE as usize])
}

/// Converts a world block coordinate into the chunk containing it.
pub fn chunk_pos_of(world_block_pos: Point3<i32>) -> Point3<i32> {
    Point3::new(
        world_block_pos.x.div_euclid(CHUNK_DIMENSION),
        world_block_pos.y.div_euclid(CHUNK_DIMENSION),
        world_block_pos.z.div_euclid(CHUNK_DIMENSION),
    )
}

/// Maps one local coordinate to the chunk step it crosses (-1, 0, +1).
fn neighbor_chunk_offset(value: i32) -> i32 {
    if value < 0 {
        -1
    } else if value >= CHUNK_DIMENSION {
        1
    } else {
        0
    }
}

/// Maps one local coordinate to its index inside the neighboring chunk.
fn neighbor_block_index(value: i32) -> i32 {
    if value < 0 {
        CHUNK_DIMENSION - 1
    } else if value >= CHUNK_DIMENSION {
        0
    } else {
        value
    }
}

/// Splits a local position that may lie one step outside the grid into the
/// chunk offset it falls in and the wrapped local position inside that chunk.
///
/// Only positions within one block of the grid are meaningful; the wrap is to
/// the facing edge (`CHUNK_DIMENSION - 1` or `0`).
pub fn resolve_local(local: Point3<i32>) -> (Vector3<i32>, Point3<i32>) {
    (
        Vector3::new(
            neighbor_chunk_offset(local.x),
            neighbor_chunk_offset(local.y),
            neighbor_chunk_offset(local.z),
        ),
        Point3::new(
            neighbor_block_index(local.x),
            neighbor_block_index(local.y),
            neighbor_block_index(local.z),
        ),
    )
}

/// Represents a cubic collection of voxel blocks in the world.
pub struct Chunk {
    /// The position of this chunk in chunk coordinates (not block coordinates).
    pub position: Point3<i32>,

    /// The block grid, `None` until the chunk is populated.
    blocks: Option<Box<BlockGrid>>,

    /// Non-owning link back to the world, used for neighbor lookups only.
    world: WorldHandle,

    id: u64,
}

impl Chunk {
    /// Creates an unpopulated chunk owned by the world behind `world`.
    pub fn new(position: Point3<i32>, world: WorldHandle) -> Self {
        Chunk {
            position,
            blocks: None,
            world,
            id: NEXT_CHUNK_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Creates an unpopulated chunk that belongs to no world.
    ///
    /// Neighbor lookups from a detached chunk always miss.
    pub fn detached(position: Point3<i32>) -> Self {
        Self::new(position, WorldHandle::dangling())
    }

    /// The instance id, unique among all chunks created by this process.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The block-coordinate origin of this chunk.
    pub fn world_pos(&self) -> Point3<i32> {
        Point3::new(
            self.position.x * CHUNK_DIMENSION,
            self.position.y * CHUNK_DIMENSION,
            self.position.z * CHUNK_DIMENSION,
        )
    }

    /// The weak link to the owning world.
    pub fn world(&self) -> &WorldHandle {
        &self.world
    }

    /// Returns true once a grid has been adopted.
    pub fn is_populated(&self) -> bool {
        self.blocks.is_some()
    }

    /// Allocates an all-air grid.
    ///
    /// # Returns
    /// `false` without touching anything if the chunk was already populated.
    pub fn populate(&mut self) -> bool {
        self.adopt(empty_grid())
    }

    /// Installs `grid` as this chunk's blocks.
    ///
    /// # Returns
    /// `false` if the chunk was already populated; `grid` is dropped.
    pub fn adopt(&mut self, grid: Box<BlockGrid>) -> bool {
        if self.is_populated() {
            return false;
        }
        self.blocks = Some(grid);
        true
    }

    /// The block grid, or `None` while unpopulated.
    pub fn blocks(&self) -> Option<&BlockGrid> {
        self.blocks.as_deref()
    }

    /// Returns true if `local` addresses a cell of this chunk's grid.
    pub fn contains_local(local: Point3<i32>) -> bool {
        let range = 0..CHUNK_DIMENSION;
        range.contains(&local.x) && range.contains(&local.y) && range.contains(&local.z)
    }

    /// Flat grid index of an in-grid local position.
    pub fn index_of(local: Point3<usize>) -> usize {
        let dimension = CHUNK_DIMENSION as usize;
        local.x * dimension * dimension + local.y * dimension + local.z
    }

    fn checked_index(local: Point3<i32>) -> Result<usize> {
        if !Self::contains_local(local) {
            return Err(StreamError::BlockOutOfGrid(local));
        }
        Ok(Self::index_of(local.map(|c| c as usize)))
    }

    /// Reads the block at a local position.
    ///
    /// # Errors
    /// `BlockOutOfGrid` for positions outside the grid, `Unpopulated` if the
    /// chunk has no blocks yet.
    pub fn block_at(&self, local: Point3<i32>) -> Result<Block> {
        let index = Self::checked_index(local)?;
        let blocks = self
            .blocks
            .as_ref()
            .ok_or(StreamError::Unpopulated(self.position))?;
        Ok(blocks[index])
    }

    /// Overwrites a block without any dirty bookkeeping.
    pub fn set_block_at(&mut self, local: Point3<i32>, block: Block) -> Result<()> {
        let index = Self::checked_index(local)?;
        let position = self.position;
        let blocks = self
            .blocks
            .as_mut()
            .ok_or(StreamError::Unpopulated(position))?;
        blocks[index] = block;
        Ok(())
    }

    /// Changes a block's material, resets its overlay, and marks this chunk and
    /// every live neighbor sharing the touched face dirty.
    pub fn set_block_type(&mut self, local: Point3<i32>, block_type: BlockType) -> Result<()> {
        self.set_block_at(local, Block::new(block_type))?;

        let mut touched = vec![self.position];
        for side in BlockSide::all() {
            let across = local + side.offset();
            if !Self::contains_local(across) {
                touched.push(self.position + side.offset());
            }
        }
        self.world.mark_dirty(&touched);
        Ok(())
    }

    /// Changes a block's overlay and marks only this chunk dirty.
    pub fn set_block_overlay(&mut self, local: Point3<i32>, overlay: BlockOverlay) -> Result<()> {
        let mut block = self.block_at(local)?;
        block.overlay = overlay;
        self.set_block_at(local, block)?;
        self.world.mark_dirty(&[self.position]);
        Ok(())
    }

    /// Copies the block types of the layer touching `side`.
    ///
    /// The layer is indexed by [`neighbors::layer_index`]. `None` while the
    /// chunk is unpopulated.
    pub fn boundary_layer(&self, side: BlockSide) -> Option<Box<neighbors::BoundaryLayer>> {
        let blocks = self.blocks.as_ref()?;
        let edge = CHUNK_DIMENSION as usize - 1;
        let mut layer = Box::new([BlockType::AIR; CHUNK_PLANE_SIZE as usize]);
        let dimension = CHUNK_DIMENSION as usize;

        for a in 0..dimension {
            for b in 0..dimension {
                let local = match side {
                    BlockSide::LEFT => Point3::new(0, a, b),
                    BlockSide::RIGHT => Point3::new(edge, a, b),
                    BlockSide::BOTTOM => Point3::new(a, 0, b),
                    BlockSide::TOP => Point3::new(a, edge, b),
                    BlockSide::BACK => Point3::new(a, b, 0),
                    BlockSide::FRONT => Point3::new(a, b, edge),
                };
                layer[neighbors::layer_index(side, local)] = blocks[Self::index_of(local)].block_type;
            }
        }

        Some(layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn populate_is_idempotent() {
        let mut chunk = Chunk::detached(Point3::new(0, 0, 0));
        assert!(!chunk.is_populated());
        assert!(chunk.populate());
        chunk
            .set_block_at(Point3::new(1, 2, 3), Block::new(BlockType::STONE))
            .unwrap();

        assert!(!chunk.populate());
        assert!(!chunk.adopt(empty_grid()));
        assert_eq!(
            chunk.block_at(Point3::new(1, 2, 3)).unwrap().block_type,
            BlockType::STONE
        );
    }

    #[test]
    fn out_of_grid_access_is_an_addressing_error() {
        let mut chunk = Chunk::detached(Point3::new(0, 0, 0));
        chunk.populate();
        let err = chunk.block_at(Point3::new(CHUNK_DIMENSION, 0, 0)).unwrap_err();
        assert!(err.is_addressing());
        assert!(chunk
            .set_block_at(Point3::new(0, -1, 0), Block::AIR)
            .unwrap_err()
            .is_addressing());
    }

    #[test]
    fn unpopulated_reads_fail() {
        let chunk = Chunk::detached(Point3::new(3, 0, 0));
        assert!(matches!(
            chunk.block_at(Point3::new(0, 0, 0)),
            Err(StreamError::Unpopulated(_))
        ));
        assert!(chunk.blocks().is_none());
    }

    #[test]
    fn every_instance_gets_its_own_id() {
        let first = Chunk::detached(Point3::new(2, 0, 2));
        let second = Chunk::detached(Point3::new(2, 0, 2));
        assert_ne!(first.id(), second.id());
        assert_eq!(first.id(), first.id());
    }

    #[test]
    fn world_pos_scales_by_dimension() {
        let chunk = Chunk::detached(Point3::new(-1, 2, 3));
        assert_eq!(
            chunk.world_pos(),
            Point3::new(-CHUNK_DIMENSION, 2 * CHUNK_DIMENSION, 3 * CHUNK_DIMENSION)
        );
    }

    #[test]
    fn chunk_pos_of_floors_negative_coordinates() {
        assert_eq!(chunk_pos_of(Point3::new(0, 15, 16)), Point3::new(0, 0, 1));
        assert_eq!(chunk_pos_of(Point3::new(-1, -16, -17)), Point3::new(-1, -1, -2));
    }

    #[test]
    fn resolve_local_wraps_to_facing_edge() {
        let edge = CHUNK_DIMENSION - 1;
        assert_eq!(
            resolve_local(Point3::new(-1, 4, CHUNK_DIMENSION)),
            (Vector3::new(-1, 0, 1), Point3::new(edge, 4, 0))
        );
        assert_eq!(
            resolve_local(Point3::new(2, 3, 4)),
            (Vector3::new(0, 0, 0), Point3::new(2, 3, 4))
        );
    }

    #[test]
    fn overlay_edit_keeps_type() {
        let mut chunk = Chunk::detached(Point3::new(0, 0, 0));
        chunk.populate();
        let local = Point3::new(0, 0, 0);
        chunk.set_block_type(local, BlockType::DIRT).unwrap();
        chunk.set_block_overlay(local, BlockOverlay::CRACK2).unwrap();
        let block = chunk.block_at(local).unwrap();
        assert_eq!(block.block_type, BlockType::DIRT);
        assert_eq!(block.overlay, BlockOverlay::CRACK2);

        chunk.set_block_type(local, BlockType::STONE).unwrap();
        assert_eq!(chunk.block_at(local).unwrap().overlay, BlockOverlay::NONE);
    }
}
