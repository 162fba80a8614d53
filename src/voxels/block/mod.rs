//! # Block Module
//!
//! This module provides the block value type: a material plus a damage overlay.
//! Blocks carry no identity; a chunk is simply a grid of them.

use block_overlay::BlockOverlay;
use block_type::BlockType;

pub mod block_overlay;
pub mod block_side;
pub mod block_type;

/// The underlying integer type used for block type and overlay codes on disk.
pub type BlockTypeSize = i16;

/// Represents a single voxel block in the world.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Block {
    /// The material of this block.
    pub block_type: BlockType,
    /// The damage stage drawn over the material.
    pub overlay: BlockOverlay,
}

impl Block {
    /// The empty block every fresh grid is filled with.
    pub const AIR: Block = Block {
        block_type: BlockType::AIR,
        overlay: BlockOverlay::NONE,
    };

    /// Creates an undamaged block of the specified type.
    pub fn new(block_type: BlockType) -> Self {
        Block {
            block_type,
            overlay: BlockOverlay::NONE,
        }
    }

    /// Returns true if the block hides the faces of its neighbors.
    pub fn is_solid(&self) -> bool {
        self.block_type.is_solid()
    }
}
