//! # Block Type Module
//!
//! This module defines the material of a block and its on-disk code.

use num_derive::FromPrimitive;

use super::BlockTypeSize;

/// Enumerates all possible block materials in the voxel world.
///
/// The discriminants are the 16-bit codes stored in region files, so the order
/// of the variants is part of the file format.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, FromPrimitive)]
#[repr(i16)]
pub enum BlockType {
    /// Empty space. The only non-solid material.
    #[default]
    AIR = 0,

    /// The one-block-thick surface layer.
    GRASS = 1,

    /// Soil between the stone line and the surface.
    DIRT = 2,

    /// The bulk material below the stone line.
    STONE = 3,

    /// The indestructible world floor at `y == 0`.
    BEDROCK = 4,

    /// Ore found in a shallow band near the floor.
    REDSTONE = 5,

    /// Ore found in a deeper, wider band.
    DIAMOND = 6,

    /// Fills open space below the water line. Rendered translucent.
    WATER = 7,
}

impl BlockType {
    /// Every material in code order.
    pub const ALL: [BlockType; 8] = [
        BlockType::AIR,
        BlockType::GRASS,
        BlockType::DIRT,
        BlockType::STONE,
        BlockType::BEDROCK,
        BlockType::REDSTONE,
        BlockType::DIAMOND,
        BlockType::WATER,
    ];

    /// Decodes a stored type code; `None` for codes no variant uses.
    pub fn from_code(code: BlockTypeSize) -> Option<Self> {
        num::FromPrimitive::from_i16(code)
    }

    /// The code written to region files.
    pub fn code(self) -> BlockTypeSize {
        self as BlockTypeSize
    }

    /// Anything other than air occludes its neighbors' faces.
    pub fn is_solid(self) -> bool {
        self != BlockType::AIR
    }

    /// Water goes to the translucent mesh buffer.
    pub fn is_translucent(self) -> bool {
        self == BlockType::WATER
    }
}
