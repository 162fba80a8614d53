//! # Block Overlay Module
//!
//! Progressive damage state layered on top of a block's material. Keeping it
//! separate from [`BlockType`](super::block_type::BlockType) lets a half-broken
//! block survive re-meshing and persistence.

use num_derive::FromPrimitive;

use super::BlockTypeSize;

/// The crack stage drawn over a block.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, FromPrimitive)]
#[repr(i16)]
pub enum BlockOverlay {
    /// Undamaged.
    #[default]
    NONE = 0,
    /// First crack stage.
    CRACK1 = 1,
    /// Second crack stage.
    CRACK2 = 2,
    /// Third crack stage.
    CRACK3 = 3,
    /// Last stage; the next hit breaks the block.
    CRACK4 = 4,
}

impl BlockOverlay {
    /// Decodes a stored overlay code; `None` for codes no variant uses.
    pub fn from_code(code: BlockTypeSize) -> Option<Self> {
        num::FromPrimitive::from_i16(code)
    }

    /// The code written to region files.
    pub fn code(self) -> BlockTypeSize {
        self as BlockTypeSize
    }

    /// The crack stage as a zero-based index, used for atlas lookups.
    pub fn stage(self) -> usize {
        self as usize
    }

    /// The next crack stage, saturating at `CRACK4`.
    pub fn next(self) -> Self {
        match self {
            BlockOverlay::NONE => BlockOverlay::CRACK1,
            BlockOverlay::CRACK1 => BlockOverlay::CRACK2,
            BlockOverlay::CRACK2 => BlockOverlay::CRACK3,
            BlockOverlay::CRACK3 | BlockOverlay::CRACK4 => BlockOverlay::CRACK4,
        }
    }
}
