//! Texture atlas lookup.
//!
//! The mesher never knows where a texture lives; it asks a [`TextureAtlas`]
//! for the UV rectangle of a material face and of a damage overlay. Hosts plug
//! in their own atlas. [`TileAtlas`] is a ready-made one for a 16 x 16 grid of
//! square tiles.

use cgmath::Vector2;

use crate::voxels::block::block_overlay::BlockOverlay;
use crate::voxels::block::block_side::BlockSide;
use crate::voxels::block::block_type::BlockType;

/// Corners of a UV rectangle: lower-left, lower-right, upper-left, upper-right.
pub type TileUvs = [Vector2<f32>; 4];

/// Supplies UV rectangles for the two texture channels of a chunk mesh.
pub trait TextureAtlas: Send + Sync {
    /// UVs of the material texture for one face of a block type.
    fn block_uvs(&self, block_type: BlockType, side: BlockSide) -> TileUvs;

    /// UVs of the overlay texture for a damage stage.
    fn overlay_uvs(&self, overlay: BlockOverlay) -> TileUvs;
}

/// Number of tiles along each edge of the atlas image.
pub const ATLAS_TILES: u32 = 16;

/// A column/row address in the tile grid, row 0 at the bottom.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct Tile(u32, u32);

impl Tile {
    fn uvs(self) -> TileUvs {
        let step = 1.0 / ATLAS_TILES as f32;
        let (u, v) = (self.0 as f32 * step, self.1 as f32 * step);
        [
            Vector2::new(u, v),
            Vector2::new(u + step, v),
            Vector2::new(u, v + step),
            Vector2::new(u + step, v + step),
        ]
    }
}

const GRASS_TOP: Tile = Tile(2, 6);
const GRASS_SIDE: Tile = Tile(3, 15);
const DIRT: Tile = Tile(2, 15);
const STONE: Tile = Tile(0, 14);
const BEDROCK: Tile = Tile(5, 13);
const REDSTONE: Tile = Tile(3, 12);
const DIAMOND: Tile = Tile(2, 12);
const WATER: Tile = Tile(13, 12);

/// Crack stages 0 (undamaged, a blank tile) through 4.
const CRACKS: [Tile; 5] = [Tile(10, 0), Tile(0, 0), Tile(1, 0), Tile(2, 0), Tile(3, 0)];

/// The default block atlas layout.
#[derive(Copy, Clone, Debug, Default)]
pub struct TileAtlas;

impl TextureAtlas for TileAtlas {
    fn block_uvs(&self, block_type: BlockType, side: BlockSide) -> TileUvs {
        let tile = match (block_type, side) {
            (BlockType::GRASS, BlockSide::TOP) => GRASS_TOP,
            (BlockType::GRASS, BlockSide::BOTTOM) => DIRT,
            (BlockType::GRASS, _) => GRASS_SIDE,
            (BlockType::DIRT, _) => DIRT,
            (BlockType::STONE, _) => STONE,
            (BlockType::BEDROCK, _) => BEDROCK,
            (BlockType::REDSTONE, _) => REDSTONE,
            (BlockType::DIAMOND, _) => DIAMOND,
            (BlockType::WATER, _) => WATER,
            // Air is never meshed; point it at the blank tile.
            (BlockType::AIR, _) => CRACKS[0],
        };
        tile.uvs()
    }

    fn overlay_uvs(&self, overlay: BlockOverlay) -> TileUvs {
        CRACKS[overlay.stage()].uvs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grass_uses_three_tiles() {
        let atlas = TileAtlas;
        let top = atlas.block_uvs(BlockType::GRASS, BlockSide::TOP);
        let side = atlas.block_uvs(BlockType::GRASS, BlockSide::LEFT);
        let bottom = atlas.block_uvs(BlockType::GRASS, BlockSide::BOTTOM);
        assert_ne!(top, side);
        assert_eq!(bottom, atlas.block_uvs(BlockType::DIRT, BlockSide::TOP));
    }

    #[test]
    fn tiles_stay_inside_the_image() {
        let atlas = TileAtlas;
        let overlays = [
            BlockOverlay::NONE,
            BlockOverlay::CRACK1,
            BlockOverlay::CRACK2,
            BlockOverlay::CRACK3,
            BlockOverlay::CRACK4,
        ];
        let uvs = BlockType::ALL
            .iter()
            .flat_map(|&t| BlockSide::all().map(|s| atlas.block_uvs(t, s)))
            .chain(overlays.map(|o| atlas.overlay_uvs(o)));
        for corners in uvs {
            for uv in corners {
                assert!((0.0..=1.0).contains(&uv.x) && (0.0..=1.0).contains(&uv.y));
            }
        }
    }
}
