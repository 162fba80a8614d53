//! # Terrain Module
//!
//! Deterministic terrain: every world block coordinate maps to exactly one
//! block type, computed from fractal noise fields with no hidden state.
//!
//! ## Vertical layering
//!
//! From the bottom up, per column:
//! - `y == 0`: bedrock, always
//! - below the stone line: stone, with redstone and diamond ore pockets
//! - exactly at the surface height: grass
//! - below the surface: dirt
//! - open space below the water line: water
//! - everything else: air
//!
//! A separate 3D field then carves caves out of everything except water.

use cgmath::Point3;

use self::noise::FractalNoise;
use super::block::block_type::BlockType;
use super::block::Block;
use super::chunk::{empty_grid, BlockGrid, Chunk, CHUNK_DIMENSION};

pub mod noise;

/// Highest surface the height field can produce.
pub const MAX_HEIGHT: i32 = 150;
/// Open space below this height fills with water.
pub const WATER_LEVEL: i32 = 55;

const HEIGHT_SMOOTH: f64 = 0.01;
const HEIGHT_OCTAVES: u32 = 4;
const HEIGHT_PERSISTENCE: f64 = 0.5;
const STONE_HEIGHT_OFFSET: i32 = 10;

const CAVE_SMOOTH: f64 = 0.1;
const CAVE_OCTAVES: u32 = 3;
const CAVE_THRESHOLD: f64 = 0.42;

/// An ore pocket: a depth limit plus a 3D noise threshold.
struct OreBand {
    below_y: i32,
    smooth: f64,
    octaves: u32,
    threshold: f64,
}

const REDSTONE: OreBand = OreBand {
    below_y: 20,
    smooth: 0.03,
    octaves: 3,
    threshold: 0.41,
};

const DIAMOND: OreBand = OreBand {
    below_y: 40,
    smooth: 0.01,
    octaves: 2,
    threshold: 0.4,
};

/// Surface and stone heights of one column.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct Column {
    stone_height: i32,
    surface_height: i32,
}

/// Maps world block coordinates to block types.
#[derive(Clone)]
pub struct TerrainGenerator {
    noise: FractalNoise,
}

impl TerrainGenerator {
    /// Creates a generator; equal seeds produce identical terrain.
    pub fn new(seed: u32) -> Self {
        TerrainGenerator {
            noise: FractalNoise::new(seed),
        }
    }

    /// The y coordinate of the grass layer in column `(x, z)`.
    pub fn surface_height(&self, x: i32, z: i32) -> i32 {
        let sample = self.noise.brownian_2d(
            x as f64 * HEIGHT_SMOOTH,
            z as f64 * HEIGHT_SMOOTH,
            HEIGHT_OCTAVES,
            HEIGHT_PERSISTENCE,
        );
        map_to_height(sample, MAX_HEIGHT)
    }

    /// The y coordinate below which column `(x, z)` is stone.
    ///
    /// Sampled at twice the frequency of the surface with one more octave.
    pub fn stone_height(&self, x: i32, z: i32) -> i32 {
        let sample = self.noise.brownian_2d(
            x as f64 * HEIGHT_SMOOTH * 2.0,
            z as f64 * HEIGHT_SMOOTH * 2.0,
            HEIGHT_OCTAVES + 1,
            HEIGHT_PERSISTENCE,
        );
        map_to_height(sample, MAX_HEIGHT - STONE_HEIGHT_OFFSET)
    }

    fn column(&self, x: i32, z: i32) -> Column {
        Column {
            stone_height: self.stone_height(x, z),
            surface_height: self.surface_height(x, z),
        }
    }

    /// The block type at a world block coordinate.
    pub fn classify(&self, pos: Point3<i32>) -> BlockType {
        self.classify_in_column(self.column(pos.x, pos.z), pos)
    }

    fn classify_in_column(&self, column: Column, pos: Point3<i32>) -> BlockType {
        if pos.y == 0 {
            return BlockType::BEDROCK;
        }

        let block_type = if pos.y < column.stone_height {
            self.ore_or_stone(pos)
        } else if pos.y == column.surface_height {
            BlockType::GRASS
        } else if pos.y < column.surface_height {
            BlockType::DIRT
        } else if pos.y < WATER_LEVEL {
            BlockType::WATER
        } else {
            BlockType::AIR
        };

        if block_type != BlockType::WATER && self.is_cave(pos) {
            return BlockType::AIR;
        }
        block_type
    }

    fn ore_or_stone(&self, pos: Point3<i32>) -> BlockType {
        self.ore_or_stone_with(pos, &REDSTONE, &DIAMOND)
    }

    /// Redstone is tested first and diamond second; diamond wins when both hit.
    fn ore_or_stone_with(&self, pos: Point3<i32>, redstone: &OreBand, diamond: &OreBand) -> BlockType {
        let mut block_type = BlockType::STONE;
        if self.in_ore_band(redstone, pos) {
            block_type = BlockType::REDSTONE;
        }
        if self.in_ore_band(diamond, pos) {
            block_type = BlockType::DIAMOND;
        }
        block_type
    }

    fn in_ore_band(&self, band: &OreBand, pos: Point3<i32>) -> bool {
        pos.y < band.below_y
            && self.noise.brownian_3d(
                pos.x as f64,
                pos.y as f64,
                pos.z as f64,
                band.smooth,
                band.octaves,
            ) < band.threshold
    }

    fn is_cave(&self, pos: Point3<i32>) -> bool {
        self.noise
            .brownian_3d(pos.x as f64, pos.y as f64, pos.z as f64, CAVE_SMOOTH, CAVE_OCTAVES)
            < CAVE_THRESHOLD
    }

    /// Generates the full block grid of the chunk at `position`.
    ///
    /// Column heights are computed once per `(x, z)` and reused down the column.
    pub fn generate(&self, position: Point3<i32>) -> Box<BlockGrid> {
        let origin = Chunk::detached(position).world_pos();
        let mut grid = empty_grid();

        for x in 0..CHUNK_DIMENSION {
            for z in 0..CHUNK_DIMENSION {
                let column = self.column(origin.x + x, origin.z + z);
                for y in 0..CHUNK_DIMENSION {
                    let world = Point3::new(origin.x + x, origin.y + y, origin.z + z);
                    let local = Point3::new(x as usize, y as usize, z as usize);
                    grid[Chunk::index_of(local)] =
                        Block::new(self.classify_in_column(column, world));
                }
            }
        }

        grid
    }

    /// Populates `chunk` with generated terrain.
    ///
    /// # Returns
    /// `false` if the chunk was already populated; it is left untouched.
    pub fn fill(&self, chunk: &mut Chunk) -> bool {
        if chunk.is_populated() {
            return false;
        }
        chunk.adopt(self.generate(chunk.position))
    }
}

/// Linearly maps a `[0, 1]` sample onto `[0, max]`, clamping the input.
fn map_to_height(sample: f64, max: i32) -> i32 {
    (sample.clamp(0.0, 1.0) * max as f64) as i32
}
