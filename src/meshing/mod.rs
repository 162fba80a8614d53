//! Chunk meshing.
//!
//! Turns a populated chunk into renderable geometry by emitting only the block
//! faces that border a non-solid cell. No quad merging is done; each visible
//! face is its own quad of 4 vertices and 6 indices.
//!
//! # Architecture
//! - [`MeshBuilder`]: walks a chunk and culls hidden faces
//! - [`ChunkMesh`] / [`MeshBuffer`]: the opaque and translucent output streams
//! - [`TextureAtlas`]: the host-supplied UV lookup, with [`TileAtlas`] as a default
//!
//! # Usage
//! ```
//! use std::sync::Arc;
//! use cgmath::Point3;
//! use voxel_stream::meshing::{MeshBuilder, TileAtlas};
//! use voxel_stream::voxels::chunk::{neighbors::NeighborLayers, Chunk};
//! use voxel_stream::voxels::terrain::TerrainGenerator;
//!
//! let mut chunk = Chunk::detached(Point3::new(0, 2, 0));
//! TerrainGenerator::new(0).fill(&mut chunk);
//!
//! let builder = MeshBuilder::new(Arc::new(TileAtlas));
//! let mesh = builder.build(&chunk, &NeighborLayers::open()).unwrap();
//! assert_eq!(mesh.opaque.triangle_indices.len() % 6, 0);
//! ```

mod atlas;
mod face;
mod mesh;
mod mesh_builder;

pub use atlas::{TextureAtlas, TileAtlas, TileUvs, ATLAS_TILES};
pub use face::{face_corners, FACE_INDICES, FACE_VERTEX_COUNT};
pub use mesh::{ChunkMesh, MeshBuffer};
pub use mesh_builder::MeshBuilder;
