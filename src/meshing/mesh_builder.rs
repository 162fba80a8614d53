//! Face-culling mesh construction.
//!
//! Every non-air block is visited once. A face is emitted when the cell across
//! it is not solid; cells in a neighbor chunk are read from a
//! [`NeighborLayers`] snapshot, and a missing neighbor counts as open air.
//! Water is the exception: it only ever emits its top face, into the
//! translucent stream, and only when the cell above is not water too.

use std::sync::Arc;

use cgmath::{Point3, Vector3};
use log::trace;

use super::atlas::TextureAtlas;
use super::face::face_corners;
use super::mesh::{ChunkMesh, MeshBuffer};
use crate::core::MtResource;
use crate::error::{Result, StreamError};
use crate::voxels::block::block_side::BlockSide;
use crate::voxels::block::block_type::BlockType;
use crate::voxels::block::Block;
use crate::voxels::chunk::chunk_iteration::ChunkPositionIterator;
use crate::voxels::chunk::neighbors::NeighborLayers;
use crate::voxels::chunk::{BlockGrid, Chunk};

/// Builds chunk meshes against a texture atlas.
#[derive(Clone)]
pub struct MeshBuilder {
    atlas: Arc<dyn TextureAtlas>,
}

impl MeshBuilder {
    /// Creates a builder that takes its UVs from `atlas`.
    pub fn new(atlas: Arc<dyn TextureAtlas>) -> Self {
        MeshBuilder { atlas }
    }

    /// Meshes a shared chunk, snapshotting its neighbors from the owning world first.
    ///
    /// The chunk's own lock is released while neighbors are gathered, so no two
    /// chunk locks are ever held together.
    pub fn build_shared(&self, chunk: &MtResource<Chunk>) -> Result<ChunkMesh> {
        let (position, world) = {
            let chunk = chunk.get();
            (chunk.position, chunk.world().clone())
        };
        let neighbors = NeighborLayers::gather(&world, position);
        let chunk = chunk.get();
        self.build(&chunk, &neighbors)
    }

    /// Meshes `chunk` with the given neighbor snapshot.
    ///
    /// # Errors
    /// `Unpopulated` if the chunk has no blocks.
    ///
    /// # Returns
    /// The same buffers, bit for bit, every time it is called on the same state.
    pub fn build(&self, chunk: &Chunk, neighbors: &NeighborLayers) -> Result<ChunkMesh> {
        let blocks = chunk
            .blocks()
            .ok_or(StreamError::Unpopulated(chunk.position))?;
        let mut mesh = ChunkMesh::new(chunk.position, chunk.id());

        for (index, local) in ChunkPositionIterator::new().enumerate() {
            let block = blocks[index];
            match block.block_type {
                BlockType::AIR => {}
                BlockType::WATER => {
                    let above = type_across(blocks, neighbors, local, BlockSide::TOP);
                    if above != Some(BlockType::WATER) {
                        self.push_face(&mut mesh.translucent, block, local, BlockSide::TOP);
                    }
                }
                _ => {
                    for side in BlockSide::all() {
                        let solid = type_across(blocks, neighbors, local, side)
                            .map_or(false, BlockType::is_solid);
                        if !solid {
                            self.push_face(&mut mesh.opaque, block, local, side);
                        }
                    }
                }
            }
        }

        trace!(
            "Meshed chunk {:?}: {} opaque faces, {} translucent faces",
            chunk.position,
            mesh.opaque.face_count(),
            mesh.translucent.face_count()
        );
        Ok(mesh)
    }

    fn push_face(&self, buffer: &mut MeshBuffer, block: Block, local: Point3<usize>, side: BlockSide) {
        let offset = Vector3::new(local.x as f32, local.y as f32, local.z as f32);
        buffer.push_face(
            face_corners(side).map(|corner| corner + offset),
            side.normal(),
            &self.atlas.block_uvs(block.block_type, side),
            &self.atlas.overlay_uvs(block.overlay),
        );
    }
}

/// The block type across `side` of `local`; `None` when that cell belongs to a
/// missing neighbor.
fn type_across(
    blocks: &BlockGrid,
    neighbors: &NeighborLayers,
    local: Point3<usize>,
    side: BlockSide,
) -> Option<BlockType> {
    let across = Point3::new(local.x as i32, local.y as i32, local.z as i32) + side.offset();
    if Chunk::contains_local(across) {
        let index = Chunk::index_of(across.map(|c| c as usize));
        Some(blocks[index].block_type)
    } else {
        neighbors.across(side, local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meshing::atlas::TileAtlas;
    use crate::voxels::chunk::CHUNK_DIMENSION;
    use crate::voxels::terrain::TerrainGenerator;

    fn builder() -> MeshBuilder {
        MeshBuilder::new(Arc::new(TileAtlas))
    }

    fn chunk_with(blocks: &[(Point3<i32>, BlockType)]) -> Chunk {
        let mut chunk = Chunk::detached(Point3::new(0, 0, 0));
        chunk.populate();
        for &(local, block_type) in blocks {
            chunk.set_block_at(local, Block::new(block_type)).unwrap();
        }
        chunk
    }

    #[test]
    fn exposed_block_emits_every_face() {
        let chunk = chunk_with(&[(Point3::new(4, 4, 4), BlockType::STONE)]);
        let mesh = builder().build(&chunk, &NeighborLayers::open()).unwrap();
        assert_eq!(mesh.opaque.vertex_count(), 24);
        assert_eq!(mesh.opaque.triangle_indices.len(), 36);
        assert_eq!(mesh.opaque.uv0.len(), 24);
        assert_eq!(mesh.opaque.uv1.len(), 24);
        assert!(mesh.translucent.is_empty());
    }

    #[test]
    fn enclosed_block_emits_nothing() {
        let mut cube = Vec::new();
        for x in 0..3 {
            for y in 0..3 {
                for z in 0..3 {
                    cube.push((Point3::new(x + 5, y + 5, z + 5), BlockType::DIRT));
                }
            }
        }
        let mesh = builder()
            .build(&chunk_with(&cube), &NeighborLayers::open())
            .unwrap();
        // Only the 9 outer quads of each cube side survive; the centre adds none.
        assert_eq!(mesh.opaque.face_count(), 6 * 9);
    }

    #[test]
    fn edge_faces_consult_the_neighbor_snapshot() {
        let edge = CHUNK_DIMENSION - 1;
        let chunk = chunk_with(&[(Point3::new(edge, 2, 2), BlockType::STONE)]);

        let mut right = Chunk::detached(Point3::new(1, 0, 0));
        right.populate();
        right
            .set_block_at(Point3::new(0, 2, 2), Block::new(BlockType::STONE))
            .unwrap();
        let mut neighbors = NeighborLayers::open();
        neighbors.set(BlockSide::RIGHT, &right);

        let culled = builder().build(&chunk, &neighbors).unwrap();
        assert_eq!(culled.opaque.face_count(), 5);

        let open = builder().build(&chunk, &NeighborLayers::open()).unwrap();
        assert_eq!(open.opaque.face_count(), 6);
    }

    #[test]
    fn water_emits_only_its_surface() {
        let chunk = chunk_with(&[
            (Point3::new(1, 1, 1), BlockType::WATER),
            (Point3::new(1, 2, 1), BlockType::WATER),
        ]);
        let mesh = builder().build(&chunk, &NeighborLayers::open()).unwrap();
        assert!(mesh.opaque.is_empty());
        assert_eq!(mesh.translucent.face_count(), 1);
        assert!(mesh.translucent.normals.iter().all(|n| *n == [0.0, 1.0, 0.0]));
        assert!(mesh.translucent.positions.iter().all(|p| p[1] == 3.0));
    }

    #[test]
    fn rebuild_is_identical() {
        let generator = TerrainGenerator::new(0);
        let mut chunk = Chunk::detached(Point3::new(0, 3, 0));
        generator.fill(&mut chunk);
        let builder = builder();
        let first = builder.build(&chunk, &NeighborLayers::open()).unwrap();
        let second = builder.build(&chunk, &NeighborLayers::open()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.opaque.position_bytes(), second.opaque.position_bytes());
        assert_eq!(first.opaque.index_bytes(), second.opaque.index_bytes());
    }

    #[test]
    fn unpopulated_chunk_is_an_error() {
        let chunk = Chunk::detached(Point3::new(0, 0, 0));
        assert!(matches!(
            builder().build(&chunk, &NeighborLayers::open()),
            Err(StreamError::Unpopulated(_))
        ));
    }
}
