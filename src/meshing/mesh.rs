//! Mesh output buffers.
//!
//! A chunk mesh is two independent geometry streams: opaque faces and the
//! translucent water surface. Hosts draw them with different materials and
//! depth rules, so they are never interleaved.

use cgmath::{Point3, Vector3};

use super::atlas::TileUvs;
use super::face::{FACE_INDICES, FACE_VERTEX_COUNT};

/// One geometry stream: per-vertex attributes plus a triangle list.
///
/// Attributes are stored as plain arrays so the buffers can be handed to a
/// GPU upload as bytes (see [`MeshBuffer::position_bytes`]).
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MeshBuffer {
    /// Vertex positions in chunk-local block units.
    pub positions: Vec<[f32; 3]>,
    /// Per-vertex face normals.
    pub normals: Vec<[f32; 3]>,
    /// Material texture coordinates.
    pub uv0: Vec<[f32; 2]>,
    /// Overlay (damage) texture coordinates.
    pub uv1: Vec<[f32; 2]>,
    /// Three indices per triangle, two triangles per face.
    pub triangle_indices: Vec<u32>,
}

impl MeshBuffer {
    /// Appends one quad.
    ///
    /// # Arguments
    /// * `corners` - The face's corners, already offset to the block position
    /// * `normal` - The outward face normal
    /// * `uv0` - Material UV rectangle from the atlas
    /// * `uv1` - Overlay UV rectangle from the atlas
    pub fn push_face(
        &mut self,
        corners: [Vector3<f32>; FACE_VERTEX_COUNT],
        normal: Vector3<f32>,
        uv0: &TileUvs,
        uv1: &TileUvs,
    ) {
        let base = self.positions.len() as u32;

        for corner in corners {
            self.positions.push(corner.into());
            self.normals.push(normal.into());
        }

        // Face corners run upper-left, upper-right, lower-right, lower-left.
        for corner in [2, 3, 1, 0] {
            self.uv0.push(uv0[corner].into());
            self.uv1.push(uv1[corner].into());
        }

        self.triangle_indices
            .extend(FACE_INDICES.iter().map(|index| base + index));
    }

    /// Number of vertices in the buffer.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of quads in the buffer.
    pub fn face_count(&self) -> usize {
        self.positions.len() / FACE_VERTEX_COUNT
    }

    /// Returns true if no face was emitted.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// The vertex positions as raw bytes.
    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    /// The triangle indices as raw bytes.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.triangle_indices)
    }
}

/// The finished mesh of one chunk, in chunk-local block units.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkMesh {
    /// Chunk-grid position of the chunk this mesh was built from.
    pub position: Point3<i32>,
    /// [`Chunk::id`](crate::voxels::chunk::Chunk::id) of that chunk instance.
    pub chunk_id: u64,
    /// Faces of every solid block.
    pub opaque: MeshBuffer,
    /// Water surface faces.
    pub translucent: MeshBuffer,
}

impl ChunkMesh {
    /// An empty mesh for the chunk instance `chunk_id` at `position`.
    pub fn new(position: Point3<i32>, chunk_id: u64) -> Self {
        ChunkMesh {
            position,
            chunk_id,
            opaque: MeshBuffer::default(),
            translucent: MeshBuffer::default(),
        }
    }

    /// Returns true if neither stream holds a face.
    pub fn is_empty(&self) -> bool {
        self.opaque.is_empty() && self.translucent.is_empty()
    }
}
