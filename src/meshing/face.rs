//! Per-face vertex tables.
//!
//! Each face of a unit block is a quad of four corners, listed clockwise when
//! seen from outside the block starting at the upper-left corner. Two
//! triangles are cut from the quad with [`FACE_INDICES`]; both wind
//! counter-clockwise from outside, so their normals point away from the block.

use cgmath::Vector3;

use crate::voxels::block::block_side::BlockSide;

/// Triangle indices of one quad, relative to its first vertex.
pub const FACE_INDICES: [u32; 6] = [3, 1, 0, 3, 2, 1];

/// Number of vertices one face contributes.
pub const FACE_VERTEX_COUNT: usize = 4;

/// Returns the four corners of `side` on a block whose minimum corner is the origin.
///
/// # Arguments
/// * `side` - The face to look up
///
/// # Returns
/// Corner offsets in `{0, 1}³`, in emission order.
pub fn face_corners(side: BlockSide) -> [Vector3<f32>; FACE_VERTEX_COUNT] {
    let corners: [[f32; 3]; FACE_VERTEX_COUNT] = match side {
        BlockSide::FRONT => [[0., 1., 1.], [1., 1., 1.], [1., 0., 1.], [0., 0., 1.]],
        BlockSide::BACK => [[1., 1., 0.], [0., 1., 0.], [0., 0., 0.], [1., 0., 0.]],
        BlockSide::TOP => [[0., 1., 0.], [1., 1., 0.], [1., 1., 1.], [0., 1., 1.]],
        BlockSide::BOTTOM => [[0., 0., 1.], [1., 0., 1.], [1., 0., 0.], [0., 0., 0.]],
        BlockSide::RIGHT => [[1., 1., 1.], [1., 1., 0.], [1., 0., 0.], [1., 0., 1.]],
        BlockSide::LEFT => [[0., 1., 0.], [0., 1., 1.], [0., 0., 1.], [0., 0., 0.]],
    };
    corners.map(Vector3::from)
}

#[cfg(test)]
mod tests {
    use cgmath::InnerSpace;

    use super::*;

    #[test]
    fn corners_lie_on_their_face_plane() {
        for side in BlockSide::all() {
            let normal = side.normal();
            let plane = face_corners(side).map(|corner| corner.dot(normal));
            assert!(plane.iter().all(|&d| d == plane[0]), "{side:?} corners not coplanar");
            // Faces facing a positive axis sit on the far side of the unit cube.
            let expected = if normal.x + normal.y + normal.z > 0.0 { 1.0 } else { 0.0 };
            assert_eq!(plane[0].abs(), expected, "{side:?} on the wrong plane");
        }
    }

    #[test]
    fn triangles_wind_outwards() {
        for side in BlockSide::all() {
            let corners = face_corners(side);
            for triangle in FACE_INDICES.chunks_exact(3) {
                let [a, b, c] = [0, 1, 2].map(|i| corners[triangle[i] as usize]);
                let winding = (b - a).cross(c - a);
                assert!(winding.dot(side.normal()) > 0.0, "{side:?} winds the wrong way");
            }
        }
    }
}
