//! # Block Side Module
//!
//! This module defines the six faces of a voxel block and the unit offset each
//! face looks across. The mesher and the edit API both use the offsets to find
//! the cell on the other side of a face.

use cgmath::Vector3;

/// One of the six faces of a block, named from the viewer's point of view
/// looking down -Z.
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum BlockSide {
    /// +Z
    FRONT = 0,
    /// -Z
    BACK = 1,
    /// -Y
    BOTTOM = 2,
    /// +Y
    TOP = 3,
    /// -X
    LEFT = 4,
    /// +X
    RIGHT = 5,
}

impl BlockSide {
    /// Every face, in discriminant order.
    pub fn all() -> [BlockSide; 6] {
        [
            BlockSide::FRONT,
            BlockSide::BACK,
            BlockSide::BOTTOM,
            BlockSide::TOP,
            BlockSide::LEFT,
            BlockSide::RIGHT,
        ]
    }

    /// The integer step from a block to the neighbor this face touches.
    pub fn offset(self) -> Vector3<i32> {
        match self {
            BlockSide::FRONT => Vector3::new(0, 0, 1),
            BlockSide::BACK => Vector3::new(0, 0, -1),
            BlockSide::BOTTOM => Vector3::new(0, -1, 0),
            BlockSide::TOP => Vector3::new(0, 1, 0),
            BlockSide::LEFT => Vector3::new(-1, 0, 0),
            BlockSide::RIGHT => Vector3::new(1, 0, 0),
        }
    }

    /// The outward unit normal of this face.
    pub fn normal(self) -> Vector3<f32> {
        self.offset().cast::<f32>().unwrap_or_else(|| Vector3::new(0.0, 0.0, 0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_faces_cancel() {
        let sum = BlockSide::all()
            .iter()
            .fold(Vector3::new(0, 0, 0), |acc, side| acc + side.offset());
        assert_eq!(sum, Vector3::new(0, 0, 0));
    }

    #[test]
    fn normals_are_unit_length() {
        for side in BlockSide::all() {
            let n = side.normal();
            assert_eq!(n.x.abs() + n.y.abs() + n.z.abs(), 1.0);
        }
    }
}
