//! Mesh-space to voxel-grid transform.
//!
//! The transform is computed once per mesh from its world bounding box, the
//! target resolution and an axis permutation, and every triangle is mapped
//! through it before clipping. Uniform scaling preserves shape; snapping the
//! largest extent to the resolution avoids cropping.

use glam::{Affine3A, Mat3, Vec3};

/// True when `axes` is a permutation of `(0, 1, 2)`.
pub fn is_permutation(axes: [u32; 3]) -> bool {
    let mut seen = [false; 3];
    for axis in axes {
        match seen.get_mut(axis as usize) {
            Some(slot) if !*slot => *slot = true,
            _ => return false,
        }
    }
    true
}

/// Computes the affine transform mapping mesh-space points into `[0, R]³`.
///
/// Points are translated to the bounding-box origin, scaled uniformly so the
/// largest extent spans `resolution` cells, and their coordinates reordered
/// so mesh axis `i` lands on grid axis `permutation[i]`.
pub fn mesh_to_grid_transform(
    min: Vec3,
    max: Vec3,
    resolution: u32,
    permutation: [u32; 3],
) -> Affine3A {
    debug_assert!(is_permutation(permutation));

    let extent = max - min;
    let largest = extent.x.max(extent.y).max(extent.z);
    let scale = if largest > 0.0 {
        resolution as f32 / largest
    } else {
        // Point-like mesh; any uniform scale keeps it at the grid origin.
        1.0
    };

    let mut columns = [Vec3::ZERO; 3];
    for (axis, &grid_axis) in permutation.iter().enumerate() {
        columns[axis][grid_axis as usize] = scale;
    }
    let linear = Mat3::from_cols(columns[0], columns[1], columns[2]);
    Affine3A::from_mat3_translation(linear, linear * -min)
}
