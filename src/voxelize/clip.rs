//! Clipping sub-triangles to single voxel cubes.
//!
//! Six successive half-space clips against the cube's faces yield the exact
//! intersection polygon of a triangle and a cell, as a fan of fragments.
//! Fragment areas are measured in voxel-space units, so weights are directly
//! comparable across cells.

use crate::geometry::{TexturedTriangle, VisualTriangle};
use crate::voxelize::color::WeightedColor;
use crate::voxelize::splitter::split_triangle;
use glam::UVec3;

/// Clips `sub` to the unit cube at cell `pos` and returns the area-weighted
/// color of the surviving fragments, sampling `triangle`'s shading at each
/// fragment's UV centroid. Returns a zero-weight color when nothing
/// survives.
///
/// `pre` and `post` are caller-owned scratch buffers, reused across calls to
/// avoid reallocation; both must be empty on entry and are left empty.
pub fn clip_to_voxel(
    triangle: &VisualTriangle,
    sub: &TexturedTriangle,
    pos: UVec3,
    pre: &mut Vec<TexturedTriangle>,
    post: &mut Vec<TexturedTriangle>,
) -> WeightedColor {
    debug_assert!(pre.is_empty() && post.is_empty());
    pre.push(*sub);

    // Low faces keep the upper half-space, high faces the lower one; what
    // remains after all six cuts is the part inside the cube.
    for high_face in [false, true] {
        for axis in 0..3 {
            let plane = pos[axis] + high_face as u32;
            for t in pre.iter() {
                if high_face {
                    split_triangle(axis, plane, t, Some(&mut *post), None);
                } else {
                    split_triangle(axis, plane, t, None, Some(&mut *post));
                }
            }
            pre.clear();
            if post.is_empty() {
                return WeightedColor::ZERO;
            }
            std::mem::swap(pre, post);
        }
    }

    let mut result = WeightedColor::ZERO;
    for fragment in pre.iter() {
        let sample = WeightedColor::new(fragment.area(), triangle.color_at(fragment.centroid_uv()));
        result = result.blend(sample);
    }
    pre.clear();
    result
}
