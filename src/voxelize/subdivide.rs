//! Adaptive subdivision bounding per-triangle clipping work.
//!
//! A triangle that cuts diagonally through the grid has a bounding box whose
//! cell count grows cubically while its surface only grows quadratically, so
//! most candidate cells fail the intersection test. Quartering such
//! triangles until their boxes are small keeps the tested-to-hit cell ratio
//! bounded. Near-axis-aligned triangles fail few tests and skip the pass.

use crate::geometry::TexturedTriangle;
use glam::Vec3;

/// Bounding boxes spanning at least this many cells get subdivided.
pub const VOLUME_LIMIT: u32 = 512;

const SQRT_THIRD: f32 = 0.577_350_26;

/// Quarters `triangle` until every piece's bounding box spans fewer than
/// [`VOLUME_LIMIT`] cells, appending the result to `out` (which must be
/// empty). Triangles angled more than 60° away from the space diagonal are
/// passed through unmodified.
pub fn subdivide_large_triangles(triangle: &TexturedTriangle, out: &mut Vec<TexturedTriangle>) {
    debug_assert!(out.is_empty());
    out.push(*triangle);

    let normal = triangle.normal().abs().normalize_or_zero();
    let diagonality = normal.dot(Vec3::splat(SQRT_THIRD));
    if (diagonality - SQRT_THIRD) / (1.0 - SQRT_THIRD) < 0.5 {
        return;
    }

    let mut i = 0;
    while i < out.len() {
        let t = out[i];
        let size = t.voxel_max() - t.voxel_min();
        let volume = size.x * size.y * size.z;
        if volume < VOLUME_LIMIT {
            i += 1;
            continue;
        }

        // The center quarter replaces the current entry so it can be
        // subdivided again; the corner quarters are appended.
        let quarters = t.subdivide4();
        out[i] = quarters[0];
        out.extend_from_slice(&quarters[1..]);
    }
}
