//! Per-worker voxelization state and voxel-map operations.

use crate::geometry::{TexturedTriangle, VisualTriangle};
use crate::voxelize::clip::clip_to_voxel;
use crate::voxelize::color::{ColorStrategy, WeightedColor};
use crate::voxelize::subdivide::subdivide_large_triangles;
use glam::{Affine3A, UVec3, Vec3};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Sparse voxel grid keyed by cell position.
pub type VoxelMap<T> = HashMap<UVec3, T>;

/// A triangle plane farther than this from a cube center cannot touch the
/// cube: the half-diagonal is √3/2 ≈ 0.87, with generous slack for float
/// error.
const PLANE_DISTANCE_LIMIT: f32 = 2.0;

/// Combines `color` into the cell at `pos` under `strategy`. An empty cell
/// simply stores the contribution.
#[inline]
pub fn insert_weighted(
    strategy: ColorStrategy,
    map: &mut VoxelMap<WeightedColor>,
    pos: UVec3,
    color: WeightedColor,
) {
    match map.entry(pos) {
        Entry::Occupied(mut cell) => {
            let combined = strategy.combine(*cell.get(), color);
            cell.insert(combined);
        }
        Entry::Vacant(cell) => {
            cell.insert(color);
        }
    }
}

/// Drains `source` into `target`, combining cell-wise under `strategy`.
/// On weight ties under [`ColorStrategy::Max`], the target's cell wins.
pub fn merge_maps(
    strategy: ColorStrategy,
    target: &mut VoxelMap<WeightedColor>,
    source: &mut VoxelMap<WeightedColor>,
) {
    debug_assert!(!std::ptr::eq(target, source));
    for (pos, color) in source.drain() {
        insert_weighted(strategy, target, pos, color);
    }
}

/// Halves the grid resolution by folding every 2×2×2 block into the cell at
/// the halved position, under `strategy`.
pub fn downscale(
    map: VoxelMap<WeightedColor>,
    strategy: ColorStrategy,
) -> VoxelMap<WeightedColor> {
    let mut out = VoxelMap::with_capacity(map.len() / 4 + 1);
    for (pos, color) in map {
        insert_weighted(strategy, &mut out, pos / 2, color);
    }
    out
}

/// Stateful triangle voxelizer.
///
/// Holds the mesh transform, the color strategy and three scratch triangle
/// buffers that are reused across triangles so that per-triangle work never
/// reallocates in the steady state. One lives on each worker thread.
pub struct Voxelizer {
    transform: Affine3A,
    resolution: u32,
    strategy: ColorStrategy,
    subdivided: Vec<TexturedTriangle>,
    pre: Vec<TexturedTriangle>,
    post: Vec<TexturedTriangle>,
}

impl Voxelizer {
    pub fn new(transform: Affine3A, resolution: u32, strategy: ColorStrategy) -> Self {
        Self {
            transform,
            resolution,
            strategy,
            subdivided: Vec::new(),
            pre: Vec::new(),
            post: Vec::new(),
        }
    }

    /// Voxelizes one mesh-space triangle into `out`: transform, subdivide,
    /// then clip against every candidate cell of each sub-triangle's
    /// bounding box. Zero-weight contributions (degenerate input, grazing
    /// cells) are dropped at the insert site.
    pub fn voxelize(&mut self, triangle: &VisualTriangle, out: &mut VoxelMap<WeightedColor>) {
        let geometry = triangle.geometry.transformed(&self.transform);

        self.subdivided.clear();
        self.pre.clear();
        self.post.clear();

        let mut subdivided = std::mem::take(&mut self.subdivided);
        subdivide_large_triangles(&geometry, &mut subdivided);
        for sub in &subdivided {
            self.voxelize_sub_triangle(triangle, sub, out);
        }
        subdivided.clear();
        self.subdivided = subdivided;
    }

    fn voxelize_sub_triangle(
        &mut self,
        triangle: &VisualTriangle,
        sub: &TexturedTriangle,
        out: &mut VoxelMap<WeightedColor>,
    ) {
        let plane_origin = sub.v[0];
        let plane_normal = sub.normal().normalize_or_zero();

        // Candidate cells, clamped to the grid so faces lying exactly on the
        // outer boundary planes land in the outermost cell layer.
        let limit = UVec3::splat(self.resolution);
        let min = sub.voxel_min().min(limit - UVec3::ONE);
        let max = sub.voxel_max().min(limit);

        for z in min.z..max.z {
            for y in min.y..max.y {
                for x in min.x..max.x {
                    let pos = UVec3::new(x, y, z);
                    let center = pos.as_vec3() + Vec3::splat(0.5);
                    if (center - plane_origin).dot(plane_normal).abs() > PLANE_DISTANCE_LIMIT {
                        continue;
                    }

                    let color =
                        clip_to_voxel(triangle, sub, pos, &mut self.pre, &mut self.post);
                    if color.weight != 0.0 {
                        insert_weighted(self.strategy, out, pos, color);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn merge_combines_and_clears_the_source() {
        let mut target = VoxelMap::new();
        let mut source = VoxelMap::new();
        target.insert(UVec3::ZERO, WeightedColor::new(1.0, Vec3::X));
        source.insert(UVec3::ZERO, WeightedColor::new(2.0, Vec3::Z));
        source.insert(UVec3::ONE, WeightedColor::new(1.0, Vec3::Y));

        merge_maps(ColorStrategy::Blend, &mut target, &mut source);

        assert!(source.is_empty());
        assert_eq!(target.len(), 2);
        let cell = target[&UVec3::ZERO];
        assert_eq!(cell.weight, 3.0);
        assert!(cell
            .value
            .abs_diff_eq(Vec3::new(1.0 / 3.0, 0.0, 2.0 / 3.0), 1e-6));
    }

    #[test]
    fn downscale_folds_blocks_to_halved_positions() {
        let mut map = VoxelMap::new();
        for z in 0..2 {
            for y in 0..2 {
                for x in 0..2 {
                    map.insert(UVec3::new(x, y, z), WeightedColor::new(1.0, Vec3::X));
                }
            }
        }
        map.insert(UVec3::new(2, 0, 0), WeightedColor::new(1.0, Vec3::Y));

        let halved = downscale(map, ColorStrategy::Blend);
        assert_eq!(halved.len(), 2);
        assert_eq!(halved[&UVec3::ZERO].weight, 8.0);
        assert_eq!(halved[&UVec3::new(1, 0, 0)].value, Vec3::Y);
    }

    #[test]
    fn degenerate_triangles_produce_no_voxels() {
        let mut voxelizer = Voxelizer::new(Affine3A::IDENTITY, 4, ColorStrategy::Max);
        let collinear = VisualTriangle::flat(
            [
                Vec3::new(0.5, 0.5, 0.5),
                Vec3::new(1.5, 1.5, 0.5),
                Vec3::new(2.5, 2.5, 0.5),
            ],
            Vec3::X,
        );
        let mut out = VoxelMap::new();
        voxelizer.voxelize(&collinear, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn uv_centroid_survives_subdivision_paths() {
        // Textured shading resolves through the fragment UV centroid; a flat
        // in-cell triangle must sample its own UV centroid.
        let tri = VisualTriangle::new(
            TexturedTriangle::new(
                [
                    Vec3::new(0.25, 0.25, 0.5),
                    Vec3::new(0.75, 0.25, 0.5),
                    Vec3::new(0.25, 0.75, 0.5),
                ],
                [Vec2::ZERO, Vec2::X, Vec2::Y],
            ),
            crate::geometry::ShadingSource::Default,
        );
        let mut voxelizer = Voxelizer::new(Affine3A::IDENTITY, 2, ColorStrategy::Blend);
        let mut out = VoxelMap::new();
        voxelizer.voxelize(&tri, &mut out);
        assert_eq!(out.len(), 1);
        let cell = out[&UVec3::ZERO];
        assert!((cell.weight - tri.geometry.area()).abs() < 1e-5);
    }
}
