//! Triangle types flowing through the voxelization pipeline.
//!
//! A [`TexturedTriangle`] is pure geometry plus texture coordinates and is
//! what the splitter and clipper operate on. A [`VisualTriangle`] pairs the
//! geometry with a [`ShadingSource`] that decides how `color_at` resolves a
//! UV coordinate to a color.

use crate::texture::Texture;
use glam::{Affine3A, UVec3, Vec2, Vec3};
use std::sync::Arc;

/// Color used for faces that carry no material at all.
pub const DEFAULT_COLOR: Vec3 = Vec3::ONE;

/// A triangle in voxel space with per-vertex texture coordinates.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct TexturedTriangle {
    pub v: [Vec3; 3],
    pub uv: [Vec2; 3],
}

impl TexturedTriangle {
    #[inline]
    pub const fn new(v: [Vec3; 3], uv: [Vec2; 3]) -> Self {
        Self { v, uv }
    }

    /// Triangle with all texture coordinates at the origin.
    #[inline]
    pub const fn from_vertices(v: [Vec3; 3]) -> Self {
        Self {
            v,
            uv: [Vec2::ZERO; 3],
        }
    }

    /// Unnormalized normal (cross product of two edges). Its length is twice
    /// the triangle area; zero for degenerate triangles.
    #[inline]
    pub fn normal(&self) -> Vec3 {
        (self.v[1] - self.v[0]).cross(self.v[2] - self.v[0])
    }

    #[inline]
    pub fn area(&self) -> f32 {
        0.5 * self.normal().length()
    }

    /// Texture coordinate of the triangle's centroid.
    #[inline]
    pub fn centroid_uv(&self) -> Vec2 {
        (self.uv[0] + self.uv[1] + self.uv[2]) / 3.0
    }

    #[inline]
    pub fn min(&self) -> Vec3 {
        self.v[0].min(self.v[1]).min(self.v[2])
    }

    #[inline]
    pub fn max(&self) -> Vec3 {
        self.v[0].max(self.v[1]).max(self.v[2])
    }

    /// Lowest grid cell touched by the triangle's bounding box.
    #[inline]
    pub fn voxel_min(&self) -> UVec3 {
        self.min().floor().max(Vec3::ZERO).as_uvec3()
    }

    /// Exclusive upper cell bound of the triangle's bounding box. A triangle
    /// lying exactly in an integer plane still spans one cell on that axis.
    #[inline]
    pub fn voxel_max(&self) -> UVec3 {
        self.max().floor().max(Vec3::ZERO).as_uvec3() + UVec3::ONE
    }

    /// Midpoint subdivision into four quarters. The center piece comes
    /// first so callers can replace the parent in place and keep splitting.
    pub fn subdivide4(&self) -> [TexturedTriangle; 4] {
        let [a, b, c] = self.v;
        let [ua, ub, uc] = self.uv;
        let ab = a.midpoint(b);
        let bc = b.midpoint(c);
        let ca = c.midpoint(a);
        let uab = ua.midpoint(ub);
        let ubc = ub.midpoint(uc);
        let uca = uc.midpoint(ua);
        [
            TexturedTriangle::new([ab, bc, ca], [uab, ubc, uca]),
            TexturedTriangle::new([a, ab, ca], [ua, uab, uca]),
            TexturedTriangle::new([ab, b, bc], [uab, ub, ubc]),
            TexturedTriangle::new([ca, bc, c], [uca, ubc, uc]),
        ]
    }

    /// Applies an affine transform to the vertices; texture coordinates are
    /// unaffected.
    #[inline]
    pub fn transformed(&self, transform: &Affine3A) -> Self {
        Self {
            v: self.v.map(|p| transform.transform_point3(p)),
            uv: self.uv,
        }
    }
}

/// How a triangle resolves texture coordinates to colors.
#[derive(Clone, Debug)]
pub enum ShadingSource {
    /// Face without any material; shaded with [`DEFAULT_COLOR`].
    Default,
    /// Face with a constant material color.
    Flat(Vec3),
    /// Face sampling a shared read-only texture through its UVs.
    Textured(Arc<Texture>),
}

/// A textured triangle plus the shading source used to color it.
#[derive(Clone, Debug)]
pub struct VisualTriangle {
    pub geometry: TexturedTriangle,
    pub shading: ShadingSource,
}

impl VisualTriangle {
    #[inline]
    pub fn new(geometry: TexturedTriangle, shading: ShadingSource) -> Self {
        Self { geometry, shading }
    }

    /// Untextured triangle with a constant color.
    #[inline]
    pub fn flat(v: [Vec3; 3], color: Vec3) -> Self {
        Self::new(TexturedTriangle::from_vertices(v), ShadingSource::Flat(color))
    }

    /// Color of the surface at the given texture coordinate.
    #[inline]
    pub fn color_at(&self, uv: Vec2) -> Vec3 {
        match &self.shading {
            ShadingSource::Default => DEFAULT_COLOR,
            ShadingSource::Flat(color) => *color,
            ShadingSource::Textured(texture) => texture.sample(uv),
        }
    }
}
