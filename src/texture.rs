//! Immutable RGBA8 textures with wrap addressing.
//!
//! Textures are loaded once, owned by the pipeline front end and shared
//! read-only (behind an `Arc`) by every triangle that references them.

use glam::{Vec2, Vec3};

/// Texture sampling mode.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Filter {
    /// Nearest texel. The pipeline default.
    #[default]
    Nearest,
    /// Bilinear interpolation of the four surrounding texels.
    Bilinear,
}

/// An immutable 2D RGBA8 image addressed by UV coordinates in `[0, 1]²`.
/// Coordinates outside that range wrap (tile) on both axes.
#[derive(Clone, Debug)]
pub struct Texture {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    filter: Filter,
}

impl Texture {
    /// Wraps a tightly packed RGBA8 pixel buffer (row-major, top row first).
    ///
    /// # Panics
    /// Panics if the buffer length does not match `width * height * 4` or a
    /// dimension is zero.
    pub fn from_rgba8(width: u32, height: u32, pixels: Vec<u8>, filter: Filter) -> Self {
        assert!(width > 0 && height > 0, "texture dimensions must be nonzero");
        assert_eq!(
            pixels.len(),
            width as usize * height as usize * 4,
            "pixel buffer does not match texture dimensions"
        );
        Self {
            width,
            height,
            pixels,
            filter,
        }
    }

    /// 1×1 texture of a single color, useful as a fallback.
    pub fn solid(color: Vec3) -> Self {
        let to_byte = |c: f32| (c.clamp(0.0, 1.0) * 255.0) as u8;
        Self::from_rgba8(
            1,
            1,
            vec![to_byte(color.x), to_byte(color.y), to_byte(color.z), 255],
            Filter::Nearest,
        )
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    fn texel(&self, x: u32, y: u32) -> Vec3 {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Vec3::new(
            self.pixels[i] as f32,
            self.pixels[i + 1] as f32,
            self.pixels[i + 2] as f32,
        ) / 255.0
    }

    /// Samples the texture at `uv` with the configured filter. Alpha is
    /// ignored; the result is RGB in `[0, 1]`.
    pub fn sample(&self, uv: Vec2) -> Vec3 {
        match self.filter {
            Filter::Nearest => self.sample_nearest(uv),
            Filter::Bilinear => self.sample_bilinear(uv),
        }
    }

    pub fn sample_nearest(&self, uv: Vec2) -> Vec3 {
        let u = wrap(uv.x);
        let v = wrap(uv.y);
        let x = ((u * self.width as f32) as u32).min(self.width - 1);
        let y = ((v * self.height as f32) as u32).min(self.height - 1);
        self.texel(x, y)
    }

    pub fn sample_bilinear(&self, uv: Vec2) -> Vec3 {
        // Texel centers sit at half-integer coordinates.
        let x = wrap(uv.x) * self.width as f32 - 0.5;
        let y = wrap(uv.y) * self.height as f32 - 0.5;
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;

        let wrap_texel = |x: f32, y: f32| -> Vec3 {
            let tx = (x as i64).rem_euclid(self.width as i64) as u32;
            let ty = (y as i64).rem_euclid(self.height as i64) as u32;
            self.texel(tx, ty)
        };

        let top = wrap_texel(x0, y0).lerp(wrap_texel(x0 + 1.0, y0), fx);
        let bottom = wrap_texel(x0, y0 + 1.0).lerp(wrap_texel(x0 + 1.0, y0 + 1.0), fx);
        top.lerp(bottom, fy)
    }
}

/// Wraps a texture coordinate into `[0, 1)`.
#[inline]
fn wrap(c: f32) -> f32 {
    let wrapped = c.fract();
    if wrapped < 0.0 {
        wrapped + 1.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkerboard() -> Texture {
        // 2x2: red, green / blue, white.
        #[rustfmt::skip]
        let pixels = vec![
            255, 0, 0, 255,   0, 255, 0, 255,
            0, 0, 255, 255,   255, 255, 255, 255,
        ];
        Texture::from_rgba8(2, 2, pixels, Filter::Nearest)
    }

    #[test]
    fn nearest_picks_the_covering_texel() {
        let tex = checkerboard();
        assert_eq!(tex.sample(Vec2::new(0.25, 0.25)), Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(tex.sample(Vec2::new(0.75, 0.25)), Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(tex.sample(Vec2::new(0.25, 0.75)), Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn coordinates_wrap_on_both_axes() {
        let tex = checkerboard();
        let inside = tex.sample(Vec2::new(0.25, 0.25));
        assert_eq!(tex.sample(Vec2::new(1.25, 0.25)), inside);
        assert_eq!(tex.sample(Vec2::new(-0.75, 2.25)), inside);
        // Exactly 1.0 wraps back to the first texel.
        assert_eq!(tex.sample(Vec2::new(1.0, 1.0)), inside);
    }

    #[test]
    fn bilinear_blends_neighbors() {
        let pixels = vec![0, 0, 0, 255, 255, 255, 255, 255];
        let tex = Texture::from_rgba8(2, 1, pixels, Filter::Bilinear);
        // Halfway between the black and white texel centers.
        let mid = tex.sample(Vec2::new(0.5, 0.5));
        assert!(mid.abs_diff_eq(Vec3::splat(0.5), 1e-3));
    }
}
