//! Weighted samples and the per-cell combine strategies.
//!
//! Every contribution a triangle makes to a cell is a value tagged with the
//! area of the fragment that produced it. Cells fold contributions with one
//! of two strategies; both are commutative so that per-worker maps can be
//! merged in any order.

use glam::{Vec2, Vec3};
use std::fmt;
use std::ops::{Add, Div, Mul};
use std::str::FromStr;

/// A value weighted by the voxel-space area that produced it.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Weighted<T> {
    pub weight: f32,
    pub value: T,
}

/// Area-weighted color contribution to a cell.
pub type WeightedColor = Weighted<Vec3>;

/// Area-weighted texture coordinate, the intermediate when blending
/// textured contributions.
pub type WeightedUv = Weighted<Vec2>;

impl<T> Weighted<T> {
    #[inline]
    pub const fn new(weight: f32, value: T) -> Self {
        Self { weight, value }
    }
}

impl<T> Weighted<T>
where
    T: Copy + Add<Output = T> + Mul<f32, Output = T> + Div<f32, Output = T>,
{
    /// Weighted average of two samples. A zero-weight sample is the
    /// identity element. The division keeps a uniform value exact across
    /// arbitrary blend chains.
    #[inline]
    pub fn blend(self, other: Self) -> Self {
        let weight = self.weight + other.weight;
        if weight == 0.0 {
            return self;
        }
        Self {
            weight,
            value: (self.value * self.weight + other.value * other.weight) / weight,
        }
    }

    /// Keeps the sample with the strictly greater weight. The incumbent
    /// (`self`) wins ties, which fixes a canonical result for map merges:
    /// the merge target survives.
    #[inline]
    pub fn heavier(self, other: Self) -> Self {
        if other.weight > self.weight {
            other
        } else {
            self
        }
    }
}

impl WeightedColor {
    pub const ZERO: WeightedColor = WeightedColor::new(0.0, Vec3::ZERO);

    /// Packs the color as ARGB32 with full alpha. Channels are scaled to
    /// 0‥255, clamped, and rounded toward zero.
    #[inline]
    pub fn to_argb32(self) -> u32 {
        let c = (self.value * 255.0).clamp(Vec3::ZERO, Vec3::splat(255.0));
        0xFF00_0000 | (c.x as u32) << 16 | (c.y as u32) << 8 | c.z as u32
    }
}

/// How multiple weighted contributions to one cell are combined.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ColorStrategy {
    /// The heaviest contribution wins the cell.
    Max,
    /// Contributions are blended with their areas as weights.
    Blend,
}

impl ColorStrategy {
    /// Folds `source` into `target` under the strategy.
    #[inline]
    pub fn combine<T>(self, target: Weighted<T>, source: Weighted<T>) -> Weighted<T>
    where
        T: Copy + Add<Output = T> + Mul<f32, Output = T> + Div<f32, Output = T>,
    {
        match self {
            ColorStrategy::Max => target.heavier(source),
            ColorStrategy::Blend => target.blend(source),
        }
    }
}

impl fmt::Display for ColorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ColorStrategy::Max => "max",
            ColorStrategy::Blend => "blend",
        })
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown color strategy `{0}`, expected `max` or `blend`")]
pub struct ParseStrategyError(String);

impl FromStr for ColorStrategy {
    type Err = ParseStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("max") {
            Ok(ColorStrategy::Max)
        } else if s.eq_ignore_ascii_case("blend") {
            Ok(ColorStrategy::Blend)
        } else {
            Err(ParseStrategyError(s.to_owned()))
        }
    }
}
