//! The voxelization core: plane splitting, adaptive subdivision, per-cell
//! clipping and weighted color folding.

pub mod clip;
pub mod color;
pub mod splitter;
pub mod subdivide;
pub mod voxelizer;

pub use clip::clip_to_voxel;
pub use color::{ColorStrategy, ParseStrategyError, Weighted, WeightedColor, WeightedUv};
pub use splitter::split_triangle;
pub use subdivide::{subdivide_large_triangles, VOLUME_LIMIT};
pub use voxelizer::{downscale, insert_weighted, merge_maps, VoxelMap, Voxelizer};
