//! Geometric primitives shared across the voxelization pipeline

pub mod transform;
pub mod triangle;

pub use transform::{is_permutation, mesh_to_grid_transform};
pub use triangle::{ShadingSource, TexturedTriangle, VisualTriangle, DEFAULT_COLOR};
