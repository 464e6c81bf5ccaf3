//! mesh2voxel - converts triangle meshes into colored voxel grids.
//!
//! Triangles are clipped against every voxel cube their bounding boxes
//! touch; each cell folds the area-weighted colors of the fragments it
//! receives. Voxelization runs on one worker thread per hardware thread,
//! fed through a bounded command queue, and the per-worker maps are merged
//! pairwise at the end.

pub mod geometry;
pub mod io;
pub mod pipeline;
pub mod texture;
pub mod voxelize;

pub use geometry::{mesh_to_grid_transform, ShadingSource, TexturedTriangle, VisualTriangle};
pub use pipeline::{
    voxelize, ConfigError, TriangleStream, Voxel32, VoxelSink, VoxelizationArgs,
};
pub use texture::{Filter, Texture};
pub use voxelize::{ColorStrategy, VoxelMap, Voxelizer, WeightedColor, WeightedUv};
