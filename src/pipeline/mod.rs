//! Parallel voxelization pipeline: command queue, worker threads and the
//! driving loop that orchestrates dispatch, merge, downscale and output.

pub mod driver;
pub mod queue;

pub use driver::{voxelize, ConfigError, TriangleStream, Voxel32, VoxelSink, VoxelizationArgs};
pub use queue::{CommandQueue, Counter, RingBuffer, WorkerCommand, QUEUE_CAPACITY};
