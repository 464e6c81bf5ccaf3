//! Pipeline driver: computes the mesh transform, spawns one worker per
//! hardware thread, dispatches triangle and merge commands, and writes the
//! merged result to the voxel sink.

use crate::geometry::{is_permutation, mesh_to_grid_transform, VisualTriangle};
use crate::pipeline::queue::{CommandQueue, WorkerCommand};
use crate::voxelize::{
    downscale, merge_maps, ColorStrategy, VoxelMap, Voxelizer, WeightedColor,
};
use glam::{Affine3A, IVec3, Vec3};
use log::{debug, error, info, warn};
use std::sync::{Arc, Mutex};
use std::thread;

/// Source of the triangles to voxelize. The flat position buffer is used
/// once, up front, to compute the mesh bounding box.
pub trait TriangleStream {
    fn vertex_count(&self) -> u64;
    /// Flat xyz coordinate buffer of every mesh vertex.
    fn vertex_positions(&self) -> &[f32];
    /// Moves the next triangle out of the stream.
    fn next(&mut self) -> Option<VisualTriangle>;
}

/// Receiver of the finished voxels.
///
/// `write` is infallible while `can_write` holds; a failed write surfaces
/// through the next `can_write` call.
pub trait VoxelSink {
    fn can_write(&self) -> bool;
    fn write(&mut self, voxel: Voxel32);
    fn flush(&mut self);
}

/// One output voxel: cell position and packed ARGB color.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Voxel32 {
    pub pos: IVec3,
    pub argb: u32,
}

/// Voxelization parameters.
#[derive(Copy, Clone, Debug)]
pub struct VoxelizationArgs {
    /// Grid resolution along the longest mesh axis. Must be at least 1.
    pub resolution: u32,
    /// Per-cell color combine strategy.
    pub strategy: ColorStrategy,
    /// Grid axis receiving each mesh axis; must be a permutation of
    /// `(0, 1, 2)`.
    pub permutation: [u32; 3],
    /// Halve the resolution after voxelization.
    pub downscale: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("resolution must be at least 1")]
    ZeroResolution,
    #[error("axes {0:?} are not a permutation of (0, 1, 2)")]
    InvalidPermutation([u32; 3]),
}

impl VoxelizationArgs {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.resolution == 0 {
            return Err(ConfigError::ZeroResolution);
        }
        if !is_permutation(self.permutation) {
            return Err(ConfigError::InvalidPermutation(self.permutation));
        }
        Ok(())
    }
}

/// Voxelizes every triangle of `stream` and writes the result to `sink`.
///
/// Returns `Ok(false)` when the sink stops accepting voxels mid-output; all
/// worker threads have joined by that point. Configuration errors are
/// reported before any thread is spawned.
pub fn voxelize(
    args: &VoxelizationArgs,
    stream: &mut dyn TriangleStream,
    sink: &mut dyn VoxelSink,
) -> Result<bool, ConfigError> {
    args.validate()?;

    if stream.vertex_count() == 0 {
        warn!("model has no vertices, writing an empty voxel model");
        sink.flush();
        return Ok(true);
    }
    info!("loaded model with {} vertices", stream.vertex_count());

    let (mesh_min, mesh_max) = bounds(stream.vertex_positions());
    let transform = mesh_to_grid_transform(mesh_min, mesh_max, args.resolution, args.permutation);

    let worker_count = thread::available_parallelism().map_or(1, usize::from);
    let queue = Arc::new(CommandQueue::new());
    let maps: Arc<Vec<Mutex<VoxelMap<WeightedColor>>>> = Arc::new(
        (0..worker_count)
            .map(|_| Mutex::new(VoxelMap::new()))
            .collect(),
    );

    let workers: Vec<_> = (0..worker_count)
        .map(|index| {
            let queue = Arc::clone(&queue);
            let maps = Arc::clone(&maps);
            let resolution = args.resolution;
            let strategy = args.strategy;
            thread::spawn(move || {
                worker_loop(index, transform, resolution, strategy, &queue, &maps)
            })
        })
        .collect();

    let mut triangle_count = 0u64;
    while let Some(triangle) = stream.next() {
        triangle_count += 1;
        queue.issue(WorkerCommand::Voxelize(triangle));
    }
    debug!("dispatched all triangles, waiting for the workers to drain");
    queue.wait_for_completion();
    info!("voxelized {triangle_count} triangles, merging results ...");

    let mut result = tournament_merge(&queue, &maps);

    for _ in 0..worker_count {
        queue.issue(WorkerCommand::Exit);
    }
    for worker in workers {
        worker.join().expect("voxelizer worker panicked");
    }

    if args.downscale {
        info!(
            "downscaling from {} to {} ...",
            args.resolution,
            args.resolution / 2
        );
        result = downscale(result, args.strategy);
    }

    info!("writing {} voxels ...", result.len());
    for (&pos, color) in result.iter() {
        if !sink.can_write() {
            error!("no more voxels can be written after an I/O error, aborting");
            return Ok(false);
        }
        sink.write(Voxel32 {
            pos: pos.as_ivec3(),
            argb: color.to_argb32(),
        });
    }
    sink.flush();
    Ok(true)
}

/// Axis-aligned bounds of a flat xyz coordinate buffer.
fn bounds(positions: &[f32]) -> (Vec3, Vec3) {
    let mut min = Vec3::splat(f32::INFINITY);
    let mut max = Vec3::splat(f32::NEG_INFINITY);
    for p in positions.chunks_exact(3) {
        let p = Vec3::new(p[0], p[1], p[2]);
        min = min.min(p);
        max = max.max(p);
    }
    (min, max)
}

fn worker_loop(
    index: usize,
    transform: Affine3A,
    resolution: u32,
    strategy: ColorStrategy,
    queue: &CommandQueue,
    maps: &[Mutex<VoxelMap<WeightedColor>>],
) {
    debug!("voxelizer worker {index} started");
    let mut voxelizer = Voxelizer::new(transform, resolution, strategy);

    let mut running = true;
    while running {
        match queue.receive() {
            WorkerCommand::Voxelize(triangle) => {
                let mut map = maps[index].lock().unwrap();
                voxelizer.voxelize(&triangle, &mut map);
            }
            WorkerCommand::Merge { target, source } => {
                debug_assert_ne!(target, source);
                // Slots are locked in ascending index order.
                let (first, second) = (target.min(source), target.max(source));
                let mut first_map = maps[first].lock().unwrap();
                let mut second_map = maps[second].lock().unwrap();
                let (target_map, source_map) = if target == first {
                    (&mut *first_map, &mut *second_map)
                } else {
                    (&mut *second_map, &mut *first_map)
                };
                merge_maps(strategy, target_map, source_map);
            }
            WorkerCommand::Exit => running = false,
        }
        queue.complete();
    }
    debug!("voxelizer worker {index} exiting");
}

/// Pairwise reduction of the per-worker maps into a single map.
///
/// Each pass scans the worker slots, pairing non-empty maps as they are
/// found and issuing a merge command per pair, with the larger map as target
/// so the smaller one is the one copied. Passes repeat until a scan issues
/// no command; the surviving map is the result. N maps reduce in O(log N)
/// passes, each pass merging in parallel across workers.
fn tournament_merge(
    queue: &CommandQueue,
    maps: &[Mutex<VoxelMap<WeightedColor>>],
) -> VoxelMap<WeightedColor> {
    loop {
        let mut pending: Option<usize> = None;
        let mut issued = 0usize;

        for index in 0..maps.len() {
            let len = maps[index].lock().unwrap().len();
            if len == 0 {
                continue;
            }
            match pending {
                None => pending = Some(index),
                Some(candidate) => {
                    let candidate_len = maps[candidate].lock().unwrap().len();
                    let (target, source) = if candidate_len < len {
                        (index, candidate)
                    } else {
                        (candidate, index)
                    };
                    queue.issue(WorkerCommand::Merge { target, source });
                    issued += 1;
                    pending = None;
                }
            }
        }

        if issued == 0 {
            return match pending {
                Some(index) => std::mem::take(&mut *maps[index].lock().unwrap()),
                None => VoxelMap::new(),
            };
        }
        queue.wait_for_completion();
    }
}
