//! End-to-end pipeline tests: configuration validation, the six driver
//! scenarios, command queue semantics and sink failure handling.

use glam::{IVec3, Vec3};
use mesh2voxel::pipeline::{CommandQueue, WorkerCommand, QUEUE_CAPACITY};
use mesh2voxel::{
    voxelize, ColorStrategy, ConfigError, TriangleStream, VisualTriangle, Voxel32,
    VoxelizationArgs, VoxelSink,
};
use std::sync::Arc;
use std::thread;

/// In-memory triangle stream over a prebuilt list.
struct VecStream {
    positions: Vec<f32>,
    triangles: std::vec::IntoIter<VisualTriangle>,
}

impl VecStream {
    fn new(triangles: Vec<VisualTriangle>) -> Self {
        let positions = triangles
            .iter()
            .flat_map(|t| t.geometry.v)
            .flat_map(|v| [v.x, v.y, v.z])
            .collect();
        Self {
            positions,
            triangles: triangles.into_iter(),
        }
    }

    fn empty() -> Self {
        Self {
            positions: Vec::new(),
            triangles: Vec::new().into_iter(),
        }
    }
}

impl TriangleStream for VecStream {
    fn vertex_count(&self) -> u64 {
        (self.positions.len() / 3) as u64
    }
    fn vertex_positions(&self) -> &[f32] {
        &self.positions
    }
    fn next(&mut self) -> Option<VisualTriangle> {
        self.triangles.next()
    }
}

/// Voxel sink collecting into memory, optionally failing after a write
/// budget is exhausted.
struct CollectSink {
    voxels: Vec<Voxel32>,
    budget: Option<usize>,
    flushed: bool,
}

impl CollectSink {
    fn new() -> Self {
        Self {
            voxels: Vec::new(),
            budget: None,
            flushed: false,
        }
    }

    fn failing_after(budget: usize) -> Self {
        Self {
            voxels: Vec::new(),
            budget: Some(budget),
            flushed: false,
        }
    }
}

impl VoxelSink for CollectSink {
    fn can_write(&self) -> bool {
        self.budget.map_or(true, |b| self.voxels.len() < b)
    }
    fn write(&mut self, voxel: Voxel32) {
        self.voxels.push(voxel);
    }
    fn flush(&mut self) {
        self.flushed = true;
    }
}

fn args(resolution: u32, strategy: ColorStrategy) -> VoxelizationArgs {
    VoxelizationArgs {
        resolution,
        strategy,
        permutation: [0, 1, 2],
        downscale: false,
    }
}

fn run(args: &VoxelizationArgs, triangles: Vec<VisualTriangle>) -> Vec<Voxel32> {
    let mut stream = VecStream::new(triangles);
    let mut sink = CollectSink::new();
    assert!(voxelize(args, &mut stream, &mut sink).unwrap());
    sink.voxels
}

const RED: u32 = 0xFFFF_0000;

#[test]
fn test_single_triangle_at_resolution_two() {
    let triangle = VisualTriangle::flat(
        [
            Vec3::ZERO,
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(0.0, 2.0, 0.0),
        ],
        Vec3::X,
    );
    let mut voxels = run(&args(2, ColorStrategy::Max), vec![triangle]);
    voxels.sort_by_key(|v| (v.pos.z, v.pos.y, v.pos.x));

    let positions: Vec<IVec3> = voxels.iter().map(|v| v.pos).collect();
    assert_eq!(
        positions,
        vec![IVec3::new(0, 0, 0), IVec3::new(1, 0, 0), IVec3::new(0, 1, 0)]
    );
    assert!(voxels.iter().all(|v| v.argb == RED));
}

#[test]
fn test_degenerate_triangle_produces_an_empty_model() {
    let collinear = VisualTriangle::flat(
        [
            Vec3::ZERO,
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(2.0, 2.0, 2.0),
        ],
        Vec3::X,
    );
    let voxels = run(&args(4, ColorStrategy::Max), vec![collinear]);
    assert!(voxels.is_empty());
}

#[test]
fn test_empty_mesh_flushes_and_succeeds() {
    let mut stream = VecStream::empty();
    let mut sink = CollectSink::new();
    assert!(voxelize(&args(8, ColorStrategy::Blend), &mut stream, &mut sink).unwrap());
    assert!(sink.voxels.is_empty());
    assert!(sink.flushed);
}

#[test]
fn test_invalid_configuration_is_rejected_before_running() {
    let mut sink = CollectSink::new();
    let err = voxelize(
        &args(0, ColorStrategy::Max),
        &mut VecStream::empty(),
        &mut sink,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::ZeroResolution));

    let bad = VoxelizationArgs {
        permutation: [0, 0, 2],
        ..args(4, ColorStrategy::Max)
    };
    let err = voxelize(&bad, &mut VecStream::empty(), &mut sink).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidPermutation([0, 0, 2])));
}

#[test]
fn test_overlapping_triangles_blend_by_area() {
    // In cell (0,0,0): a red triangle of area 1/2 and a blue unit square
    // (two triangles), all in one plane. Blend: (0.5 red + 1.0 blue) / 1.5.
    let z = 0.5;
    let red = VisualTriangle::flat(
        [
            Vec3::new(0.0, 0.0, z),
            Vec3::new(1.0, 0.0, z),
            Vec3::new(0.0, 1.0, z),
        ],
        Vec3::X,
    );
    let blue_a = VisualTriangle::flat(
        [
            Vec3::new(0.0, 0.0, z),
            Vec3::new(1.0, 0.0, z),
            Vec3::new(1.0, 1.0, z),
        ],
        Vec3::Z,
    );
    let blue_b = VisualTriangle::flat(
        [
            Vec3::new(0.0, 0.0, z),
            Vec3::new(1.0, 1.0, z),
            Vec3::new(0.0, 1.0, z),
        ],
        Vec3::Z,
    );

    let voxels = run(
        &args(1, ColorStrategy::Blend),
        vec![red, blue_a, blue_b],
    );
    assert_eq!(voxels.len(), 1);
    let argb = voxels[0].argb;
    let r = (argb >> 16) & 0xFF;
    let g = (argb >> 8) & 0xFF;
    let b = argb & 0xFF;
    assert!((r as i32 - 85).abs() <= 1, "red channel {r}");
    assert_eq!(g, 0);
    assert!((b as i32 - 170).abs() <= 1, "blue channel {b}");
}

#[test]
fn test_overlapping_triangles_max_keeps_the_heavier() {
    let z = 0.5;
    let small_red = VisualTriangle::flat(
        [
            Vec3::new(0.0, 0.0, z),
            Vec3::new(0.5, 0.0, z),
            Vec3::new(0.0, 0.5, z),
        ],
        Vec3::X,
    );
    let large_blue = VisualTriangle::flat(
        [
            Vec3::new(0.0, 0.0, z),
            Vec3::new(1.0, 0.0, z),
            Vec3::new(0.0, 1.0, z),
        ],
        Vec3::Z,
    );
    let voxels = run(
        &args(1, ColorStrategy::Max),
        vec![small_red, large_blue],
    );
    assert_eq!(voxels.len(), 1);
    assert_eq!(voxels[0].argb, 0xFF00_00FF);
}

#[test]
fn test_axis_permutation_reorients_the_grid() {
    // A triangle extended along mesh X; with X -> Z the occupied cells line
    // up along the grid's Z axis.
    let triangle = VisualTriangle::flat(
        [
            Vec3::ZERO,
            Vec3::new(4.0, 0.0, 0.0),
            Vec3::new(0.0, 0.5, 0.0),
        ],
        Vec3::X,
    );
    let permuted = VoxelizationArgs {
        permutation: [2, 0, 1],
        ..args(4, ColorStrategy::Max)
    };
    let voxels = run(&permuted, vec![triangle]);
    assert!(!voxels.is_empty());
    assert!(voxels.iter().all(|v| v.pos.x == 0 && v.pos.y == 0));
    let mut zs: Vec<i32> = voxels.iter().map(|v| v.pos.z).collect();
    zs.sort_unstable();
    assert_eq!(zs, vec![0, 1, 2, 3]);
}

/// The twelve triangles of the axis-aligned box `[0, size]³`.
fn box_triangles(size: f32, color: Vec3) -> Vec<VisualTriangle> {
    let corner = |x: u32, y: u32, z: u32| {
        Vec3::new(x as f32 * size, y as f32 * size, z as f32 * size)
    };
    // Each face as (origin, edge corner, far corner, other edge corner).
    let faces = [
        [(0, 0, 0), (0, 1, 0), (1, 1, 0), (1, 0, 0)], // z = 0
        [(0, 0, 1), (1, 0, 1), (1, 1, 1), (0, 1, 1)], // z = size
        [(0, 0, 0), (1, 0, 0), (1, 0, 1), (0, 0, 1)], // y = 0
        [(0, 1, 0), (0, 1, 1), (1, 1, 1), (1, 1, 0)], // y = size
        [(0, 0, 0), (0, 0, 1), (0, 1, 1), (0, 1, 0)], // x = 0
        [(1, 0, 0), (1, 1, 0), (1, 1, 1), (1, 0, 1)], // x = size
    ];
    faces
        .iter()
        .flat_map(|&[a, b, c, d]| {
            let (a, b, c, d) = (
                corner(a.0, a.1, a.2),
                corner(b.0, b.1, b.2),
                corner(c.0, c.1, c.2),
                corner(d.0, d.1, d.2),
            );
            [
                VisualTriangle::flat([a, b, c], color),
                VisualTriangle::flat([a, c, d], color),
            ]
        })
        .collect()
}

#[test]
fn test_axis_aligned_box_round_trips_to_a_shell() {
    let resolution = 4;
    let voxels = run(
        &args(resolution, ColorStrategy::Max),
        box_triangles(resolution as f32, Vec3::Y),
    );

    let limit = resolution as i32 - 1;
    let mut positions: Vec<IVec3> = voxels.iter().map(|v| v.pos).collect();
    positions.sort_by_key(|p| (p.z, p.y, p.x));
    positions.dedup();
    assert_eq!(positions.len(), voxels.len(), "duplicate cells in output");

    let mut expected = Vec::new();
    for z in 0..=limit {
        for y in 0..=limit {
            for x in 0..=limit {
                let boundary = x == 0 || y == 0 || z == 0 || x == limit || y == limit || z == limit;
                if boundary {
                    expected.push(IVec3::new(x, y, z));
                }
            }
        }
    }
    assert_eq!(positions, expected);
}

#[test]
fn test_downscale_halves_the_shell() {
    let resolution = 4;
    let downscaled = VoxelizationArgs {
        downscale: true,
        ..args(resolution, ColorStrategy::Blend)
    };
    let voxels = run(&downscaled, box_triangles(resolution as f32, Vec3::Y));

    // Every 2x2x2 block of the 4-cube contains shell cells, so the halved
    // grid is a full 2-cube; the uniform green survives blending.
    assert_eq!(voxels.len(), 8);
    assert!(voxels
        .iter()
        .all(|v| v.pos.max_element() < 2 && v.argb == 0xFF00_FF00));
}

#[test]
fn test_sink_failure_aborts_with_a_false_result() {
    let mut stream = VecStream::new(box_triangles(4.0, Vec3::X));
    let mut sink = CollectSink::failing_after(5);
    let ok = voxelize(&args(4, ColorStrategy::Max), &mut stream, &mut sink).unwrap();
    assert!(!ok);
    assert_eq!(sink.voxels.len(), 5);
}

#[test]
fn test_command_queue_counts_completions_not_emptiness() {
    let queue = Arc::new(CommandQueue::new());
    let worker = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || {
            let mut processed = 0u32;
            loop {
                match queue.receive() {
                    WorkerCommand::Exit => {
                        queue.complete();
                        break;
                    }
                    _ => {
                        processed += 1;
                        queue.complete();
                    }
                }
            }
            processed
        })
    };

    // More commands than the queue capacity: issue must block and resume.
    let total = QUEUE_CAPACITY as u32 + 50;
    for _ in 0..total {
        queue.issue(WorkerCommand::Merge {
            target: 0,
            source: 1,
        });
    }
    queue.wait_for_completion();
    queue.issue(WorkerCommand::Exit);
    assert_eq!(worker.join().unwrap(), total);
}
