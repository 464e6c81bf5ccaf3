//! Command-line front end: Wavefront OBJ in, VL32 voxel model out.

use anyhow::{bail, Context};
use clap::Parser;
use mesh2voxel::io::{ObjMesh, Vl32Sink};
use mesh2voxel::{voxelize, ColorStrategy, VoxelizationArgs};
use mimalloc::MiMalloc;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[command(
    name = "mesh2voxel",
    about = "Convert a triangle mesh into a colored voxel grid"
)]
struct Cli {
    /// Input mesh (Wavefront OBJ)
    input: PathBuf,
    /// Output voxel model (VL32)
    output: PathBuf,
    /// Grid resolution along the longest mesh axis
    #[arg(short, long)]
    resolution: u32,
    /// Per-cell color strategy: "max" or "blend"
    #[arg(short, long, default_value = "max")]
    strategy: String,
    /// Grid axis for each mesh axis, e.g. "xzy" swaps Y and Z
    #[arg(short, long, default_value = "xyz")]
    permutation: String,
    /// Halve the output resolution after voxelization
    #[arg(short, long)]
    downscale: bool,
}

/// Parses an axis triple like "xzy" into the grid axis each mesh axis maps
/// to.
fn parse_permutation(s: &str) -> anyhow::Result<[u32; 3]> {
    let mut axes = [u32::MAX; 3];
    let mut chars = s.chars();
    for slot in &mut axes {
        *slot = match chars.next() {
            Some('x' | 'X') => 0,
            Some('y' | 'Y') => 1,
            Some('z' | 'Z') => 2,
            other => bail!("invalid axis {other:?} in permutation \"{s}\""),
        };
    }
    if chars.next().is_some() || !mesh2voxel::geometry::is_permutation(axes) {
        bail!("\"{s}\" is not a permutation of the axes x, y, z");
    }
    Ok(axes)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let strategy: ColorStrategy = cli.strategy.parse()?;
    let args = VoxelizationArgs {
        resolution: cli.resolution,
        strategy,
        permutation: parse_permutation(&cli.permutation)?,
        downscale: cli.downscale,
    };

    log::info!(
        "converting \"{}\" to \"{}\" at resolution {} with strategy {}",
        cli.input.display(),
        cli.output.display(),
        cli.resolution,
        strategy
    );

    let mesh = ObjMesh::load(&cli.input)?;
    for (material, map) in mesh.diffuse_map_names() {
        log::warn!(
            "material \"{material}\" references texture \"{map}\"; image decoding is left to \
             library users, its diffuse color is used instead"
        );
    }

    let file = File::create(&cli.output)
        .with_context(|| format!("failed to create \"{}\"", cli.output.display()))?;
    let mut sink = Vl32Sink::new(BufWriter::new(file));
    let mut stream = mesh.into_stream();

    if !voxelize(&args, &mut stream, &mut sink)? {
        bail!("aborted after a voxel sink failure");
    }
    Ok(())
}
