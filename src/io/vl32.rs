//! VL32 voxel sink.
//!
//! VL32 is the simplest list format the original tool family writes: one
//! record per voxel, four big-endian 32-bit words — x, y, z, then the color
//! as ARGB. No header, no palette.

use crate::pipeline::{Voxel32, VoxelSink};
use log::error;
use std::io::Write;

/// Streams voxels to a writer in VL32 format. The first I/O failure latches
/// the sink into a non-writable state, surfaced through `can_write`.
pub struct Vl32Sink<W: Write> {
    writer: W,
    healthy: bool,
}

impl<W: Write> Vl32Sink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            healthy: true,
        }
    }

    /// Consumes the sink, returning the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> VoxelSink for Vl32Sink<W> {
    fn can_write(&self) -> bool {
        self.healthy
    }

    fn write(&mut self, voxel: Voxel32) {
        if !self.healthy {
            return;
        }
        let mut record = [0u8; 16];
        record[0..4].copy_from_slice(&voxel.pos.x.to_be_bytes());
        record[4..8].copy_from_slice(&voxel.pos.y.to_be_bytes());
        record[8..12].copy_from_slice(&voxel.pos.z.to_be_bytes());
        record[12..16].copy_from_slice(&voxel.argb.to_be_bytes());
        if let Err(e) = self.writer.write_all(&record) {
            error!("voxel write failed: {e}");
            self.healthy = false;
        }
    }

    fn flush(&mut self) {
        if let Err(e) = self.writer.flush() {
            error!("voxel flush failed: {e}");
            self.healthy = false;
        }
    }
}
