//! Arena snapshot handed to the GPU as one structured buffer
//!
//! Binary contract with the shader side: nodes are `{ u64 bitmap; u32 header }`
//! packed into 12 bytes, voxels are one material byte, and every reference is
//! a byte offset from the start of `bytes`.

use crate::world::core::Material;
use crate::world::error::WorldResult;
use crate::world::tree::{validate_tree, voxel_at, FlatBuffer, Region, TreeIntegrityReport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuUpload {
    /// Arena bytes `[0, high_water_mark)`
    pub bytes: Vec<u8>,
    pub root_index: u32,
    pub depth: u32,
}

impl GpuUpload {
    /// Copy the arena behind `region` once no client write is in flight
    pub fn capture(region: &Region) -> Self {
        let bytes = region.client().arena().snapshot();
        log::debug!(
            "[GpuUpload::capture] {} bytes, root at {:#x}",
            bytes.len(),
            region.root_index()
        );
        Self {
            bytes,
            root_index: region.root_index(),
            depth: region.depth(),
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn buffer(&self) -> FlatBuffer<'_> {
        FlatBuffer::new(&self.bytes)
    }

    /// Material lookup against the uploaded bytes, as a shader would do it
    pub fn voxel_at(&self, x: u32, y: u32, z: u32) -> WorldResult<Material> {
        voxel_at(&self.buffer(), self.root_index, self.depth, x, y, z)
    }

    pub fn validate(&self) -> TreeIntegrityReport {
        validate_tree(&self.buffer(), self.root_index, self.depth)
    }
}
