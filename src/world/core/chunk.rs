//! Dense 4x4x4 voxel grid, the unit of insertion into a region
//!
//! Voxels are stored x fastest, then y, then z. Chunks are transient: they
//! are built by a generator, copied into the tree and dropped.

use super::voxel::{Material, Voxel};
use crate::constants::tree::{NODE_WIDTH, NODE_WIDTH_CUBED, NODE_WIDTH_SQUARED};

pub const CHUNK_WIDTH: u32 = NODE_WIDTH;
pub const CHUNK_VOLUME: usize = NODE_WIDTH_CUBED as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    voxels: [Voxel; CHUNK_VOLUME],
}

impl Default for Chunk {
    fn default() -> Self {
        Self::empty()
    }
}

impl Chunk {
    /// All air
    pub const fn empty() -> Self {
        Self {
            voxels: [Voxel::AIR; CHUNK_VOLUME],
        }
    }

    pub const fn filled(voxel: Voxel) -> Self {
        Self {
            voxels: [voxel; CHUNK_VOLUME],
        }
    }

    #[inline]
    pub fn index(x: u32, y: u32, z: u32) -> usize {
        assert!(
            x < CHUNK_WIDTH && y < CHUNK_WIDTH && z < CHUNK_WIDTH,
            "chunk coordinate ({}, {}, {}) out of bounds",
            x,
            y,
            z
        );
        (x + y * NODE_WIDTH + z * NODE_WIDTH_SQUARED) as usize
    }

    pub fn set(&mut self, x: u32, y: u32, z: u32, voxel: Voxel) {
        self.voxels[Self::index(x, y, z)] = voxel;
    }

    pub fn get(&self, x: u32, y: u32, z: u32) -> Voxel {
        self.voxels[Self::index(x, y, z)]
    }

    /// Voxels in storage order
    pub fn voxels(&self) -> &[Voxel; CHUNK_VOLUME] {
        &self.voxels
    }

    /// Bit `i` set when voxel `i` in storage order is not air
    pub fn occupancy(&self) -> u64 {
        self.voxels
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.is_air())
            .fold(0u64, |mask, (i, _)| mask | (1u64 << i))
    }

    pub fn is_empty(&self) -> bool {
        self.voxels.iter().all(|v| v.is_air())
    }

    /// The one material every non-air voxel shares, `AIR` for an empty chunk.
    /// `None` when two non-air voxels differ.
    pub fn uniform_material(&self) -> Option<Material> {
        let mut uniform = Material::AIR;
        for voxel in self.voxels.iter().filter(|v| !v.is_air()) {
            if uniform.is_air() {
                uniform = voxel.material;
            } else if uniform != voxel.material {
                return None;
            }
        }
        Some(uniform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get() {
        let mut chunk = Chunk::empty();
        chunk.set(3, 2, 1, Voxel::new(Material::DIRT));
        assert_eq!(chunk.get(3, 2, 1).material, Material::DIRT);
        assert!(chunk.get(1, 2, 3).is_air());
    }

    #[test]
    fn test_storage_order_is_x_fastest() {
        let mut chunk = Chunk::empty();
        chunk.set(1, 0, 0, Voxel::new(Material::STONE));
        chunk.set(0, 1, 0, Voxel::new(Material::STONE));
        chunk.set(0, 0, 1, Voxel::new(Material::STONE));
        assert_eq!(chunk.occupancy(), (1 << 1) | (1 << 4) | (1 << 16));
    }

    #[test]
    #[should_panic]
    fn test_out_of_bounds_set() {
        Chunk::empty().set(4, 0, 0, Voxel::new(Material::STONE));
    }

    #[test]
    fn test_uniformity_ignores_air() {
        assert_eq!(Chunk::empty().uniform_material(), Some(Material::AIR));
        assert!(Chunk::empty().is_empty());

        let mut chunk = Chunk::filled(Voxel::new(Material::STONE));
        assert_eq!(chunk.uniform_material(), Some(Material::STONE));
        chunk.set(0, 0, 0, Voxel::AIR);
        assert_eq!(chunk.uniform_material(), Some(Material::STONE));
        assert!(!chunk.is_empty());

        chunk.set(1, 0, 0, Voxel::new(Material::DIRT));
        assert_eq!(chunk.uniform_material(), None);
    }
}
