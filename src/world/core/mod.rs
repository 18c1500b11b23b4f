//! Core world data types
//!
//! Voxels, materials and the transient chunk grid fed into a region.

mod chunk;
mod voxel;

pub use chunk::{Chunk, CHUNK_VOLUME, CHUNK_WIDTH};
pub use voxel::{Material, Voxel};
