//! Staircase test terrain: solid wherever `z <= max(x, y)`

use super::{fill_store, surface_chunk, ChunkStore, GenerationStats, Generator};
use crate::constants::tree::NODE_WIDTH;
use crate::world::core::Material;
use glam::{IVec3, UVec3};

#[derive(Debug, Clone, Copy, Default)]
pub struct DebugGenerator;

impl DebugGenerator {
    pub fn new() -> Self {
        Self
    }

    /// World-space material; everything outside the view reads as air
    fn sample(origin: IVec3, width: i32, p: IVec3) -> Material {
        let local = p - origin;
        if local.cmplt(IVec3::ZERO).any() || local.cmpge(IVec3::splat(width)).any() {
            return Material::AIR;
        }
        if p.z <= p.x.max(p.y) {
            Material::STONE
        } else {
            Material::AIR
        }
    }
}

impl Generator for DebugGenerator {
    fn name(&self) -> &'static str {
        "debug"
    }

    fn generate_view(&self, origin: IVec3, store: &mut dyn ChunkStore) -> GenerationStats {
        let width = store.width();
        let sample = |p: IVec3| Self::sample(origin, width as i32, p);

        let stats = fill_store(store, |cx, cy| {
            let mut chunks = Vec::new();
            let (x, y) = (cx * NODE_WIDTH, cy * NODE_WIDTH);
            // nothing is solid above the highest max(x, y) in the column
            let ceiling = (origin.x + (x + NODE_WIDTH) as i32)
                .max(origin.y + (y + NODE_WIDTH) as i32);
            let mut z = 0;
            while z < width && origin.z + z as i32 <= ceiling {
                let local = UVec3::new(x, y, z);
                if let Some(chunk) = surface_chunk(origin + local.as_ivec3(), &sample) {
                    chunks.push((local, chunk));
                }
                z += NODE_WIDTH;
            }
            chunks
        });

        log::debug!(
            "[DebugGenerator::generate_view] {} chunks, {} voxels at {}",
            stats.chunks,
            stats.voxels,
            origin
        );
        stats
    }
}
