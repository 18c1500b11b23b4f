//! World context
//!
//! Owns the shared arena and the active generator for the lifetime of the
//! world subsystem. Created at subsystem start, consumed by `shutdown`.

use crate::error::EngineResult;
use crate::gpu::GpuUpload;
use crate::memory::{Arena, MemoryStats};
use crate::world::generation::{create_generator, GenerationStats, Generator};
use crate::world::tree::{Region, RegionConfig};
use crate::EngineConfig;
use glam::IVec3;
use std::sync::Arc;

pub struct WorldContext {
    arena: Arc<Arena>,
    generator: Box<dyn Generator>,
    region_config: RegionConfig,
}

impl WorldContext {
    pub fn init(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;

        let arena = Arena::new(&config.arena)?;
        let generator = create_generator(&config.generator);

        log::info!(
            "[WorldContext::init] {} generator, regions of depth {} ({} voxels per axis)",
            generator.name(),
            config.region.depth,
            config.region.width()
        );

        Ok(Self {
            arena,
            generator,
            region_config: config.region,
        })
    }

    pub fn arena(&self) -> &Arc<Arena> {
        &self.arena
    }

    pub fn generator(&self) -> &dyn Generator {
        self.generator.as_ref()
    }

    pub fn region_config(&self) -> &RegionConfig {
        &self.region_config
    }

    /// Empty region on a fresh arena client
    pub fn create_region(&self) -> Region {
        Region::new(self.arena.create_client(), &self.region_config)
    }

    /// Region filled by the configured generator for the volume at `origin`
    pub fn generate_region(&self, origin: IVec3) -> (Region, GenerationStats) {
        let mut region = self.create_region();
        let stats = self.generator.generate_view(origin, &mut region);
        log::debug!(
            "[WorldContext::generate_region] {} at {}: {} chunks, {} bytes live",
            self.generator.name(),
            origin,
            stats.chunks,
            region.used_memory()
        );
        (region, stats)
    }

    pub fn upload(&self, region: &Region) -> GpuUpload {
        GpuUpload::capture(region)
    }

    /// Destroy a region and return its chunks to the arena
    pub fn release_region(&self, region: Region) -> usize {
        region.destroy().release()
    }

    pub fn stats(&self) -> MemoryStats {
        MemoryStats::capture(&self.arena)
    }

    pub fn shutdown(self) {
        let stats = self.stats();
        if stats.clients > 0 {
            log::warn!(
                "[WorldContext::shutdown] {} arena clients still alive; the arena outlives this context",
                stats.clients
            );
        }
        log::info!("[WorldContext::shutdown] {}", stats);
    }
}

impl std::fmt::Debug for WorldContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorldContext")
            .field("arena", &self.arena)
            .field("generator", &self.generator.name())
            .field("region", &self.region_config)
            .finish()
    }
}
