// Ivy Engine - arena-backed sparse voxel world core
//
// Voxel regions live in a relocatable arena as a bitmap-coded wide tree and
// are uploaded to the GPU as one flat buffer:
// - memory::Arena / ArenaClient for index-addressed allocation
// - world::Region for tree construction and queries
// - world::generation for terrain generators
// - world_state::WorldContext to tie them together

// Constants module
pub mod constants;

// Core engine modules
pub mod error;
pub mod gpu;
pub mod memory;
pub mod world;
pub mod world_state;

use serde::Deserialize;

pub use error::{EngineError, EngineResult};
pub use gpu::GpuUpload;
pub use memory::{Arena, ArenaClient, ArenaConfig, MemoryError, MemoryResult, MemoryStats};
pub use world::{
    Chunk, ChunkStore, GenerationStats, Generator, GeneratorConfig, GeneratorKind, Material,
    Region, RegionConfig, Voxel, WorldError, WorldResult,
};
pub use world_state::WorldContext;

/// Main engine configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub arena: ArenaConfig,
    pub region: RegionConfig,
    pub generator: GeneratorConfig,
}

impl EngineConfig {
    /// Parse a TOML document; missing tables and keys take their defaults
    pub fn from_toml_str(source: &str) -> EngineResult<Self> {
        let config: EngineConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> EngineResult<()> {
        self.arena.validate()?;
        self.region.validate()?;
        self.generator.validate()?;

        log::info!(
            "[EngineConfig] Validation: arena={} MiB, chunk={} bytes, depth={}, generator={:?}",
            self.arena.max_size / (1024 * 1024),
            self.arena.chunk_size,
            self.region.depth,
            self.generator.kind
        );
        Ok(())
    }
}
