//! World generation
//!
//! Generators build chunks and hand them to a `ChunkStore`; the tree never
//! calls back into a generator. Chunk contents are computed in parallel with
//! rayon and inserted in a fixed order on the calling thread.

mod debug_generator;
mod heightmap;
mod procedural_generator;

pub use debug_generator::DebugGenerator;
pub use heightmap::HeightMap;
pub use procedural_generator::ProceduralGenerator;

use crate::constants::tree::NODE_WIDTH;
use crate::error::{EngineError, EngineResult};
use crate::world::core::{Chunk, Material, Voxel};
use glam::{IVec3, UVec3};
use rayon::prelude::*;
use serde::Deserialize;

/// Insertion interface consumed by generators
pub trait ChunkStore {
    /// Store a chunk at store-local voxel coordinates
    fn add_chunk(&mut self, dx: u32, dy: u32, dz: u32, chunk: &Chunk);

    /// Voxels per axis
    fn width(&self) -> u32;
}

/// Universal world generation interface
pub trait Generator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fill `store` with the world volume whose minimum corner is `origin`
    fn generate_view(&self, origin: IVec3, store: &mut dyn ChunkStore) -> GenerationStats;
}

/// What a generation pass inserted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationStats {
    pub chunks: usize,
    pub voxels: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorKind {
    Debug,
    Procedural,
}

/// Generator selection and terrain parameters, from the `[generator]` table
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub kind: GeneratorKind,
    pub seed: u32,
    pub height_offset: f64,
    pub height_multiplier: f64,
    pub frequency: f64,
    pub octaves: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            kind: GeneratorKind::Procedural,
            seed: 1337,
            height_offset: 64.0,
            height_multiplier: 32.0,
            frequency: 0.005,
            octaves: 5,
        }
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> EngineResult<()> {
        if self.kind == GeneratorKind::Procedural {
            if self.octaves == 0 {
                return Err(EngineError::invalid_config(
                    "generator.octaves",
                    self.octaves,
                    "procedural terrain needs at least one octave",
                ));
            }
            if !self.frequency.is_finite() || self.frequency <= 0.0 {
                return Err(EngineError::invalid_config(
                    "generator.frequency",
                    self.frequency,
                    "must be a positive number",
                ));
            }
        }
        Ok(())
    }
}

pub fn create_generator(config: &GeneratorConfig) -> Box<dyn Generator> {
    match config.kind {
        GeneratorKind::Debug => Box::new(DebugGenerator::new()),
        GeneratorKind::Procedural => Box::new(ProceduralGenerator::new(config)),
    }
}

/// Build the chunk whose minimum corner is `corner`, keeping only solid voxels
/// with at least one air neighbour. `None` when nothing survives.
pub(crate) fn surface_chunk<F>(corner: IVec3, sample: &F) -> Option<Chunk>
where
    F: Fn(IVec3) -> Material,
{
    const NEIGHBOURS: [IVec3; 6] = [
        IVec3::X,
        IVec3::NEG_X,
        IVec3::Y,
        IVec3::NEG_Y,
        IVec3::Z,
        IVec3::NEG_Z,
    ];

    let mut chunk = Chunk::empty();
    let mut solid = 0;
    for z in 0..NODE_WIDTH {
        for y in 0..NODE_WIDTH {
            for x in 0..NODE_WIDTH {
                let p = corner + UVec3::new(x, y, z).as_ivec3();
                let material = sample(p);
                if material.is_air() {
                    continue;
                }
                if NEIGHBOURS.iter().any(|n| sample(p + *n).is_air()) {
                    chunk.set(x, y, z, Voxel::new(material));
                    solid += 1;
                }
            }
        }
    }
    (solid > 0).then_some(chunk)
}

/// Generate the chunks of every column in parallel, then insert them in
/// column order. `column(cx, cy)` returns `(local_position, chunk)` pairs.
pub(crate) fn fill_store<F>(store: &mut dyn ChunkStore, column: F) -> GenerationStats
where
    F: Fn(u32, u32) -> Vec<(UVec3, Chunk)> + Sync,
{
    let columns = store.width() / NODE_WIDTH;
    let generated: Vec<Vec<(UVec3, Chunk)>> = (0..columns * columns)
        .into_par_iter()
        .map(|i| column(i % columns, i / columns))
        .collect();

    let mut stats = GenerationStats::default();
    for (position, chunk) in generated.iter().flatten() {
        store.add_chunk(position.x, position.y, position.z, chunk);
        stats.chunks += 1;
        stats.voxels += chunk.occupancy().count_ones() as usize;
    }
    stats
}
