//! World Module
//!
//! - **Core**: voxels, materials and the chunk grid
//! - **Tree**: the arena-resident wide tree (`Region`) and its readers
//! - **Generation**: generators that fill a `ChunkStore`

pub mod core;
pub mod error;
pub mod generation;
pub mod tree;

pub use core::{Chunk, Material, Voxel, CHUNK_VOLUME, CHUNK_WIDTH};
pub use error::{WorldError, WorldResult};
pub use generation::{
    create_generator, ChunkStore, DebugGenerator, GenerationStats, Generator, GeneratorConfig,
    GeneratorKind, HeightMap, ProceduralGenerator,
};
pub use tree::{
    validate_tree, voxel_at, FlatBuffer, NodeKind, NodeSource, RawNode, Region, RegionConfig,
    TreeIntegrityReport,
};
