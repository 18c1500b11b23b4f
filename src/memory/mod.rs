//! Memory Module - arena allocation for GPU-uploadable data
//!
//! `Arena` reserves one contiguous region and hands out fixed-size chunks.
//! `ArenaClient` sub-allocates inside those chunks by size class. Every
//! reference stored in the arena is a 32-bit offset from its base.

pub mod arena;
pub mod arena_client;
pub mod performance_metrics;
pub mod size_class;

pub use arena::{Arena, ArenaConfig};
pub use arena_client::ArenaClient;
pub use performance_metrics::MemoryStats;
pub use size_class::{SizeClassId, SizeClasses};

/// Memory module errors
pub mod error {
    #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
    pub enum MemoryError {
        #[error("Out of memory: requested a {requested} byte chunk from a {capacity} byte arena")]
        OutOfMemory { requested: usize, capacity: usize },

        #[error("Allocation failed for {size} bytes: {reason}")]
        AllocationFailed { size: usize, reason: String },

        #[error("No size class serves {size} bytes")]
        InvalidSizeClass { size: usize },

        #[error("Index {index:#x} is not owned by this client")]
        ForeignIndex { index: u32 },

        #[error("Block at {index:#x} was allocated with {expected} bytes, freed with {found}")]
        SizeMismatch {
            index: u32,
            expected: usize,
            found: usize,
        },

        #[error("Block at {index:#x} is not live")]
        DoubleFree { index: u32 },
    }

    pub type MemoryResult<T> = Result<T, MemoryError>;
}

pub use error::{MemoryError, MemoryResult};
