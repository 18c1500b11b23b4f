//! Engine-wide constants
//!
//! Layout constants are part of the binary contract with the GPU consumer and
//! must not change without updating the shaders that read the arena buffer.

/// Wide-tree geometry
pub mod tree {
    /// Children per node along one axis
    pub const NODE_WIDTH: u32 = 4;
    pub const NODE_WIDTH_SQUARED: u32 = NODE_WIDTH * NODE_WIDTH;
    /// Child slots per node, one bitmap bit each
    pub const NODE_WIDTH_CUBED: u32 = NODE_WIDTH * NODE_WIDTH * NODE_WIDTH;

    pub const DEFAULT_DEPTH: u32 = 5;
    pub const MAX_DEPTH: u32 = 8;
}

/// On-arena binary layout
pub mod layout {
    /// `{ u64 bitmap; u32 header }`, packed
    pub const NODE_SIZE: usize = 12;
    pub const VOXEL_SIZE: usize = 1;

    pub const HEADER_TAG_SHIFT: u32 = 30;
    pub const HEADER_TAG_MASK: u32 = 0b11 << HEADER_TAG_SHIFT;
    pub const HEADER_INDEX_MASK: u32 = !HEADER_TAG_MASK;
    pub const HEADER_MATERIAL_MASK: u32 = 0xFF;
}

/// Arena sizing
pub mod memory {
    use super::layout::NODE_SIZE;
    use super::tree::NODE_WIDTH_CUBED;

    pub const KIB: usize = 1024;
    pub const MIB: usize = 1024 * KIB;

    /// Every byte size up to this bound has its own class
    pub const SMALL_CLASS_MAX: usize = 64;
    /// Largest node-multiple class: a full child array
    pub const LARGE_CLASS_MAX: usize = NODE_WIDTH_CUBED as usize * NODE_SIZE;

    pub const DEFAULT_ARENA_SIZE: usize = 256 * MIB;
    pub const DEFAULT_CHUNK_SIZE: usize = 12 * KIB;
    /// Indices must fit the 30-bit header field
    pub const MAX_ARENA_SIZE: usize = 1 << super::layout::HEADER_TAG_SHIFT;
    pub const ARENA_ALIGNMENT: usize = 32;
}
