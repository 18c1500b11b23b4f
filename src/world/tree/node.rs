//! Wide-tree node encoding
//!
//! A node is 12 packed bytes: `{ bitmap: u64, header: u32 }`. The top two
//! header bits select how the low 30 bits are read:
//!
//! | tag  | kind     | low bits                          |
//! |------|----------|-----------------------------------|
//! | `00` | internal | index of the packed child array   |
//! | `01` | terminal | index of the packed voxel array   |
//! | `11` | LOD      | uniform material in the low 8     |
//! | `10` | invalid  |                                   |

use crate::constants::layout::{
    HEADER_INDEX_MASK, HEADER_MATERIAL_MASK, HEADER_TAG_MASK, HEADER_TAG_SHIFT, NODE_SIZE,
};
use crate::world::core::Material;
use crate::world::error::{WorldError, WorldResult};
use bytemuck::{Pod, Zeroable};

const TAG_INTERNAL: u32 = 0b00;
const TAG_TERMINAL: u32 = 0b01;
const TAG_LOD: u32 = 0b11;

/// Node as stored in the arena and read by the GPU
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct RawNode {
    pub bitmap: u64,
    pub header: u32,
}

static_assertions::const_assert_eq!(std::mem::size_of::<RawNode>(), NODE_SIZE);

/// Decoded header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Internal { children: u32 },
    Terminal { voxels: u32 },
    Lod { material: Material },
}

impl NodeKind {
    pub fn encode(self) -> u32 {
        match self {
            NodeKind::Internal { children } => pack(TAG_INTERNAL, children),
            NodeKind::Terminal { voxels } => pack(TAG_TERMINAL, voxels),
            NodeKind::Lod { material } => (TAG_LOD << HEADER_TAG_SHIFT) | material.0 as u32,
        }
    }

    pub fn decode(header: u32) -> WorldResult<Self> {
        let index = header & HEADER_INDEX_MASK;
        match (header & HEADER_TAG_MASK) >> HEADER_TAG_SHIFT {
            TAG_INTERNAL => Ok(NodeKind::Internal { children: index }),
            TAG_TERMINAL => Ok(NodeKind::Terminal { voxels: index }),
            TAG_LOD => Ok(NodeKind::Lod {
                material: Material((header & HEADER_MATERIAL_MASK) as u8),
            }),
            _ => Err(WorldError::InvalidHeaderTag { header }),
        }
    }

    /// Terminal and LOD nodes sit at leaf depth, internal nodes above it
    pub fn is_leaf(self) -> bool {
        !matches!(self, NodeKind::Internal { .. })
    }

    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Internal { .. } => "internal",
            NodeKind::Terminal { .. } => "terminal",
            NodeKind::Lod { .. } => "LOD",
        }
    }
}

fn pack(tag: u32, index: u32) -> u32 {
    assert!(
        index & HEADER_TAG_MASK == 0,
        "arena index {:#x} does not fit the 30-bit header field",
        index
    );
    (tag << HEADER_TAG_SHIFT) | index
}

impl RawNode {
    pub fn new(bitmap: u64, kind: NodeKind) -> Self {
        Self {
            bitmap,
            header: kind.encode(),
        }
    }

    pub fn kind(&self) -> WorldResult<NodeKind> {
        NodeKind::decode(self.header)
    }

    /// Populated slots
    pub fn count(&self) -> usize {
        let bitmap = self.bitmap;
        bitmap.count_ones() as usize
    }

    pub fn has_child(&self, slot: u32) -> bool {
        let bitmap = self.bitmap;
        bitmap & (1u64 << slot) != 0
    }

    /// Position of `slot` inside the packed array
    pub fn packed_position(&self, slot: u32) -> usize {
        let bitmap = self.bitmap;
        let below = (1u64 << slot) - 1;
        (bitmap & below).count_ones() as usize
    }
}
