//! Read-only traversal shared by the live region and uploaded snapshots

use super::node::{NodeKind, RawNode};
use crate::constants::layout::{NODE_SIZE, VOXEL_SIZE};
use crate::constants::tree::{MAX_DEPTH, NODE_WIDTH, NODE_WIDTH_SQUARED};
use crate::memory::ArenaClient;
use crate::world::core::{Material, Voxel};
use crate::world::error::{WorldError, WorldResult};

/// Anything that can resolve arena indices to nodes and voxels
pub trait NodeSource {
    fn read_node(&self, index: u32) -> RawNode;

    fn read_voxel(&self, index: u32) -> Voxel;

    /// Recorded byte size of the allocation starting at `index`, when known
    fn allocation_size(&self, _index: u32) -> Option<usize> {
        None
    }

    fn tracks_allocations(&self) -> bool {
        false
    }
}

impl NodeSource for ArenaClient {
    fn read_node(&self, index: u32) -> RawNode {
        self.read(index)
    }

    fn read_voxel(&self, index: u32) -> Voxel {
        self.read(index)
    }

    fn allocation_size(&self, index: u32) -> Option<usize> {
        ArenaClient::allocation_size(self, index)
    }

    fn tracks_allocations(&self) -> bool {
        ArenaClient::tracks_allocations(self)
    }
}

/// Arena bytes copied out of process memory, e.g. the buffer handed to the GPU
#[derive(Debug, Clone, Copy)]
pub struct FlatBuffer<'a> {
    bytes: &'a [u8],
}

impl<'a> FlatBuffer<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn range(&self, index: u32, len: usize) -> &'a [u8] {
        let start = index as usize;
        match self.bytes.get(start..start + len) {
            Some(bytes) => bytes,
            None => {
                log::error!(
                    "[FlatBuffer] Index {:#x} (+{} bytes) past the end of a {} byte buffer",
                    index,
                    len,
                    self.bytes.len()
                );
                panic!("flat buffer read out of range at {:#x}", index);
            }
        }
    }
}

impl NodeSource for FlatBuffer<'_> {
    fn read_node(&self, index: u32) -> RawNode {
        bytemuck::pod_read_unaligned(self.range(index, NODE_SIZE))
    }

    fn read_voxel(&self, index: u32) -> Voxel {
        bytemuck::pod_read_unaligned(self.range(index, VOXEL_SIZE))
    }
}

/// Material at tree-local voxel coordinates. Unpopulated space reads as air.
pub fn voxel_at<S: NodeSource + ?Sized>(
    source: &S,
    root: u32,
    depth: u32,
    x: u32,
    y: u32,
    z: u32,
) -> WorldResult<Material> {
    check_depth(depth)?;
    let width = NODE_WIDTH.pow(depth);
    if x >= width || y >= width || z >= width {
        return Err(WorldError::CoordinateOutOfBounds { x, y, z, width });
    }

    let (mut x, mut y, mut z) = (x, y, z);
    let mut span = width;
    let mut index = root;
    let mut level = 0;
    loop {
        let node = source.read_node(index);
        span /= NODE_WIDTH;
        let slot = x / span + (y / span) * NODE_WIDTH + (z / span) * NODE_WIDTH_SQUARED;
        x %= span;
        y %= span;
        z %= span;

        let at_leaf = level + 1 == depth;
        let kind = node.kind()?;
        match kind {
            NodeKind::Internal { children } if !at_leaf => {
                if !node.has_child(slot) {
                    return Ok(Material::AIR);
                }
                index = children + (node.packed_position(slot) * NODE_SIZE) as u32;
                level += 1;
            }
            NodeKind::Terminal { voxels } if at_leaf => {
                if !node.has_child(slot) {
                    return Ok(Material::AIR);
                }
                let offset = (node.packed_position(slot) * VOXEL_SIZE) as u32;
                return Ok(source.read_voxel(voxels + offset).material);
            }
            NodeKind::Lod { material } if at_leaf => {
                return Ok(if node.has_child(slot) {
                    material
                } else {
                    Material::AIR
                });
            }
            _ => return Err(encoding_mismatch(index, level, at_leaf, kind)),
        }
    }
}

pub(crate) fn check_depth(depth: u32) -> WorldResult<()> {
    if depth == 0 || depth > MAX_DEPTH {
        return Err(WorldError::InvalidDepth {
            depth,
            max: MAX_DEPTH,
        });
    }
    Ok(())
}

pub(crate) fn encoding_mismatch(
    index: u32,
    level: u32,
    at_leaf: bool,
    kind: NodeKind,
) -> WorldError {
    WorldError::EncodingMismatch {
        index,
        level,
        expected: if at_leaf { "terminal or LOD" } else { "internal" },
        found: kind.name(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_tree() -> Vec<u8> {
        // root at 0 with slot 1 populated, child array at 12 holding a LOD leaf
        let root = RawNode::new(1 << 1, NodeKind::Internal { children: 12 });
        let leaf = RawNode::new(
            0b11,
            NodeKind::Lod {
                material: Material::DIRT,
            },
        );
        let mut bytes = Vec::new();
        bytes.extend_from_slice(bytemuck::bytes_of(&root));
        bytes.extend_from_slice(bytemuck::bytes_of(&leaf));
        bytes
    }

    #[test]
    fn test_flat_buffer_lookup() {
        let bytes = flat_tree();
        let buffer = FlatBuffer::new(&bytes);
        assert_eq!(voxel_at(&buffer, 0, 2, 4, 0, 0), Ok(Material::DIRT));
        assert_eq!(voxel_at(&buffer, 0, 2, 5, 0, 0), Ok(Material::DIRT));
        assert_eq!(voxel_at(&buffer, 0, 2, 6, 0, 0), Ok(Material::AIR));
        assert_eq!(voxel_at(&buffer, 0, 2, 0, 0, 0), Ok(Material::AIR));
    }

    #[test]
    fn test_out_of_bounds_coordinate() {
        let bytes = flat_tree();
        let buffer = FlatBuffer::new(&bytes);
        assert_eq!(
            voxel_at(&buffer, 0, 2, 16, 0, 0),
            Err(WorldError::CoordinateOutOfBounds {
                x: 16,
                y: 0,
                z: 0,
                width: 16
            })
        );
    }

    #[test]
    fn test_depth_mismatch_is_reported() {
        let bytes = flat_tree();
        let buffer = FlatBuffer::new(&bytes);
        // read as a depth-3 tree the LOD node sits above leaf depth
        assert!(matches!(
            voxel_at(&buffer, 0, 3, 16, 0, 0),
            Err(WorldError::EncodingMismatch { index: 12, level: 1, .. })
        ));
    }

    #[test]
    fn test_depth_outside_range_is_rejected() {
        let bytes = [0u8; 12];
        let buffer = FlatBuffer::new(&bytes);
        for depth in [0, MAX_DEPTH + 1, 16, u32::MAX] {
            assert_eq!(
                voxel_at(&buffer, 0, depth, 0, 0, 0),
                Err(WorldError::InvalidDepth {
                    depth,
                    max: MAX_DEPTH
                })
            );
        }
    }

    #[test]
    #[should_panic]
    fn test_read_past_end_is_fatal() {
        let bytes = flat_tree();
        FlatBuffer::new(&bytes).read_node(20);
    }
}
