//! Region - fixed-depth wide tree stored inside one arena client
//!
//! The root sits on level 0 and leaf-depth nodes on level `depth - 1`; each
//! leaf-depth node holds one 4x4x4 chunk. Child arrays are packed: a node
//! with `n` bits set in its bitmap owns an array of exactly `n` children in
//! ascending slot order.

use super::integrity::{validate_tree, TreeIntegrityReport};
use super::node::{NodeKind, RawNode};
use super::view::{encoding_mismatch, voxel_at};
use crate::constants::layout::{NODE_SIZE, VOXEL_SIZE};
use crate::constants::tree::{DEFAULT_DEPTH, MAX_DEPTH, NODE_WIDTH, NODE_WIDTH_SQUARED};
use crate::error::{EngineError, EngineResult};
use crate::memory::ArenaClient;
use crate::world::core::{Chunk, Material, Voxel};
use crate::world::error::{WorldError, WorldResult};
use crate::world::generation::ChunkStore;
use bytemuck::Zeroable;
use serde::Deserialize;

/// Tree shape, deserialized from the `[region]` table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    /// Levels including the root. A region spans `4^depth` voxels per axis.
    pub depth: u32,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_DEPTH,
        }
    }
}

impl RegionConfig {
    pub fn validate(&self) -> EngineResult<()> {
        if self.depth == 0 || self.depth > MAX_DEPTH {
            return Err(EngineError::invalid_config(
                "region.depth",
                self.depth,
                format!("must be between 1 and {}", MAX_DEPTH),
            ));
        }
        Ok(())
    }

    /// Voxels per axis
    pub fn width(&self) -> u32 {
        NODE_WIDTH.pow(self.depth)
    }
}

pub struct Region {
    client: ArenaClient,
    root: u32,
    depth: u32,
    chunks_inserted: usize,
}

impl Region {
    pub fn new(mut client: ArenaClient, config: &RegionConfig) -> Self {
        if let Err(e) = config.validate() {
            log::error!("[Region::new] {}", e);
            panic!("invalid region config: {}", e);
        }

        let root = client.allocate(NODE_SIZE);
        client.write(root, &empty_node(config.depth == 1));

        log::debug!(
            "[Region::new] Root at {:#x}, depth {} ({} voxels per axis)",
            root,
            config.depth,
            config.width()
        );

        Self {
            client,
            root,
            depth: config.depth,
            chunks_inserted: 0,
        }
    }

    pub fn root_index(&self) -> u32 {
        self.root
    }

    pub fn root(&self) -> RawNode {
        self.client.read(self.root)
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Voxels per axis
    pub fn width(&self) -> u32 {
        NODE_WIDTH.pow(self.depth)
    }

    pub fn client(&self) -> &ArenaClient {
        &self.client
    }

    /// Live bytes held by the tree
    pub fn used_memory(&self) -> usize {
        self.client.used_memory()
    }

    pub fn chunks_inserted(&self) -> usize {
        self.chunks_inserted
    }

    /// Store `chunk` in the leaf covering `(dx, dy, dz)`. Any coordinate inside
    /// the chunk's 4x4x4 cell selects it. Bad coordinates and corrupt nodes are
    /// fatal.
    pub fn add_chunk(&mut self, dx: u32, dy: u32, dz: u32, chunk: &Chunk) {
        if let Err(e) = self.try_add_chunk(dx, dy, dz, chunk) {
            log::error!(
                "[Region::add_chunk] Insertion at ({}, {}, {}) failed: {}",
                dx,
                dy,
                dz,
                e
            );
            panic!("region insertion failed: {}", e);
        }
    }

    pub fn try_add_chunk(&mut self, dx: u32, dy: u32, dz: u32, chunk: &Chunk) -> WorldResult<()> {
        let width = self.width();
        if dx >= width || dy >= width || dz >= width {
            return Err(WorldError::CoordinateOutOfBounds {
                x: dx,
                y: dy,
                z: dz,
                width,
            });
        }

        let leaf = self.descend_or_grow(dx, dy, dz)?;
        self.write_leaf(leaf, chunk)?;
        self.chunks_inserted += 1;

        log::trace!(
            "[Region::add_chunk] Chunk at ({}, {}, {}) stored in node {:#x}",
            dx,
            dy,
            dz,
            leaf
        );
        Ok(())
    }

    /// Walk from the root to the leaf-depth node covering the coordinate,
    /// creating missing children on the way. Returns the leaf's index.
    fn descend_or_grow(&mut self, dx: u32, dy: u32, dz: u32) -> WorldResult<u32> {
        let (mut x, mut y, mut z) = (dx, dy, dz);
        let mut span = self.width();
        let mut index = self.root;

        for level in 0..self.depth - 1 {
            span /= NODE_WIDTH;
            let slot = x / span + (y / span) * NODE_WIDTH + (z / span) * NODE_WIDTH_SQUARED;
            x %= span;
            y %= span;
            z %= span;

            let node: RawNode = self.client.read(index);
            let kind = node.kind()?;
            let children = match kind {
                NodeKind::Internal { children } => children,
                _ => return Err(encoding_mismatch(index, level, false, kind)),
            };

            let position = node.packed_position(slot);
            if node.has_child(slot) {
                index = children + (position * NODE_SIZE) as u32;
                continue;
            }

            let count = node.count();
            let grown = self.client.allocate((count + 1) * NODE_SIZE);
            if count != 0 {
                let split = position * NODE_SIZE;
                self.client.copy(children, grown, split);
                self.client.copy(
                    children + split as u32,
                    grown + (split + NODE_SIZE) as u32,
                    (count - position) * NODE_SIZE,
                );
                self.client.deallocate(children, count * NODE_SIZE);
            }

            let child = grown + (position * NODE_SIZE) as u32;
            self.client.write(child, &empty_node(level + 2 == self.depth));
            self.client.write(
                index,
                &RawNode::new(
                    node.bitmap | (1u64 << slot),
                    NodeKind::Internal { children: grown },
                ),
            );
            index = child;
        }

        Ok(index)
    }

    fn write_leaf(&mut self, index: u32, chunk: &Chunk) -> WorldResult<()> {
        let node: RawNode = self.client.read(index);
        let kind = node.kind()?;
        match kind {
            NodeKind::Terminal { voxels } => {
                let count = node.count();
                if count != 0 {
                    self.client.deallocate(voxels, count * VOXEL_SIZE);
                }
            }
            NodeKind::Lod { .. } => {}
            NodeKind::Internal { .. } => {
                return Err(encoding_mismatch(index, self.depth - 1, true, kind));
            }
        }

        let bitmap = chunk.occupancy();
        let leaf = match chunk.uniform_material() {
            Some(material) => RawNode::new(bitmap, NodeKind::Lod { material }),
            None => {
                let solid: Vec<Voxel> = chunk
                    .voxels()
                    .iter()
                    .copied()
                    .filter(|v| !v.is_air())
                    .collect();
                let voxels = self.client.allocate(solid.len() * VOXEL_SIZE);
                self.client.write_slice(voxels, &solid);
                RawNode::new(bitmap, NodeKind::Terminal { voxels })
            }
        };
        self.client.write(index, &leaf);
        Ok(())
    }

    /// Material at tree-local voxel coordinates
    pub fn voxel_at(&self, x: u32, y: u32, z: u32) -> WorldResult<Material> {
        voxel_at(&self.client, self.root, self.depth, x, y, z)
    }

    pub fn validate(&self) -> TreeIntegrityReport {
        validate_tree(&self.client, self.root, self.depth)
    }

    /// Free every packed array and the root node, then hand the client back
    /// so its chunks can be returned to the arena.
    pub fn destroy(mut self) -> ArenaClient {
        let mut stack = vec![(self.root, 0u32)];
        let mut freed_nodes = 0usize;

        while let Some((index, level)) = stack.pop() {
            let node: RawNode = self.client.read(index);
            let count = node.count();
            let kind = match node.kind() {
                Ok(kind) => kind,
                Err(e) => {
                    log::error!("[Region::destroy] {}", e);
                    panic!("corrupt region node at {:#x}: {}", index, e);
                }
            };
            let at_leaf = level + 1 == self.depth;
            match kind {
                NodeKind::Internal { children } if !at_leaf => {
                    if count != 0 {
                        for i in 0..count {
                            stack.push((children + (i * NODE_SIZE) as u32, level + 1));
                        }
                        // nothing allocates during the walk, so the freed array stays readable
                        self.client.deallocate(children, count * NODE_SIZE);
                        freed_nodes += count;
                    }
                }
                NodeKind::Terminal { voxels } if at_leaf => {
                    if count != 0 {
                        self.client.deallocate(voxels, count * VOXEL_SIZE);
                    }
                }
                NodeKind::Lod { .. } if at_leaf => {}
                _ => {
                    let e = encoding_mismatch(index, level, at_leaf, kind);
                    log::error!("[Region::destroy] {}", e);
                    panic!("corrupt region: {}", e);
                }
            }
        }

        self.client.deallocate(self.root, NODE_SIZE);
        log::debug!(
            "[Region::destroy] Freed {} nodes, {} bytes still live in the client",
            freed_nodes + 1,
            self.client.used_memory()
        );
        self.client
    }
}

impl ChunkStore for Region {
    fn add_chunk(&mut self, dx: u32, dy: u32, dz: u32, chunk: &Chunk) {
        Region::add_chunk(self, dx, dy, dz, chunk);
    }

    fn width(&self) -> u32 {
        Region::width(self)
    }
}

impl std::fmt::Debug for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Region")
            .field("root", &self.root)
            .field("depth", &self.depth)
            .field("chunks_inserted", &self.chunks_inserted)
            .field("used", &self.client.used_memory())
            .finish()
    }
}

fn empty_node(at_leaf: bool) -> RawNode {
    if at_leaf {
        RawNode::new(0, NodeKind::Terminal { voxels: 0 })
    } else {
        RawNode::zeroed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::memory::KIB;
    use crate::memory::{Arena, ArenaConfig};
    use std::sync::Arc;

    fn arena() -> Arc<Arena> {
        let config = ArenaConfig {
            max_size: 4096 * KIB,
            chunk_size: 12 * KIB,
            track_allocations: true,
        };
        Arena::new(&config).expect("arena")
    }

    fn region(arena: &Arc<Arena>, depth: u32) -> Region {
        Region::new(arena.create_client(), &RegionConfig { depth })
    }

    fn stone() -> Chunk {
        Chunk::filled(Voxel::new(Material::STONE))
    }

    /// Two materials on alternating cells, air in between
    fn checkerboard() -> Chunk {
        let mut chunk = Chunk::empty();
        for z in 0..4 {
            for y in 0..4 {
                for x in 0..4 {
                    if (x + y + z) % 2 == 0 {
                        let material = if z < 2 { Material::STONE } else { Material::DIRT };
                        chunk.set(x, y, z, Voxel::new(material));
                    }
                }
            }
        }
        chunk
    }

    #[test]
    fn test_new_region_holds_only_the_root() {
        let arena = arena();
        let region = region(&arena, 3);
        assert_eq!(region.used_memory(), NODE_SIZE);
        assert_eq!(region.width(), 64);
        assert_eq!(region.root().kind(), Ok(NodeKind::Internal { children: 0 }));
    }

    #[test]
    fn test_uniform_chunk_becomes_lod() {
        let arena = arena();
        let mut region = region(&arena, 2);
        region.add_chunk(0, 0, 0, &stone());

        let root = region.root();
        assert_eq!(root.count(), 1);
        let children = match root.kind() {
            Ok(NodeKind::Internal { children }) => children,
            other => panic!("unexpected root {:?}", other),
        };
        let leaf: RawNode = region.client().read(children);
        assert_eq!(
            leaf.kind(),
            Ok(NodeKind::Lod {
                material: Material::STONE
            })
        );
        let bitmap = leaf.bitmap;
        assert_eq!(bitmap, u64::MAX);
        // root plus a one-node child array, no voxel array
        assert_eq!(region.used_memory(), 2 * NODE_SIZE);
    }

    #[test]
    fn test_single_material_checkerboard_becomes_lod() {
        let arena = arena();
        let mut region = region(&arena, 2);
        let mut chunk = Chunk::empty();
        for z in 0..4 {
            for y in 0..4 {
                for x in 0..4 {
                    if (x + y + z) % 2 == 0 {
                        chunk.set(x, y, z, Voxel::new(Material::STONE));
                    }
                }
            }
        }
        region.add_chunk(0, 0, 0, &chunk);

        let children = match region.root().kind() {
            Ok(NodeKind::Internal { children }) => children,
            other => panic!("unexpected root {:?}", other),
        };
        let leaf: RawNode = region.client().read(children);
        assert_eq!(
            leaf.kind(),
            Ok(NodeKind::Lod {
                material: Material::STONE
            })
        );
        let bitmap = leaf.bitmap;
        assert_eq!(bitmap.count_ones(), 32);
        assert_eq!(region.used_memory(), 2 * NODE_SIZE);

        assert_eq!(region.voxel_at(0, 0, 0), Ok(Material::STONE));
        assert_eq!(region.voxel_at(1, 0, 0), Ok(Material::AIR));
        assert_eq!(region.voxel_at(3, 3, 2), Ok(Material::STONE));
    }

    #[test]
    fn test_mixed_chunk_stores_solid_voxels_in_bit_order() {
        let arena = arena();
        let mut region = region(&arena, 2);
        let chunk = checkerboard();
        region.add_chunk(4, 0, 0, &chunk);

        for z in 0..4 {
            for y in 0..4 {
                for x in 0..4 {
                    assert_eq!(
                        region.voxel_at(4 + x, y, z),
                        Ok(chunk.get(x, y, z).material)
                    );
                }
            }
        }
        assert_eq!(region.used_memory(), 2 * NODE_SIZE + 32);
        assert!(region.validate().is_valid());
    }

    #[test]
    fn test_children_stay_sorted_by_slot() {
        let arena = arena();
        let mut region = region(&arena, 2);
        for slot in (0..64u32).rev() {
            let x = slot % 4;
            let y = (slot / 4) % 4;
            let z = slot / 16;
            let material = Material::new(1 + (slot % 200) as u8);
            region.add_chunk(x * 4, y * 4, z * 4, &Chunk::filled(Voxel::new(material)));
        }

        let report = region.validate();
        assert!(report.is_valid(), "{:?}", report.violations);
        assert_eq!(report.lod_nodes, 64);
        assert_eq!(region.root().count(), 64);
        for slot in 0..64u32 {
            let (x, y, z) = (slot % 4, (slot / 4) % 4, slot / 16);
            assert_eq!(
                region.voxel_at(x * 4 + 1, y * 4 + 2, z * 4 + 3),
                Ok(Material::new(1 + slot as u8))
            );
        }
        assert_eq!(region.used_memory(), NODE_SIZE + 64 * NODE_SIZE);
    }

    #[test]
    fn test_reinsertion_does_not_leak() {
        let arena = arena();
        let mut region = region(&arena, 3);
        region.add_chunk(20, 8, 40, &checkerboard());
        let used = region.used_memory();

        region.add_chunk(20, 8, 40, &checkerboard());
        assert_eq!(region.used_memory(), used);

        region.add_chunk(21, 9, 41, &stone());
        assert_eq!(region.used_memory(), used - 32);
        region.add_chunk(20, 8, 40, &checkerboard());
        assert_eq!(region.used_memory(), used);
        assert_eq!(region.chunks_inserted(), 4);
    }

    #[test]
    fn test_depth_one_root_is_the_leaf() {
        let arena = arena();
        let mut region = region(&arena, 1);
        assert_eq!(region.width(), 4);
        assert!(region.root().kind().map(NodeKind::is_leaf).unwrap());

        region.add_chunk(0, 0, 0, &checkerboard());
        assert_eq!(region.voxel_at(0, 0, 0), Ok(Material::STONE));
        assert_eq!(region.voxel_at(1, 0, 0), Ok(Material::AIR));
        assert_eq!(region.voxel_at(1, 0, 3), Ok(Material::DIRT));
    }

    #[test]
    fn test_out_of_bounds_insertion() {
        let arena = arena();
        let mut region = region(&arena, 2);
        assert_eq!(
            region.try_add_chunk(0, 16, 0, &stone()),
            Err(WorldError::CoordinateOutOfBounds {
                x: 0,
                y: 16,
                z: 0,
                width: 16
            })
        );
        assert_eq!(region.used_memory(), NODE_SIZE);
    }

    #[test]
    #[should_panic]
    fn test_out_of_bounds_insertion_is_fatal() {
        let arena = arena();
        let mut region = region(&arena, 2);
        region.add_chunk(64, 0, 0, &stone());
    }

    #[test]
    fn test_destroy_frees_everything() {
        let arena = arena();
        let mut region = region(&arena, 4);
        region.add_chunk(0, 0, 0, &stone());
        region.add_chunk(100, 3, 17, &checkerboard());
        region.add_chunk(255, 255, 255, &checkerboard());
        region.add_chunk(128, 64, 0, &stone());

        let client = region.destroy();
        assert_eq!(client.used_memory(), 0);
        assert!(client.owned_chunk_count() >= 3);
        client.release();
        assert_eq!(arena.outstanding_chunks(), 0);
        assert_eq!(arena.used(), 0);
    }

    #[test]
    fn test_config_depth_bounds() {
        assert!(RegionConfig { depth: 0 }.validate().is_err());
        assert!(RegionConfig { depth: 9 }.validate().is_err());
        assert!(RegionConfig::default().validate().is_ok());
        assert_eq!(RegionConfig::default().width(), 1024);
    }
}
