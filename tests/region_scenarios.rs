//! End-to-end region scenarios: insertion, encoding, teardown and upload.

use ivy_engine::constants::layout::NODE_SIZE;
use ivy_engine::constants::memory::KIB;
use ivy_engine::world::tree::FlatBuffer;
use ivy_engine::world::{voxel_at, NodeKind, RawNode};
use ivy_engine::{Arena, ArenaConfig, Chunk, Material, Region, RegionConfig, Voxel};
use std::collections::HashSet;
use std::sync::Arc;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn arena() -> Arc<Arena> {
    init_logging();
    let config = ArenaConfig {
        max_size: 8 * 1024 * KIB,
        chunk_size: 12 * KIB,
        track_allocations: true,
    };
    Arena::new(&config).expect("arena")
}

fn stone_chunk() -> Chunk {
    Chunk::filled(Voxel::new(Material::STONE))
}

/// Stone and dirt on even cells, air on odd cells
fn checkerboard_chunk() -> Chunk {
    let mut chunk = Chunk::empty();
    for z in 0..4 {
        for y in 0..4 {
            for x in 0..4 {
                if (x + y + z) % 2 == 0 {
                    let material = if x < 2 { Material::STONE } else { Material::DIRT };
                    chunk.set(x, y, z, Voxel::new(material));
                }
            }
        }
    }
    chunk
}

fn child(region: &Region, parent: &RawNode, position: usize) -> RawNode {
    match parent.kind() {
        Ok(NodeKind::Internal { children }) => region
            .client()
            .read(children + (position * NODE_SIZE) as u32),
        other => panic!("expected an internal node, found {:?}", other),
    }
}

#[test]
fn test_two_level_lod_and_terminal_scenario() {
    let arena = arena();
    let mut region = Region::new(arena.create_client(), &RegionConfig { depth: 2 });

    region.add_chunk(0, 0, 0, &stone_chunk());
    let root = region.root();
    let bitmap = root.bitmap;
    assert_eq!(bitmap, 0b1);
    assert_eq!(
        child(&region, &root, 0).kind(),
        Ok(NodeKind::Lod {
            material: Material::STONE
        })
    );

    let chunk = checkerboard_chunk();
    region.add_chunk(4, 0, 0, &chunk);
    let root = region.root();
    let bitmap = root.bitmap;
    assert_eq!(bitmap, 0b11);

    let terminal = child(&region, &root, 1);
    let voxels = match terminal.kind() {
        Ok(NodeKind::Terminal { voxels }) => voxels,
        other => panic!("expected a terminal node, found {:?}", other),
    };
    assert_eq!(terminal.count(), 32);
    assert_eq!(region.client().allocation_size(voxels), Some(32));

    // the packed array in bit order reproduces the non-air voxels
    let mut stored = vec![Voxel::AIR; terminal.count()];
    region.client().read_slice(voxels, &mut stored);
    let expected: Vec<Voxel> = chunk.voxels().iter().copied().filter(|v| !v.is_air()).collect();
    assert_eq!(stored, expected);

    // the LOD child kept its slot
    assert_eq!(
        child(&region, &root, 0).kind(),
        Ok(NodeKind::Lod {
            material: Material::STONE
        })
    );
    assert!(region.validate().is_valid());
}

/// Deterministic scatter of voxel coordinates inside a 256-wide region
fn scattered_coordinates(count: usize) -> Vec<(u32, u32, u32)> {
    let mut seed = 0x2545_f491_u32;
    (0..count)
        .map(|_| {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            (seed % 256, (seed >> 8) % 256, (seed >> 16) % 256)
        })
        .collect()
}

#[test]
fn test_packed_arrays_match_bitmaps_after_mixed_inserts() {
    let arena = arena();
    let mut region = Region::new(arena.create_client(), &RegionConfig { depth: 4 });

    let coordinates = scattered_coordinates(300);
    for (i, (x, y, z)) in coordinates.iter().enumerate() {
        let chunk = if i % 3 == 0 {
            stone_chunk()
        } else {
            checkerboard_chunk()
        };
        region.add_chunk(*x, *y, *z, &chunk);
    }

    let report = region.validate();
    assert!(report.is_valid(), "{:?}", report.violations);

    let leaves: HashSet<_> = coordinates
        .iter()
        .map(|(x, y, z)| (x / 4, y / 4, z / 4))
        .collect();
    assert_eq!(report.lod_nodes + report.terminal_nodes, leaves.len());
}

#[test]
fn test_reinsertion_has_no_net_growth() {
    let arena = arena();
    let mut region = Region::new(arena.create_client(), &RegionConfig { depth: 3 });
    region.add_chunk(12, 40, 60, &checkerboard_chunk());
    let used = region.used_memory();
    let allocated = arena.allocated();

    for _ in 0..10 {
        region.add_chunk(12, 40, 60, &checkerboard_chunk());
        region.add_chunk(12, 40, 60, &stone_chunk());
        region.add_chunk(12, 40, 60, &checkerboard_chunk());
    }
    assert_eq!(region.used_memory(), used);
    assert_eq!(arena.allocated(), allocated);
}

#[test]
fn test_destroy_and_release_returns_every_chunk() {
    let arena = arena();
    let mut region = Region::new(arena.create_client(), &RegionConfig { depth: 3 });
    region.add_chunk(0, 0, 0, &stone_chunk());
    region.add_chunk(17, 33, 2, &checkerboard_chunk());
    region.add_chunk(63, 63, 63, &checkerboard_chunk());
    region.add_chunk(32, 0, 48, &stone_chunk());
    assert!(arena.outstanding_chunks() >= 3);

    let client = region.destroy();
    assert_eq!(client.used_memory(), 0);
    client.release();
    assert_eq!(arena.outstanding_chunks(), 0);
    assert_eq!(arena.used(), 0);
    assert_eq!(arena.client_count(), 0);
}

#[test]
fn test_snapshot_is_relocatable() {
    let arena = arena();
    // a second client interleaves chunks so the region is not at offset 0
    let mut neighbour = arena.create_client();
    neighbour.allocate(NODE_SIZE);

    let mut region = Region::new(arena.create_client(), &RegionConfig { depth: 3 });
    region.add_chunk(4, 8, 12, &checkerboard_chunk());
    region.add_chunk(60, 0, 0, &stone_chunk());

    let bytes = arena.snapshot();
    assert_eq!(bytes.len(), arena.high_water_mark());

    // move the bytes somewhere else entirely
    let moved = bytes.clone().into_boxed_slice();
    drop(bytes);
    let buffer = FlatBuffer::new(&moved);

    for z in 0..64 {
        for y in 0..16 {
            for x in 0..64 {
                assert_eq!(
                    voxel_at(&buffer, region.root_index(), 3, x, y, z),
                    region.voxel_at(x, y, z),
                    "({}, {}, {})",
                    x,
                    y,
                    z
                );
            }
        }
    }
    assert_eq!(
        voxel_at(&buffer, region.root_index(), 3, 4, 8, 12),
        Ok(Material::STONE)
    );
    assert_eq!(
        voxel_at(&buffer, region.root_index(), 3, 61, 2, 3),
        Ok(Material::STONE)
    );
}
