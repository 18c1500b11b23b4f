//! Heightmap terrain from fractal simplex noise

use super::{
    fill_store, surface_chunk, ChunkStore, GenerationStats, Generator, GeneratorConfig, HeightMap,
};
use crate::constants::tree::NODE_WIDTH;
use crate::world::core::Material;
use glam::{IVec3, UVec3};
use noise::{Fbm, MultiFractal, NoiseFn, Simplex};

pub struct ProceduralGenerator {
    noise: Fbm<Simplex>,
    height_offset: f64,
    height_multiplier: f64,
}

impl ProceduralGenerator {
    pub fn new(config: &GeneratorConfig) -> Self {
        let noise = Fbm::<Simplex>::new(config.seed)
            .set_octaves(config.octaves)
            .set_frequency(config.frequency);
        Self {
            noise,
            height_offset: config.height_offset,
            height_multiplier: config.height_multiplier,
        }
    }

    /// Surface height of the world column at `(x, y)`
    pub fn surface_height(&self, x: i32, y: i32) -> i32 {
        let n = self.noise.get([x as f64, y as f64]);
        (self.height_offset + n * self.height_multiplier).floor() as i32
    }

    /// Heights for the `width` x `width` columns starting at `(x, y)`
    pub fn heightmap(&self, x: i32, y: i32, width: u32) -> HeightMap {
        HeightMap::from_fn(width, |dx, dy| {
            self.surface_height(x + dx as i32, y + dy as i32)
        })
    }
}

/// Chunk-aligned vertical range worth sampling for a column whose heights span
/// `[min, max]`, one chunk of margin below
fn column_range(min: i32, max: i32) -> (i32, i32) {
    let w = NODE_WIDTH as i32;
    let low = (min.div_euclid(w) - 1) * w;
    let high = -(-max).div_euclid(w) * w;
    (low, high)
}

impl Generator for ProceduralGenerator {
    fn name(&self) -> &'static str {
        "procedural"
    }

    fn generate_view(&self, origin: IVec3, store: &mut dyn ChunkStore) -> GenerationStats {
        let width = store.width();
        let heights = self.heightmap(origin.x, origin.y, width);

        // stone below the surface; outside the view counts as stone so the
        // view's sides and floor stay closed
        let sample = |p: IVec3| {
            let local = p - origin;
            if local.cmplt(IVec3::ZERO).any() || local.cmpge(IVec3::splat(width as i32)).any() {
                return Material::STONE;
            }
            if p.z <= heights.get(local.x as u32, local.y as u32) {
                Material::STONE
            } else {
                Material::AIR
            }
        };

        let w = NODE_WIDTH as i32;
        let top = width as i32 - w;
        let stats = fill_store(store, |cx, cy| {
            let (x, y) = (cx * NODE_WIDTH, cy * NODE_WIDTH);
            let (min, max) = heights.cell_bounds(x, y, NODE_WIDTH);
            let (low, high) = column_range(min, max);
            let mut chunks = Vec::new();
            if high < origin.z || low > origin.z + width as i32 {
                return chunks;
            }

            let mut z = (low - origin.z).max(0).div_euclid(w) * w;
            let end = (high - origin.z).min(top);
            while z <= end {
                let local = UVec3::new(x, y, z as u32);
                if let Some(chunk) = surface_chunk(origin + local.as_ivec3(), &sample) {
                    chunks.push((local, chunk));
                }
                z += w;
            }
            chunks
        });

        log::debug!(
            "[ProceduralGenerator::generate_view] {} chunks, {} voxels at {}",
            stats.chunks,
            stats.voxels,
            origin
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::generation::test_support::RecordingStore;

    fn flat(height: f64) -> ProceduralGenerator {
        ProceduralGenerator::new(&GeneratorConfig {
            height_offset: height,
            height_multiplier: 0.0,
            ..GeneratorConfig::default()
        })
    }

    #[test]
    fn test_column_range() {
        assert_eq!(column_range(5, 9), (0, 12));
        assert_eq!(column_range(8, 8), (4, 8));
        assert_eq!(column_range(-3, 1), (-8, 4));
    }

    #[test]
    fn test_flat_terrain_is_a_single_sheet() {
        let mut store = RecordingStore::new(16);
        let stats = flat(6.0).generate_view(IVec3::ZERO, &mut store);
        assert!(stats.chunks > 0);
        for y in 0..16 {
            for x in 0..16 {
                assert_eq!(store.material(x, y, 6), Material::STONE, "({}, {})", x, y);
                assert_eq!(store.material(x, y, 7), Material::AIR);
                // sides and floor border stone, so the interior stays hollow
                assert_eq!(store.material(x, y, 5), Material::AIR);
            }
        }
    }

    #[test]
    fn test_terrain_above_the_view_is_skipped() {
        let mut store = RecordingStore::new(16);
        let stats = flat(200.0).generate_view(IVec3::ZERO, &mut store);
        assert_eq!(stats, GenerationStats::default());
    }

    #[test]
    fn test_noise_is_deterministic() {
        let config = GeneratorConfig::default();
        let a = ProceduralGenerator::new(&config).heightmap(0, 0, 8);
        let b = ProceduralGenerator::new(&config).heightmap(0, 0, 8);
        assert_eq!(a, b);
        let h = a.get(3, 3);
        assert!((32..=96).contains(&h), "height {}", h);
    }
}
