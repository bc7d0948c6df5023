use abtworld_chunk::{Chunk, ChunkPos, SIZE, TileRegistry};

use crate::WorldGenerator;
use crate::flat::LayerGenerator;

/// Layer fill plus a per-column biome derived from a cheap coordinate hash.
pub struct BiomeGenerator {
    layers: LayerGenerator,
    seed: i64,
    biome_count: i32,
}

impl BiomeGenerator {
    pub fn new(seed: i64, biome_count: i32) -> Self {
        Self {
            layers: LayerGenerator::default(),
            seed,
            biome_count: biome_count.max(1),
        }
    }

    pub fn with_layers(mut self, layers: LayerGenerator) -> Self {
        self.layers = layers;
        self
    }

    /// Biome of world column `(x, y)`; stable across chunk boundaries.
    pub fn biome_at(&self, x: i64, y: i64) -> i32 {
        // coarse 8x8 patches so neighbouring cells usually agree
        let px = x.div_euclid(8);
        let py = y.div_euclid(8);
        let h = px.wrapping_mul(31) ^ py.wrapping_mul(17) ^ self.seed.wrapping_mul(0x9E37_79B9);
        h.rem_euclid(self.biome_count as i64) as i32
    }
}

impl WorldGenerator for BiomeGenerator {
    fn generate_chunk(&self, pos: ChunkPos, registry: &TileRegistry) -> anyhow::Result<Chunk> {
        let mut builder = self.layers.builder_for(pos);
        let origin_x = pos.x.wrapping_mul(SIZE as i64);
        let origin_y = pos.y.wrapping_mul(SIZE as i64);
        for y in 0..SIZE {
            for x in 0..SIZE {
                let biome = self.biome_at(origin_x.wrapping_add(x as i64), origin_y.wrapping_add(y as i64));
                builder.set_biome(x, y, biome);
            }
        }
        builder.build(pos, registry)
    }
}
