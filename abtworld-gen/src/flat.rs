use abtworld_chunk::{Chunk, ChunkPos, TileRegistry};

use crate::builder::ChunkBuilder;
use crate::{DEFAULT_ABOVE, DEFAULT_GROUND, WorldGenerator};

/// Fills layer 0 of ground-level chunks (z = 0) with the ground tile and of
/// the chunks directly above (z = -1) with the above tile. Every other chunk
/// and layer is left empty.
pub struct LayerGenerator {
    pub ground: String,
    pub above: String,
}

impl Default for LayerGenerator {
    fn default() -> Self {
        Self {
            ground: DEFAULT_GROUND.to_string(),
            above: DEFAULT_ABOVE.to_string(),
        }
    }
}

impl LayerGenerator {
    pub(crate) fn builder_for(&self, pos: ChunkPos) -> ChunkBuilder {
        let mut builder = ChunkBuilder::new();
        match pos.z {
            0 => builder.fill_layer(0, &self.ground),
            -1 => builder.fill_layer(0, &self.above),
            _ => {}
        }
        builder
    }
}

impl WorldGenerator for LayerGenerator {
    fn generate_chunk(&self, pos: ChunkPos, registry: &TileRegistry) -> anyhow::Result<Chunk> {
        self.builder_for(pos).build(pos, registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use abtworld_chunk::{DEPTH, SIZE};

    fn registry() -> TileRegistry {
        TileRegistry::with_ids([DEFAULT_GROUND, DEFAULT_ABOVE])
    }

    fn layer_ids(chunk: &Chunk, layer: usize) -> Vec<Option<String>> {
        let mut out = Vec::new();
        for y in 0..SIZE {
            for x in 0..SIZE {
                out.push(chunk.get_tile(x, y, layer).map(|t| t.id().to_string()));
            }
        }
        out
    }

    #[test]
    fn test_ground_chunk() {
        let chunk = LayerGenerator::default()
            .generate_chunk(ChunkPos::new(3, -2, 0), &registry())
            .unwrap();
        assert!(layer_ids(&chunk, 0).iter().all(|t| t.as_deref() == Some(DEFAULT_GROUND)));
        for layer in 1..DEPTH {
            assert!(layer_ids(&chunk, layer).iter().all(Option::is_none));
        }
    }

    #[test]
    fn test_above_chunk() {
        let chunk = LayerGenerator::default()
            .generate_chunk(ChunkPos::new(0, 0, -1), &registry())
            .unwrap();
        assert!(layer_ids(&chunk, 0).iter().all(|t| t.as_deref() == Some(DEFAULT_ABOVE)));
        assert!(layer_ids(&chunk, 1).iter().all(Option::is_none));
    }

    #[test]
    fn test_other_layers_empty() {
        for z in [-5, -2, 1, 4] {
            let chunk = LayerGenerator::default()
                .generate_chunk(ChunkPos::new(0, 0, z), &registry())
                .unwrap();
            assert!(chunk.cells().all(|c| c.tile.is_none()), "z = {}", z);
        }
    }

    #[test]
    fn test_deterministic() {
        let generator = LayerGenerator::default();
        let pos = ChunkPos::new(9, 9, 0);
        assert_eq!(
            generator.generate_chunk(pos, &registry()).unwrap(),
            generator.generate_chunk(pos, &registry()).unwrap()
        );
    }
}
