use std::collections::HashMap;

use abtworld_chunk::{Chunk, ChunkPos, DEPTH, SIZE, TileRegistry};
use anyhow::{Result, bail};

/// Collects tile placements by id and resolves them against a registry in
/// one pass at `build()`.
#[derive(Default)]
pub struct ChunkBuilder {
    // Key: (x, y, layer)
    custom_tiles: HashMap<(usize, usize, usize), String>,
    // Key: layer
    full_layers: HashMap<usize, String>,
    // Key: (x, y), applied to every layer of the column
    biomes: HashMap<(usize, usize), i32>,
}

impl ChunkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a single tile at chunk-local coordinates. Out-of-range cells are ignored.
    pub fn set_tile(&mut self, x: usize, y: usize, layer: usize, id: &str) {
        if x < SIZE && y < SIZE && layer < DEPTH {
            self.custom_tiles.insert((x, y, layer), id.to_string());
        }
    }

    /// Fill an entire layer with one tile, dropping earlier single placements on it.
    pub fn fill_layer(&mut self, layer: usize, id: &str) {
        if layer >= DEPTH {
            return;
        }
        self.full_layers.insert(layer, id.to_string());
        self.custom_tiles.retain(|(_, _, l), _| *l != layer);
    }

    pub fn set_biome(&mut self, x: usize, y: usize, biome: i32) {
        if x < SIZE && y < SIZE {
            self.biomes.insert((x, y), biome);
        }
    }

    pub fn build(self, pos: ChunkPos, registry: &TileRegistry) -> Result<Chunk> {
        let mut chunk = Chunk::new(pos);

        for (&layer, id) in &self.full_layers {
            let Some(tile) = registry.get(id) else {
                bail!("tile '{}' is not registered", id);
            };
            for y in 0..SIZE {
                for x in 0..SIZE {
                    chunk.set_tile(x, y, layer, Some(tile.clone()));
                }
            }
        }

        for (&(x, y, layer), id) in &self.custom_tiles {
            let Some(tile) = registry.get(id) else {
                bail!("tile '{}' is not registered", id);
            };
            chunk.set_tile(x, y, layer, Some(tile));
        }

        for (&(x, y), &biome) in &self.biomes {
            for layer in 0..DEPTH {
                chunk.set_biome(x, y, layer, biome);
            }
        }

        Ok(chunk)
    }
}
