use abtworld_chunk::{Chunk, ChunkPos, TileRegistry};
use anyhow::Result;

/// Tile id placed on layer 0 of chunks at z = 0.
pub const DEFAULT_GROUND: &str = "defaultGround";
/// Tile id placed on layer 0 of chunks at z = -1.
pub const DEFAULT_ABOVE: &str = "defaultAbove";

pub trait WorldGenerator: Send + Sync {
    fn generate_chunk(&self, pos: ChunkPos, registry: &TileRegistry) -> Result<Chunk>;
}

pub mod biome;
pub mod builder;
pub mod flat;
