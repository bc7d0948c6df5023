//! Chunk entity, its versioned tag layout and the tile registry it resolves
//! tiles against.

pub mod chunk;
pub mod error;
pub mod pos;
pub mod tile;

pub use chunk::{CHUNK_VERSION, Cell, Chunk, DEPTH, SIZE, stored_pos};
pub use error::{ChunkError, ChunkResult};
pub use pos::ChunkPos;
pub use tile::{Tile, TileRegistry};
