use std::fmt;

use serde::Serialize;

use crate::chunk::{DEPTH, SIZE};

/// Chunk-grid coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ChunkPos {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl ChunkPos {
    pub const fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }

    /// Chunk containing the world cell `(x, y, z)`. Floors towards negative
    /// infinity, so cell -1 belongs to chunk -1.
    pub fn from_world(x: i64, y: i64, z: i64) -> Self {
        Self {
            x: x.div_euclid(SIZE as i64),
            y: y.div_euclid(SIZE as i64),
            z: z.div_euclid(DEPTH as i64),
        }
    }

    /// Cell-local coordinates of a world cell inside its chunk.
    pub fn local(x: i64, y: i64, z: i64) -> (usize, usize, usize) {
        (
            x.rem_euclid(SIZE as i64) as usize,
            y.rem_euclid(SIZE as i64) as usize,
            z.rem_euclid(DEPTH as i64) as usize,
        )
    }
}

impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}
