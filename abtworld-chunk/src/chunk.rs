//! Fixed-size grid of world cells and its versioned tag layout.
//!
//! A saved chunk is a flat group:
//! - `version` (Int), `x`, `y`, `z` (Long)
//! - per cell, keyed `<field>/<layer>/<row>/<col>`: `tile` and `state` and
//!   `area` (String), `flag` (Boolean), `biome` (Int)
//!
//! A cell without a tile is stored as an empty tile id.

use std::sync::Arc;

use abtworld_abt::{Tag, TagGroup, TagIndex};

use crate::error::{ChunkError, ChunkResult};
use crate::pos::ChunkPos;
use crate::tile::{Tile, TileRegistry};

/// Cells per side of a chunk layer.
pub const SIZE: usize = 16;
/// Layers per chunk.
pub const DEPTH: usize = 2;
/// The only chunk format this crate reads or writes.
pub const CHUNK_VERSION: i32 = 0;

const CELLS: usize = SIZE * SIZE * DEPTH;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cell {
    pub tile: Option<Arc<Tile>>,
    pub state: String,
    pub flag: bool,
    pub area: String,
    pub biome: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pos: ChunkPos,
    version: i32,
    cells: Vec<Cell>,
}

#[inline]
fn index(lx: usize, ly: usize, lz: usize) -> usize {
    if lx >= SIZE || ly >= SIZE || lz >= DEPTH {
        panic!(
            "IndexOutOfBounds: cell ({}, {}, {}) outside {}x{}x{} chunk",
            lx, ly, lz, SIZE, SIZE, DEPTH
        );
    }
    (lz * SIZE + ly) * SIZE + lx
}

fn cell_key(field: &str, lx: usize, ly: usize, lz: usize) -> String {
    format!("{}/{}/{}/{}", field, lz, ly, lx)
}

impl Chunk {
    /// A chunk with every cell at its default.
    pub fn new(pos: ChunkPos) -> Self {
        Self {
            pos,
            version: CHUNK_VERSION,
            cells: vec![Cell::default(); CELLS],
        }
    }

    #[inline]
    pub fn pos(&self) -> ChunkPos {
        self.pos
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    #[inline]
    pub fn is_at(&self, cx: i64, cy: i64, cz: i64) -> bool {
        self.pos.x == cx && self.pos.y == cy && self.pos.z == cz
    }

    pub fn cell(&self, lx: usize, ly: usize, lz: usize) -> &Cell {
        &self.cells[index(lx, ly, lz)]
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    pub fn get_tile(&self, lx: usize, ly: usize, lz: usize) -> Option<&Arc<Tile>> {
        self.cells[index(lx, ly, lz)].tile.as_ref()
    }

    pub fn set_tile(&mut self, lx: usize, ly: usize, lz: usize, tile: Option<Arc<Tile>>) {
        self.cells[index(lx, ly, lz)].tile = tile;
    }

    pub fn get_state(&self, lx: usize, ly: usize, lz: usize) -> &str {
        &self.cells[index(lx, ly, lz)].state
    }

    pub fn set_state(&mut self, lx: usize, ly: usize, lz: usize, state: impl Into<String>) {
        self.cells[index(lx, ly, lz)].state = state.into();
    }

    pub fn get_flag(&self, lx: usize, ly: usize, lz: usize) -> bool {
        self.cells[index(lx, ly, lz)].flag
    }

    pub fn set_flag(&mut self, lx: usize, ly: usize, lz: usize, flag: bool) {
        self.cells[index(lx, ly, lz)].flag = flag;
    }

    pub fn get_area(&self, lx: usize, ly: usize, lz: usize) -> &str {
        &self.cells[index(lx, ly, lz)].area
    }

    pub fn set_area(&mut self, lx: usize, ly: usize, lz: usize, area: impl Into<String>) {
        self.cells[index(lx, ly, lz)].area = area.into();
    }

    pub fn get_biome(&self, lx: usize, ly: usize, lz: usize) -> i32 {
        self.cells[index(lx, ly, lz)].biome
    }

    pub fn set_biome(&mut self, lx: usize, ly: usize, lz: usize, biome: i32) {
        self.cells[index(lx, ly, lz)].biome = biome;
    }

    pub fn save(&self) -> TagGroup {
        let mut group = TagGroup::with_capacity(4 + CELLS * 5);
        group
            .add(Tag::int("version", self.version))
            .add(Tag::long("x", self.pos.x))
            .add(Tag::long("y", self.pos.y))
            .add(Tag::long("z", self.pos.z));

        for lz in 0..DEPTH {
            for ly in 0..SIZE {
                for lx in 0..SIZE {
                    let cell = self.cell(lx, ly, lz);
                    let tile_id = cell.tile.as_deref().map(Tile::id).unwrap_or("");
                    group
                        .add(Tag::string(cell_key("tile", lx, ly, lz), tile_id))
                        .add(Tag::string(cell_key("state", lx, ly, lz), cell.state.as_str()))
                        .add(Tag::boolean(cell_key("flag", lx, ly, lz), cell.flag))
                        .add(Tag::string(cell_key("area", lx, ly, lz), cell.area.as_str()))
                        .add(Tag::int(cell_key("biome", lx, ly, lz), cell.biome));
                }
            }
        }
        group
    }

    /// Decodes a chunk that was requested at `expected`.
    pub fn load(group: &TagGroup, registry: &TileRegistry, expected: ChunkPos) -> ChunkResult<Self> {
        let mut chunk = Self::new(expected);
        chunk.merge(group, registry)?;
        Ok(chunk)
    }

    /// Overwrites every cell with the contents of `group`. The chunk is left
    /// untouched if the group is rejected or incomplete.
    pub fn merge(&mut self, group: &TagGroup, registry: &TileRegistry) -> ChunkResult<()> {
        let tags = group.index();
        check_header(&tags, self.pos)?;

        let mut cells = Vec::with_capacity(CELLS);
        let mut unknown_tiles = 0usize;
        for lz in 0..DEPTH {
            for ly in 0..SIZE {
                for lx in 0..SIZE {
                    let tile_id = tags.get_str(&cell_key("tile", lx, ly, lz))?;
                    let tile = if tile_id.is_empty() {
                        None
                    } else {
                        let tile = registry.get(tile_id);
                        if tile.is_none() {
                            unknown_tiles += 1;
                        }
                        tile
                    };
                    cells.push(Cell {
                        tile,
                        state: tags.get_str(&cell_key("state", lx, ly, lz))?.to_string(),
                        flag: tags.get_bool(&cell_key("flag", lx, ly, lz))?,
                        area: tags.get_str(&cell_key("area", lx, ly, lz))?.to_string(),
                        biome: tags.get_int(&cell_key("biome", lx, ly, lz))?,
                    });
                }
            }
        }

        if unknown_tiles > 0 {
            log::warn!(
                "Chunk {}: {} cells reference tiles missing from the registry",
                self.pos,
                unknown_tiles
            );
        }
        self.cells = cells;
        Ok(())
    }
}

fn check_header(tags: &TagIndex<'_>, expected: ChunkPos) -> ChunkResult<()> {
    let version = tags.get_int("version")?;
    if version != CHUNK_VERSION {
        return Err(ChunkError::UnsupportedVersion(version));
    }
    let found = ChunkPos::new(tags.get_long("x")?, tags.get_long("y")?, tags.get_long("z")?);
    if found != expected {
        return Err(ChunkError::CoordinateMismatch { expected, found });
    }
    Ok(())
}

/// Reads only the coordinates stored in a chunk group.
pub fn stored_pos(group: &TagGroup) -> ChunkResult<ChunkPos> {
    Ok(ChunkPos::new(group.get_long("x")?, group.get_long("y")?, group.get_long("z")?))
}
