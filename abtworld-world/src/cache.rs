//! Chunk residency shared by every world flavour.
//!
//! A chunk, once materialized, stays in the resident list until the world is
//! dropped. The LRU cache and the last-chunk slot only speed up lookups; they
//! hold clones of the same `Arc`, so a chunk has one identity whichever tier
//! returns it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use abtworld_chunk::{Chunk, ChunkPos, Tile, TileRegistry};
use abtworld_stats::{LookupTier, WorldStats};
use lru::LruCache;
use parking_lot::{Mutex, RwLock};

use crate::config::WorldConfig;
use crate::error::WorldResult;

/// Shared handle to a resident chunk.
pub type ChunkRef = Arc<RwLock<Chunk>>;

/// Produces a chunk the world has not seen yet.
pub trait ChunkSource: Send + Sync {
    fn materialize(&self, pos: ChunkPos) -> WorldResult<Chunk>;
}

struct CacheEntry {
    chunk: ChunkRef,
    last_access: Instant,
}

struct WorldState {
    chunks: Vec<ChunkRef>,
    positions: HashMap<ChunkPos, usize>,
    cache: LruCache<ChunkPos, CacheEntry>,
    last: Option<(ChunkPos, ChunkRef)>,
}

impl WorldState {
    fn remember(&mut self, pos: ChunkPos, chunk: &ChunkRef, stats: &WorldStats) {
        let entry = CacheEntry {
            chunk: chunk.clone(),
            last_access: Instant::now(),
        };
        if let Some((evicted, old)) = self.cache.push(pos, entry) {
            if evicted != pos {
                stats.record_eviction();
                log::debug!(
                    "Evicted chunk {} from cache after {:?} idle",
                    evicted,
                    old.last_access.elapsed()
                );
            }
        }
        self.last = Some((pos, chunk.clone()));
    }
}

pub struct ChunkWorld<S> {
    source: S,
    registry: Arc<TileRegistry>,
    stats: Arc<WorldStats>,
    state: Mutex<WorldState>,
}

impl<S: ChunkSource> ChunkWorld<S> {
    pub fn new(source: S, registry: Arc<TileRegistry>, stats: Arc<WorldStats>, config: &WorldConfig) -> Self {
        let cache = match config.cache_capacity {
            Some(capacity) => LruCache::new(capacity),
            None => LruCache::unbounded(),
        };
        Self {
            source,
            registry,
            stats,
            state: Mutex::new(WorldState {
                chunks: Vec::new(),
                positions: HashMap::new(),
                cache,
                last: None,
            }),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn registry(&self) -> &Arc<TileRegistry> {
        &self.registry
    }

    pub fn stats(&self) -> &Arc<WorldStats> {
        &self.stats
    }

    /// Chunk containing the world cell `(x, y, z)`.
    pub fn get_chunk(&self, x: i64, y: i64, z: i64) -> WorldResult<ChunkRef> {
        self.get_chunk_at(ChunkPos::from_world(x, y, z))
    }

    /// The state lock is held across materialization, so two callers missing
    /// on the same position produce a single chunk.
    pub fn get_chunk_at(&self, pos: ChunkPos) -> WorldResult<ChunkRef> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        if let Some((last_pos, chunk)) = &state.last {
            if *last_pos == pos {
                self.stats.record_hit(LookupTier::LastChunk);
                return Ok(chunk.clone());
            }
        }

        if let Some(entry) = state.cache.get_mut(&pos) {
            entry.last_access = Instant::now();
            let chunk = entry.chunk.clone();
            state.last = Some((pos, chunk.clone()));
            self.stats.record_hit(LookupTier::Cache);
            return Ok(chunk);
        }

        if let Some(&i) = state.positions.get(&pos) {
            let chunk = state.chunks[i].clone();
            state.remember(pos, &chunk, &self.stats);
            self.stats.record_hit(LookupTier::List);
            return Ok(chunk);
        }

        let chunk = match self.source.materialize(pos) {
            Ok(chunk) => Arc::new(RwLock::new(chunk)),
            Err(e) => {
                self.stats.record_materialize_failure();
                return Err(e);
            }
        };
        self.stats.record_materialization();
        state.positions.insert(pos, state.chunks.len());
        state.chunks.push(chunk.clone());
        state.remember(pos, &chunk, &self.stats);
        Ok(chunk)
    }

    pub fn get_tile(&self, x: i64, y: i64, z: i64) -> WorldResult<Option<Arc<Tile>>> {
        let chunk = self.get_chunk(x, y, z)?;
        let (lx, ly, lz) = ChunkPos::local(x, y, z);
        let tile = chunk.read().get_tile(lx, ly, lz).cloned();
        Ok(tile)
    }

    pub fn get_tile_state(&self, x: i64, y: i64, z: i64) -> WorldResult<String> {
        let chunk = self.get_chunk(x, y, z)?;
        let (lx, ly, lz) = ChunkPos::local(x, y, z);
        let state = chunk.read().get_state(lx, ly, lz).to_string();
        Ok(state)
    }

    /// Number of chunks in the resident list.
    pub fn resident_chunks(&self) -> usize {
        self.state.lock().chunks.len()
    }

    pub fn cached_chunks(&self) -> usize {
        self.state.lock().cache.len()
    }

    /// Snapshot of the resident list, in materialization order.
    pub fn chunks(&self) -> Vec<ChunkRef> {
        self.state.lock().chunks.clone()
    }
}
