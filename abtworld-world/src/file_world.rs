use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use abtworld_chunk::{Chunk, ChunkPos, Tile, TileRegistry};
use abtworld_gen::WorldGenerator;
use abtworld_gen::flat::LayerGenerator;
use abtworld_stats::WorldStats;
use abtworld_storage::file::FileStorage;
use abtworld_storage::{ChunkStorage, StorageError};
use parking_lot::Mutex;

use crate::cache::{ChunkRef, ChunkSource, ChunkWorld};
use crate::config::WorldConfig;
use crate::error::{WorldError, WorldResult};
use crate::meta::{LightSource, WorldMetadata};

/// Loads stored chunks and generates the rest.
pub struct FileSource {
    storage: Arc<dyn ChunkStorage>,
    generator: Arc<dyn WorldGenerator>,
    registry: Arc<TileRegistry>,
    stats: Arc<WorldStats>,
}

impl FileSource {
    fn load(&self, pos: ChunkPos) -> WorldResult<Option<Chunk>> {
        let start = Instant::now();
        let group = match self.storage.load_chunk(pos) {
            Ok(Some(group)) => group,
            Ok(None) => return Ok(None),
            Err(StorageError::Tag(e)) => {
                log::error!("Chunk {} is corrupt, regenerating: {}", pos, e);
                self.stats.record_corrupt_chunk();
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        match Chunk::load(&group, &self.registry, pos) {
            Ok(chunk) => {
                self.stats.record_load(start.elapsed());
                Ok(Some(chunk))
            }
            Err(e) => {
                log::error!("Chunk {} could not be decoded, regenerating: {}", pos, e);
                self.stats.record_corrupt_chunk();
                Ok(None)
            }
        }
    }
}

impl ChunkSource for FileSource {
    fn materialize(&self, pos: ChunkPos) -> WorldResult<Chunk> {
        if let Some(chunk) = self.load(pos)? {
            return Ok(chunk);
        }
        let start = Instant::now();
        let chunk = self
            .generator
            .generate_chunk(pos, &self.registry)
            .map_err(WorldError::Generation)?;
        self.stats.record_generation(start.elapsed());
        log::debug!("Generated chunk {} in {:?}", pos, start.elapsed());
        Ok(chunk)
    }
}

/// Outcome of [`FileWorld::save`].
#[derive(Debug, Default)]
pub struct SaveReport {
    pub saved: usize,
    pub failed: Vec<ChunkPos>,
    /// The metadata document could not be written. Chunks are still saved.
    pub metadata_failed: bool,
}

/// World persisted as one metadata document plus one document per chunk.
pub struct FileWorld {
    world: ChunkWorld<FileSource>,
    storage: Arc<dyn ChunkStorage>,
    metadata: Mutex<WorldMetadata>,
}

impl FileWorld {
    /// Opens (or creates) a world directory with the default layer generator.
    pub fn open(dir: impl Into<PathBuf>, registry: Arc<TileRegistry>, config: &WorldConfig) -> WorldResult<Self> {
        let storage = Arc::new(FileStorage::open(dir)?);
        Self::with_storage(storage, Arc::new(LayerGenerator::default()), registry, config)
    }

    /// Reads the stored metadata, or writes a fresh document when there is
    /// none. Any problem with existing metadata is fatal.
    pub fn with_storage(
        storage: Arc<dyn ChunkStorage>,
        generator: Arc<dyn WorldGenerator>,
        registry: Arc<TileRegistry>,
        config: &WorldConfig,
    ) -> WorldResult<Self> {
        let metadata = match storage.load_metadata()? {
            Some(doc) => {
                let metadata = WorldMetadata::from_doc(&doc)?;
                log::info!(
                    "Loaded world metadata: {} lights, {} entities",
                    metadata.lights.len(),
                    metadata.entities.len()
                );
                metadata
            }
            None => {
                let metadata = WorldMetadata::default();
                storage.save_metadata(&metadata.to_doc())?;
                log::info!("Created new world metadata");
                metadata
            }
        };

        let stats = Arc::new(WorldStats::new());
        let source = FileSource {
            storage: storage.clone(),
            generator,
            registry: registry.clone(),
            stats: stats.clone(),
        };
        Ok(Self {
            world: ChunkWorld::new(source, registry, stats, config),
            storage,
            metadata: Mutex::new(metadata),
        })
    }

    pub fn world(&self) -> &ChunkWorld<FileSource> {
        &self.world
    }

    pub fn stats(&self) -> &Arc<WorldStats> {
        self.world.stats()
    }

    pub fn get_chunk(&self, x: i64, y: i64, z: i64) -> WorldResult<ChunkRef> {
        self.world.get_chunk(x, y, z)
    }

    pub fn get_chunk_at(&self, pos: ChunkPos) -> WorldResult<ChunkRef> {
        self.world.get_chunk_at(pos)
    }

    pub fn get_tile(&self, x: i64, y: i64, z: i64) -> WorldResult<Option<Arc<Tile>>> {
        self.world.get_tile(x, y, z)
    }

    pub fn get_tile_state(&self, x: i64, y: i64, z: i64) -> WorldResult<String> {
        self.world.get_tile_state(x, y, z)
    }

    pub fn resident_chunks(&self) -> usize {
        self.world.resident_chunks()
    }

    /// Chunk positions present in storage, resident or not.
    pub fn stored_chunks(&self) -> WorldResult<Vec<ChunkPos>> {
        Ok(self.storage.list_chunks()?)
    }

    pub fn lights(&self) -> Vec<LightSource> {
        self.metadata.lock().lights.clone()
    }

    pub fn add_light(&self, light: LightSource) {
        self.metadata.lock().lights.push(light);
    }

    pub fn metadata(&self) -> WorldMetadata {
        self.metadata.lock().clone()
    }

    /// Writes the metadata, then every resident chunk. A failed write is
    /// logged and reported; the remaining documents are still written.
    pub fn save(&self) -> WorldResult<SaveReport> {
        let mut report = SaveReport::default();

        let doc = self.metadata.lock().to_doc();
        if let Err(e) = self.storage.save_metadata(&doc) {
            log::error!("Failed to save world metadata: {}", e);
            report.metadata_failed = true;
        }

        for chunk in self.world.chunks() {
            let start = Instant::now();
            let (pos, group) = {
                let chunk = chunk.read();
                (chunk.pos(), chunk.save())
            };
            match self.storage.save_chunk(pos, &group) {
                Ok(()) => {
                    self.stats().record_save(start.elapsed());
                    report.saved += 1;
                }
                Err(e) => {
                    log::error!("Failed to save chunk {}: {}", pos, e);
                    self.stats().record_save_failure();
                    report.failed.push(pos);
                }
            }
        }
        log::info!(
            "Saved {} chunks ({} failed{})",
            report.saved,
            report.failed.len(),
            if report.metadata_failed { ", metadata not written" } else { "" }
        );
        Ok(report)
    }
}
