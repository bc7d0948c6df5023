use std::collections::HashMap;

use abtworld_abt::{TagDoc, TagGroup};
use abtworld_chunk::ChunkPos;
use parking_lot::Mutex;

use crate::error::StorageResult;
use crate::{CHUNK_DOC, ChunkStorage, METADATA_DOC, expect_doc};

/// Keeps encoded documents in memory. Data goes through the same gzip
/// encoding as files, so corrupt input behaves the same way.
#[derive(Default)]
pub struct MemoryStorage {
    chunks: Mutex<HashMap<ChunkPos, Vec<u8>>>,
    metadata: Mutex<Option<Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the stored bytes of a chunk, bypassing encoding.
    pub fn put_raw(&self, pos: ChunkPos, bytes: Vec<u8>) {
        self.chunks.lock().insert(pos, bytes);
    }

    pub fn contains(&self, pos: ChunkPos) -> bool {
        self.chunks.lock().contains_key(&pos)
    }
}

impl ChunkStorage for MemoryStorage {
    fn load_chunk(&self, pos: ChunkPos) -> StorageResult<Option<TagGroup>> {
        let Some(bytes) = self.chunks.lock().get(&pos).cloned() else {
            return Ok(None);
        };
        let doc = expect_doc(TagDoc::from_maybe_gzip(&bytes)?, CHUNK_DOC)?;
        Ok(Some(doc.root))
    }

    fn save_chunk(&self, pos: ChunkPos, data: &TagGroup) -> StorageResult<()> {
        let bytes = TagDoc::new(CHUNK_DOC, data.clone()).to_gzip_bytes()?;
        self.chunks.lock().insert(pos, bytes);
        Ok(())
    }

    fn load_metadata(&self) -> StorageResult<Option<TagDoc>> {
        match self.metadata.lock().as_deref() {
            Some(bytes) => Ok(Some(expect_doc(TagDoc::from_maybe_gzip(bytes)?, METADATA_DOC)?)),
            None => Ok(None),
        }
    }

    fn save_metadata(&self, doc: &TagDoc) -> StorageResult<()> {
        *self.metadata.lock() = Some(doc.to_gzip_bytes()?);
        Ok(())
    }

    fn list_chunks(&self) -> StorageResult<Vec<ChunkPos>> {
        let mut out: Vec<ChunkPos> = self.chunks.lock().keys().copied().collect();
        out.sort();
        Ok(out)
    }
}
