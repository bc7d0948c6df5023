//! Persistence of world metadata and chunk documents.

use abtworld_abt::{TagDoc, TagError, TagGroup};
use abtworld_chunk::ChunkPos;

pub mod error;
pub mod file;
pub mod memory;
pub mod naming;

pub use error::{StorageError, StorageResult};

/// File holding the world metadata document.
pub const METADATA_FILE: &str = "map.abt";
/// Document name of the world metadata.
pub const METADATA_DOC: &str = "map";
/// Document name of a single chunk.
pub const CHUNK_DOC: &str = "map_c";

pub trait ChunkStorage: Send + Sync {
    /// `Ok(None)` when nothing is stored for `pos`.
    fn load_chunk(&self, pos: ChunkPos) -> StorageResult<Option<TagGroup>>;
    fn save_chunk(&self, pos: ChunkPos, data: &TagGroup) -> StorageResult<()>;

    fn load_metadata(&self) -> StorageResult<Option<TagDoc>>;
    fn save_metadata(&self, doc: &TagDoc) -> StorageResult<()>;

    fn list_chunks(&self) -> StorageResult<Vec<ChunkPos>>;
}

pub(crate) fn expect_doc(doc: TagDoc, expected: &str) -> StorageResult<TagDoc> {
    if doc.name != expected {
        return Err(TagError::UnexpectedDoc {
            expected: expected.to_string(),
            found: doc.name,
        }
        .into());
    }
    Ok(doc)
}
