use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use abtworld_abt::{TagDoc, TagGroup};
use abtworld_chunk::ChunkPos;

use crate::error::{StorageError, StorageResult};
use crate::naming::{chunk_file_name, parse_chunk_file_name};
use crate::{CHUNK_DOC, ChunkStorage, METADATA_DOC, METADATA_FILE, expect_doc};

/// One directory per world: `map.abt` plus one gzip document per chunk.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn open(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| StorageError::file(&dir, e))?;
        log::info!("Using world directory {:?}", dir);
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn chunk_path(&self, pos: ChunkPos) -> PathBuf {
        self.dir.join(chunk_file_name(pos))
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(METADATA_FILE)
    }

    fn read_doc(&self, path: &Path, expected: &str) -> StorageResult<Option<TagDoc>> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::file(path, e)),
        };
        let doc = TagDoc::from_maybe_gzip(&bytes)?;
        Ok(Some(expect_doc(doc, expected)?))
    }

    /// Writes next to the target and renames over it, so a failed write
    /// never leaves a truncated document behind.
    fn write_doc(&self, path: &Path, doc: &TagDoc) -> StorageResult<()> {
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let result = (|| -> StorageResult<()> {
            let file = fs::File::create(&tmp).map_err(|e| StorageError::file(&tmp, e))?;
            let mut out = BufWriter::new(file);
            doc.write_gzip(&mut out)?;
            out.flush().map_err(|e| StorageError::file(&tmp, e))?;
            fs::rename(&tmp, path).map_err(|e| StorageError::file(path, e))?;
            Ok(())
        })();

        if result.is_err() {
            log::warn!("Discarding partial write {:?}", tmp);
            let _ = fs::remove_file(&tmp);
        }
        result
    }
}

impl ChunkStorage for FileStorage {
    fn load_chunk(&self, pos: ChunkPos) -> StorageResult<Option<TagGroup>> {
        let path = self.chunk_path(pos);
        Ok(self.read_doc(&path, CHUNK_DOC)?.map(|doc| doc.root))
    }

    fn save_chunk(&self, pos: ChunkPos, data: &TagGroup) -> StorageResult<()> {
        let doc = TagDoc::new(CHUNK_DOC, data.clone());
        self.write_doc(&self.chunk_path(pos), &doc)
    }

    fn load_metadata(&self) -> StorageResult<Option<TagDoc>> {
        self.read_doc(&self.metadata_path(), METADATA_DOC)
    }

    fn save_metadata(&self, doc: &TagDoc) -> StorageResult<()> {
        self.write_doc(&self.metadata_path(), doc)
    }

    fn list_chunks(&self) -> StorageResult<Vec<ChunkPos>> {
        let mut out = Vec::new();
        let entries = fs::read_dir(&self.dir).map_err(|e| StorageError::file(&self.dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::file(&self.dir, e))?;
            if let Some(pos) = entry.file_name().to_str().and_then(parse_chunk_file_name) {
                out.push(pos);
            }
        }
        out.sort();
        log::debug!("Found {} stored chunks in {:?}", out.len(), self.dir);
        Ok(out)
    }
}
