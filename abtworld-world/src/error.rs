use abtworld_abt::TagError;
use abtworld_chunk::ChunkError;
use abtworld_storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorldError {
    #[error(transparent)]
    Tag(#[from] TagError),

    #[error(transparent)]
    Chunk(#[from] ChunkError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Unknown world format version {0}")]
    UnknownFormatVersion(i32),

    #[error("Chunk generation failed: {0:#}")]
    Generation(anyhow::Error),

    #[error("Chunk transport is closed")]
    TransportClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type WorldResult<T> = Result<T, WorldError>;
