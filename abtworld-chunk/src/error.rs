use abtworld_abt::TagError;
use thiserror::Error;

use crate::pos::ChunkPos;

#[derive(Error, Debug)]
pub enum ChunkError {
    #[error(transparent)]
    Tag(#[from] TagError),

    #[error("Unsupported chunk format version {0}")]
    UnsupportedVersion(i32),

    #[error("Chunk data is for {found}, but was requested as {expected}")]
    CoordinateMismatch { expected: ChunkPos, found: ChunkPos },
}

pub type ChunkResult<T> = Result<T, ChunkError>;
