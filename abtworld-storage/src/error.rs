use std::path::PathBuf;

use abtworld_abt::TagError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt document: {0}")]
    Tag(#[from] TagError),
}

impl StorageError {
    pub(crate) fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::File { path: path.into(), source }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
