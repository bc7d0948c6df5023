use thiserror::Error;

use crate::tag::TagType;

#[derive(Error, Debug)]
pub enum TagError {
    #[error("Malformed tag data: {0}")]
    Malformed(String),

    #[error("Unknown tag type 0x{0:02x}")]
    UnknownType(u8),

    #[error("Missing tag '{0}'")]
    MissingTag(String),

    #[error("Tag '{name}' is {found:?}, expected {expected:?}")]
    TypeMismatch {
        name: String,
        expected: TagType,
        found: TagType,
    },

    #[error("Unexpected document '{found}', expected '{expected}'")]
    UnexpectedDoc { expected: String, found: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TagError {
    /// True for errors caused by corrupt or truncated bytes, as opposed to
    /// well-formed data with the wrong shape.
    pub fn is_malformed(&self) -> bool {
        matches!(self, TagError::Malformed(_) | TagError::UnknownType(_))
    }
}

pub type TagResult<T> = Result<T, TagError>;
