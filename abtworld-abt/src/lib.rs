//! ABT: a self-describing binary tag format used for world files and for
//! streaming chunk data to clients.

pub mod codec;
pub mod doc;
pub mod error;
pub mod pretty;
pub mod tag;

pub use codec::{decode, encode};
pub use doc::TagDoc;
pub use error::{TagError, TagResult};
pub use tag::{Tag, TagGroup, TagIndex, TagType, TagValue, big_int_bytes, big_int_to_i128};
