//! Chunked tile worlds: an on-disk world that loads or generates chunks, and
//! a network world that streams them from a server.

pub mod cache;
pub mod config;
pub mod error;
pub mod file_world;
pub mod meta;
pub mod net;

pub use cache::{ChunkRef, ChunkSource, ChunkWorld};
pub use config::WorldConfig;
pub use error::{WorldError, WorldResult};
pub use file_world::{FileSource, FileWorld, SaveReport};
pub use meta::{FORMAT_VERSION, LightSource, WorldMetadata};
pub use net::{ChunkDelivery, ChunkRequest, NetWorld};
