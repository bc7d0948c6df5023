//! Client side of the chunk streaming protocol, plus a loopback server that
//! answers requests from a [`FileWorld`](crate::file_world::FileWorld).

pub mod protocol;
pub mod server;
pub mod transport;
pub mod world;

pub use protocol::{CHUNK_REQUEST_ID, ChunkDelivery, ChunkRequest};
pub use server::{serve_request, spawn_loopback};
pub use transport::{ChannelTransport, ChunkTransport};
pub use world::{NetSource, NetWorld};
