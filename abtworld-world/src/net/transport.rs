use tokio::sync::mpsc;

use crate::error::{WorldError, WorldResult};
use crate::net::protocol::ChunkRequest;

/// Outbound half of the chunk protocol. Sends must not block.
pub trait ChunkTransport: Send + Sync {
    fn request_chunk(&self, request: ChunkRequest) -> WorldResult<()>;
}

/// Sends encoded request frames over an in-process channel.
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

impl ChannelTransport {
    /// Returns the transport and the receiving end the server reads frames from.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Vec<u8>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ChunkTransport for ChannelTransport {
    fn request_chunk(&self, request: ChunkRequest) -> WorldResult<()> {
        self.tx
            .send(request.encode().to_vec())
            .map_err(|_| WorldError::TransportClosed)
    }
}
