use std::sync::Arc;
use std::thread::JoinHandle;

use tokio::sync::mpsc;

use crate::error::WorldResult;
use crate::file_world::FileWorld;
use crate::net::protocol::{ChunkDelivery, ChunkRequest};

/// Answers one request from a file world, loading or generating the chunk.
pub fn serve_request(world: &FileWorld, request: &ChunkRequest) -> WorldResult<ChunkDelivery> {
    let chunk = world.get_chunk_at(request.pos)?;
    let data = chunk.read().save();
    Ok(ChunkDelivery { pos: request.pos, data })
}

/// Serves request frames from `requests` until either channel closes.
///
/// Runs on its own thread since the file world does blocking I/O. Every
/// answer goes through the encoded `map_c` form, as it would on a socket.
pub fn spawn_loopback(
    world: Arc<FileWorld>,
    mut requests: mpsc::UnboundedReceiver<Vec<u8>>,
    deliveries: mpsc::UnboundedSender<ChunkDelivery>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        while let Some(frame) = requests.blocking_recv() {
            let delivery = ChunkRequest::decode(&frame)
                .map_err(Into::into)
                .and_then(|request| serve_request(&world, &request))
                .and_then(|delivery| delivery.encode().map_err(Into::into))
                .and_then(|bytes| ChunkDelivery::decode(&bytes));
            match delivery {
                Ok(delivery) => {
                    log::debug!("Serving chunk {}", delivery.pos);
                    if deliveries.send(delivery).is_err() {
                        log::info!("Client went away, stopping loopback server");
                        break;
                    }
                }
                Err(e) => log::error!("Bad chunk request: {}", e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use abtworld_chunk::{ChunkPos, TileRegistry};
    use abtworld_gen::flat::LayerGenerator;
    use abtworld_gen::{DEFAULT_ABOVE, DEFAULT_GROUND};
    use abtworld_storage::memory::MemoryStorage;
    use tokio::runtime::Handle;

    use super::*;
    use crate::config::WorldConfig;
    use crate::net::transport::ChannelTransport;
    use crate::net::world::NetWorld;

    fn registry() -> Arc<TileRegistry> {
        Arc::new(TileRegistry::with_ids([DEFAULT_GROUND, DEFAULT_ABOVE]))
    }

    fn server_world() -> Arc<FileWorld> {
        Arc::new(
            FileWorld::with_storage(
                Arc::new(MemoryStorage::new()),
                Arc::new(LayerGenerator::default()),
                registry(),
                &WorldConfig::default(),
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_serve_request() {
        let world = server_world();
        let pos = ChunkPos::new(3, 1, -1);
        let delivery = serve_request(&world, &ChunkRequest::new(pos)).unwrap();
        assert_eq!(delivery.pos, pos);
        assert_eq!(delivery.data.get_long("x").unwrap(), 3);
        assert_eq!(delivery.data.get_str("tile/0/0/0").unwrap(), DEFAULT_ABOVE);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_loopback_streams_generated_chunks() {
        let (transport, requests) = ChannelTransport::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let server = spawn_loopback(server_world(), requests, tx);

        let client = NetWorld::new(
            &[],
            Arc::new(transport),
            rx,
            registry(),
            &Handle::current(),
            &WorldConfig::default(),
        )
        .unwrap();

        assert!(client.get_tile(0, 0, 0).unwrap().is_none());
        let mut filled = false;
        for _ in 0..500 {
            if client.get_tile(0, 0, 0).unwrap().is_some() {
                filled = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(filled);
        assert_eq!(client.get_tile(15, 15, 0).unwrap().unwrap().id(), DEFAULT_GROUND);
        assert_eq!(client.stats().snapshot().deliveries_merged, 1);

        // dropping the client closes the request channel
        drop(client);
        tokio::task::spawn_blocking(move || server.join().unwrap()).await.unwrap();
    }
}
