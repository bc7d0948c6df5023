use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use abtworld_abt::TagGroup;
use abtworld_chunk::{Chunk, ChunkPos, Tile, TileRegistry};
use abtworld_stats::WorldStats;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::cache::{ChunkRef, ChunkSource, ChunkWorld};
use crate::config::WorldConfig;
use crate::error::WorldResult;
use crate::meta::{LightSource, WorldMetadata};
use crate::net::protocol::{ChunkDelivery, ChunkRequest};
use crate::net::transport::ChunkTransport;

/// Requests chunks from the server and hands out empty placeholders until
/// the data arrives.
pub struct NetSource {
    transport: Arc<dyn ChunkTransport>,
    stats: Arc<WorldStats>,
    stopped: Arc<AtomicBool>,
}

impl ChunkSource for NetSource {
    fn materialize(&self, pos: ChunkPos) -> WorldResult<Chunk> {
        if self.stopped.load(Ordering::Acquire) {
            log::debug!("World stopped, not requesting chunk {}", pos);
            return Ok(Chunk::new(pos));
        }
        self.stats.record_request();
        if let Err(e) = self.transport.request_chunk(ChunkRequest::new(pos)) {
            log::warn!("Could not request chunk {}: {}", pos, e);
        }
        Ok(Chunk::new(pos))
    }
}

/// Client-side world fed by chunk deliveries from a server.
///
/// Deliveries are merged into the placeholder chunk in place, so a
/// [`ChunkRef`] handed out before the data arrived sees it afterwards.
pub struct NetWorld {
    world: Arc<ChunkWorld<NetSource>>,
    lights: Vec<LightSource>,
    stop: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl NetWorld {
    pub fn new(
        lights: &[TagGroup],
        transport: Arc<dyn ChunkTransport>,
        deliveries: mpsc::UnboundedReceiver<ChunkDelivery>,
        registry: Arc<TileRegistry>,
        handle: &Handle,
        config: &WorldConfig,
    ) -> WorldResult<Self> {
        let lights = WorldMetadata::lights_from_groups(lights)?;
        let stats = Arc::new(WorldStats::new());
        let stop = Arc::new(AtomicBool::new(false));
        let source = NetSource {
            transport,
            stats: stats.clone(),
            stopped: stop.clone(),
        };
        let world = Arc::new(ChunkWorld::new(source, registry, stats, config));

        let task = handle.spawn(delivery_loop(
            world.clone(),
            deliveries,
            stop.clone(),
            config.poll_interval,
        ));

        Ok(Self {
            world,
            lights,
            stop,
            task,
        })
    }

    pub fn world(&self) -> &ChunkWorld<NetSource> {
        &self.world
    }

    pub fn stats(&self) -> &Arc<WorldStats> {
        self.world.stats()
    }

    pub fn lights(&self) -> &[LightSource] {
        &self.lights
    }

    pub fn get_chunk(&self, x: i64, y: i64, z: i64) -> WorldResult<ChunkRef> {
        self.world.get_chunk(x, y, z)
    }

    pub fn get_tile(&self, x: i64, y: i64, z: i64) -> WorldResult<Option<Arc<Tile>>> {
        self.world.get_tile(x, y, z)
    }

    pub fn get_tile_state(&self, x: i64, y: i64, z: i64) -> WorldResult<String> {
        self.world.get_tile_state(x, y, z)
    }

    pub fn resident_chunks(&self) -> usize {
        self.world.resident_chunks()
    }

    /// Deliveries received after this call are not merged and new chunks are
    /// no longer requested. The background task exits within one poll
    /// interval.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for NetWorld {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn delivery_loop(
    world: Arc<ChunkWorld<NetSource>>,
    mut deliveries: mpsc::UnboundedReceiver<ChunkDelivery>,
    stop: Arc<AtomicBool>,
    poll_interval: Duration,
) {
    log::debug!("Delivery loop started");
    while !stop.load(Ordering::Acquire) {
        let delivery = match tokio::time::timeout(poll_interval, deliveries.recv()).await {
            Ok(Some(delivery)) => delivery,
            Ok(None) => {
                log::info!("Delivery queue closed");
                break;
            }
            Err(_) => continue,
        };
        if stop.load(Ordering::Acquire) {
            break;
        }
        let pos = delivery.pos;
        match merge_delivery(&world, delivery) {
            Ok(()) => {
                world.stats().record_delivery(true);
                log::debug!("Merged chunk {}", pos);
            }
            Err(e) => {
                world.stats().record_delivery(false);
                log::error!("Dropped delivery for chunk {}: {}", pos, e);
            }
        }
    }
    log::debug!("Delivery loop stopped");
}

/// Looks up (or creates) the target chunk and overwrites it with the
/// delivered cells. A rejected delivery leaves the chunk unchanged.
pub(crate) fn merge_delivery<S: ChunkSource>(world: &ChunkWorld<S>, delivery: ChunkDelivery) -> WorldResult<()> {
    let chunk = world.get_chunk_at(delivery.pos)?;
    chunk.write().merge(&delivery.data, world.registry())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use abtworld_abt::Tag;

    use super::*;
    use crate::net::transport::ChannelTransport;

    fn registry() -> Arc<TileRegistry> {
        Arc::new(TileRegistry::with_ids(["sand", "water"]))
    }

    fn config() -> WorldConfig {
        WorldConfig {
            poll_interval: Duration::from_millis(10),
            ..WorldConfig::default()
        }
    }

    struct Harness {
        world: NetWorld,
        requests: mpsc::UnboundedReceiver<Vec<u8>>,
        deliveries: mpsc::UnboundedSender<ChunkDelivery>,
    }

    fn harness(lights: &[TagGroup]) -> Harness {
        let (transport, requests) = ChannelTransport::new();
        let (deliveries, rx) = mpsc::unbounded_channel();
        let world = NetWorld::new(
            lights,
            Arc::new(transport),
            rx,
            registry(),
            &Handle::current(),
            &config(),
        )
        .unwrap();
        Harness {
            world,
            requests,
            deliveries,
        }
    }

    fn beach(pos: ChunkPos, registry: &TileRegistry) -> Chunk {
        let mut chunk = Chunk::new(pos);
        chunk.set_tile(2, 3, 0, registry.get("sand"));
        chunk.set_state(2, 3, 0, "dry");
        chunk
    }

    async fn wait_for(mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if done() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        done()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_placeholder_is_filled_in_place() {
        let mut h = harness(&[]);
        let placeholder = h.world.get_chunk(2, 3, 0).unwrap();
        assert!(placeholder.read().get_tile(2, 3, 0).is_none());

        let frame = h.requests.recv().await.unwrap();
        let request = ChunkRequest::decode(&frame).unwrap();
        assert_eq!(request.pos, ChunkPos::new(0, 0, 0));

        let data = beach(request.pos, h.world.world().registry()).save();
        h.deliveries.send(ChunkDelivery { pos: request.pos, data }).unwrap();

        let watched = placeholder.clone();
        assert!(wait_for(|| watched.read().get_tile(2, 3, 0).is_some()).await);
        assert_eq!(placeholder.read().get_state(2, 3, 0), "dry");
        assert!(Arc::ptr_eq(&placeholder, &h.world.get_chunk(0, 0, 1).unwrap()));
        assert_eq!(h.world.stats().snapshot().deliveries_merged, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_unrequested_delivery_creates_chunk() {
        let h = harness(&[]);
        let pos = ChunkPos::new(-1, 5, 2);
        let data = beach(pos, h.world.world().registry()).save();
        h.deliveries.send(ChunkDelivery { pos, data }).unwrap();

        let stats = h.world.stats().clone();
        assert!(wait_for(|| stats.snapshot().deliveries_merged == 1).await);
        assert_eq!(h.world.get_tile_state(-16 + 2, 80 + 3, 4).unwrap(), "dry");
        assert_eq!(h.world.resident_chunks(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_bad_delivery_is_dropped() {
        let h = harness(&[]);
        let placeholder = h.world.get_chunk(0, 0, 0).unwrap();

        // claims to be (0, 0, 0) but carries another chunk's coordinates
        let data = beach(ChunkPos::new(9, 9, 9), h.world.world().registry()).save();
        h.deliveries
            .send(ChunkDelivery {
                pos: ChunkPos::new(0, 0, 0),
                data,
            })
            .unwrap();

        let stats = h.world.stats().clone();
        assert!(wait_for(|| stats.snapshot().deliveries_rejected == 1).await);
        assert!(placeholder.read().get_tile(2, 3, 0).is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stop_halts_merging() {
        let mut h = harness(&[]);
        let placeholder = h.world.get_chunk(0, 0, 0).unwrap();
        assert!(h.requests.recv().await.is_some());

        h.world.stop();
        let world = &h.world;
        assert!(wait_for(|| !world.is_running()).await);

        let data = beach(ChunkPos::new(0, 0, 0), h.world.world().registry()).save();
        // the receiver is gone once the loop exits
        assert!(
            h.deliveries
                .send(ChunkDelivery {
                    pos: ChunkPos::new(0, 0, 0),
                    data,
                })
                .is_err()
        );
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(placeholder.read().get_tile(2, 3, 0).is_none());
        assert_eq!(h.world.stats().snapshot().deliveries_merged, 0);

        // still answers reads, but stops asking the server
        assert!(h.world.get_chunk(64, 0, 0).unwrap().read().is_at(4, 0, 0));
        assert!(h.requests.try_recv().is_err());
        assert_eq!(h.world.stats().snapshot().chunk_requests, 1);
    }

    #[tokio::test]
    async fn test_lights_are_decoded() {
        let lamp = LightSource {
            x: 4.0,
            y: 4.5,
            r: 1.0,
            g: 1.0,
            b: 1.0,
            brightness: 2.0,
        };
        let h = harness(&[lamp.to_group()]);
        assert_eq!(h.world.lights(), &[lamp]);

        let mut broken = TagGroup::new();
        broken.add(Tag::int("color", 1));
        let (transport, _requests) = ChannelTransport::new();
        let (_tx, rx) = mpsc::unbounded_channel();
        let result = NetWorld::new(
            &[broken],
            Arc::new(transport),
            rx,
            registry(),
            &Handle::current(),
            &config(),
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_closed_transport_still_returns_placeholder() {
        let h = harness(&[]);
        drop(h.requests);
        let chunk = h.world.get_chunk(100, 100, 0).unwrap();
        assert!(chunk.read().is_at(6, 6, 0));
        assert_eq!(h.world.stats().snapshot().chunk_requests, 1);
    }
}
