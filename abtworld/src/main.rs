use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use abtworld_abt::TagDoc;
use abtworld_abt::pretty::group_to_json;
use abtworld_chunk::{ChunkPos, DEPTH, SIZE, TileRegistry};
use abtworld_gen::biome::BiomeGenerator;
use abtworld_gen::flat::LayerGenerator;
use abtworld_gen::{DEFAULT_ABOVE, DEFAULT_GROUND, WorldGenerator};
use abtworld_stats::StatsSnapshot;
use abtworld_storage::file::FileStorage;
use abtworld_world::net::{ChannelTransport, spawn_loopback};
use abtworld_world::{FileWorld, NetWorld, SaveReport, WorldConfig};
use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(name = "abtworld", about = "Inspect and drive chunked ABT tile worlds")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct WorldArgs {
    /// World directory (created if missing)
    #[arg(short, long, env = "ABT_WORLD_DIR", default_value = "world")]
    dir: PathBuf,

    /// Recently-used chunk cache size; 0 keeps every chunk cached
    #[arg(long, env = "ABT_CACHE_CAPACITY", default_value = "256")]
    cache_capacity: usize,

    /// World generator: "layer" or "biome"
    #[arg(short, long, default_value = "layer")]
    generator: String,

    /// Seed for the biome generator
    #[arg(short, long, default_value = "0", allow_negative_numbers = true)]
    seed: i64,
}

impl WorldArgs {
    fn config(&self) -> WorldConfig {
        WorldConfig::default().with_cache_capacity(NonZeroUsize::new(self.cache_capacity))
    }

    fn generator(&self) -> Result<Arc<dyn WorldGenerator>> {
        Ok(match self.generator.as_str() {
            "layer" => Arc::new(LayerGenerator::default()),
            "biome" => Arc::new(BiomeGenerator::new(self.seed, 8)),
            other => bail!("Unknown generator '{}', expected \"layer\" or \"biome\"", other),
        })
    }

    fn open(&self, registry: Arc<TileRegistry>) -> Result<FileWorld> {
        let storage = FileStorage::open(&self.dir)
            .with_context(|| format!("Failed to open world directory {:?}", self.dir))?;
        FileWorld::with_storage(Arc::new(storage), self.generator()?, registry, &self.config())
            .with_context(|| format!("Failed to load world metadata from {:?}", self.dir))
    }
}

#[derive(Subcommand)]
enum Command {
    /// Pretty-print an ABT document, gzip-compressed or raw
    Inspect {
        file: PathBuf,

        /// Print JSON instead of a tag tree
        #[arg(long)]
        json: bool,
    },

    /// Load or generate the chunks covering the given cells, then save the world
    Touch {
        #[command(flatten)]
        world: WorldArgs,

        /// Cell coordinates as x y z triples
        #[arg(required = true, num_args = 3.., allow_negative_numbers = true)]
        cells: Vec<i64>,

        /// Print the save report and counters as JSON
        #[arg(long)]
        json: bool,
    },

    /// Stream chunks from a file world into a network world over an in-process channel
    StreamDemo {
        #[command(flatten)]
        world: WorldArgs,

        /// Chunks requested around the origin, per axis
        #[arg(short, long, default_value = "1")]
        radius: i64,

        /// Print the server and client counters as JSON
        #[arg(long)]
        json: bool,
    },
}

fn registry() -> Arc<TileRegistry> {
    Arc::new(TileRegistry::with_ids([DEFAULT_GROUND, DEFAULT_ABOVE]))
}

fn inspect(file: &Path, json: bool) -> Result<()> {
    let bytes = std::fs::read(file).with_context(|| format!("Failed to read {:?}", file))?;
    let doc = TagDoc::from_maybe_gzip(&bytes).with_context(|| format!("{:?} is not an ABT document", file))?;
    if json {
        let value = serde_json::json!({ "name": doc.name, "root": group_to_json(&doc.root) });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        print!("{}", doc);
    }
    Ok(())
}

fn save_summary(report: &SaveReport, stats: &StatsSnapshot) -> serde_json::Value {
    serde_json::json!({
        "saved": report.saved,
        "failed": report.failed,
        "metadata_failed": report.metadata_failed,
        "stats": stats,
    })
}

fn touch(args: &WorldArgs, cells: &[i64], json: bool) -> Result<()> {
    if cells.len() % 3 != 0 {
        bail!("Expected x y z triples, got {} numbers", cells.len());
    }
    let world = args.open(registry())?;

    for cell in cells.chunks_exact(3) {
        let (x, y, z) = (cell[0], cell[1], cell[2]);
        let tile = world.get_tile(x, y, z)?;
        let state = world.get_tile_state(x, y, z)?;
        println!(
            "({}, {}, {}) in chunk {}: tile={} state={:?}",
            x,
            y,
            z,
            ChunkPos::from_world(x, y, z),
            tile.as_ref().map_or("<none>", |t| t.id()),
            state
        );
    }

    let report = world.save().context("Failed to save world")?;
    if json {
        let summary = save_summary(&report, &world.stats().snapshot());
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    println!("Saved {} chunks to {:?}", report.saved, args.dir);
    if report.metadata_failed {
        eprintln!("Failed to save world metadata");
    }
    for pos in &report.failed {
        eprintln!("Failed to save chunk {}", pos);
    }
    println!("{}", world.stats().generate_report());
    Ok(())
}

async fn stream_demo(args: &WorldArgs, radius: i64, json: bool) -> Result<()> {
    let radius = radius.max(0);
    let server = Arc::new(args.open(registry())?);

    let (transport, requests) = ChannelTransport::new();
    let (deliveries_tx, deliveries_rx) = mpsc::unbounded_channel();
    let server_thread = spawn_loopback(server.clone(), requests, deliveries_tx);

    let lights: Vec<_> = server.lights().iter().map(|l| l.to_group()).collect();
    let client = NetWorld::new(
        &lights,
        Arc::new(transport),
        deliveries_rx,
        registry(),
        &tokio::runtime::Handle::current(),
        &args.config(),
    )?;

    let mut expected = 0;
    for cy in -radius..=radius {
        for cx in -radius..=radius {
            for cz in [-1, 0] {
                client.get_chunk(cx * SIZE as i64, cy * SIZE as i64, cz * DEPTH as i64)?;
                expected += 1;
            }
        }
    }
    println!("Requested {} chunks", expected);

    let start = Instant::now();
    while client.stats().snapshot().deliveries_merged < expected {
        if start.elapsed() > Duration::from_secs(10) {
            bail!("Timed out waiting for chunk deliveries");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    println!("All chunks arrived in {:.2?}", start.elapsed());

    for cz in [-1, 0] {
        let chunk = client.get_chunk(0, 0, cz * DEPTH as i64)?;
        let chunk = chunk.read();
        let filled = chunk.cells().filter(|c| c.tile.is_some()).count();
        let first = chunk.get_tile(0, 0, 0).map_or("<none>", |t| t.id());
        println!("Chunk {}: {} tiled cells, first tile {}", chunk.pos(), filled, first);
    }

    let client_stats = client.stats().snapshot();
    client.stop();
    drop(client);
    tokio::task::spawn_blocking(move || server_thread.join())
        .await?
        .map_err(|_| anyhow::anyhow!("Loopback server panicked"))?;

    if json {
        let value = serde_json::json!({
            "server": server.stats().snapshot(),
            "client": client_stats,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("--- server ---\n{}", server.stats().generate_report());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Inspect { file, json } => inspect(&file, json),
        Command::Touch { world, cells, json } => touch(&world, &cells, json),
        Command::StreamDemo { world, radius, json } => stream_demo(&world, radius, json).await,
    }
}

#[cfg(test)]
mod tests {
    use abtworld_stats::WorldStats;

    use super::*;

    #[test]
    fn test_save_summary_json() {
        let stats = WorldStats::new();
        stats.record_materialization();
        stats.record_save_failure();
        let report = SaveReport {
            saved: 2,
            failed: vec![ChunkPos::new(-1, 0, 3)],
            metadata_failed: true,
        };

        let value = save_summary(&report, &stats.snapshot());
        assert_eq!(value["saved"], 2);
        assert_eq!(value["metadata_failed"], true);
        assert_eq!(value["failed"][0], serde_json::json!({ "x": -1, "y": 0, "z": 3 }));
        assert_eq!(value["stats"]["materializations"], 1);
        assert_eq!(value["stats"]["save_failures"], 1);
    }

    #[test]
    fn test_cli_json_flags() {
        let cli = Cli::try_parse_from(["abtworld", "touch", "--json", "1", "-2", "0"]).unwrap();
        assert!(matches!(cli.command, Command::Touch { json: true, ref cells, .. } if cells == &[1, -2, 0]));

        let cli = Cli::try_parse_from(["abtworld", "stream-demo", "-r", "2"]).unwrap();
        assert!(matches!(cli.command, Command::StreamDemo { radius: 2, json: false, .. }));
    }
}
