use clap::{Parser, Subcommand};
use glam::Vec3;
use gridhost_common::{EntityId, EntityKind, InstanceKey, MapConfig, ResurrectionPolicy};
use gridhost_instance::{Courier, Entity, FlatTerrain, MapInstance};
use gridhost_registry::{Registry, RegistryConfig};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gridhost-cli", about = "CLI tool for gridhost instance runtime")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print crate versions
    Info,
    /// Run a multi-threaded instance simulation and print stats
    Simulate {
        /// Number of entities to add
        #[arg(short, long, default_value = "32")]
        entities: usize,
        /// Number of relocation rounds to drive
        #[arg(short, long, default_value = "20")]
        ticks: usize,
        /// JSON config file overriding the built-in demo parameters
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Demo content parameters; the real content layer injects these.
#[derive(Debug, Clone, Copy, Deserialize)]
struct SimulationConfig {
    cell_size: f32,
    fallback_vision_range: f32,
    grace_millis: u64,
    tick_millis: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            cell_size: 64.0,
            fallback_vision_range: 128.0,
            grace_millis: 500,
            tick_millis: 10,
        }
    }
}

/// Counts deliveries instead of sending them anywhere.
#[derive(Default)]
struct CountingCourier(AtomicUsize);

impl Courier for CountingCourier {
    fn deliver(&self, _player: EntityId, _payload: &[u8]) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("gridhost-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", gridhost_common::crate_info());
            println!("queue: {}", gridhost_queue::crate_info());
            println!("grid: {}", gridhost_grid::crate_info());
            println!("event: {}", gridhost_event::crate_info());
            println!("instance: {}", gridhost_instance::crate_info());
            println!("registry: {}", gridhost_registry::crate_info());
        }
        Commands::Simulate {
            entities,
            ticks,
            config,
        } => {
            let sim: SimulationConfig = match config {
                Some(path) => serde_json::from_reader(std::fs::File::open(path)?)?,
                None => SimulationConfig::default(),
            };
            simulate(sim, entities, ticks)?;
        }
    }
    Ok(())
}

fn simulate(sim: SimulationConfig, entities: usize, ticks: usize) -> anyhow::Result<()> {
    println!("Simulation: {entities} entities, {ticks} rounds, {sim:?}");

    let courier = Arc::new(CountingCourier::default());
    let courier_for_factory = Arc::clone(&courier);
    let registry = Arc::new(Registry::new(
        RegistryConfig {
            tick_interval: Duration::from_millis(sim.tick_millis),
            grace_period: Duration::from_millis(sim.grace_millis),
        },
        move |key: &InstanceKey, grace: Duration| {
            MapInstance::new(
                key.clone(),
                MapConfig {
                    cell_size: sim.cell_size,
                    vision_range: None,
                    fallback_vision_range: sim.fallback_vision_range,
                },
                grace,
                ResurrectionPolicy::NearestSpawn,
                Arc::new(FlatTerrain {
                    height: 0.0,
                    half_extent: 10_000.0,
                }),
                Arc::clone(&courier_for_factory) as Arc<dyn Courier>,
            )
        },
    ));
    registry.start_sweeper(Duration::from_millis(sim.tick_millis * 4));

    let key = InstanceKey::new("Demo");
    let handle = registry.get_or_create(&key)?;

    let mut ids = Vec::with_capacity(entities);
    let mut seed = 0x5eed;
    for i in 0..entities {
        let id = EntityId::new();
        let kind = if i % 4 == 0 {
            EntityKind::Player
        } else {
            EntityKind::Npc
        };
        handle.enqueue_add(Entity::new(id, kind, random_position(&mut seed), 0.5));
        ids.push(id);
    }

    for round in 0..ticks {
        for id in ids.iter().step_by(3) {
            // Waiting on the committed position exercises the completion
            // path; the tick thread is never blocked by it.
            let committed = handle
                .enqueue_relocate(*id, random_position(&mut seed))
                .wait()??;
            tracing::debug!(%id, ?committed, "relocated");
        }
        handle.enqueue_broadcast(format!("round {round}").into_bytes());
    }

    let count = handle.invoke(|map| map.entity_count()).wait()?;
    let cells = handle
        .invoke(|map| map.grid_search(Vec3::ZERO, None).len())
        .wait()?;
    println!("Entities resident: {count}");
    println!("Occupied cells: {cells}");
    println!("Broadcast deliveries: {}", courier.0.load(Ordering::Relaxed));
    println!("Lifecycle: {:?}", handle.lifecycle());

    for id in ids {
        handle.enqueue_remove(id);
    }
    registry.shutdown();
    println!("Shut down cleanly");
    Ok(())
}

/// Deterministic position sequence (splitmix64 over a running seed).
fn random_position(seed: &mut u64) -> Vec3 {
    let mut next = || {
        *seed = seed.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = *seed;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    };
    let x = (next() % 2000) as f32 - 1000.0;
    let z = (next() % 2000) as f32 - 1000.0;
    Vec3::new(x, 10.0, z)
}
