use std::cell::Cell;
use std::rc::Rc;

use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

use roadblock_sim::simulation::{DeadEndPolicy, EventKind, GeoPoint, SegmentId, SimConfig, SimEvent, SimWorld};

/// Vehicles spawned per click
const SPAWN_BATCH: usize = 3;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DeadEnd {
    Stall,
    Retire,
}

impl From<DeadEnd> for DeadEndPolicy {
    fn from(value: DeadEnd) -> Self {
        match value {
            DeadEnd::Stall => DeadEndPolicy::Stall,
            DeadEnd::Retire => DeadEndPolicy::Retire,
        }
    }
}

#[derive(Parser)]
#[command(name = "roadblock_sim")]
#[command(about = "Headless road traffic simulation with roadblocks")]
struct Cli {
    /// Number of simulation ticks to run
    #[arg(long, default_value = "600")]
    ticks: u32,

    /// Time delta per tick in seconds
    #[arg(long, default_value = "0.1")]
    delta: f64,

    /// Seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// Number of vehicles to spawn
    #[arg(long, default_value = "12")]
    vehicles: usize,

    /// Blocks per side of the street grid
    #[arg(long, default_value = "4")]
    grid: usize,

    /// Number of random roadblocks
    #[arg(long, default_value = "2")]
    block: usize,

    /// What vehicles do at a dead end
    #[arg(long, value_enum, default_value_t = DeadEnd::Stall)]
    dead_end: DeadEnd,

    /// Stop at roadblocks instead of turning around
    #[arg(long)]
    no_u_turns: bool,

    /// Speed mode ID (normal, fast, zoom-sync)
    #[arg(long, default_value = "normal")]
    speed_mode: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn,roadblock_sim=info")).init();

    let cli = Cli::parse();
    run_headless(&cli)
}

/// Run the simulation in headless mode (no graphics)
fn run_headless(cli: &Cli) -> Result<()> {
    if !(cli.delta > 0.0) {
        bail!("--delta must be positive");
    }

    let seed = cli.seed.unwrap_or_else(|| rand::rng().random());
    let config = SimConfig {
        dead_end_policy: cli.dead_end.into(),
        anticipatory_u_turns: !cli.no_u_turns,
        ..SimConfig::default()
    };

    println!("Running road simulation in headless mode...");
    println!("Ticks: {}, Delta: {}s, Seed: {}", cli.ticks, cli.delta, seed);

    let mut world = SimWorld::build_test_world(config, cli.grid, Some(seed));
    if !world.engine.speed_controller_mut().select(&cli.speed_mode) {
        let known: Vec<_> = world.engine.speed_controller().modes().iter().map(|m| m.id().to_string()).collect();
        bail!("Unknown speed mode '{}' (expected one of {})", cli.speed_mode, known.join(", "));
    }

    let idle_events = Rc::new(Cell::new(0usize));
    let jam_events = Rc::new(Cell::new(0usize));
    let exited = Rc::new(Cell::new(0usize));
    {
        let bus = world.engine.sink_mut();
        let counter = Rc::clone(&idle_events);
        bus.on(EventKind::Idle, move |_| counter.set(counter.get() + 1));
        let counter = Rc::clone(&jam_events);
        bus.on(EventKind::Jammed, move |_| counter.set(counter.get() + 1));
        let counter = Rc::clone(&exited);
        bus.on(EventKind::Counts, move |event| {
            if let SimEvent::Counts(counts) = event {
                counter.set(counter.get() + counts.exited);
            }
        });
    }

    world.toggle_run()?;

    let mut rng = StdRng::seed_from_u64(seed);
    let segment_ids: Vec<SegmentId> = world.graph.segments().map(|s| s.id).collect();

    for segment_id in segment_ids.choose_multiple(&mut rng, cli.block) {
        if let Some(point) = midpoint(&world, *segment_id) {
            world.block_at(&point);
        }
    }

    let mut spawned = 0;
    while spawned < cli.vehicles {
        let Some(segment_id) = segment_ids.choose(&mut rng).copied() else {
            break;
        };
        let Some(point) = midpoint(&world, segment_id) else {
            break;
        };
        let batch = SPAWN_BATCH.min(cli.vehicles - spawned);
        let ids = world.spawn_at(&point, batch);
        if ids.is_empty() {
            break;
        }
        spawned += ids.len();
    }

    println!("Initial state:");
    world.print_summary();
    println!();

    // Calculate how many ticks equal 1 second of simulation time
    let ticks_per_second = (1.0 / cli.delta).ceil().max(1.0) as u32;

    let mut tick = 0;
    while tick < cli.ticks && world.is_running() {
        let ticks_to_run = ticks_per_second.min(cli.ticks - tick);

        for _ in 0..ticks_to_run {
            tick += 1;
            world.tick(cli.delta);
            if !world.is_running() {
                break;
            }
        }

        println!(
            "--- After tick {} ({:.1}s simulated time) ---",
            tick,
            tick as f64 * cli.delta
        );
        world.print_summary();
        println!();
    }

    println!("=== SIMULATION COMPLETE ===");
    println!("Ticks run: {}", tick);
    println!("Vehicles spawned: {}", spawned);
    println!("Vehicles exited: {}", exited.get());
    println!("Idle events: {}", idle_events.get());
    println!("Jam events: {}", jam_events.get());
    println!("Final state: {:?}", world.state());
    Ok(())
}

fn midpoint(world: &SimWorld, segment_id: SegmentId) -> Option<GeoPoint> {
    let segment = world.graph.get_segment(segment_id)?;
    Some(segment.position_at(segment.total_length() / 2.0))
}
