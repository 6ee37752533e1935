//! Main simulation world that ties everything together
//!
//! `SimWorld` owns the road graph, the vehicle engine and the viewport, and
//! plays the part of the map controller: it gates interactions on the run
//! state and stops the simulation once traffic goes idle or jams.

use anyhow::{bail, Result};
use log::{debug, info, warn};

use super::config::SimConfig;
use super::engine::{SpawnAnchor, TickReport, VehicleEngine};
use super::events::EventBus;
use super::road_network::{IngestReport, RoadGraph};
use super::segment::RawRoad;
use super::speed::SpeedMode;
use super::types::{BlockId, GeoPoint, SegmentId, VehicleId};
use super::viewport::{GeoBounds, StaticViewport, Viewport};

/// Map centre used by the synthetic test world
pub const DEFAULT_CENTER: GeoPoint = GeoPoint {
    lat: 37.7749,
    lng: -122.4194,
};

/// Spacing between junctions of the synthetic grid, in degrees
const GRID_SPACING_DEG: f64 = 0.002;

/// Length of the exit roads leaving the grid, as a fraction of its span
const EXIT_ROAD_RATIO: f64 = 0.5;

/// Run state of the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimulationState {
    #[default]
    Idle,
    Running,
    Paused,
    Stopped,
}

/// The main simulation world
pub struct SimWorld {
    /// Road network the vehicles drive on
    pub graph: RoadGraph,

    /// Live vehicles and the motion loop
    pub engine: VehicleEngine<EventBus>,

    /// What the map currently shows
    pub viewport: StaticViewport,

    state: SimulationState,

    /// Whether the next stop leaves vehicles on screen
    preserve_vehicles_on_stop: bool,

    /// Simulation time
    pub time: f64,
}

impl SimWorld {
    pub fn new(viewport: StaticViewport) -> Self {
        Self::with_config(SimConfig::default(), viewport, None)
    }

    /// Create a new simulation world with a seeded RNG for reproducible results
    pub fn new_with_seed(viewport: StaticViewport, seed: u64) -> Self {
        Self::with_config(SimConfig::default(), viewport, Some(seed))
    }

    pub fn with_config(config: SimConfig, viewport: StaticViewport, seed: Option<u64>) -> Self {
        let graph = RoadGraph::with_precision(config.node_key_precision);
        let mut engine = VehicleEngine::new(config);
        if let Some(seed) = seed {
            engine = engine.with_seed(seed);
        }
        Self {
            graph,
            engine,
            viewport,
            state: SimulationState::Idle,
            preserve_vehicles_on_stop: false,
            time: 0.0,
        }
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SimulationState::Running
    }

    /// Spawning and blocking are only accepted while a run is in progress
    pub fn interactions_enabled(&self) -> bool {
        matches!(self.state, SimulationState::Running | SimulationState::Paused)
    }

    pub fn set_viewport(&mut self, viewport: StaticViewport) {
        self.viewport = viewport;
    }

    /// Replaces the road set
    pub fn load_roads(&mut self, roads: &[RawRoad]) -> IngestReport {
        self.graph.ingest(roads)
    }

    fn transition(&mut self, state: SimulationState) {
        if self.state != state {
            debug!("Simulation {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }

    /// Starts, pauses or resumes depending on the current state
    pub fn toggle_run(&mut self) -> Result<SimulationState> {
        match self.state {
            SimulationState::Running => self.pause(),
            SimulationState::Paused => self.resume(),
            SimulationState::Idle | SimulationState::Stopped => self.start()?,
        }
        Ok(self.state)
    }

    /// Starts a run. Refuses when zoomed out too far or with no roads loaded.
    pub fn start(&mut self) -> Result<()> {
        if !self.viewport.is_within_interaction_threshold() {
            bail!(
                "Zoom in to within {:.1} miles to start (showing {:.1})",
                self.viewport.interaction_threshold(),
                self.viewport.visible_radius()
            );
        }
        if !self.graph.has_segments() {
            bail!("No road segments loaded");
        }

        self.engine.start();
        self.transition(SimulationState::Running);
        info!("Simulation started on {} segments", self.graph.segment_count());
        Ok(())
    }

    pub fn pause(&mut self) {
        if self.state == SimulationState::Running {
            self.engine.pause();
            self.transition(SimulationState::Paused);
        }
    }

    pub fn resume(&mut self) {
        if self.state == SimulationState::Paused {
            self.engine.resume();
            self.transition(SimulationState::Running);
        }
    }

    /// Stops the run, clearing vehicles unless a preserving stop was requested
    pub fn stop(&mut self) {
        self.engine.stop(self.preserve_vehicles_on_stop);
        self.preserve_vehicles_on_stop = false;
        self.transition(SimulationState::Stopped);
    }

    fn stop_preserving_vehicles(&mut self) {
        self.preserve_vehicles_on_stop = true;
        self.stop();
    }

    /// Clears vehicles and blocks and returns to the initial state
    pub fn reset(&mut self) {
        self.engine.stop(false);
        self.graph.clear_blocks();
        self.preserve_vehicles_on_stop = false;
        self.time = 0.0;
        self.transition(SimulationState::Idle);
    }

    /// Spawns vehicles on the road nearest `point`
    pub fn spawn_at(&mut self, point: &GeoPoint, count: usize) -> Vec<VehicleId> {
        if !self.interactions_enabled() {
            warn!("Start the simulation before adding vehicles");
            return Vec::new();
        }

        let radius = self.engine.config().pick_radius_m;
        let Some(nearest) = self.graph.nearest_segment_within(point, radius) else {
            warn!("No road within {radius} m of {point}");
            return Vec::new();
        };

        self.engine.spawn(&self.graph, &SpawnAnchor::from(nearest), count)
    }

    /// Blocks the road nearest `point` at the picked spot
    pub fn block_at(&mut self, point: &GeoPoint) -> Option<BlockId> {
        if !self.interactions_enabled() {
            warn!("Start the simulation before blocking roads");
            return None;
        }

        let radius = self.engine.config().pick_radius_m;
        let Some(nearest) = self.graph.nearest_segment_within(point, radius) else {
            warn!("No road within {radius} m of {point}");
            return None;
        };

        if self.graph.is_blocked(nearest.segment_id) {
            warn!("{} is already blocked", nearest.segment_id);
            return None;
        }

        let block_id = self.graph.add_block(nearest.segment_id, Some(nearest.distance_along))?;
        info!(
            "Blocked {} at {:.1} m ({} blocks total)",
            nearest.segment_id,
            nearest.distance_along,
            self.graph.block_count()
        );
        Some(block_id)
    }

    pub fn add_block(&mut self, segment_id: SegmentId, distance: Option<f64>) -> Option<BlockId> {
        self.graph.add_block(segment_id, distance)
    }

    pub fn clear_blocks(&mut self) {
        self.graph.clear_blocks();
    }

    /// Advances the simulation by `delta_secs`.
    ///
    /// Stops the run, leaving vehicles in place, once every vehicle has left
    /// or every remaining vehicle is blocked.
    pub fn tick(&mut self, delta_secs: f64) -> Option<TickReport> {
        if self.state != SimulationState::Running {
            return None;
        }

        let report = self.engine.tick(delta_secs, &self.graph, &self.viewport)?;
        self.time += delta_secs;

        if report.idle {
            info!("All vehicles have left the view; stopping");
            self.stop_preserving_vehicles();
        } else if report.jammed {
            info!(
                "Traffic jam: all {} vehicles are blocked; stopping",
                report.counts.total
            );
            self.stop_preserving_vehicles();
        }

        Some(report)
    }

    /// Switches to the next speed mode
    pub fn cycle_speed_mode(&mut self) -> SpeedMode {
        let mode = self.engine.speed_controller_mut().cycle().clone();
        info!("Speed mode: {}", mode.label());
        mode
    }

    /// Create a test world with a grid of streets and exit roads
    pub fn create_test_world(grid_size: usize) -> Self {
        Self::build_test_world(SimConfig::default(), grid_size, None)
    }

    /// Create a test world with a seeded RNG for reproducible results
    pub fn create_test_world_with_seed(grid_size: usize, seed: u64) -> Self {
        Self::build_test_world(SimConfig::default(), grid_size, Some(seed))
    }

    pub fn build_test_world(config: SimConfig, grid_size: usize, seed: Option<u64>) -> Self {
        let (roads, bounds) = test_grid_roads(grid_size);
        let mut world = Self::with_config(config, StaticViewport::new(bounds), seed);
        world.load_roads(&roads);
        world
    }

    /// Print a summary of the world state
    pub fn print_summary(&self) {
        let counts = self.engine.counts();
        let mode = self.engine.speed_controller().current_mode();

        println!("=== Road Simulation Summary ===");
        println!("State: {:?}, Time: {:.2}s", self.state, self.time);
        println!(
            "Segments: {}, Junctions: {}, Components: {}, Blocks: {}",
            self.graph.segment_count(),
            self.graph.junction_count(),
            self.graph.component_count(),
            self.graph.block_count()
        );
        println!(
            "Vehicles: {} (active {}, blocked {})",
            counts.total, counts.active, counts.blocked
        );
        println!(
            "Speed mode: {} (x{:.2})",
            mode.label(),
            self.engine.current_speed_multiplier(&self.viewport)
        );

        if counts.total > 0 {
            println!("--- Vehicles ---");
            for vehicle in self.engine.iter_vehicles() {
                println!(
                    "  {} {}: {} {:.1}m {:?} at {} heading {:.0}",
                    vehicle.id,
                    vehicle.vehicle_type.name,
                    vehicle.segment_id,
                    vehicle.distance,
                    vehicle.status,
                    vehicle.position,
                    vehicle.heading
                );
            }
        }
    }
}

/// Builds a square street grid around [`DEFAULT_CENTER`].
///
/// `grid_size` blocks per side (at least one). Even rows are primary roads and
/// even columns secondary, the rest residential. A tertiary exit road leaves
/// the middle of each side and runs well past the returned bounds, which
/// cover the grid itself.
pub fn test_grid_roads(grid_size: usize) -> (Vec<RawRoad>, GeoBounds) {
    let n = grid_size.max(1);
    let half = n as f64 / 2.0;
    let junction = |row: usize, col: usize| {
        GeoPoint::new(
            DEFAULT_CENTER.lat + (row as f64 - half) * GRID_SPACING_DEG,
            DEFAULT_CENTER.lng + (col as f64 - half) * GRID_SPACING_DEG,
        )
    };

    let mut roads = Vec::new();
    let mut next_id = 1;
    let mut push = |class: &str, from: GeoPoint, to: GeoPoint| {
        roads.push(RawRoad::new(next_id, class, vec![from, from.lerp(&to, 0.5), to]));
        next_id += 1;
    };

    for row in 0..=n {
        let class = if row % 2 == 0 { "primary" } else { "residential" };
        for col in 0..n {
            push(class, junction(row, col), junction(row, col + 1));
        }
    }
    for col in 0..=n {
        let class = if col % 2 == 0 { "secondary" } else { "residential" };
        for row in 0..n {
            push(class, junction(row, col), junction(row + 1, col));
        }
    }

    let exit = n as f64 * GRID_SPACING_DEG * EXIT_ROAD_RATIO;
    let mid = n / 2;
    let exits = [
        (junction(0, mid), -exit, 0.0),
        (junction(n, mid), exit, 0.0),
        (junction(mid, 0), 0.0, -exit),
        (junction(mid, n), 0.0, exit),
    ];
    for (from, d_lat, d_lng) in exits {
        push("tertiary", from, GeoPoint::new(from.lat + d_lat, from.lng + d_lng));
    }

    let bounds = GeoBounds::new(
        junction(0, 0).lat,
        junction(0, 0).lng,
        junction(n, n).lat,
        junction(n, n).lng,
    );
    (roads, bounds)
}
