//! Vehicle spawning, ticking and telemetry
//!
//! The engine owns the live vehicle set. It reads the road graph during a
//! tick but never mutates it; the graph is borrowed for exactly the duration
//! of [`VehicleEngine::tick`].

use log::{debug, warn};
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use std::collections::BTreeMap;

use super::config::SimConfig;
use super::events::{EventBus, EventSink, VehicleCounts};
use super::road_network::{NearestSegment, RoadGraph};
use super::speed::{SpeedController, SpeedMode};
use super::types::{SegmentId, SimId, VehicleId, VehicleStatus};
use super::vehicle::{MotionContext, SimVehicle, VehicleUpdateResult};
use super::vehicle_types::{default_fleet, TypeCursor, VehicleType};
use super::viewport::Viewport;

/// Where on the network new vehicles appear
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnAnchor {
    pub segment_id: SegmentId,
    /// Edge of the segment's polyline
    pub segment_index: usize,
    /// Fraction along that edge
    pub t_on_segment: f64,
}

impl SpawnAnchor {
    pub fn new(segment_id: SegmentId, segment_index: usize, t_on_segment: f64) -> Self {
        Self {
            segment_id,
            segment_index,
            t_on_segment,
        }
    }

    /// The first point of a segment
    pub fn start_of(segment_id: SegmentId) -> Self {
        Self::new(segment_id, 0, 0.0)
    }
}

impl From<NearestSegment> for SpawnAnchor {
    fn from(nearest: NearestSegment) -> Self {
        Self::new(nearest.segment_id, nearest.segment_index, nearest.t_on_segment)
    }
}

/// How spawn picks each new vehicle's type
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TypeSelector {
    /// Cycle through every available type in turn
    #[default]
    RoundRobin,
    /// Always the named type; falls back to round-robin if it doesn't exist
    Named(String),
}

/// What a tick or count emission observed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub counts: VehicleCounts,
    pub idle: bool,
    pub jammed: bool,
}

/// The motion simulation: live vehicles plus the run flags that gate ticking
pub struct VehicleEngine<S: EventSink = EventBus> {
    /// All live vehicles, ordered by ID so seeded runs replay identically
    vehicles: BTreeMap<VehicleId, SimVehicle>,

    types: Vec<VehicleType>,

    type_cursor: TypeCursor,

    speed: SpeedController,

    config: SimConfig,

    sink: S,

    /// Next ID to assign
    next_id: usize,

    running: bool,

    paused: bool,

    /// Whether the last count emission saw any vehicles
    has_vehicles: bool,

    /// Optional seeded RNG for reproducible simulations
    rng: Option<StdRng>,
}

impl VehicleEngine<EventBus> {
    pub fn new(config: SimConfig) -> Self {
        Self::with_sink(config, EventBus::new())
    }
}

impl<S: EventSink> VehicleEngine<S> {
    /// Creates an engine with the default fleet reporting to `sink`
    pub fn with_sink(config: SimConfig, sink: S) -> Self {
        Self {
            vehicles: BTreeMap::new(),
            types: default_fleet(),
            type_cursor: TypeCursor::new(),
            speed: SpeedController::default(),
            config,
            sink,
            next_id: 0,
            running: false,
            paused: false,
            has_vehicles: false,
            rng: None,
        }
    }

    /// Seeds the engine's RNG for reproducible simulations
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Some(StdRng::seed_from_u64(seed));
        self
    }

    pub fn with_types(mut self, types: Vec<VehicleType>) -> Self {
        self.set_types(types);
        self
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn types(&self) -> &[VehicleType] {
        &self.types
    }

    /// Replaces the available vehicle types and restarts the type rotation
    pub fn set_types(&mut self, types: Vec<VehicleType>) {
        self.types = types;
        self.type_cursor.reset();
    }

    pub fn speed_controller(&self) -> &SpeedController {
        &self.speed
    }

    pub fn speed_controller_mut(&mut self) -> &mut SpeedController {
        &mut self.speed
    }

    pub fn set_speed_mode(&mut self, mode: SpeedMode) {
        self.speed.set_mode(mode);
    }

    pub fn current_speed_multiplier(&self, viewport: &dyn Viewport) -> f64 {
        self.speed.current_multiplier(viewport)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn vehicle_count(&self) -> usize {
        self.vehicles.len()
    }

    /// Returns an iterator over all live vehicles
    pub fn iter_vehicles(&self) -> impl Iterator<Item = &SimVehicle> + '_ {
        self.vehicles.values()
    }

    pub fn get_vehicle(&self, vehicle_id: VehicleId) -> Option<&SimVehicle> {
        self.vehicles.get(&vehicle_id)
    }

    /// Current tallies, without emitting anything
    pub fn counts(&self) -> VehicleCounts {
        self.tally(0)
    }

    /// Get a random value in the given range, using seeded RNG if available
    fn random_range(&mut self, range: std::ops::Range<f64>) -> f64 {
        if range.is_empty() {
            return range.start;
        }
        match &mut self.rng {
            Some(rng) => rng.random_range(range),
            None => rand::rng().random_range(range),
        }
    }

    fn random_index(&mut self, len: usize) -> usize {
        match &mut self.rng {
            Some(rng) => rng.random_range(0..len),
            None => rand::rng().random_range(0..len),
        }
    }

    fn next_vehicle_id(&mut self) -> VehicleId {
        let id = VehicleId(SimId(self.next_id));
        self.next_id += 1;
        id
    }

    fn pick_type(&mut self, selector: &TypeSelector) -> Option<VehicleType> {
        if self.types.is_empty() {
            return None;
        }

        if let TypeSelector::Named(name) = selector {
            match self.types.iter().find(|t| &t.name == name) {
                Some(vehicle_type) => return Some(vehicle_type.clone()),
                None => warn!("Unknown vehicle type '{name}', using rotation"),
            }
        }

        let len = self.types.len();
        let index = match self.type_cursor.next_index(len) {
            Some(index) => index,
            None => self.random_index(len),
        };
        self.types.get(index).cloned()
    }

    /// Spawns `count` vehicles at `anchor`, cycling through vehicle types
    pub fn spawn(&mut self, graph: &RoadGraph, anchor: &SpawnAnchor, count: usize) -> Vec<VehicleId> {
        self.spawn_with(graph, anchor, count, &TypeSelector::RoundRobin)
    }

    /// Spawns `count` vehicles at `anchor`.
    ///
    /// Co-spawned vehicles are spread out by a random offset proportional to
    /// their spawn order. Emits counts and marks the engine running.
    pub fn spawn_with(
        &mut self,
        graph: &RoadGraph,
        anchor: &SpawnAnchor,
        count: usize,
        selector: &TypeSelector,
    ) -> Vec<VehicleId> {
        if self.types.is_empty() {
            warn!("No vehicle types available");
            return Vec::new();
        }

        let Some(segment) = graph.get_segment(anchor.segment_id) else {
            warn!("Cannot spawn on unknown {}", anchor.segment_id);
            return Vec::new();
        };

        let base_distance = segment.distance_at(anchor.segment_index, anchor.t_on_segment);
        let jitter = self.config.spawn_jitter_m.abs();
        let (min_factor, max_factor) = self.config.speed_factor_range;

        let mut spawned = Vec::with_capacity(count);
        for order in 0..count {
            let Some(vehicle_type) = self.pick_type(selector) else {
                break;
            };
            let offset = self.random_range(-jitter..jitter) * order as f64;
            let speed_factor = self.random_range(min_factor..max_factor);

            let id = self.next_vehicle_id();
            let vehicle = SimVehicle::new(
                id,
                vehicle_type,
                segment,
                base_distance + offset,
                speed_factor,
                &self.config,
            );
            debug!(
                "Spawned {} ({}) on {} at {:.1} m",
                id, vehicle.vehicle_type.name, segment.id, vehicle.distance
            );
            self.vehicles.insert(id, vehicle);
            spawned.push(id);
        }

        self.emit_counts();
        self.ensure_running();
        spawned
    }

    fn ensure_running(&mut self) {
        self.running = true;
    }

    pub fn start(&mut self) {
        self.running = true;
        self.paused = false;
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Halts ticking. Vehicles are either cleared or left frozen in place.
    pub fn stop(&mut self, retain_vehicles: bool) {
        self.running = false;
        self.paused = false;
        if retain_vehicles {
            self.emit_counts();
        } else {
            self.clear_vehicles();
        }
    }

    pub fn clear_vehicles(&mut self) {
        self.vehicles.clear();
        self.has_vehicles = false;
        self.emit_counts();
    }

    /// Advances every vehicle by `delta_secs` against the current graph.
    ///
    /// Does nothing unless the engine is running, not paused, and
    /// `delta_secs` is positive. Returns the counts and signals observed.
    pub fn tick(&mut self, delta_secs: f64, graph: &RoadGraph, viewport: &dyn Viewport) -> Option<TickReport> {
        if !self.running || self.paused || !(delta_secs > 0.0) {
            return None;
        }

        let ctx = MotionContext {
            graph,
            config: &self.config,
            speed_multiplier: self.speed.current_multiplier(viewport),
            visible_bounds: viewport.visible_bounds().pad(self.config.visibility_padding),
        };

        let mut exited = Vec::new();
        for (vehicle_id, vehicle) in self.vehicles.iter_mut() {
            let result = match &mut self.rng {
                Some(rng) => vehicle.update(delta_secs, &ctx, rng),
                None => vehicle.update(delta_secs, &ctx, &mut rand::rng()),
            };

            match result {
                Ok(VehicleUpdateResult::Continue) => {}
                Ok(VehicleUpdateResult::Despawn) => exited.push(*vehicle_id),
                Err(err) => {
                    warn!("Retiring {vehicle_id}: {err:#}");
                    exited.push(*vehicle_id);
                }
            }
        }

        for vehicle_id in &exited {
            self.vehicles.remove(vehicle_id);
        }

        Some(self.report_counts(exited.len()))
    }

    /// Emits counts plus any idle or jammed signal
    pub fn emit_counts(&mut self) -> TickReport {
        self.report_counts(0)
    }

    fn tally(&self, exited: usize) -> VehicleCounts {
        let mut counts = VehicleCounts {
            exited,
            total: self.vehicles.len(),
            ..Default::default()
        };
        for vehicle in self.vehicles.values() {
            match vehicle.status {
                VehicleStatus::Active => counts.active += 1,
                VehicleStatus::Blocked => counts.blocked += 1,
                VehicleStatus::Exited => {}
            }
        }
        counts
    }

    fn report_counts(&mut self, exited: usize) -> TickReport {
        let counts = self.tally(exited);
        self.sink.counts(&counts);

        let mut report = TickReport {
            counts,
            ..Default::default()
        };

        let had_vehicles = self.has_vehicles;
        if counts.total == 0 {
            self.has_vehicles = false;
            if self.running && had_vehicles {
                debug!("All vehicles have left");
                report.idle = true;
                self.sink.idle();
            }
            return report;
        }

        self.has_vehicles = true;
        if self.running && counts.active == 0 {
            debug!("All {} vehicles are blocked", counts.total);
            report.jammed = true;
            self.sink.jammed();
        }
        report
    }
}
