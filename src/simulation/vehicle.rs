//! Vehicle movement logic for the road simulation
//!
//! Standalone implementation that doesn't depend on any rendering layer.

use anyhow::{Context, Result};
use log::debug;
use ordered_float::OrderedFloat;
use rand::seq::IndexedRandom;
use rand::Rng;

use super::config::{DeadEndPolicy, SimConfig};
use super::road_network::{AdjacencyEntry, RoadGraph};
use super::segment::RoadSegment;
use super::types::{BlockId, GeoPoint, SegmentId, TravelDirection, VehicleId, VehicleStatus};
use super::vehicle_types::{VehicleShape, VehicleType};
use super::viewport::GeoBounds;

/// Tolerance for treating a vehicle as standing on a segment's end, in metres
const TERMINAL_EPSILON_M: f64 = 1e-9;

/// Result of a vehicle update indicating what action should be taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleUpdateResult {
    Continue, // Vehicle stays in the simulation
    Despawn,  // Vehicle left and should be removed
}

/// Shared, read-only state every vehicle consults during a tick
#[derive(Debug, Clone, Copy)]
pub struct MotionContext<'a> {
    pub graph: &'a RoadGraph,
    pub config: &'a SimConfig,
    pub speed_multiplier: f64,
    /// Vehicles outside these bounds are retired
    pub visible_bounds: GeoBounds,
}

/// A vehicle in the road simulation
#[derive(Debug, Clone)]
pub struct SimVehicle {
    pub id: VehicleId,
    pub vehicle_type: VehicleType,
    pub segment_id: SegmentId,
    pub direction: TravelDirection,
    /// Distance along the current segment, always within [0, total length]
    pub distance: f64,
    /// Multiplier on the type's average speed, fixed at spawn
    pub speed_factor: f64,
    pub status: VehicleStatus,
    pub position: GeoPoint,
    /// Compass bearing in degrees
    pub heading: f64,
    /// Blocks on the current segment this vehicle already turned around for
    u_turns: Vec<BlockId>,
}

impl SimVehicle {
    pub fn new(
        id: VehicleId,
        vehicle_type: VehicleType,
        segment: &RoadSegment,
        distance: f64,
        speed_factor: f64,
        config: &SimConfig,
    ) -> Self {
        let mut vehicle = Self {
            id,
            vehicle_type,
            segment_id: segment.id,
            direction: TravelDirection::Forward,
            distance: 0.0,
            speed_factor,
            status: VehicleStatus::Active,
            position: GeoPoint::default(),
            heading: 0.0,
            u_turns: Vec::new(),
        };
        vehicle.set_distance(distance, segment);
        vehicle.refresh_pose(segment, config);
        vehicle
    }

    pub fn shape(&self) -> VehicleShape {
        self.vehicle_type.shape
    }

    /// Whether the vehicle has turned around on its current segment
    pub fn has_u_turned(&self) -> bool {
        !self.u_turns.is_empty()
    }

    /// Travel speed in m/s before the global multiplier
    pub fn speed_mps(&self, config: &SimConfig) -> f64 {
        let nominal = self.vehicle_type.avg_speed_mps * self.speed_factor;
        let ceiling = self.vehicle_type.max_speed_mps.max(config.min_speed_mps);
        nominal.clamp(config.min_speed_mps, ceiling)
    }

    /// Advances the vehicle by `delta_secs`.
    /// Returns VehicleUpdateResult indicating whether the vehicle should be removed
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        delta_secs: f64,
        ctx: &MotionContext<'_>,
        rng: &mut R,
    ) -> Result<VehicleUpdateResult> {
        let segment = self.current_segment(ctx.graph)?;
        // The segment may have been re-ingested with shorter geometry
        self.set_distance(self.distance, segment);

        // A blocked vehicle stays put until a way opens
        if self.status == VehicleStatus::Blocked {
            if !self.can_resume(segment, ctx) {
                self.refresh_pose(segment, ctx.config);
                return Ok(VehicleUpdateResult::Continue);
            }
            debug!("{} resumes on {}", self.id, self.segment_id);
            self.status = VehicleStatus::Active;
        }

        self.check_obstruction(segment, ctx);

        let mut remaining = self.speed_mps(ctx.config) * ctx.speed_multiplier * delta_secs;
        let mut transitions = 0;

        while remaining > 0.0 && self.status == VehicleStatus::Active {
            let segment = self.current_segment(ctx.graph)?;
            let target = segment.terminal_distance(self.direction);
            let distance_to_target = (target - self.distance).abs();

            if distance_to_target > remaining {
                self.set_distance(self.distance + self.direction.sign() * remaining, segment);
                break;
            }

            self.set_distance(target, segment);
            remaining -= distance_to_target;

            if transitions >= ctx.config.transition_limit() {
                break;
            }
            transitions += 1;

            if !self.advance_to_next_segment(segment, ctx, rng)? {
                match ctx.config.dead_end_policy {
                    DeadEndPolicy::Stall => {
                        debug!("{} stalled at dead end of {}", self.id, self.segment_id);
                        self.status = VehicleStatus::Blocked;
                    }
                    DeadEndPolicy::Retire => {
                        debug!("{} retired at dead end of {}", self.id, self.segment_id);
                        self.status = VehicleStatus::Exited;
                        return Ok(VehicleUpdateResult::Despawn);
                    }
                }
            }
        }

        let segment = self.current_segment(ctx.graph)?;
        self.refresh_pose(segment, ctx.config);

        if !ctx.visible_bounds.contains(&self.position) {
            self.status = VehicleStatus::Exited;
            return Ok(VehicleUpdateResult::Despawn);
        }

        Ok(VehicleUpdateResult::Continue)
    }

    fn current_segment<'g>(&self, graph: &'g RoadGraph) -> Result<&'g RoadSegment> {
        graph
            .get_segment(self.segment_id)
            .with_context(|| format!("{} is on unknown {}", self.id, self.segment_id))
    }

    fn set_distance(&mut self, distance: f64, segment: &RoadSegment) {
        self.distance = segment.clamp_distance(distance);
    }

    fn at_terminal(&self, segment: &RoadSegment) -> bool {
        (segment.terminal_distance(self.direction) - self.distance).abs() <= TERMINAL_EPSILON_M
    }

    /// Recomputes the rendered position and facing from the distance
    pub fn refresh_pose(&mut self, segment: &RoadSegment, config: &SimConfig) {
        self.position = segment.position_at(self.distance);
        self.heading = segment.heading_at(self.distance, self.direction, config.facing_lookahead_m);
    }

    /// Nearest block strictly ahead in the direction of travel
    fn block_ahead(&self, segment: &RoadSegment, graph: &RoadGraph) -> Option<BlockId> {
        let total = segment.total_length();
        let ahead = graph
            .blocks_on(self.segment_id)
            .map(|block| (block.id, block.distance_or(total)));

        let nearest = match self.direction {
            TravelDirection::Forward => ahead
                .filter(|(_, d)| *d > self.distance)
                .min_by_key(|(_, d)| OrderedFloat(*d)),
            TravelDirection::Backward => ahead
                .filter(|(_, d)| *d < self.distance)
                .max_by_key(|(_, d)| OrderedFloat(*d)),
        };
        nearest.map(|(id, _)| id)
    }

    /// Reacts to blocks on the current segment before moving
    fn check_obstruction(&mut self, segment: &RoadSegment, ctx: &MotionContext<'_>) {
        if self.status != VehicleStatus::Active || !ctx.graph.is_blocked(self.segment_id) {
            return;
        }

        if !ctx.config.anticipatory_u_turns {
            debug!("{} halted on blocked {}", self.id, self.segment_id);
            self.status = VehicleStatus::Blocked;
            return;
        }

        let Some(block_id) = self.block_ahead(segment, ctx.graph) else {
            return;
        };

        if self.u_turns.contains(&block_id) {
            debug!("{} faces {} again and halts", self.id, block_id);
            self.status = VehicleStatus::Blocked;
        } else {
            debug!("{} turns around ahead of {}", self.id, block_id);
            self.u_turns.push(block_id);
            self.direction = self.direction.reversed();
        }
    }

    fn can_resume(&self, segment: &RoadSegment, ctx: &MotionContext<'_>) -> bool {
        let obstructed = if ctx.config.anticipatory_u_turns {
            self.block_ahead(segment, ctx.graph)
                .is_some_and(|block_id| self.u_turns.contains(&block_id))
        } else {
            ctx.graph.is_blocked(self.segment_id)
        };
        if obstructed {
            return false;
        }

        !self.at_terminal(segment) || !self.onward_segments(segment, ctx).is_empty()
    }

    /// Unblocked segments this vehicle may take from the junction ahead
    fn onward_segments(&self, segment: &RoadSegment, ctx: &MotionContext<'_>) -> Vec<AdjacencyEntry> {
        let node = segment.terminal_key(self.direction);
        ctx.graph
            .get_connected_segments(node, self.segment_id)
            .into_iter()
            .filter(|entry| !ctx.graph.is_blocked(entry.segment_id))
            .filter(|entry| {
                ctx.graph
                    .get_segment(entry.segment_id)
                    .is_some_and(|next| self.vehicle_type.allows(next.class))
            })
            .collect()
    }

    /// Moves the vehicle onto a random onward segment.
    /// Returns false when there is nowhere to go.
    fn advance_to_next_segment<R: Rng + ?Sized>(
        &mut self,
        segment: &RoadSegment,
        ctx: &MotionContext<'_>,
        rng: &mut R,
    ) -> Result<bool> {
        let candidates = self.onward_segments(segment, ctx);
        let Some(next) = candidates.choose(rng).copied() else {
            return Ok(false);
        };

        let next_segment = ctx
            .graph
            .get_segment(next.segment_id)
            .context("Onward segment not found")?;

        self.segment_id = next.segment_id;
        self.direction = next.direction;
        self.u_turns.clear();
        self.set_distance(next_segment.terminal_distance(next.direction.reversed()), next_segment);
        Ok(true)
    }
}
