//! Tunables for the road graph and the motion engine

use super::node_key::DEFAULT_NODE_KEY_PRECISION;

/// Spawn offset per spawn-order index, in metres (applied as ±)
pub const SPAWN_JITTER_M: f64 = 4.0;

/// Slowest a vehicle will ever travel, in m/s
pub const MIN_SPEED_MPS: f64 = 1.0;

/// Per-vehicle speed factor range drawn at spawn
pub const SPEED_FACTOR_RANGE: (f64, f64) = (0.85, 1.15);

/// Distance ahead sampled to derive a vehicle's facing, in metres
pub const FACING_LOOKAHEAD_M: f64 = 1.0;

/// Fraction the visible bounds are grown by before retiring vehicles
pub const VISIBILITY_PADDING: f64 = 0.2;

/// How far from a road a pick may land and still select it, in metres
pub const PICK_RADIUS_M: f64 = 25.0;

/// Upper bound on junctions a single vehicle crosses in one tick
pub const MAX_TRANSITIONS_PER_TICK: usize = 256;

/// What happens to a vehicle that reaches a junction with no legal way on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeadEndPolicy {
    /// Rest at the junction as blocked until a way opens
    #[default]
    Stall,
    /// Leave the simulation as if it had driven out of view
    Retire,
}

/// Simulation configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Decimal places kept when merging segment endpoints into junctions
    pub node_key_precision: u32,
    pub dead_end_policy: DeadEndPolicy,
    /// Turn around once on approaching a block instead of stopping at it
    pub anticipatory_u_turns: bool,
    pub spawn_jitter_m: f64,
    pub speed_factor_range: (f64, f64),
    pub min_speed_mps: f64,
    pub facing_lookahead_m: f64,
    pub visibility_padding: f64,
    pub pick_radius_m: f64,
    pub max_transitions_per_tick: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            node_key_precision: DEFAULT_NODE_KEY_PRECISION,
            dead_end_policy: DeadEndPolicy::default(),
            anticipatory_u_turns: true,
            spawn_jitter_m: SPAWN_JITTER_M,
            speed_factor_range: SPEED_FACTOR_RANGE,
            min_speed_mps: MIN_SPEED_MPS,
            facing_lookahead_m: FACING_LOOKAHEAD_M,
            visibility_padding: VISIBILITY_PADDING,
            pick_radius_m: PICK_RADIUS_M,
            max_transitions_per_tick: MAX_TRANSITIONS_PER_TICK,
        }
    }
}

impl SimConfig {
    /// Junction crossings allowed per vehicle per tick, never less than one
    pub fn transition_limit(&self) -> usize {
        self.max_transitions_per_tick.max(1)
    }
}
