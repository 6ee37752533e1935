//! Road-graph traversal and vehicle motion simulation
//!
//! Everything here runs headless: raw road pieces go in, vehicle poses and
//! count/idle/jammed telemetry come out. Rendering is left to the caller.

mod blocks;
mod config;
mod engine;
mod events;
mod geometry;
mod node_key;
mod road_network;
mod segment;
mod speed;
mod types;
mod vehicle;
mod vehicle_types;
mod viewport;
mod world;

// Re-export public types for external use
// These may not be used within this crate but are part of the public API
#[allow(unused_imports)]
pub use blocks::{Block, BlockRegistry};
#[allow(unused_imports)]
pub use config::{
    DeadEndPolicy, SimConfig, FACING_LOOKAHEAD_M, MAX_TRANSITIONS_PER_TICK, MIN_SPEED_MPS, PICK_RADIUS_M,
    SPAWN_JITTER_M, SPEED_FACTOR_RANGE, VISIBILITY_PADDING,
};
pub use engine::{SpawnAnchor, TickReport, TypeSelector, VehicleEngine};
#[allow(unused_imports)]
pub use events::{EventBus, EventKind, EventLog, EventSink, NoopSink, SimEvent, VehicleCounts};
#[allow(unused_imports)]
pub use geometry::{
    project_onto_edge, project_onto_polyline, EdgeProjection, LocalProjection, PlanePoint, PolylineProjection,
};
#[allow(unused_imports)]
pub use node_key::{node_key, NodeKey, DEFAULT_NODE_KEY_PRECISION, MAX_NODE_KEY_PRECISION};
#[allow(unused_imports)]
pub use road_network::{AdjacencyEntry, IngestReport, NearestSegment, RoadGraph};
#[allow(unused_imports)]
pub use segment::{RawRoad, RoadSegment};
#[allow(unused_imports)]
pub use speed::{default_speed_modes, SpeedController, SpeedMode};
#[allow(unused_imports)]
pub use types::{
    BlockId, GeoPoint, RoadClass, SegmentId, SimId, TravelDirection, VehicleId, VehicleStatus, EARTH_RADIUS_M,
    METERS_TO_MILES, MPH_TO_MPS,
};
#[allow(unused_imports)]
pub use vehicle::{MotionContext, SimVehicle, VehicleUpdateResult};
#[allow(unused_imports)]
pub use vehicle_types::{
    default_fleet, TypeCursor, VehicleShape, VehicleType, DEFAULT_AVG_SPEED_MPH, DEFAULT_MAX_SPEED_MPH,
};
#[allow(unused_imports)]
pub use viewport::{GeoBounds, StaticViewport, Viewport, MAX_INTERACTION_RADIUS_MILES};
pub use world::{test_grid_roads, SimWorld, SimulationState, DEFAULT_CENTER};
