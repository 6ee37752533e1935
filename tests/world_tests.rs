//! Simulation controller tests
//!
//! Run-state transitions, point picking, and the automatic stop on idle or
//! jammed traffic.

use std::cell::Cell;
use std::rc::Rc;

use roadblock_sim::simulation::{
    EventKind, GeoBounds, GeoPoint, RawRoad, SegmentId, SimConfig, SimWorld, SimulationState, StaticViewport, Viewport,
};

const LAT: f64 = 37.0;

/// A world holding one dead-end road running east past the viewport's edge
fn single_road_world(config: SimConfig) -> SimWorld {
    let viewport = StaticViewport::new(GeoBounds::new(36.999, -122.001, 37.001, -121.995));
    let mut world = SimWorld::with_config(config, viewport, Some(5));
    world.load_roads(&[RawRoad::new(
        1,
        "residential",
        vec![GeoPoint::new(LAT, -122.0), GeoPoint::new(LAT, -121.99)],
    )]);
    world
}

fn counter(world: &mut SimWorld, kind: EventKind) -> Rc<Cell<usize>> {
    let count = Rc::new(Cell::new(0));
    let handle = Rc::clone(&count);
    world.engine.sink_mut().on(kind, move |_| handle.set(handle.get() + 1));
    count
}

fn midpoint(world: &SimWorld, segment_id: SegmentId) -> GeoPoint {
    let segment = world.graph.get_segment(segment_id).unwrap();
    segment.position_at(segment.total_length() / 2.0)
}

#[test]
fn test_start_requires_roads() {
    let mut world = SimWorld::new(StaticViewport::new(GeoBounds::new(36.999, -122.001, 37.001, -121.999)));

    assert!(world.toggle_run().is_err());
    assert_eq!(world.state(), SimulationState::Idle);
}

#[test]
fn test_start_refused_when_zoomed_out() {
    let mut world = SimWorld::create_test_world(4);
    world.set_viewport(StaticViewport::new(GeoBounds::new(36.0, -123.0, 38.0, -121.0)));

    let err = world.toggle_run().unwrap_err();
    assert!(err.to_string().contains("Zoom in"), "{}", err);
    assert!(!world.is_running());
}

#[test]
fn test_toggle_run_cycles_states() {
    let mut world = SimWorld::create_test_world_with_seed(4, 1);

    assert_eq!(world.toggle_run().unwrap(), SimulationState::Running);
    assert_eq!(world.toggle_run().unwrap(), SimulationState::Paused);
    assert!(world.tick(0.1).is_none());
    assert_eq!(world.toggle_run().unwrap(), SimulationState::Running);

    world.stop();
    assert_eq!(world.state(), SimulationState::Stopped);
    assert_eq!(world.toggle_run().unwrap(), SimulationState::Running);
}

#[test]
fn test_interactions_need_a_running_simulation() {
    let mut world = SimWorld::create_test_world_with_seed(4, 1);
    let point = midpoint(&world, SegmentId(1));

    assert!(world.spawn_at(&point, 2).is_empty());
    assert!(world.block_at(&point).is_none());
    assert_eq!(world.engine.vehicle_count(), 0);
    assert_eq!(world.graph.block_count(), 0);
}

#[test]
fn test_spawn_and_block_by_point() {
    let mut world = SimWorld::create_test_world_with_seed(4, 1);
    world.toggle_run().unwrap();
    let point = midpoint(&world, SegmentId(1));

    let spawned = world.spawn_at(&point, 3);
    assert_eq!(spawned.len(), 3);
    assert!(world.engine.iter_vehicles().all(|v| v.segment_id == SegmentId(1)));

    assert!(world.block_at(&point).is_some());
    assert!(world.graph.is_blocked(SegmentId(1)));

    // A second block on the same road is refused
    assert!(world.block_at(&point).is_none());
    assert_eq!(world.graph.block_count(), 1);

    // Nothing within the pick radius
    let nowhere = GeoPoint::new(0.0, 0.0);
    assert!(world.spawn_at(&nowhere, 1).is_empty());
    assert!(world.block_at(&nowhere).is_none());
}

#[test]
fn test_jam_stops_simulation_and_keeps_vehicles() {
    let config = SimConfig {
        anticipatory_u_turns: false,
        ..SimConfig::default()
    };
    let mut world = single_road_world(config);
    let jams = counter(&mut world, EventKind::Jammed);
    world.toggle_run().unwrap();

    world.spawn_at(&GeoPoint::new(LAT, -121.9995), 1);
    world.add_block(SegmentId(1), None);

    let report = world.tick(1.0).unwrap();

    assert!(report.jammed);
    assert_eq!(report.counts.active, 0);
    assert_eq!(report.counts.blocked, 1);
    assert_eq!(world.state(), SimulationState::Stopped);
    assert_eq!(world.engine.vehicle_count(), 1);
    assert!(world.tick(1.0).is_none());
    assert_eq!(jams.get(), 1);
}

#[test]
fn test_idle_stops_simulation() {
    let mut world = single_road_world(SimConfig::default());
    let idles = counter(&mut world, EventKind::Idle);
    world.toggle_run().unwrap();
    world.spawn_at(&GeoPoint::new(LAT, -122.0), 1);

    let mut ticks = 0;
    while world.is_running() && ticks < 200 {
        world.tick(1.0);
        ticks += 1;
    }

    assert_eq!(world.state(), SimulationState::Stopped);
    assert_eq!(idles.get(), 1);
    assert_eq!(world.engine.vehicle_count(), 0);
    assert!(world.time > 0.0);
}

#[test]
fn test_manual_stop_clears_vehicles() {
    let mut world = SimWorld::create_test_world_with_seed(4, 2);
    world.toggle_run().unwrap();
    let point = midpoint(&world, SegmentId(3));
    world.spawn_at(&point, 4);

    world.stop();

    assert_eq!(world.engine.vehicle_count(), 0);
    assert!(!world.engine.is_running());
}

#[test]
fn test_reset_clears_everything() {
    let mut world = SimWorld::create_test_world_with_seed(4, 2);
    world.toggle_run().unwrap();
    let point = midpoint(&world, SegmentId(3));
    world.spawn_at(&point, 2);
    world.block_at(&point);
    world.tick(0.5);

    world.reset();

    assert_eq!(world.state(), SimulationState::Idle);
    assert_eq!(world.engine.vehicle_count(), 0);
    assert_eq!(world.graph.block_count(), 0);
    assert_eq!(world.time, 0.0);
    assert!(world.graph.has_segments());
}

#[test]
fn test_cycle_speed_mode() {
    let mut world = SimWorld::create_test_world(2);

    assert_eq!(world.cycle_speed_mode().id(), "fast");
    assert_eq!(world.cycle_speed_mode().id(), "zoom-sync");
    assert_eq!(world.cycle_speed_mode().id(), "normal");
}

#[test]
fn test_grid_world_topology() {
    let world = SimWorld::create_test_world(4);

    // 5 rows and 5 columns of 4 blocks each, plus an exit road per side
    assert_eq!(world.graph.segment_count(), 44);
    assert_eq!(world.graph.junction_count(), 29);
    assert_eq!(world.graph.component_count(), 1);
    assert!(world.viewport.is_within_interaction_threshold());
}

#[test]
fn test_grid_world_keeps_vehicles_on_roads() {
    let mut world = SimWorld::create_test_world_with_seed(4, 11);
    world.toggle_run().unwrap();

    for id in [1, 7, 13, 22, 30, 41] {
        let point = midpoint(&world, SegmentId(id));
        world.spawn_at(&point, 2);
    }
    let point = midpoint(&world, SegmentId(10));
    world.block_at(&point);

    for _ in 0..400 {
        if world.tick(0.25).is_none() {
            break;
        }
        for vehicle in world.engine.iter_vehicles() {
            let segment = world.graph.get_segment(vehicle.segment_id).unwrap();
            assert!(vehicle.distance >= 0.0 && vehicle.distance <= segment.total_length());
        }
    }
}
