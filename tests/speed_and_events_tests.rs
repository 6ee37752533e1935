//! Speed mode and event dispatch tests

use std::cell::RefCell;
use std::rc::Rc;

use roadblock_sim::simulation::{
    default_speed_modes, EventBus, EventKind, EventLog, EventSink, GeoBounds, GeoPoint, SimEvent, SpeedController, SpeedMode,
    StaticViewport, VehicleCounts, Viewport, MAX_INTERACTION_RADIUS_MILES,
};

fn zoom_sync() -> SpeedMode {
    SpeedMode::dynamic("zoom-sync", "Zoom Sync", 1.15, 0.9, 3.2)
}

#[test]
fn test_fixed_mode_ignores_viewport() {
    let mode = SpeedMode::fixed("fast", "Rush", 1.7);

    assert_eq!(mode.multiplier_for(0.0, 5.0), 1.7);
    assert_eq!(mode.multiplier_for(100.0, 5.0), 1.7);
    assert!(!mode.is_dynamic());
}

#[test]
fn test_dynamic_mode_follows_zoom_within_limits() {
    let mode = zoom_sync();

    assert!((mode.multiplier_for(5.0, 5.0) - 1.15).abs() < 1e-12);
    assert!((mode.multiplier_for(10.0, 5.0) - 2.3).abs() < 1e-12);
    assert_eq!(mode.multiplier_for(50.0, 5.0), 3.2);
    assert_eq!(mode.multiplier_for(0.0, 5.0), 0.9);
    assert_eq!(mode.multiplier_for(f64::NAN, 5.0), 0.9);
}

#[test]
fn test_dynamic_mode_with_zero_threshold_uses_base() {
    let mode = zoom_sync();

    assert!((mode.multiplier_for(3.0, 0.0) - 1.15).abs() < 1e-12);
    assert!((mode.multiplier_for(3.0, f64::INFINITY) - 1.15).abs() < 1e-12);
}

#[test]
fn test_dynamic_mode_orders_limits() {
    let mode = SpeedMode::dynamic("odd", "Odd", 1.0, 4.0, 2.0);

    assert_eq!(mode.multiplier_for(0.0, 1.0), 2.0);
    assert_eq!(mode.multiplier_for(100.0, 1.0), 4.0);
}

#[test]
fn test_speed_controller_cycles_modes() {
    let mut controller = SpeedController::default();
    assert_eq!(controller.current_mode().id(), "normal");

    assert_eq!(controller.cycle().id(), "fast");
    assert_eq!(controller.cycle().id(), "zoom-sync");
    assert!(controller.is_dynamic());
    assert_eq!(controller.cycle().id(), "normal");
}

#[test]
fn test_speed_controller_select_and_set() {
    let mut controller = SpeedController::new(Vec::new());
    assert_eq!(controller.modes(), default_speed_modes().as_slice());

    assert!(controller.select("fast"));
    assert!(!controller.select("warp"));
    assert_eq!(controller.current_mode().label(), "Rush");

    controller.set_mode(SpeedMode::fixed("warp", "Warp", 9.0));
    assert_eq!(controller.modes().len(), 4);
    assert_eq!(controller.current_mode().id(), "warp");

    // Replacing an existing mode keeps the list length
    controller.set_mode(SpeedMode::fixed("normal", "Crawl", 0.5));
    assert_eq!(controller.modes().len(), 4);
    assert_eq!(controller.current_mode().label(), "Crawl");
}

#[test]
fn test_current_multiplier_reads_viewport() {
    let viewport = StaticViewport::new(GeoBounds::new(37.0, -122.0, 37.05, -121.95));
    let mut controller = SpeedController::default();

    assert_eq!(controller.current_multiplier(&viewport), 1.0);

    controller.select("zoom-sync");
    let expected = (1.15 * viewport.visible_radius() / MAX_INTERACTION_RADIUS_MILES).clamp(0.9, 3.2);
    assert!((controller.current_multiplier(&viewport) - expected).abs() < 1e-12);
}

#[test]
fn test_viewport_radius_and_threshold() {
    // 0.1 degrees of latitude tall, so about 3.45 miles from centre to edge
    let viewport = StaticViewport::new(GeoBounds::new(37.0, -122.1, 37.1, -122.0));
    let radius = viewport.visible_radius();

    assert!((radius - 3.45).abs() < 0.05, "radius {}", radius);
    assert!(viewport.is_within_interaction_threshold());
    assert!(!viewport.with_threshold(2.0).is_within_interaction_threshold());
}

#[test]
fn test_bounds_padding_and_containment() {
    let bounds = GeoBounds::new(1.0, 10.0, 0.0, 12.0);
    assert_eq!(bounds.south, 0.0);
    assert_eq!(bounds.north, 1.0);

    let padded = bounds.pad(0.2);
    assert!((padded.south + 0.2).abs() < 1e-12);
    assert!((padded.east - 12.4).abs() < 1e-12);

    let inside = GeoPoint::new(1.1, 12.3);
    assert!(!bounds.contains(&inside));
    assert!(padded.contains(&inside));
    assert!(bounds.contains(&GeoPoint::new(1.0, 12.0)));
}

#[test]
fn test_event_bus_dispatches_by_kind() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let mut bus = EventBus::new();

    let log = Rc::clone(&seen);
    bus.on(EventKind::Jammed, move |event| log.borrow_mut().push(*event));
    let log = Rc::clone(&seen);
    bus.on(EventKind::Counts, move |event| log.borrow_mut().push(*event));

    assert_eq!(bus.listener_count(EventKind::Jammed), 1);
    assert_eq!(bus.listener_count(EventKind::Idle), 0);

    let counts = VehicleCounts {
        active: 1,
        blocked: 2,
        exited: 0,
        total: 3,
    };
    bus.counts(&counts);
    bus.idle();
    bus.jammed();

    assert_eq!(*seen.borrow(), vec![SimEvent::Counts(counts), SimEvent::Jammed]);
}

#[test]
fn test_late_listener_misses_earlier_events() {
    let idle_events = Rc::new(RefCell::new(0));
    let mut bus = EventBus::new();

    bus.idle();
    let counter = Rc::clone(&idle_events);
    bus.on(EventKind::Idle, move |_| *counter.borrow_mut() += 1);
    bus.idle();

    assert_eq!(*idle_events.borrow(), 1);
}

#[test]
fn test_event_log_records_in_order() {
    let mut log = EventLog::new();
    assert_eq!(log.last_counts(), None);

    log.counts(&VehicleCounts {
        total: 2,
        active: 2,
        ..Default::default()
    });
    log.jammed();
    log.counts(&VehicleCounts::default());

    assert_eq!(log.count(EventKind::Counts), 2);
    assert_eq!(log.count(EventKind::Jammed), 1);
    assert_eq!(log.last_counts(), Some(VehicleCounts::default()));

    log.clear();
    assert!(log.events.is_empty());
}
