//! Road graph validation tests
//!
//! Covers segment measurement, junction quantization, adjacency, blocks and
//! nearest-segment picking.

use roadblock_sim::simulation::{
    node_key, GeoPoint, RawRoad, RoadClass, RoadGraph, RoadSegment, SegmentId, TravelDirection,
    DEFAULT_NODE_KEY_PRECISION, MAX_NODE_KEY_PRECISION,
};

const LAT: f64 = 37.0;

fn east_west(id: u64, from_lng: f64, to_lng: f64) -> RawRoad {
    RawRoad::new(id, "residential", vec![GeoPoint::new(LAT, from_lng), GeoPoint::new(LAT, to_lng)])
}

fn bent_segment() -> RoadSegment {
    let points = [
        GeoPoint::new(37.0, -122.0),
        GeoPoint::new(37.0005, -121.9995),
        GeoPoint::new(37.0005, -121.998),
        GeoPoint::new(37.001, -121.998),
    ];
    RoadSegment::new(SegmentId(1), RoadClass::Residential, &points, DEFAULT_NODE_KEY_PRECISION)
        .expect("valid geometry")
}

#[test]
fn test_cumulative_lengths_are_monotonic() {
    let segment = bent_segment();
    let lengths = segment.cumulative_lengths();

    assert_eq!(lengths.len(), segment.points().len());
    assert_eq!(lengths[0], 0.0);
    for pair in lengths.windows(2) {
        assert!(pair[1] >= pair[0], "lengths decreased: {:?}", lengths);
    }
    assert_eq!(*lengths.last().unwrap(), segment.total_length());
    assert!(segment.total_length() > 0.0);
}

#[test]
fn test_interpolation_round_trips_distance() {
    let segment = bent_segment();
    let lengths = segment.cumulative_lengths().to_vec();

    for step in 0..=20 {
        let distance = segment.total_length() * step as f64 / 20.0;
        let point = segment.position_at(distance);

        let edge = lengths
            .windows(2)
            .position(|pair| distance <= pair[1])
            .unwrap_or(lengths.len() - 2);
        let measured = segment.measure_to(edge, &point);

        assert!(
            (measured - distance).abs() < 1e-2,
            "distance {} re-measured as {}",
            distance,
            measured
        );
    }
}

#[test]
fn test_position_clamps_outside_segment() {
    let segment = bent_segment();
    let points = segment.points();

    assert_eq!(segment.position_at(-50.0), points[0]);
    assert_eq!(segment.position_at(f64::NAN), points[0]);
    assert!(segment.position_at(1e9).distance(&points[points.len() - 1]) < 1e-6);
}

#[test]
fn test_heading_follows_travel_direction() {
    let road = east_west(1, -122.0, -121.999);
    let segment = RoadSegment::new(road.id, RoadClass::Residential, &road.points, 5).unwrap();
    let middle = segment.total_length() / 2.0;

    let forward = segment.heading_at(middle, TravelDirection::Forward, 1.0);
    let backward = segment.heading_at(middle, TravelDirection::Backward, 1.0);
    assert!((forward - 90.0).abs() < 0.5, "forward heading {}", forward);
    assert!((backward - 270.0).abs() < 0.5, "backward heading {}", backward);

    // At the far end the lookahead runs out and the heading is taken from behind
    let at_end = segment.heading_at(segment.total_length(), TravelDirection::Forward, 1.0);
    assert!((at_end - 90.0).abs() < 0.5, "end heading {}", at_end);
}

#[test]
fn test_degenerate_geometry_is_rejected() {
    let point = GeoPoint::new(LAT, -122.0);
    let precision = DEFAULT_NODE_KEY_PRECISION;

    assert!(RoadSegment::new(SegmentId(1), RoadClass::Primary, &[point], precision).is_err());
    assert!(RoadSegment::new(SegmentId(2), RoadClass::Primary, &[point, point], precision).is_err());
    assert!(RoadSegment::new(
        SegmentId(3),
        RoadClass::Primary,
        &[point, GeoPoint::new(f64::NAN, -121.999)],
        precision
    )
    .is_err());

    // Non-finite points are dropped, the rest still makes a segment
    let segment = RoadSegment::new(
        SegmentId(4),
        RoadClass::Primary,
        &[point, GeoPoint::new(f64::INFINITY, 0.0), point, GeoPoint::new(LAT, -121.999)],
        precision,
    )
    .unwrap();
    assert_eq!(segment.points().len(), 2);
}

#[test]
fn test_node_key_precision_merges_nearby_endpoints() {
    let a = GeoPoint::new(37.000001, -121.999);
    let b = GeoPoint::new(37.000004, -121.999002);
    let c = GeoPoint::new(37.00002, -121.999);

    assert_eq!(node_key(&a, 5), node_key(&b, 5));
    assert_ne!(node_key(&a, 5), node_key(&c, 5));
    assert_ne!(node_key(&a, 6), node_key(&b, 6));

    // Coarser keys merge more
    assert_eq!(node_key(&a, 3), node_key(&c, 3));
}

#[test]
fn test_node_key_precision_is_clamped() {
    let point = GeoPoint::new(12.5, -45.25);

    let key = node_key(&point, 40);
    assert_eq!(key.precision(), MAX_NODE_KEY_PRECISION);

    let coarse = node_key(&point, 0);
    assert_eq!(coarse.center(), GeoPoint::new(13.0, -45.0));
    assert_eq!(coarse.to_string(), "13|-45");
    assert_eq!(node_key(&point, 2).to_string(), "12.50|-45.25");
}

#[test]
fn test_ingest_builds_adjacency() {
    let mut graph = RoadGraph::new();
    let report = graph.ingest(&[east_west(1, -122.0, -121.999), east_west(2, -121.999, -121.998)]);

    assert_eq!(report.accepted, 2);
    assert_eq!(graph.segment_count(), 2);
    assert_eq!(graph.junction_count(), 3);
    assert_eq!(graph.component_count(), 1);

    let shared = graph.get_segment(SegmentId(1)).unwrap().end_key();
    let from_first = graph.get_connected_segments(shared, SegmentId(1));
    assert_eq!(from_first.len(), 1);
    assert_eq!(from_first[0].segment_id, SegmentId(2));
    assert_eq!(from_first[0].direction, TravelDirection::Forward);

    let from_second = graph.get_connected_segments(shared, SegmentId(2));
    assert_eq!(from_second.len(), 1);
    assert_eq!(from_second[0].segment_id, SegmentId(1));
    assert_eq!(from_second[0].direction, TravelDirection::Backward);

    let dead_end = graph.get_segment(SegmentId(1)).unwrap().start_key();
    assert!(graph.get_connected_segments(dead_end, SegmentId(1)).is_empty());
}

#[test]
fn test_ingest_merges_endpoints_within_precision() {
    let mut graph = RoadGraph::new();
    graph.ingest(&[
        east_west(1, -122.0, -121.999),
        RawRoad::new(
            2,
            "primary",
            vec![GeoPoint::new(37.000001, -121.999001), GeoPoint::new(37.001, -121.999)],
        ),
        east_west(3, -121.9, -121.899),
    ]);

    assert_eq!(graph.junction_count(), 5);
    assert_eq!(graph.component_count(), 2);

    let shared = graph.get_segment(SegmentId(1)).unwrap().end_key();
    assert_eq!(shared, graph.get_segment(SegmentId(2)).unwrap().start_key());
}

#[test]
fn test_ingest_skips_bad_pieces() {
    let mut graph = RoadGraph::new();
    let point = GeoPoint::new(LAT, -122.0);
    let report = graph.ingest(&[
        east_west(1, -122.0, -121.999),
        RawRoad::new(2, "residential", vec![point]),
        RawRoad::new(3, "residential", vec![point, point]),
        RawRoad::new(4, "footway", vec![point, GeoPoint::new(LAT, -121.999)]),
    ]);

    assert_eq!(report.accepted, 1);
    assert_eq!(report.rejected, 2);
    assert_eq!(report.unclassified, 1);
    assert!(graph.get_segment(SegmentId(1)).is_some());
    assert!(graph.get_segment(SegmentId(4)).is_none());
}

#[test]
fn test_loop_segment_is_accepted() {
    let mut graph = RoadGraph::new();
    let start = GeoPoint::new(LAT, -122.0);
    graph.ingest(&[RawRoad::new(
        1,
        "residential",
        vec![start, GeoPoint::new(37.001, -122.0), GeoPoint::new(37.001, -121.999), start],
    )]);

    let segment = graph.get_segment(SegmentId(1)).unwrap();
    assert_eq!(segment.start_key(), segment.end_key());
    assert_eq!(graph.junction_count(), 1);
}

#[test]
fn test_reingest_replaces_segments_and_drops_stale_blocks() {
    let mut graph = RoadGraph::new();
    graph.ingest(&[east_west(1, -122.0, -121.999), east_west(2, -121.999, -121.998)]);
    graph.add_block(SegmentId(1), None);
    graph.add_block(SegmentId(2), Some(10.0));

    graph.ingest(&[east_west(2, -121.999, -121.998), east_west(3, -121.998, -121.997)]);

    assert_eq!(graph.segment_count(), 2);
    assert!(graph.get_segment(SegmentId(1)).is_none());
    assert!(!graph.is_blocked(SegmentId(1)));
    assert!(graph.is_blocked(SegmentId(2)));
    assert_eq!(graph.block_count(), 1);
}

#[test]
fn test_blocks_add_and_clear() {
    let mut graph = RoadGraph::new();
    graph.ingest(&[east_west(1, -122.0, -121.999)]);
    let total = graph.get_segment(SegmentId(1)).unwrap().total_length();

    assert!(graph.add_block(SegmentId(99), None).is_none());
    assert!(!graph.is_blocked(SegmentId(1)));

    let first = graph.add_block(SegmentId(1), Some(1e9)).unwrap();
    let second = graph.add_block(SegmentId(1), Some(-5.0)).unwrap();
    assert_ne!(first, second);
    assert!(graph.is_blocked(SegmentId(1)));
    assert_eq!(graph.block_count(), 2);

    let distances: Vec<_> = graph.blocks_on(SegmentId(1)).map(|b| b.distance).collect();
    assert_eq!(distances, vec![Some(total), Some(0.0)]);

    graph.clear_blocks();
    graph.clear_blocks();
    assert_eq!(graph.block_count(), 0);
    assert!(!graph.is_blocked(SegmentId(1)));
}

#[test]
fn test_nearest_segment_on_geometry() {
    let mut graph = RoadGraph::new();
    graph.ingest(&[
        east_west(1, -122.0, -121.999),
        RawRoad::new(2, "primary", vec![GeoPoint::new(37.0, -121.999), GeoPoint::new(37.001, -121.999)]),
    ]);

    let segment = graph.get_segment(SegmentId(1)).unwrap();
    let along = segment.total_length() * 0.3;
    let point = segment.position_at(along);

    let nearest = graph.nearest_segment(&point).unwrap();
    assert_eq!(nearest.segment_id, SegmentId(1));
    assert!(nearest.distance < 1e-3, "distance {}", nearest.distance);
    assert!((nearest.distance_along - along).abs() < 1e-2);
}

#[test]
fn test_nearest_segment_within_radius() {
    let mut graph = RoadGraph::new();
    assert!(graph.nearest_segment(&GeoPoint::new(LAT, -122.0)).is_none());

    graph.ingest(&[east_west(1, -122.0, -121.999)]);

    // Roughly 111 m north of the road
    let off_road = GeoPoint::new(LAT + 0.001, -121.9995);
    let nearest = graph.nearest_segment(&off_road).unwrap();
    assert!((nearest.distance - 111.2).abs() < 1.0, "distance {}", nearest.distance);

    assert!(graph.nearest_segment_within(&off_road, 25.0).is_none());
    assert!(graph.nearest_segment_within(&off_road, 500.0).is_some());
}

#[test]
fn test_segments_keep_ingest_order() {
    let mut graph = RoadGraph::new();
    graph.ingest(&[
        east_west(7, -122.0, -121.999),
        east_west(3, -121.999, -121.998),
        east_west(5, -121.998, -121.997),
    ]);

    let ids: Vec<_> = graph.segments().map(|s| s.id).collect();
    assert_eq!(ids, vec![SegmentId(7), SegmentId(3), SegmentId(5)]);

    graph.clear();
    assert!(!graph.has_segments());
    assert_eq!(graph.junction_count(), 0);
}
