//! Road network graph built from raw road geometry
//!
//! Standalone implementation that doesn't depend on any map library.
//! Connectivity comes only from endpoint quantization: segments whose
//! endpoints share a [`NodeKey`] meet at that junction.

use log::{debug, info, warn};
use ordered_float::OrderedFloat;
use petgraph::algo::connected_components;
use petgraph::graph::{NodeIndex, UnGraph};
use std::collections::HashMap;

use super::blocks::{Block, BlockRegistry};
use super::geometry::{project_onto_polyline, LocalProjection};
use super::node_key::{NodeKey, DEFAULT_NODE_KEY_PRECISION};
use super::segment::{RawRoad, RoadSegment};
use super::types::{BlockId, GeoPoint, RoadClass, SegmentId, TravelDirection};

/// A segment reachable from a junction, and the direction a vehicle
/// travels along it after entering from that junction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdjacencyEntry {
    pub segment_id: SegmentId,
    pub direction: TravelDirection,
}

/// The closest point on the network to a queried location
#[derive(Debug, Clone, Copy)]
pub struct NearestSegment {
    pub segment_id: SegmentId,
    /// Edge of the polyline holding the closest point
    pub segment_index: usize,
    /// Fraction along that edge
    pub t_on_segment: f64,
    /// Distance along the whole segment
    pub distance_along: f64,
    /// Perpendicular distance from the query point, in metres
    pub distance: f64,
}

/// Counts reported after ingesting raw roads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub accepted: usize,
    pub rejected: usize,
    pub unclassified: usize,
}

/// Segment store, junction index and block registry
#[derive(Debug)]
pub struct RoadGraph {
    /// Validated segments by ID
    segments: HashMap<SegmentId, RoadSegment>,

    /// Segment IDs in ingest order
    order: Vec<SegmentId>,

    /// Junction adjacency, rebuilt on every ingest
    adjacency: HashMap<NodeKey, Vec<AdjacencyEntry>>,

    /// Junction graph used for topology statistics
    topology: UnGraph<NodeKey, SegmentId>,

    /// Maps junction keys to their node indices in the topology graph
    key_to_node: HashMap<NodeKey, NodeIndex>,

    blocks: BlockRegistry,

    precision: u32,
}

impl Default for RoadGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl RoadGraph {
    pub fn new() -> Self {
        Self::with_precision(DEFAULT_NODE_KEY_PRECISION)
    }

    /// Creates a graph that quantizes endpoints to `precision` decimal places
    pub fn with_precision(precision: u32) -> Self {
        Self {
            segments: HashMap::new(),
            order: Vec::new(),
            adjacency: HashMap::new(),
            topology: UnGraph::default(),
            key_to_node: HashMap::new(),
            blocks: BlockRegistry::new(),
            precision,
        }
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    /// Replaces the segment set with `roads` and rebuilds adjacency.
    ///
    /// Pieces with an unknown road class or degenerate geometry are skipped.
    /// Blocks on segments that are no longer present are dropped.
    pub fn ingest(&mut self, roads: &[RawRoad]) -> IngestReport {
        let mut report = IngestReport::default();
        let mut segments = Vec::with_capacity(roads.len());

        for road in roads {
            let Some(class) = RoadClass::from_tag(&road.class) else {
                debug!("Skipping {} with unsupported class '{}'", road.id, road.class);
                report.unclassified += 1;
                continue;
            };

            match RoadSegment::new(road.id, class, &road.points, self.precision) {
                Ok(segment) => segments.push(segment),
                Err(err) => {
                    warn!("Rejected road geometry: {err}");
                    report.rejected += 1;
                }
            }
        }

        self.segments.clear();
        self.order.clear();
        for segment in segments {
            if self.segments.contains_key(&segment.id) {
                warn!("Duplicate {} in road data; keeping the latest", segment.id);
                self.order.retain(|id| *id != segment.id);
            }
            self.order.push(segment.id);
            self.segments.insert(segment.id, segment);
        }
        report.accepted = self.segments.len();

        let segments = &self.segments;
        self.blocks.retain_segments(|id| segments.contains_key(&id));
        self.rebuild_adjacency();

        info!(
            "Ingested {} segments ({} rejected, {} unclassified) across {} junctions",
            report.accepted,
            report.rejected,
            report.unclassified,
            self.junction_count()
        );
        report
    }

    fn rebuild_adjacency(&mut self) {
        self.adjacency.clear();
        self.topology = UnGraph::default();
        self.key_to_node.clear();

        for id in &self.order {
            let segment = &self.segments[id];
            let start_key = segment.start_key();
            let end_key = segment.end_key();

            self.adjacency.entry(start_key).or_default().push(AdjacencyEntry {
                segment_id: segment.id,
                direction: TravelDirection::Forward,
            });
            self.adjacency.entry(end_key).or_default().push(AdjacencyEntry {
                segment_id: segment.id,
                direction: TravelDirection::Backward,
            });

            let start_node = Self::topology_node(&mut self.topology, &mut self.key_to_node, start_key);
            let end_node = Self::topology_node(&mut self.topology, &mut self.key_to_node, end_key);
            self.topology.add_edge(start_node, end_node, segment.id);
        }
    }

    fn topology_node(
        topology: &mut UnGraph<NodeKey, SegmentId>,
        key_to_node: &mut HashMap<NodeKey, NodeIndex>,
        key: NodeKey,
    ) -> NodeIndex {
        *key_to_node
            .entry(key)
            .or_insert_with(|| topology.add_node(key))
    }

    /// Gets a segment by ID
    pub fn get_segment(&self, segment_id: SegmentId) -> Option<&RoadSegment> {
        self.segments.get(&segment_id)
    }

    /// All segments in ingest order
    pub fn segments(&self) -> impl Iterator<Item = &RoadSegment> + '_ {
        self.order.iter().filter_map(|id| self.segments.get(id))
    }

    pub fn has_segments(&self) -> bool {
        !self.segments.is_empty()
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn junction_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Number of disconnected pieces of the road network
    pub fn component_count(&self) -> usize {
        connected_components(&self.topology)
    }

    /// Gets every segment touching `node_key` except `exclude`
    pub fn get_connected_segments(&self, node_key: NodeKey, exclude: SegmentId) -> Vec<AdjacencyEntry> {
        self.adjacency
            .get(&node_key)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|entry| entry.segment_id != exclude)
                    .copied()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Places a block on a segment. `distance` defaults to the full segment.
    /// Returns `None` when the segment is unknown.
    pub fn add_block(&mut self, segment_id: SegmentId, distance: Option<f64>) -> Option<BlockId> {
        let segment = self.segments.get(&segment_id)?;
        let distance = distance.map(|d| segment.clamp_distance(d));
        let block_id = self.blocks.add(segment_id, distance);
        info!("Placed {} on {}", block_id, segment_id);
        Some(block_id)
    }

    pub fn is_blocked(&self, segment_id: SegmentId) -> bool {
        self.blocks.is_blocked(segment_id)
    }

    /// Blocks on a segment in placement order
    pub fn blocks_on(&self, segment_id: SegmentId) -> impl Iterator<Item = &Block> + '_ {
        self.blocks.on_segment(segment_id)
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn clear_blocks(&mut self) {
        if !self.blocks.is_empty() {
            debug!("Clearing {} blocks", self.blocks.len());
        }
        self.blocks.clear();
    }

    /// Removes every segment, junction and block
    pub fn clear(&mut self) {
        self.segments.clear();
        self.order.clear();
        self.clear_blocks();
        self.rebuild_adjacency();
    }

    /// Finds the closest point on any segment to `point`
    pub fn nearest_segment(&self, point: &GeoPoint) -> Option<NearestSegment> {
        let projection = LocalProjection::around(point);
        let target = projection.project(point);

        self.segments()
            .filter_map(|segment| {
                let polyline: Vec<_> = segment.points().iter().map(|p| projection.project(p)).collect();
                let hit = project_onto_polyline(&target, &polyline)?;
                Some(NearestSegment {
                    segment_id: segment.id,
                    segment_index: hit.segment_index,
                    t_on_segment: hit.t_on_segment,
                    distance_along: segment.distance_at(hit.segment_index, hit.t_on_segment),
                    distance: hit.distance,
                })
            })
            .min_by_key(|nearest| OrderedFloat(nearest.distance))
    }

    /// Like [`nearest_segment`](Self::nearest_segment), but only within
    /// `max_distance` metres of `point`
    pub fn nearest_segment_within(&self, point: &GeoPoint, max_distance: f64) -> Option<NearestSegment> {
        self.nearest_segment(point)
            .filter(|nearest| nearest.distance <= max_distance)
    }
}
