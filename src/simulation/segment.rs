//! Road segments: measured polylines with derived terminal keys
//!
//! Standalone implementation that doesn't depend on any map library.

use anyhow::{bail, Result};

use super::node_key::{node_key, NodeKey};
use super::types::{GeoPoint, RoadClass, SegmentId, TravelDirection};

/// A road piece as delivered by the road-data provider, before validation
#[derive(Debug, Clone)]
pub struct RawRoad {
    pub id: SegmentId,
    pub points: Vec<GeoPoint>,
    /// OSM-style `highway` tag, e.g. `"residential"`
    pub class: String,
}

impl RawRoad {
    pub fn new(id: u64, class: &str, points: Vec<GeoPoint>) -> Self {
        Self {
            id: SegmentId(id),
            points,
            class: class.to_string(),
        }
    }
}

/// A validated road segment
#[derive(Debug, Clone)]
pub struct RoadSegment {
    pub id: SegmentId,
    pub class: RoadClass,
    points: Vec<GeoPoint>,
    cumulative_lengths: Vec<f64>,
    start_key: NodeKey,
    end_key: NodeKey,
}

impl RoadSegment {
    /// Builds a segment from raw geometry.
    ///
    /// Non-finite points and consecutive duplicates are dropped first; the
    /// result must keep at least two points and a positive length.
    pub fn new(id: SegmentId, class: RoadClass, points: &[GeoPoint], precision: u32) -> Result<Self> {
        let mut filtered: Vec<GeoPoint> = Vec::with_capacity(points.len());
        for point in points.iter().filter(|p| p.is_finite()) {
            if filtered.last() != Some(point) {
                filtered.push(*point);
            }
        }

        if filtered.len() < 2 {
            bail!("{} has fewer than two usable points", id);
        }

        let mut cumulative_lengths = Vec::with_capacity(filtered.len());
        cumulative_lengths.push(0.0);
        for pair in filtered.windows(2) {
            let previous = cumulative_lengths[cumulative_lengths.len() - 1];
            cumulative_lengths.push(previous + pair[0].distance(&pair[1]));
        }

        let total = cumulative_lengths[cumulative_lengths.len() - 1];
        if !(total > 0.0) {
            bail!("{} has zero length", id);
        }

        let start_key = node_key(&filtered[0], precision);
        let end_key = node_key(&filtered[filtered.len() - 1], precision);

        Ok(Self {
            id,
            class,
            points: filtered,
            cumulative_lengths,
            start_key,
            end_key,
        })
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    pub fn cumulative_lengths(&self) -> &[f64] {
        &self.cumulative_lengths
    }

    pub fn total_length(&self) -> f64 {
        self.cumulative_lengths[self.cumulative_lengths.len() - 1]
    }

    pub fn start_key(&self) -> NodeKey {
        self.start_key
    }

    pub fn end_key(&self) -> NodeKey {
        self.end_key
    }

    /// The junction a vehicle reaches when travelling in `direction`
    pub fn terminal_key(&self, direction: TravelDirection) -> NodeKey {
        match direction {
            TravelDirection::Forward => self.end_key,
            TravelDirection::Backward => self.start_key,
        }
    }

    /// Distance at which a vehicle travelling in `direction` reaches its terminal
    pub fn terminal_distance(&self, direction: TravelDirection) -> f64 {
        match direction {
            TravelDirection::Forward => self.total_length(),
            TravelDirection::Backward => 0.0,
        }
    }

    pub fn clamp_distance(&self, distance: f64) -> f64 {
        if distance.is_nan() {
            return 0.0;
        }
        distance.clamp(0.0, self.total_length())
    }

    /// Distance along the segment of fraction `t` along edge `segment_index`
    pub fn distance_at(&self, segment_index: usize, t: f64) -> f64 {
        let index = segment_index.min(self.cumulative_lengths.len() - 2);
        let start = self.cumulative_lengths[index];
        let edge_length = self.cumulative_lengths[index + 1] - start;
        start + edge_length * t.clamp(0.0, 1.0)
    }

    /// Interpolated point at `distance` along the segment
    pub fn position_at(&self, distance: f64) -> GeoPoint {
        let target = self.clamp_distance(distance);
        let cumulative = &self.cumulative_lengths;

        let mut index = 1;
        while index < cumulative.len() && cumulative[index] < target {
            index += 1;
        }
        let index = index.clamp(1, cumulative.len() - 1);

        let start = cumulative[index - 1];
        let edge_length = cumulative[index] - start;
        let ratio = if edge_length == 0.0 {
            0.0
        } else {
            (target - start) / edge_length
        };
        self.points[index - 1].lerp(&self.points[index], ratio)
    }

    /// Measures the distance along the segment to `point`, which is assumed
    /// to lie on the edge starting at `segment_index`.
    pub fn measure_to(&self, segment_index: usize, point: &GeoPoint) -> f64 {
        let index = segment_index.min(self.points.len() - 2);
        self.cumulative_lengths[index] + self.points[index].distance(point)
    }

    /// Facing of a vehicle at `distance` travelling in `direction`, as a
    /// compass bearing in degrees. Samples `lookahead` metres further on,
    /// or behind when the lookahead runs off the end of the segment.
    pub fn heading_at(&self, distance: f64, direction: TravelDirection, lookahead: f64) -> f64 {
        let here = self.clamp_distance(distance);
        let ahead = self.clamp_distance(here + direction.sign() * lookahead);

        if (ahead - here).abs() > f64::EPSILON {
            self.position_at(here).bearing_to(&self.position_at(ahead))
        } else {
            let behind = self.clamp_distance(here - direction.sign() * lookahead);
            self.position_at(behind).bearing_to(&self.position_at(here))
        }
    }
}
