//! Planar geometry helpers for picking points on road polylines
//!
//! Geographic points are projected onto a local equirectangular plane
//! (metres, centred on a reference latitude) before projecting, which keeps
//! the closed-form perpendicular projection exact for linearly interpolated
//! geometry.

use super::types::{GeoPoint, EARTH_RADIUS_M};

/// A point on the local projection plane, in metres
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlanePoint {
    pub x: f64,
    pub y: f64,
}

impl PlanePoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &PlanePoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Equirectangular projection around a reference latitude
#[derive(Debug, Clone, Copy)]
pub struct LocalProjection {
    cos_lat: f64,
}

impl LocalProjection {
    pub fn around(reference: &GeoPoint) -> Self {
        Self {
            cos_lat: reference.lat.to_radians().cos(),
        }
    }

    pub fn project(&self, point: &GeoPoint) -> PlanePoint {
        PlanePoint {
            x: point.lng.to_radians() * self.cos_lat * EARTH_RADIUS_M,
            y: point.lat.to_radians() * EARTH_RADIUS_M,
        }
    }
}

/// Closest point on a straight edge
#[derive(Debug, Clone, Copy)]
pub struct EdgeProjection {
    pub distance: f64,
    /// Fraction along the edge, clamped to [0, 1]
    pub t: f64,
    pub closest: PlanePoint,
}

/// Closest point on a polyline
#[derive(Debug, Clone, Copy)]
pub struct PolylineProjection {
    pub distance: f64,
    /// Index of the edge starting at point `segment_index`
    pub segment_index: usize,
    pub t_on_segment: f64,
}

/// Perpendicular projection of `point` onto edge `a`-`b`, clamped to its ends
pub fn project_onto_edge(point: &PlanePoint, a: &PlanePoint, b: &PlanePoint) -> EdgeProjection {
    let ab_x = b.x - a.x;
    let ab_y = b.y - a.y;
    let ab_len_sq = ab_x * ab_x + ab_y * ab_y;

    let t = if ab_len_sq > 0.0 {
        (((point.x - a.x) * ab_x + (point.y - a.y) * ab_y) / ab_len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let closest = PlanePoint::new(a.x + ab_x * t, a.y + ab_y * t);
    EdgeProjection {
        distance: point.distance(&closest),
        t,
        closest,
    }
}

/// Minimum-distance projection of `point` over every edge of `polyline`.
/// Returns `None` for polylines with fewer than two points.
pub fn project_onto_polyline(point: &PlanePoint, polyline: &[PlanePoint]) -> Option<PolylineProjection> {
    let mut best: Option<PolylineProjection> = None;

    for (index, edge) in polyline.windows(2).enumerate() {
        let projection = project_onto_edge(point, &edge[0], &edge[1]);
        if best.map_or(true, |b| projection.distance < b.distance) {
            best = Some(PolylineProjection {
                distance: projection.distance,
                segment_index: index,
                t_on_segment: projection.t,
            });
        }
    }

    best
}
