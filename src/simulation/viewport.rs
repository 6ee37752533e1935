//! The visible map area as seen by the simulation
//!
//! The viewport itself belongs to the embedding application; the engine only
//! needs its bounds (to retire vehicles that leave view) and its radius (for
//! zoom-linked speed).

use super::types::{GeoPoint, METERS_TO_MILES};

/// Interaction threshold used when none is configured, in miles
pub const MAX_INTERACTION_RADIUS_MILES: f64 = 5.0;

/// A lat/lng rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl GeoBounds {
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south: south.min(north),
            west: west.min(east),
            north: south.max(north),
            east: west.max(east),
        }
    }

    /// Smallest bounds holding every point, or `None` for no points
    pub fn around(points: impl IntoIterator<Item = GeoPoint>) -> Option<Self> {
        points.into_iter().fold(None, |bounds: Option<GeoBounds>, p| {
            Some(match bounds {
                None => GeoBounds::new(p.lat, p.lng, p.lat, p.lng),
                Some(b) => GeoBounds::new(
                    b.south.min(p.lat),
                    b.west.min(p.lng),
                    b.north.max(p.lat),
                    b.east.max(p.lng),
                ),
            })
        })
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint::new((self.south + self.north) / 2.0, (self.west + self.east) / 2.0)
    }

    /// Inclusive containment test
    pub fn contains(&self, point: &GeoPoint) -> bool {
        point.lat >= self.south && point.lat <= self.north && point.lng >= self.west && point.lng <= self.east
    }

    /// Grows each side by `ratio` of the bounds' height or width
    pub fn pad(&self, ratio: f64) -> Self {
        let lat_pad = (self.north - self.south) * ratio;
        let lng_pad = (self.east - self.west) * ratio;
        Self {
            south: self.south - lat_pad,
            west: self.west - lng_pad,
            north: self.north + lat_pad,
            east: self.east + lng_pad,
        }
    }

    /// Distance from the centre to the northern edge, in miles
    pub fn radius_miles(&self) -> f64 {
        let center = self.center();
        let north = GeoPoint::new(self.north, center.lng);
        center.distance(&north) * METERS_TO_MILES
    }
}

/// Live viewport metrics supplied by the map view
pub trait Viewport {
    fn visible_bounds(&self) -> GeoBounds;

    /// Visible radius in miles
    fn visible_radius(&self) -> f64 {
        self.visible_bounds().radius_miles()
    }

    /// Radius in miles beyond which the simulation may not be started
    fn interaction_threshold(&self) -> f64 {
        MAX_INTERACTION_RADIUS_MILES
    }

    fn is_within_interaction_threshold(&self) -> bool {
        self.visible_radius() <= self.interaction_threshold()
    }
}

/// A viewport with fixed bounds, for headless runs and tests
#[derive(Debug, Clone, Copy)]
pub struct StaticViewport {
    pub bounds: GeoBounds,
    pub threshold_miles: f64,
}

impl StaticViewport {
    pub fn new(bounds: GeoBounds) -> Self {
        Self {
            bounds,
            threshold_miles: MAX_INTERACTION_RADIUS_MILES,
        }
    }

    pub fn with_threshold(mut self, threshold_miles: f64) -> Self {
        self.threshold_miles = threshold_miles;
        self
    }
}

impl Viewport for StaticViewport {
    fn visible_bounds(&self) -> GeoBounds {
        self.bounds
    }

    fn interaction_threshold(&self) -> f64 {
        self.threshold_miles
    }
}
