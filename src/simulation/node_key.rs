//! Junction identity by coordinate quantization
//!
//! Road pieces arrive without topology. Two pieces meet at a junction when
//! their endpoints round to the same key, so the rounding precision decides
//! which endpoints are merged.

use std::fmt;

use super::types::GeoPoint;

/// Default number of decimal places kept when quantizing coordinates.
/// Five places is roughly 1.1 m of latitude.
pub const DEFAULT_NODE_KEY_PRECISION: u32 = 5;

/// Largest precision that still fits a quantized longitude in an `i64`
pub const MAX_NODE_KEY_PRECISION: u32 = 15;

/// Quantized coordinates identifying a junction
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeKey {
    lat: i64,
    lng: i64,
    precision: u32,
}

impl NodeKey {
    pub fn precision(&self) -> u32 {
        self.precision
    }

    /// The junction centre this key stands for
    pub fn center(&self) -> GeoPoint {
        let scale = 10f64.powi(self.precision as i32);
        GeoPoint::new(self.lat as f64 / scale, self.lng as f64 / scale)
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let center = self.center();
        let places = self.precision as usize;
        write!(f, "{:.*}|{:.*}", places, center.lat, places, center.lng)
    }
}

/// Rounds a point to `precision` decimal places. Values above
/// [`MAX_NODE_KEY_PRECISION`] are clamped.
pub fn node_key(point: &GeoPoint, precision: u32) -> NodeKey {
    let precision = precision.min(MAX_NODE_KEY_PRECISION);
    let scale = 10f64.powi(precision as i32);
    NodeKey {
        lat: quantize(point.lat, scale),
        lng: quantize(point.lng, scale),
        precision,
    }
}

fn quantize(value: f64, scale: f64) -> i64 {
    (value * scale).round() as i64
}
