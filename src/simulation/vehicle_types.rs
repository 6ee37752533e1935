//! Vehicle type descriptors and the round-robin type cursor

use super::types::{RoadClass, MPH_TO_MPS};

/// Average speed assumed when a type does not declare one, in mph
pub const DEFAULT_AVG_SPEED_MPH: f64 = 25.0;

/// Maximum speed assumed when a type declares neither max nor average, in mph
pub const DEFAULT_MAX_SPEED_MPH: f64 = 35.0;

/// Visual family a renderer should draw a vehicle as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VehicleShape {
    Sedan,
    Van,
    Truck,
    Semi,
    Default,
}

impl VehicleShape {
    /// Resolves a shape name or one of its aliases, case-insensitively
    pub fn resolve(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "car" | "sedan" | "coupe" => Self::Sedan,
            "van" | "lorry" => Self::Van,
            "truck" | "rigid" => Self::Truck,
            "semi" | "semi_truck" => Self::Semi,
            _ => Self::Default,
        }
    }
}

/// A kind of vehicle that can be spawned
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleType {
    pub name: String,
    /// Display colour as a CSS hex string
    pub color: String,
    pub avg_speed_mps: f64,
    pub max_speed_mps: f64,
    pub shape: VehicleShape,
    /// Restricted to arterial road classes
    pub arterial_only: bool,
}

impl VehicleType {
    /// Builds a type from mph speeds, filling gaps the way the vehicle
    /// configuration does: average defaults to 25 mph, max to the average
    /// or 35 mph.
    pub fn from_mph(name: &str, color: &str, avg_mph: Option<f64>, max_mph: Option<f64>) -> Self {
        let avg = avg_mph.unwrap_or(DEFAULT_AVG_SPEED_MPH);
        let max = max_mph.or(avg_mph).unwrap_or(DEFAULT_MAX_SPEED_MPH);
        Self {
            name: name.to_string(),
            color: color.to_string(),
            avg_speed_mps: avg * MPH_TO_MPS,
            max_speed_mps: max * MPH_TO_MPS,
            shape: VehicleShape::resolve(name),
            arterial_only: false,
        }
    }

    pub fn with_shape(mut self, shape: VehicleShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn arterial_only(mut self) -> Self {
        self.arterial_only = true;
        self
    }

    /// Whether vehicles of this type may enter a road of `class`
    pub fn allows(&self, class: RoadClass) -> bool {
        !self.arterial_only || class.is_arterial()
    }

    /// Single-type catalog used when no configuration is available
    pub fn fallback_car() -> Self {
        Self::from_mph("car", "#3A7AFE", Some(30.0), Some(65.0))
    }
}

/// The standard fleet: cars, vans, trucks and arterial-only semis
pub fn default_fleet() -> Vec<VehicleType> {
    vec![
        VehicleType::fallback_car(),
        VehicleType::from_mph("van", "#F59E0B", Some(27.0), Some(60.0)),
        VehicleType::from_mph("truck", "#10B981", Some(24.0), Some(55.0)),
        VehicleType::from_mph("semi", "#EF4444", Some(22.0), Some(55.0)).arterial_only(),
    ]
}

/// Fair round-robin position over a type list.
///
/// Every type is handed out once per full pass; the pass restarts when the
/// cursor runs past the end of the list, including when the list shrinks.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeCursor {
    index: usize,
}

impl TypeCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the next type among `len` types, or `None` when there are none
    pub fn next_index(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        if self.index >= len {
            self.index = 0;
        }
        let index = self.index;
        self.index += 1;
        Some(index)
    }

    pub fn reset(&mut self) {
        self.index = 0;
    }
}
