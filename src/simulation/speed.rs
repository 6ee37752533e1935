//! Global speed multiplier modes
//!
//! Fixed modes scale every vehicle by a constant. Dynamic modes follow the
//! map zoom: the wider the visible area, the faster vehicles appear to move.

use super::viewport::Viewport;

/// A speed policy producing the global multiplier
#[derive(Debug, Clone, PartialEq)]
pub enum SpeedMode {
    Fixed {
        id: String,
        label: String,
        multiplier: f64,
    },
    Dynamic {
        id: String,
        label: String,
        base_multiplier: f64,
        min: f64,
        max: f64,
    },
}

impl SpeedMode {
    pub fn fixed(id: &str, label: &str, multiplier: f64) -> Self {
        Self::Fixed {
            id: id.to_string(),
            label: label.to_string(),
            multiplier,
        }
    }

    pub fn dynamic(id: &str, label: &str, base_multiplier: f64, min: f64, max: f64) -> Self {
        Self::Dynamic {
            id: id.to_string(),
            label: label.to_string(),
            base_multiplier,
            min: min.min(max),
            max: min.max(max),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Fixed { id, .. } | Self::Dynamic { id, .. } => id,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Fixed { label, .. } | Self::Dynamic { label, .. } => label,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::Dynamic { .. })
    }

    /// Multiplier for the given viewport metrics (radius and threshold in the
    /// same units). A zero threshold counts as a ratio of one.
    pub fn multiplier_for(&self, visible_radius: f64, threshold: f64) -> f64 {
        match self {
            Self::Fixed { multiplier, .. } => *multiplier,
            Self::Dynamic {
                base_multiplier,
                min,
                max,
                ..
            } => {
                let ratio = if threshold == 0.0 || !threshold.is_finite() {
                    1.0
                } else {
                    visible_radius / threshold
                };
                let multiplier = base_multiplier * ratio;
                if multiplier.is_nan() {
                    return *min;
                }
                multiplier.clamp(*min, *max)
            }
        }
    }
}

/// The built-in modes: Cruise, Rush and Zoom Sync
pub fn default_speed_modes() -> Vec<SpeedMode> {
    vec![
        SpeedMode::fixed("normal", "Cruise", 1.0),
        SpeedMode::fixed("fast", "Rush", 1.7),
        SpeedMode::dynamic("zoom-sync", "Zoom Sync", 1.15, 0.9, 3.2),
    ]
}

/// Holds the selectable modes and which one is in effect
#[derive(Debug, Clone)]
pub struct SpeedController {
    modes: Vec<SpeedMode>,
    current: usize,
}

impl Default for SpeedController {
    fn default() -> Self {
        Self::new(default_speed_modes())
    }
}

impl SpeedController {
    /// Creates a controller over `modes`; an empty list falls back to the defaults
    pub fn new(modes: Vec<SpeedMode>) -> Self {
        let modes = if modes.is_empty() {
            default_speed_modes()
        } else {
            modes
        };
        Self { modes, current: 0 }
    }

    pub fn modes(&self) -> &[SpeedMode] {
        &self.modes
    }

    pub fn current_mode(&self) -> &SpeedMode {
        &self.modes[self.current]
    }

    /// Makes `mode` current, adding it to the list when it isn't there yet
    pub fn set_mode(&mut self, mode: SpeedMode) {
        match self.modes.iter().position(|m| m.id() == mode.id()) {
            Some(index) => {
                self.modes[index] = mode;
                self.current = index;
            }
            None => {
                self.modes.push(mode);
                self.current = self.modes.len() - 1;
            }
        }
    }

    /// Selects a listed mode by ID. Returns false when no mode has that ID.
    pub fn select(&mut self, id: &str) -> bool {
        match self.modes.iter().position(|m| m.id() == id) {
            Some(index) => {
                self.current = index;
                true
            }
            None => false,
        }
    }

    /// Advances to the next mode, wrapping around
    pub fn cycle(&mut self) -> &SpeedMode {
        self.current = (self.current + 1) % self.modes.len();
        &self.modes[self.current]
    }

    pub fn is_dynamic(&self) -> bool {
        self.current_mode().is_dynamic()
    }

    /// The multiplier in effect right now, read fresh from the viewport
    pub fn current_multiplier(&self, viewport: &dyn Viewport) -> f64 {
        let mode = self.current_mode();
        if !mode.is_dynamic() {
            return mode.multiplier_for(0.0, 0.0);
        }
        mode.multiplier_for(viewport.visible_radius(), viewport.interaction_threshold())
    }
}
