//! Construction-time settings for a [`Transform`](crate::core::transform::Transform).
//!
//! Settings can be built in code or loaded from JSON so an embedding application
//! can keep its camera limits next to the rest of its configuration.

use crate::core::constants::{MAX_ZOOM, MIN_ZOOM, PITCH_MAX, PITCH_MIN};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// How the viewport is kept inside the world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConstrainMode {
    /// No clamping at all
    None,
    /// Never show off-world area above or below the map
    #[default]
    HeightOnly,
    /// Never show off-world area on any side
    WidthAndHeight,
    /// Keep the whole screen inside the configured `LatLngBounds`
    Screen,
}

/// Y axis convention of the produced matrices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ViewportMode {
    #[default]
    Default,
    FlippedY,
}

/// Which screen edge north points to when the bearing is zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NorthOrientation {
    #[default]
    Upwards,
    Rightwards,
    Downwards,
    Leftwards,
}

impl NorthOrientation {
    /// Screen rotation in radians
    pub fn angle(&self) -> f64 {
        match self {
            Self::Upwards => 0.0,
            Self::Rightwards => PI / 2.0,
            Self::Downwards => PI,
            Self::Leftwards => -PI / 2.0,
        }
    }

    /// True when north points sideways, swapping the roles of width and height
    pub fn is_rotated(&self) -> bool {
        matches!(self, Self::Rightwards | Self::Leftwards)
    }
}

/// Partial update of the axonometric projection settings
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectionMode {
    pub axonometric: Option<bool>,
    pub x_skew: Option<f64>,
    pub y_skew: Option<f64>,
}

impl ProjectionMode {
    pub fn with_axonometric(mut self, axonometric: bool) -> Self {
        self.axonometric = Some(axonometric);
        self
    }

    pub fn with_x_skew(mut self, x_skew: f64) -> Self {
        self.x_skew = Some(x_skew);
        self
    }

    pub fn with_y_skew(mut self, y_skew: f64) -> Self {
        self.y_skew = Some(y_skew);
        self
    }
}

/// Settings applied when a transform is created. Zoom limits are zoom levels,
/// pitch limits are degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformOptions {
    pub constrain_mode: ConstrainMode,
    pub viewport_mode: ViewportMode,
    pub north_orientation: NorthOrientation,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub min_pitch: f64,
    pub max_pitch: f64,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            constrain_mode: ConstrainMode::HeightOnly,
            viewport_mode: ViewportMode::Default,
            north_orientation: NorthOrientation::Upwards,
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
            min_pitch: PITCH_MIN.to_degrees(),
            max_pitch: PITCH_MAX.to_degrees(),
        }
    }
}

impl TransformOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from a JSON document; missing fields keep their defaults
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_constrain_mode(mut self, mode: ConstrainMode) -> Self {
        self.constrain_mode = mode;
        self
    }

    pub fn with_viewport_mode(mut self, mode: ViewportMode) -> Self {
        self.viewport_mode = mode;
        self
    }

    pub fn with_north_orientation(mut self, orientation: NorthOrientation) -> Self {
        self.north_orientation = orientation;
        self
    }

    pub fn with_zoom_range(mut self, min_zoom: f64, max_zoom: f64) -> Self {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self
    }

    pub fn with_pitch_range(mut self, min_pitch: f64, max_pitch: f64) -> Self {
        self.min_pitch = min_pitch;
        self.max_pitch = max_pitch;
        self
    }
}
