//! Core constants shared by the projection, camera and transition code.
//! Keeping them in a single place makes it easier to tweak engine-wide magic numbers.

use crate::animation::interpolation::UnitBezier;
use std::f64::consts::PI;

/// Square tile size in pixels; `world_size = scale * TILE_SIZE`.
pub const TILE_SIZE: f64 = 512.0;

/// Number of integer units spanning one tile edge in tile-local geometry.
pub const EXTENT: f64 = 8192.0;

pub const DEGREES_MAX: f64 = 360.0;
pub const LONGITUDE_MAX: f64 = 180.0;

/// Latitude at which the mercator world becomes a square.
pub const LATITUDE_MAX: f64 = 85.051128779806604;

pub const MIN_ZOOM: f64 = 0.0;
pub const MAX_ZOOM: f64 = 25.5;

/// Pitch limits in radians.
pub const PITCH_MIN: f64 = 0.0;
pub const PITCH_MAX: f64 = PI / 3.0;

/// Equatorial radius used by spherical mercator.
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Vertical field of view, `2 * atan((height / 2) / (height * 1.5))`.
pub const FIELD_OF_VIEW: f64 = 0.6435011087932844;

/// Average fly-to velocity in rho-screenfuls per second.
pub const DEFAULT_FLY_VELOCITY: f64 = 1.2;

/// Zoom-out exaggeration along a fly-to path (van Wijk 2003 user study average).
pub const DEFAULT_FLY_RHO: f64 = 1.42;

/// Easing applied when a transition does not supply its own curve.
pub const DEFAULT_TRANSITION_EASE: UnitBezier = UnitBezier::new(0.0, 0.0, 0.25, 1.0);

/// Solver tolerance for easing curves.
pub const EASE_EPSILON: f64 = 0.001;
