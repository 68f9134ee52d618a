//! Prelude module for common tilecam types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use tilecam::prelude::*;`

pub use crate::core::{
    config::{ConstrainMode, NorthOrientation, ProjectionMode, TransformOptions, ViewportMode},
    geo::{EdgeInsets, LatLng, LatLngBounds, Point, ScreenCoordinate, Size, WrapMode},
    options::{AnimationOptions, CameraOptions, FreeCameraOptions},
    state::TransformState,
    transform::Transform,
};

pub use crate::animation::interpolation::{Interpolatable, UnitBezier};

pub use crate::traits::{CameraChangeMode, NullObserver, TransformObserver};

pub use crate::{Error as TransformError, Result};

pub use instant::Instant;
pub use std::time::Duration;
