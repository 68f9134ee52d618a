//! # tilecam
//!
//! Camera transform and animation engine for a tile map renderer.
//!
//! [`TransformState`] holds the viewport (center, zoom, bearing, pitch, size,
//! padding) and derives the projection matrices and screen/geographic
//! conversions from it. [`Transform`] sits on top and turns camera requests
//! into immediate changes, eased transitions or fly-to arcs, reporting every
//! change to a [`TransformObserver`].

pub mod animation;
pub mod core;
pub mod prelude;
pub mod rendering;
pub mod traits;
pub use crate::core::constants;

// Re-export public API
pub use core::{
    config::{ConstrainMode, NorthOrientation, ProjectionMode, TransformOptions, ViewportMode},
    geo::{
        EdgeInsets, LatLng, LatLngBounds, Point, ScreenCoordinate, Size, UnwrappedTileId, WrapMode,
    },
    options::{AnimationOptions, CameraOptions, FreeCameraOptions},
    state::{TransformState, TransformStateProperties},
    transform::Transform,
};

pub use animation::interpolation::UnitBezier;
pub use rendering::camera::Camera;
pub use traits::{CameraChangeMode, NullObserver, TransformObserver};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, TransformError>;

/// Errors reported to the caller. Everything else is logged and ignored.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("failed to resize: size is empty")]
    EmptySize,

    #[error("failed to set bounds: bounds are invalid")]
    InvalidBounds,

    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

/// Error type alias for convenience
pub type Error = TransformError;

/// Routes `log` output to stderr, honouring `RUST_LOG`
#[cfg(feature = "debug")]
pub fn init_logging() {
    let env = env_logger::Env::default().default_filter_or("warn");
    let _ = env_logger::Builder::from_env(env).try_init();
}
