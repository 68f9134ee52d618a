//! Observer interface through which a transform reports camera changes.
//!
//! Calls are synchronous and happen while the transform is being mutated, so an
//! implementation must not call back into the transform. Typical observers just
//! schedule a repaint.

use serde::{Deserialize, Serialize};

/// Whether a camera change happens at once or over several frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraChangeMode {
    Immediate,
    Animated,
}

/// Receives camera lifecycle notifications. Every method defaults to a no-op.
pub trait TransformObserver {
    fn on_camera_will_change(&mut self, _mode: CameraChangeMode) {}

    /// Fires once per animation per frame while it is in progress
    fn on_camera_is_changing(&mut self) {}

    fn on_camera_did_change(&mut self, _mode: CameraChangeMode) {}
}

/// Observer that ignores every notification
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl TransformObserver for NullObserver {}
