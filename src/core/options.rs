use crate::animation::interpolation::UnitBezier;
use crate::core::geo::{EdgeInsets, LatLng, Point, ScreenCoordinate};
use crate::core::projection::{
    lat_lng_from_mercator, mercator_x_from_lng, mercator_y_from_lat, meters_per_pixel_at_latitude,
    world_size,
};
use crate::rendering::camera::Camera;
use nalgebra::{Quaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// Camera request. Unset fields keep their current value.
///
/// `bearing` is degrees clockwise from north, `pitch` is degrees from nadir and
/// `anchor` is a screen pixel with a top-left origin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraOptions {
    pub center: Option<LatLng>,
    pub padding: Option<EdgeInsets>,
    pub anchor: Option<ScreenCoordinate>,
    pub zoom: Option<f64>,
    pub bearing: Option<f64>,
    pub pitch: Option<f64>,
}

impl CameraOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_center(mut self, center: LatLng) -> Self {
        self.center = Some(center);
        self
    }

    pub fn with_padding(mut self, padding: EdgeInsets) -> Self {
        self.padding = Some(padding);
        self
    }

    pub fn with_anchor(mut self, anchor: ScreenCoordinate) -> Self {
        self.anchor = Some(anchor);
        self
    }

    pub fn with_zoom(mut self, zoom: f64) -> Self {
        self.zoom = Some(zoom);
        self
    }

    pub fn with_bearing(mut self, bearing: f64) -> Self {
        self.bearing = Some(bearing);
        self
    }

    pub fn with_pitch(mut self, pitch: f64) -> Self {
        self.pitch = Some(pitch);
        self
    }
}

pub type FrameCallback = Rc<dyn Fn(f64)>;
pub type FinishCallback = Rc<dyn Fn()>;

/// How a camera request is animated. The default is an instantaneous change.
#[derive(Clone, Default)]
pub struct AnimationOptions {
    pub duration: Option<Duration>,
    /// Average fly-to velocity in screenfuls per second
    pub velocity: Option<f64>,
    /// Zoom level at the peak of a fly-to arc
    pub min_zoom: Option<f64>,
    pub easing: Option<UnitBezier>,
    /// Called with linear progress on every intermediate frame
    pub transition_frame_fn: Option<FrameCallback>,
    /// Called exactly once when the animation completes, is superseded or is cancelled
    pub transition_finish_fn: Option<FinishCallback>,
}

impl AnimationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_velocity(mut self, velocity: f64) -> Self {
        self.velocity = Some(velocity);
        self
    }

    pub fn with_min_zoom(mut self, min_zoom: f64) -> Self {
        self.min_zoom = Some(min_zoom);
        self
    }

    pub fn with_easing(mut self, easing: UnitBezier) -> Self {
        self.easing = Some(easing);
        self
    }

    pub fn on_frame(mut self, callback: impl Fn(f64) + 'static) -> Self {
        self.transition_frame_fn = Some(Rc::new(callback));
        self
    }

    pub fn on_finish(mut self, callback: impl Fn() + 'static) -> Self {
        self.transition_finish_fn = Some(Rc::new(callback));
        self
    }

    pub(crate) fn notify_finished(&self) {
        if let Some(finish) = &self.transition_finish_fn {
            finish();
        }
    }
}

impl fmt::Debug for AnimationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationOptions")
            .field("duration", &self.duration)
            .field("velocity", &self.velocity)
            .field("min_zoom", &self.min_zoom)
            .field("easing", &self.easing)
            .field("transition_frame_fn", &self.transition_frame_fn.is_some())
            .field("transition_finish_fn", &self.transition_finish_fn.is_some())
            .finish()
    }
}

/// Unconstrained camera description.
///
/// `position` is mercator-normalized (the world spans `[0, 1]`, z is altitude
/// over world size); `orientation` rotates the camera's local frame, which
/// looks down -z with -y up.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FreeCameraOptions {
    pub position: Option<Vector3<f64>>,
    pub orientation: Option<Quaternion<f64>>,
}

impl FreeCameraOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places the camera above `location` at `altitude` meters
    pub fn set_location(&mut self, location: LatLng, altitude: f64) {
        self.position = Some(to_mercator(&location, altitude));
    }

    /// Geographic location and altitude in meters of the camera
    pub fn location(&self) -> Option<(LatLng, f64)> {
        let position = self.position?;
        if !(0.0..=1.0).contains(&position.y) {
            return None;
        }
        let location = lat_lng_from_mercator(&Point::new(position.x, position.y));
        let meters_per_unit = meters_per_pixel_at_latitude(location.lat, 0.0) * world_size(1.0);
        Some((location, position.z * meters_per_unit))
    }

    /// Orients the camera towards `location` on the ground. Needs a position;
    /// the orientation is cleared when no valid frame exists.
    pub fn look_at_point(&mut self, location: LatLng, up: Option<Vector3<f64>>) {
        self.orientation = None;
        let Some(position) = self.position else {
            return;
        };
        let target = to_mercator(&location, 0.0);
        let forward = target - position;
        let up = up.unwrap_or_else(|| Vector3::new(0.0, 0.0, 1.0));
        self.orientation = Camera::orientation_from_frame(&forward, &up).map(|q| q.into_inner());
    }

    /// Sets the orientation from pitch and compass bearing, both in degrees
    pub fn set_pitch_bearing(&mut self, pitch: f64, bearing: f64) {
        let q = Camera::orientation_from_pitch_bearing(pitch.to_radians(), (-bearing).to_radians());
        self.orientation = Some(q.into_inner());
    }
}

fn to_mercator(location: &LatLng, altitude: f64) -> Vector3<f64> {
    let pixels_per_meter = 1.0 / meters_per_pixel_at_latitude(location.lat, 0.0);
    let world = world_size(1.0);
    Vector3::new(
        mercator_x_from_lng(location.lng),
        mercator_y_from_lat(location.lat),
        altitude * pixels_per_meter / world,
    )
}
