//! Camera controller: camera requests, per-property transitions and observer
//! notification on top of a [`TransformState`].
//!
//! Center, zoom, bearing, padding and pitch each own an independent animation
//! slot, so a pitch change issued while a zoom is still running does not cancel
//! the zoom. Drive animations by calling [`Transform::update_transitions`] once
//! per frame.

use crate::animation::interpolation::{angle_between, normalize_angle, wrap, Interpolatable};
use crate::animation::transitions::{
    Animation, CenterFrame, FlightPath, PropertySlot, SharedAnimation, TransitionProperties,
    ZoomFrame,
};
use crate::core::config::{
    ConstrainMode, NorthOrientation, ProjectionMode, TransformOptions, ViewportMode,
};
use crate::core::constants::{DEFAULT_FLY_RHO, DEFAULT_FLY_VELOCITY, PITCH_MAX, PITCH_MIN};
use crate::core::geo::{EdgeInsets, LatLng, LatLngBounds, Point, ScreenCoordinate, Size, WrapMode};
use crate::core::options::{AnimationOptions, CameraOptions, FreeCameraOptions};
use crate::core::projection::project;
use crate::core::state::{zoom_scale, ResizeOutcome, TransformState, TransformStateProperties};
use crate::traits::{CameraChangeMode, NullObserver, TransformObserver};
use crate::{Result, TransformError};
use instant::Instant;
use std::f64::consts::PI;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

pub struct Transform {
    state: TransformState,
    observer: Box<dyn TransformObserver>,
    properties: TransitionProperties,
    transition_start: Option<Instant>,
    transition_duration: Duration,
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transform")
            .field("state", &self.state)
            .field("properties", &self.properties)
            .field("transition_start", &self.transition_start)
            .field("transition_duration", &self.transition_duration)
            .finish_non_exhaustive()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new(&TransformOptions::default())
    }
}

fn change_mode(animated: bool) -> CameraChangeMode {
    if animated {
        CameraChangeMode::Animated
    } else {
        CameraChangeMode::Immediate
    }
}

/// Installs a slot for a property the request changes. Returns the displaced
/// animation, which must be finished.
fn install_slot<T: Interpolatable, F>(
    slot: &mut Option<PropertySlot<T, F>>,
    animation: &SharedAnimation,
    changed: bool,
    current: T,
    target: T,
    frame: F,
) -> Option<SharedAnimation> {
    if !changed {
        return None;
    }
    let displaced = slot.take().map(|s| s.animation);
    *slot = Some(PropertySlot::new(animation.clone(), current, target, frame));
    displaced
}

/// Endpoints shared by ease and fly requests once the request is resolved
struct ResolvedCamera {
    camera: CameraOptions,
    zoom: f64,
    bearing: f64,
    pitch: f64,
    padding: EdgeInsets,
}

impl Transform {
    pub fn new(options: &TransformOptions) -> Self {
        Self::with_observer(options, Box::new(NullObserver))
    }

    pub fn with_observer(options: &TransformOptions, observer: Box<dyn TransformObserver>) -> Self {
        Self {
            state: TransformState::from_options(options),
            observer,
            properties: TransitionProperties::default(),
            transition_start: None,
            transition_duration: Duration::ZERO,
        }
    }

    pub fn state(&self) -> &TransformState {
        &self.state
    }

    // Map view

    /// Resizes the viewport. Fails on a size with a zero dimension.
    pub fn resize(&mut self, size: Size) -> Result<()> {
        if size.is_empty() {
            return Err(TransformError::EmptySize);
        }
        if self.state.size() == size {
            return Ok(());
        }

        self.observer.on_camera_will_change(CameraChangeMode::Immediate);

        if let ResizeOutcome::ScreenCorrection { center, zoom } = self.state.resize(size)? {
            // A running transition would overwrite the correction on its next frame.
            if self.in_transition() {
                self.cancel_transitions();
            }
            self.state.set_lat_lng_zoom(&center, zoom);
        }

        self.observer.on_camera_did_change(CameraChangeMode::Immediate);
        Ok(())
    }

    // Camera

    pub fn camera_options(&self, padding: Option<EdgeInsets>) -> CameraOptions {
        self.state.camera_options(padding)
    }

    /// Applies a camera request at once
    pub fn jump_to(&mut self, camera: &CameraOptions) {
        self.ease_to(camera, &AnimationOptions::default());
    }

    /// Eases towards a camera request; unset fields keep their current value
    pub fn ease_to(&mut self, camera: &CameraOptions, animation: &AnimationOptions) {
        let duration = animation.duration.unwrap_or(Duration::ZERO);
        if !self.state.lat_lng_bounds().is_bounded()
            && !self.is_gesture_in_progress()
            && !duration.is_zero()
        {
            // A fly without zoom exaggeration keeps the ground speed constant.
            self.fly_to_with(camera, animation, true);
            return;
        }

        let Some(resolved) = self.resolve(camera, animation, false) else {
            return;
        };
        let ResolvedCamera {
            camera,
            zoom,
            bearing,
            pitch,
            padding,
        } = resolved;

        let bounded = self.state.lat_lng_bounds().is_bounded();
        let mut start_lat_lng = self.state.lat_lng(WrapMode::Unwrapped);
        let unwrapped_lat_lng = camera.center.unwrap_or(start_lat_lng);
        let lat_lng = if bounded {
            unwrapped_lat_lng
        } else {
            unwrapped_lat_lng.wrapped()
        };

        if !bounded {
            if self.is_gesture_in_progress() {
                // Carry the wrap rounds of the target into the start so the
                // scroll keeps its direction while the target stays wrapped.
                let wraps = unwrapped_lat_lng.lng - lat_lng.lng;
                start_lat_lng = LatLng::new(start_lat_lng.lat, start_lat_lng.lng - wraps);
            } else {
                start_lat_lng.unwrap_for_shortest_path(&lat_lng);
            }
        }

        let scale = self.state.scale();
        let start_point = project(&start_lat_lng, scale);
        let end_point = project(&lat_lng, scale);

        let (zoom, pitch, bearing) = self.clamp_targets(zoom, pitch, bearing);

        let start_zoom = self.state.zoom();
        let start_bearing = self.state.bearing();
        let start_pitch = self.state.pitch();
        let start_insets = self.state.edge_insets();

        let shared = Animation::new(
            Instant::now(),
            duration,
            animation.clone(),
            start_point != end_point,
            zoom != start_zoom,
            bearing != start_bearing,
        )
        .shared();

        let displaced = [
            install_slot(
                &mut self.properties.zoom,
                &shared,
                zoom != start_zoom,
                start_zoom,
                zoom,
                ZoomFrame::Interpolated,
            ),
            install_slot(
                &mut self.properties.lat_lng,
                &shared,
                start_point != end_point,
                start_point,
                end_point,
                CenterFrame::Interpolated { scale },
            ),
            install_slot(
                &mut self.properties.bearing,
                &shared,
                bearing != start_bearing,
                start_bearing,
                bearing,
                (),
            ),
            install_slot(
                &mut self.properties.padding,
                &shared,
                padding != start_insets,
                start_insets,
                padding,
                (),
            ),
            install_slot(
                &mut self.properties.pitch,
                &shared,
                pitch != start_pitch,
                start_pitch,
                pitch,
                (),
            ),
        ];

        self.start_transition(&camera, shared, displaced);
    }

    /// Flies along the Van Wijk & Nuij optimal path, zooming out mid-flight
    pub fn fly_to(&mut self, camera: &CameraOptions, animation: &AnimationOptions) {
        self.fly_to_with(camera, animation, false);
    }

    fn fly_to_with(
        &mut self,
        camera: &CameraOptions,
        animation: &AnimationOptions,
        linear_zoom: bool,
    ) {
        let Some(resolved) = self.resolve(camera, animation, true) else {
            return;
        };
        let ResolvedCamera {
            camera,
            zoom,
            bearing,
            pitch,
            padding,
        } = resolved;

        let lat_lng = camera
            .center
            .unwrap_or_else(|| self.state.lat_lng(WrapMode::Unwrapped))
            .wrapped();
        let mut start_lat_lng = self.state.lat_lng(WrapMode::Unwrapped).wrapped();
        start_lat_lng.unwrap_for_shortest_path(&lat_lng);

        let start_scale = self.state.scale();
        let start_point = project(&start_lat_lng, start_scale);
        let end_point = project(&lat_lng, start_scale);

        let (zoom, pitch, bearing) = self.clamp_targets(zoom, pitch, bearing);

        let start_zoom = self.state.scale_zoom(start_scale);
        let start_bearing = self.state.bearing();
        let start_pitch = self.state.pitch();

        // Spans are measured in pixels at the starting scale.
        let size = self.state.size();
        let w0 = (f64::from(size.width) - padding.left - padding.right)
            .max(f64::from(size.height) - padding.top - padding.bottom);
        let w1 = w0 / zoom_scale(zoom - start_zoom);
        let travel = end_point - start_point;
        let u1 = travel.x.hypot(travel.y);

        let mut rho = DEFAULT_FLY_RHO;
        if animation.min_zoom.is_some() || linear_zoom {
            let min_zoom = animation
                .min_zoom
                .unwrap_or(start_zoom)
                .min(start_zoom)
                .min(zoom)
                .max(self.state.min_zoom())
                .min(self.state.max_zoom());
            let w_max = w0 / zoom_scale(min_zoom - start_zoom);
            rho = if u1 != 0.0 { (w_max / u1 * 2.0).sqrt() } else { 1.0 };
        }

        let path = FlightPath::new(w0, w1, u1, rho);

        let duration = match animation.duration {
            Some(duration) => duration,
            None => {
                let velocity = animation.velocity.map_or(DEFAULT_FLY_VELOCITY, |v| v / rho);
                Duration::try_from_secs_f64(path.length() / velocity).unwrap_or(Duration::ZERO)
            }
        };

        if duration.is_zero() {
            self.jump_to(&camera);
            animation.notify_finished();
            return;
        }

        let start_insets = self.state.edge_insets();
        let panning = start_point != end_point;
        // The arc zooms out mid-flight even between equal zoom levels.
        let (scaling, zoom_frame) = if linear_zoom {
            (zoom != start_zoom, ZoomFrame::Interpolated)
        } else {
            (zoom != start_zoom || !path.is_close(), ZoomFrame::FlyTo(path))
        };

        let shared = Animation::new(
            Instant::now(),
            duration,
            animation.clone(),
            panning,
            scaling,
            bearing != start_bearing,
        )
        .shared();

        let displaced = [
            install_slot(&mut self.properties.zoom, &shared, scaling, start_zoom, zoom, zoom_frame),
            install_slot(
                &mut self.properties.lat_lng,
                &shared,
                panning,
                start_point,
                end_point,
                CenterFrame::FlyTo {
                    path,
                    scale: start_scale,
                },
            ),
            install_slot(
                &mut self.properties.bearing,
                &shared,
                bearing != start_bearing,
                start_bearing,
                bearing,
                (),
            ),
            install_slot(
                &mut self.properties.padding,
                &shared,
                padding != start_insets,
                start_insets,
                padding,
                (),
            ),
            install_slot(
                &mut self.properties.pitch,
                &shared,
                pitch != start_pitch,
                start_pitch,
                pitch,
                (),
            ),
        ];

        self.start_transition(&camera, shared, displaced);
    }

    /// Resolves a request against the current state and the screen bounds.
    /// A NaN field aborts the request after delivering its finish callback.
    fn resolve(
        &self,
        camera: &CameraOptions,
        animation: &AnimationOptions,
        needs_size: bool,
    ) -> Option<ResolvedCamera> {
        let mut camera = camera.clone();
        let mut zoom = camera.zoom.unwrap_or_else(|| self.state.zoom());
        let bearing = camera
            .bearing
            .map_or_else(|| self.state.bearing(), |b| (-b).to_radians());
        let pitch = camera.pitch.map_or_else(|| self.state.pitch(), f64::to_radians);

        if zoom.is_nan()
            || bearing.is_nan()
            || pitch.is_nan()
            || camera.center.is_some_and(|c| c.is_nan())
            || (needs_size && self.state.size().is_empty())
        {
            log::debug!("ignoring camera request that cannot be applied: {camera:?}");
            animation.notify_finished();
            return None;
        }

        self.state.constrain_camera_and_zoom_to_bounds(&mut camera, &mut zoom);
        let padding = camera.padding.unwrap_or_else(|| self.state.edge_insets());

        Some(ResolvedCamera {
            camera,
            zoom,
            bearing,
            pitch,
            padding,
        })
    }

    /// Clamps zoom and pitch, and rotates the shorter way round
    fn clamp_targets(&mut self, zoom: f64, pitch: f64, bearing: f64) -> (f64, f64, f64) {
        let zoom = zoom.max(self.state.min_zoom()).min(self.state.max_zoom());
        let pitch = pitch.clamp(self.state.min_pitch(), self.state.max_pitch());

        let bearing = normalize_angle(bearing, self.state.bearing());
        let start_bearing = normalize_angle(self.state.bearing(), bearing);
        self.state.set_bearing(start_bearing);

        (zoom, pitch, bearing)
    }

    fn start_transition(
        &mut self,
        camera: &CameraOptions,
        animation: SharedAnimation,
        displaced: [Option<SharedAnimation>; 5],
    ) {
        for old in displaced.into_iter().flatten() {
            self.finish_animation(&old);
        }

        let (start, duration, animated) = {
            let a = animation.borrow();
            (a.start(), a.duration(), a.is_animated())
        };
        self.transition_start = Some(start);
        self.transition_duration = duration;

        self.observer.on_camera_will_change(change_mode(animated));

        // A center takes precedence over an anchor.
        let anchor = if camera.center.is_some() { None } else { camera.anchor };
        if let Some(anchor) = anchor {
            let anchor = Point::new(anchor.x, f64::from(self.state.size().height) - anchor.y);
            let anchor_lat_lng = self
                .state
                .screen_coordinate_to_lat_lng(&anchor, WrapMode::Unwrapped);
            animation.borrow_mut().set_anchor(Some((anchor, anchor_lat_lng)));
        }

        // The request changed nothing, so no slot took this animation.
        if Rc::strong_count(&animation) == 1 {
            log::debug!("camera request left every property unchanged");
            self.finish_animation(&animation);
        } else {
            log::debug!("starting transition over {duration:?}");
        }

        if !animated {
            self.update_transitions(Instant::now());
        }
    }

    pub fn in_transition(&self) -> bool {
        !self.properties.is_empty()
    }

    /// Advances every running transition to `now`
    pub fn update_transitions(&mut self, now: Instant) {
        let animations = self.properties.animations();

        // Center and zoom are written together so each frame reads a
        // consistent pair.
        if self.properties.lat_lng.is_some() || self.properties.zoom.is_some() {
            let mut stepped: Vec<(SharedAnimation, f64)> = Vec::with_capacity(2);

            let lat_lng = match &self.properties.lat_lng {
                Some(slot) => {
                    let t = slot.interpolant(now);
                    stepped.push((slot.animation.clone(), t));
                    slot.frame_lat_lng(t)
                }
                None => self.state.lat_lng(WrapMode::Unwrapped),
            };
            let zoom = match &self.properties.zoom {
                Some(slot) => {
                    let t = slot.interpolant(now);
                    if !stepped.iter().any(|(a, _)| Rc::ptr_eq(a, &slot.animation)) {
                        stepped.push((slot.animation.clone(), t));
                    }
                    slot.frame_zoom(t)
                }
                None => self.state.zoom(),
            };

            self.state.set_lat_lng_zoom(&lat_lng, zoom);
            for step in stepped {
                self.step(step);
            }
        }

        if let Some(slot) = &self.properties.bearing {
            let t = slot.interpolant(now);
            let bearing = wrap(slot.interpolated(t), -PI, PI);
            let step = (slot.animation.clone(), t);
            self.state.set_bearing(bearing);
            self.step(step);
        }

        if let Some(slot) = &self.properties.padding {
            let t = slot.interpolant(now);
            let insets = slot.interpolated(t);
            let step = (slot.animation.clone(), t);
            self.state.set_edge_insets(insets);
            self.step(step);
        }

        let max_pitch = self.max_pitch_for_edge_insets(&self.state.edge_insets());
        if let Some(slot) = &self.properties.pitch {
            let t = slot.interpolant(now);
            let pitch = max_pitch.min(slot.interpolated(t));
            let step = (slot.animation.clone(), t);
            self.state.set_pitch(pitch);
            self.step(step);
        } else if max_pitch < self.state.pitch() {
            self.state.set_pitch(max_pitch);
        }

        for animation in &animations {
            if animation.borrow().done {
                self.finish_animation(animation);
            }
        }
        self.properties.clear_done();

        let (mut panning, mut scaling, mut rotating) = (false, false, false);
        for animation in self.properties.animations() {
            let a = animation.borrow();
            panning |= a.panning;
            scaling |= a.scaling;
            rotating |= a.rotating;
        }
        for animation in &animations {
            animation.borrow_mut().ran = false;
        }

        let motion = TransformStateProperties::new().with_motion(panning, scaling, rotating);
        self.state.set_properties(&motion);
    }

    /// Runs one frame of `animation` (once per update pass) and then re-pins
    /// its anchor against the property just written.
    fn step(&mut self, (animation, t): (SharedAnimation, f64)) {
        self.transition_frame(&animation, t);
        let anchor = animation.borrow().anchor();
        if let Some((point, lat_lng)) = anchor {
            self.state.move_lat_lng(&lat_lng, &point);
        }
    }

    fn transition_frame(&mut self, animation: &SharedAnimation, t: f64) -> bool {
        let frame_fn = {
            let mut a = animation.borrow_mut();
            if a.ran {
                return a.done;
            }
            a.ran = true;
            if t >= 1.0 {
                a.done = true;
                return true;
            }
            a.done = false;
            a.options().transition_frame_fn.clone()
        };

        if let Some(frame_fn) = frame_fn {
            frame_fn(t);
        }
        self.observer.on_camera_is_changing();
        false
    }

    fn finish_animation(&mut self, animation: &SharedAnimation) {
        let (options, animated) = {
            let mut a = animation.borrow_mut();
            if a.finished {
                return;
            }
            a.finished = true;
            (a.options().clone(), a.is_animated())
        };

        options.notify_finished();
        self.observer.on_camera_did_change(change_mode(animated));
    }

    /// Finishes every running animation, firing each finish callback once
    pub fn cancel_transitions(&mut self) {
        for animation in self.properties.animations() {
            self.finish_animation(&animation);
        }
        self.properties = TransitionProperties::default();
    }

    /// Start of the most recently requested transition
    pub fn transition_start(&self) -> Option<Instant> {
        self.transition_start
    }

    pub fn transition_duration(&self) -> Duration {
        self.transition_duration
    }

    // Position

    /// Pans by a screen offset
    pub fn move_by(&mut self, offset: &ScreenCoordinate, animation: &AnimationOptions) {
        let size = self.state.size();
        let point_on_screen = self.state.edge_insets().center(size.width, size.height) - *offset;
        // Unwrapped so the direction of the move survives.
        let center = self.screen_coordinate_to_lat_lng(&point_on_screen, WrapMode::Unwrapped);
        self.ease_to(&CameraOptions::new().with_center(center), animation);
    }

    pub fn lat_lng(&self, wrap: WrapMode) -> LatLng {
        self.state.lat_lng(wrap)
    }

    pub fn zoom(&self) -> f64 {
        self.state.zoom()
    }

    // Bounds

    pub fn set_lat_lng_bounds(&mut self, bounds: LatLngBounds) -> Result<()> {
        if !bounds.valid() {
            return Err(TransformError::InvalidBounds);
        }
        self.state.set_lat_lng_bounds(bounds);
        Ok(())
    }

    pub fn set_min_zoom(&mut self, min_zoom: f64) {
        if min_zoom.is_nan() {
            return;
        }
        self.state.set_min_zoom(min_zoom);
    }

    pub fn set_max_zoom(&mut self, max_zoom: f64) {
        if max_zoom.is_nan() {
            return;
        }
        self.state.set_max_zoom(max_zoom);
    }

    /// Degrees
    pub fn set_min_pitch(&mut self, min_pitch: f64) {
        if min_pitch.is_nan() {
            return;
        }
        if min_pitch.to_radians() < PITCH_MIN {
            log::warn!(
                "minimum pitch below the limit ({} degrees), the value will be clamped",
                PITCH_MIN.to_degrees()
            );
        }
        self.state.set_min_pitch(min_pitch.to_radians());
    }

    /// Degrees
    pub fn set_max_pitch(&mut self, max_pitch: f64) {
        if max_pitch.is_nan() {
            return;
        }
        if max_pitch.to_radians() > PITCH_MAX {
            log::warn!(
                "maximum pitch above the limit ({} degrees), the value will be clamped",
                PITCH_MAX.to_degrees()
            );
        }
        self.state.set_max_pitch(max_pitch.to_radians());
    }

    pub fn set_frustum_offset(&mut self, offset: EdgeInsets) {
        self.state.set_frustum_offset(offset);
    }

    pub fn frustum_offset(&self) -> EdgeInsets {
        self.state.frustum_offset()
    }

    // Bearing and pitch

    /// Rotates as if dragging from `first` to `second` around the padded center
    pub fn rotate_by(
        &mut self,
        first: &ScreenCoordinate,
        second: &ScreenCoordinate,
        animation: &AnimationOptions,
    ) {
        let size = self.state.size();
        let mut center = self.state.edge_insets().center(size.width, size.height);
        let offset = *first - center;
        let distance = offset.x.hypot(offset.y);

        // Too close to the center for a stable angle; rotate around a point
        // 200px away in the direction of the click instead.
        if distance < 200.0 {
            let height_offset = -200.0;
            let rotate_bearing = offset.y.atan2(offset.x);
            center = Point::new(
                first.x + rotate_bearing.cos() * height_offset,
                first.y + rotate_bearing.sin() * height_offset,
            );
        }

        let angle = angle_between(&(*first - center), &(*second - center));
        let bearing = -(self.state.bearing() + angle).to_degrees();
        self.ease_to(&CameraOptions::new().with_bearing(bearing), animation);
    }

    /// Radians
    pub fn bearing(&self) -> f64 {
        self.state.bearing()
    }

    /// Radians
    pub fn pitch(&self) -> f64 {
        self.state.pitch()
    }

    // Modes

    pub fn set_north_orientation(&mut self, orientation: NorthOrientation) {
        self.state.set_north_orientation(orientation);
        self.reconstrain();
    }

    pub fn north_orientation(&self) -> NorthOrientation {
        self.state.north_orientation()
    }

    pub fn set_constrain_mode(&mut self, mode: ConstrainMode) {
        self.state.set_constrain_mode(mode);
        self.reconstrain();
    }

    pub fn constrain_mode(&self) -> ConstrainMode {
        self.state.constrain_mode()
    }

    fn reconstrain(&mut self) {
        let state = &self.state;
        let (scale, x, y) = state.constrain(state.scale(), state.x(), state.y());
        self.state
            .set_properties(&TransformStateProperties::new().with_position(scale, x, y));
    }

    pub fn set_viewport_mode(&mut self, mode: ViewportMode) {
        self.state.set_viewport_mode(mode);
    }

    pub fn viewport_mode(&self) -> ViewportMode {
        self.state.viewport_mode()
    }

    pub fn set_projection_mode(&mut self, mode: &ProjectionMode) {
        let properties = TransformStateProperties::new().with_projection(
            mode.axonometric.unwrap_or(self.state.axonometric()),
            mode.x_skew.unwrap_or(self.state.x_skew()),
            mode.y_skew.unwrap_or(self.state.y_skew()),
        );
        self.state.set_properties(&properties);
    }

    pub fn projection_mode(&self) -> ProjectionMode {
        ProjectionMode::default()
            .with_axonometric(self.state.axonometric())
            .with_x_skew(self.state.x_skew())
            .with_y_skew(self.state.y_skew())
    }

    // Gestures

    pub fn set_gesture_in_progress(&mut self, in_progress: bool) {
        self.state.set_gesture_in_progress(in_progress);
    }

    pub fn is_gesture_in_progress(&self) -> bool {
        self.state.is_gesture_in_progress()
    }

    // Conversion

    /// Top-left origin
    pub fn lat_lng_to_screen_coordinate(&self, lat_lng: &LatLng) -> ScreenCoordinate {
        let point = self.state.lat_lng_to_screen_coordinate(lat_lng);
        Point::new(point.x, f64::from(self.state.size().height) - point.y)
    }

    /// Top-left origin
    pub fn screen_coordinate_to_lat_lng(&self, point: &ScreenCoordinate, wrap: WrapMode) -> LatLng {
        let flipped = Point::new(point.x, f64::from(self.state.size().height) - point.y);
        self.state.screen_coordinate_to_lat_lng(&flipped, wrap)
    }

    /// Steepest pitch that keeps the far plane off the ground for `insets`
    pub fn max_pitch_for_edge_insets(&self, insets: &EdgeInsets) -> f64 {
        let center_offset_y = 0.5 * (insets.top - insets.bottom);
        let height = f64::from(self.state.size().height);
        // 1.03 keeps the ground from running parallel to the clipping plane.
        let tangent_above_center = 1.03 * (height / 2.0 + center_offset_y) / (1.5 * height);
        PI * 0.5 - tangent_above_center.atan()
    }

    // Free camera

    pub fn free_camera_options(&self) -> FreeCameraOptions {
        self.state.free_camera_options()
    }

    pub fn set_free_camera_options(&mut self, options: &FreeCameraOptions) {
        self.cancel_transitions();
        self.observer.on_camera_will_change(CameraChangeMode::Immediate);
        self.state.set_free_camera_options(options);
        self.observer.on_camera_did_change(CameraChangeMode::Immediate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    #[derive(Default)]
    struct Counts {
        will: Cell<u32>,
        changing: Cell<u32>,
        did: Cell<u32>,
    }

    struct CountingObserver(Rc<Counts>);

    impl TransformObserver for CountingObserver {
        fn on_camera_will_change(&mut self, _mode: CameraChangeMode) {
            self.0.will.set(self.0.will.get() + 1);
        }

        fn on_camera_is_changing(&mut self) {
            self.0.changing.set(self.0.changing.get() + 1);
        }

        fn on_camera_did_change(&mut self, _mode: CameraChangeMode) {
            self.0.did.set(self.0.did.get() + 1);
        }
    }

    fn transform(width: u32, height: u32) -> Transform {
        let mut transform = Transform::default();
        transform.resize(Size::new(width, height)).unwrap();
        transform
    }

    #[test]
    fn test_jump_to_is_immediate() {
        let mut transform = transform(1000, 1000);
        transform.jump_to(&CameraOptions::new().with_zoom(5.0).with_bearing(90.0));
        assert!(!transform.in_transition());
        assert!((transform.zoom() - 5.0).abs() < 1e-12);
        assert!((transform.bearing() + PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_nan_request_keeps_state_and_finishes() {
        let mut transform = transform(1000, 1000);
        transform.jump_to(&CameraOptions::new().with_zoom(3.0));
        let finished = Rc::new(Cell::new(false));
        let flag = finished.clone();
        transform.ease_to(
            &CameraOptions::new().with_zoom(f64::NAN),
            &AnimationOptions::new().on_finish(move || flag.set(true)),
        );
        assert!(finished.get());
        assert_eq!(transform.zoom(), 3.0);
    }

    #[test]
    fn test_observer_sees_one_change_per_jump() {
        let counts = Rc::new(Counts::default());
        let mut transform = Transform::with_observer(
            &TransformOptions::default(),
            Box::new(CountingObserver(counts.clone())),
        );
        transform.resize(Size::new(100, 100)).unwrap();
        let (will, did) = (counts.will.get(), counts.did.get());

        transform.jump_to(&CameraOptions::new().with_zoom(2.0));
        assert_eq!(counts.will.get(), will + 1);
        assert_eq!(counts.did.get(), did + 1);
        assert_eq!(counts.changing.get(), 0);
    }

    #[test]
    fn test_animated_ease_steps_and_finishes() {
        let mut transform = transform(1000, 1000);
        let frames = Rc::new(RefCell::new(Vec::new()));
        let record = frames.clone();
        transform.ease_to(
            &CameraOptions::new().with_zoom(4.0),
            &AnimationOptions::new()
                .with_duration(Duration::from_millis(200))
                .on_frame(move |t| record.borrow_mut().push(t)),
        );
        assert!(transform.in_transition());
        let start = transform.transition_start().unwrap();

        transform.update_transitions(start + Duration::from_millis(100));
        assert!(transform.zoom() > 0.0 && transform.zoom() < 4.0);
        assert!(transform.state().is_scaling());

        transform.update_transitions(start + Duration::from_millis(200));
        assert!(!transform.in_transition());
        assert_eq!(transform.zoom(), 4.0);
        assert!(!transform.state().is_changing());
        assert_eq!(frames.borrow().len(), 1);
    }

    #[test]
    fn test_cancel_fires_finish_once() {
        let mut transform = transform(500, 500);
        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        transform.ease_to(
            &CameraOptions::new().with_pitch(30.0),
            &AnimationOptions::new()
                .with_duration(Duration::from_secs(1))
                .on_finish(move || counter.set(counter.get() + 1)),
        );
        transform.cancel_transitions();
        transform.cancel_transitions();
        assert_eq!(count.get(), 1);
        assert!(!transform.in_transition());
    }

    #[test]
    fn test_rejected_settings() {
        let mut transform = transform(500, 500);
        assert!(matches!(
            transform.resize(Size::new(0, 0)),
            Err(TransformError::EmptySize)
        ));
        let inverted = LatLngBounds::from_coords(10.0, 0.0, -10.0, 5.0);
        assert!(matches!(
            transform.set_lat_lng_bounds(inverted),
            Err(TransformError::InvalidBounds)
        ));
        transform.set_max_zoom(f64::NAN);
        assert_eq!(transform.state().max_zoom(), crate::core::constants::MAX_ZOOM);
    }

    #[test]
    fn test_max_pitch_for_flush_insets() {
        let transform = transform(600, 600);
        let expected = PI / 2.0 - (1.03f64 / 3.0).atan();
        let max_pitch = transform.max_pitch_for_edge_insets(&EdgeInsets::default());
        assert!((max_pitch - expected).abs() < 1e-12);
    }

    #[test]
    fn test_projection_mode_partial_update() {
        let mut transform = transform(100, 100);
        transform.set_projection_mode(&ProjectionMode::default().with_axonometric(true));
        let mode = transform.projection_mode();
        assert_eq!(mode.axonometric, Some(true));
        assert_eq!(mode.x_skew, Some(0.0));
        assert_eq!(mode.y_skew, Some(1.0));
    }
}
