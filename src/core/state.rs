use crate::animation::interpolation::Interpolatable;
use crate::core::config::{ConstrainMode, NorthOrientation, TransformOptions, ViewportMode};
use crate::core::constants::{
    DEGREES_MAX, EXTENT, FIELD_OF_VIEW, MAX_ZOOM, MIN_ZOOM, PITCH_MAX, PITCH_MIN, TILE_SIZE,
};
use crate::core::geo::{
    EdgeInsets, LatLng, LatLngBounds, Point, ScreenCoordinate, Size, UnwrappedTileId, WrapMode,
};
use crate::core::options::{CameraOptions, FreeCameraOptions};
use crate::core::projection::{
    lat_lng_from_mercator, meters_per_pixel_at_latitude, project, unproject, world_size,
};
use crate::rendering::camera::Camera;
use crate::{Result, TransformError};
use nalgebra::{Matrix4, Quaternion, UnitQuaternion, Vector3, Vector4};
use once_cell::unsync::OnceCell;
use std::f64::consts::PI;

const ACCURACY_EPSILON: f64 = 1e-9;

/// Snaps values within 1e-9 of an integer so zoom 13.9999999 reads as 14
fn round_for_accuracy(x: f64) -> f64 {
    let rounded = x.round();
    let diff = (rounded - x).abs();
    if diff < ACCURACY_EPSILON && diff > 0.0 {
        rounded
    } else {
        x
    }
}

pub fn zoom_scale(zoom: f64) -> f64 {
    round_for_accuracy(2f64.powf(zoom))
}

pub fn scale_zoom(scale: f64) -> f64 {
    round_for_accuracy(scale.log2())
}

/// A point in tile space at zoom level `z`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TileCoordinate {
    pub p: Point,
    pub z: f64,
}

/// Projection matrices derived from a state snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct TransformMatrices {
    pub projection: Matrix4<f64>,
    pub inv_projection: Matrix4<f64>,
    pub coord: Matrix4<f64>,
    pub inverted: Matrix4<f64>,
}

impl TransformMatrices {
    fn identity() -> Self {
        Self {
            projection: Matrix4::identity(),
            inv_projection: Matrix4::identity(),
            coord: Matrix4::identity(),
            inverted: Matrix4::identity(),
        }
    }
}

/// Either empty or holding matrices that match the current state.
/// Setters call `invalidate`; readers go through `get_or_compute`.
#[derive(Debug, Clone, Default)]
pub struct MatrixCache {
    cell: OnceCell<TransformMatrices>,
}

impl MatrixCache {
    pub fn get_or_compute(
        &self,
        compute: impl FnOnce() -> TransformMatrices,
    ) -> &TransformMatrices {
        self.cell.get_or_init(compute)
    }

    pub fn invalidate(&mut self) {
        self.cell.take();
    }

    pub fn is_computed(&self) -> bool {
        self.cell.get().is_some()
    }
}

/// Partial update applied by [`TransformState::set_properties`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformStateProperties {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub scale: Option<f64>,
    pub bearing: Option<f64>,
    pub pitch: Option<f64>,
    pub x_skew: Option<f64>,
    pub y_skew: Option<f64>,
    pub axonometric: Option<bool>,
    pub panning: Option<bool>,
    pub scaling: Option<bool>,
    pub rotating: Option<bool>,
    pub edge_insets: Option<EdgeInsets>,
    pub size: Option<Size>,
    pub constrain_mode: Option<ConstrainMode>,
    pub north_orientation: Option<NorthOrientation>,
    pub viewport_mode: Option<ViewportMode>,
    pub frustum_offset: Option<EdgeInsets>,
}

impl TransformStateProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_position(mut self, scale: f64, x: f64, y: f64) -> Self {
        self.scale = Some(scale);
        self.x = Some(x);
        self.y = Some(y);
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

    pub fn with_projection(mut self, axonometric: bool, x_skew: f64, y_skew: f64) -> Self {
        self.axonometric = Some(axonometric);
        self.x_skew = Some(x_skew);
        self.y_skew = Some(y_skew);
        self
    }

    pub fn with_motion(mut self, panning: bool, scaling: bool, rotating: bool) -> Self {
        self.panning = Some(panning);
        self.scaling = Some(scaling);
        self.rotating = Some(rotating);
        self
    }

    pub fn with_edge_insets(mut self, insets: EdgeInsets) -> Self {
        self.edge_insets = Some(insets);
        self
    }

    pub fn with_size(mut self, size: Size) -> Self {
        self.size = Some(size);
        self
    }
}

/// What `TransformState::resize` did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResizeOutcome {
    Unchanged,
    Resized,
    /// The new size violates the screen bounds; the caller must stop any
    /// transition and then apply this center and zoom
    ScreenCorrection { center: LatLng, zoom: f64 },
}

/// Authoritative viewport state plus the coordinate and matrix math built on it.
///
/// Screen coordinates taken and returned here use a bottom-left origin.
/// `x`/`y` are the world-pixel offset of the center from the middle of the
/// world at the current scale.
#[derive(Debug, Clone)]
pub struct TransformState {
    scale: f64,
    x: f64,
    y: f64,
    bearing: f64,
    pitch: f64,
    x_skew: f64,
    y_skew: f64,
    axonometric: bool,

    size: Size,
    edge_insets: EdgeInsets,
    frustum_offset: EdgeInsets,
    bounds: LatLngBounds,

    min_scale: f64,
    max_scale: f64,
    min_pitch: f64,
    max_pitch: f64,

    north_orientation: NorthOrientation,
    constrain_mode: ConstrainMode,
    viewport_mode: ViewportMode,

    panning: bool,
    scaling: bool,
    rotating: bool,
    gesture_in_progress: bool,

    matrices: MatrixCache,
}

impl Default for TransformState {
    fn default() -> Self {
        Self::new(ConstrainMode::HeightOnly, ViewportMode::Default)
    }
}

impl TransformState {
    pub fn new(constrain_mode: ConstrainMode, viewport_mode: ViewportMode) -> Self {
        Self {
            scale: 1.0,
            x: 0.0,
            y: 0.0,
            bearing: 0.0,
            pitch: 0.0,
            x_skew: 0.0,
            y_skew: 1.0,
            axonometric: false,
            size: Size::default(),
            edge_insets: EdgeInsets::default(),
            frustum_offset: EdgeInsets::default(),
            bounds: LatLngBounds::unbounded(),
            min_scale: zoom_scale(MIN_ZOOM),
            max_scale: zoom_scale(MAX_ZOOM),
            min_pitch: PITCH_MIN,
            max_pitch: PITCH_MAX,
            north_orientation: NorthOrientation::Upwards,
            constrain_mode,
            viewport_mode,
            panning: false,
            scaling: false,
            rotating: false,
            gesture_in_progress: false,
            matrices: MatrixCache::default(),
        }
    }

    pub fn from_options(options: &TransformOptions) -> Self {
        let mut state = Self::new(options.constrain_mode, options.viewport_mode);
        state.set_north_orientation(options.north_orientation);
        state.set_max_zoom(options.max_zoom);
        state.set_min_zoom(options.min_zoom);
        state.set_max_pitch(options.max_pitch.to_radians());
        state.set_min_pitch(options.min_pitch.to_radians());
        state
    }

    pub fn set_properties(&mut self, properties: &TransformStateProperties) {
        if let Some(x) = properties.x {
            self.set_x(x);
        }
        if let Some(y) = properties.y {
            self.set_y(y);
        }
        if let Some(scale) = properties.scale {
            self.set_scale(scale);
        }
        if let Some(bearing) = properties.bearing {
            self.set_bearing(bearing);
        }
        if let Some(pitch) = properties.pitch {
            self.set_pitch(pitch);
        }
        if let Some(x_skew) = properties.x_skew {
            self.set_x_skew(x_skew);
        }
        if let Some(y_skew) = properties.y_skew {
            self.set_y_skew(y_skew);
        }
        if let Some(axonometric) = properties.axonometric {
            self.set_axonometric(axonometric);
        }
        if let Some(panning) = properties.panning {
            self.panning = panning;
        }
        if let Some(scaling) = properties.scaling {
            self.scaling = scaling;
        }
        if let Some(rotating) = properties.rotating {
            self.rotating = rotating;
        }
        if let Some(insets) = properties.edge_insets {
            self.set_edge_insets(insets);
        }
        if let Some(size) = properties.size {
            self.set_size(size);
        }
        if let Some(mode) = properties.constrain_mode {
            self.set_constrain_mode(mode);
        }
        if let Some(orientation) = properties.north_orientation {
            self.set_north_orientation(orientation);
        }
        if let Some(mode) = properties.viewport_mode {
            self.set_viewport_mode(mode);
        }
        if let Some(offset) = properties.frustum_offset {
            self.set_frustum_offset(offset);
        }
    }

    // Matrices

    /// Placement of a tile's local geometry (`0..EXTENT`) in world pixels
    pub fn matrix_for(&self, tile: &UnwrappedTileId) -> Matrix4<f64> {
        let tile_scale = 2f64.powi(i32::from(tile.z));
        let s = world_size(self.scale) / tile_scale;
        let x = (f64::from(tile.x) + f64::from(tile.wrap) * tile_scale) * s;
        let y = f64::from(tile.y) * s;
        Matrix4::new_translation(&Vector3::new(x, y, 0.0))
            * Matrix4::new_nonuniform_scaling(&Vector3::new(s / EXTENT, s / EXTENT, 1.0))
    }

    /// World-pixel to clip-space matrix.
    ///
    /// With `aligned` the translation is snapped to the pixel grid (shifted by
    /// half a pixel for odd viewport dimensions) so raster tiles render crisp.
    pub fn proj_matrix(&self, near_z: f64, aligned: bool) -> Matrix4<f64> {
        if self.size.is_empty() {
            return Matrix4::identity();
        }

        let width = f64::from(self.size.width);
        let height = f64::from(self.size.height);
        let center_distance = self.camera_to_center_distance();
        let offset = self.center_offset();

        // Tangent of the angle between the view direction and the top edge,
        // measured from the padded center.
        let tan_fov_above_center = ((height - self.frustum_offset.top) * 0.5
            + (offset.y - self.frustum_offset.top / 2.0))
            / (height * 1.5);
        let tan_multiple = tan_fov_above_center * self.pitch.tan();
        debug_assert!(tan_multiple < 1.0);
        let furthest_distance = center_distance / (1.0 - tan_multiple);
        let far_z = furthest_distance * 1.01;

        let camera = self.camera();
        let world_to_camera =
            camera.world_to_camera(self.scale, self.viewport_mode == ViewportMode::FlippedY);
        let mut camera_to_clip =
            camera.camera_to_clip_perspective(FIELD_OF_VIEW, width / height, near_z, far_z);

        // Move the center of perspective to the center of the padded area.
        if !self.axonometric {
            camera_to_clip[(0, 2)] = -offset.x * 2.0 / width;
            camera_to_clip[(1, 2)] = offset.y * 2.0 / height;
        }

        if self.north_orientation != NorthOrientation::Upwards {
            let north = -self.north_orientation.angle();
            camera_to_clip *= Matrix4::from_axis_angle(&Vector3::z_axis(), north);
        }

        let mut projection = camera_to_clip * world_to_camera;

        if self.axonometric {
            projection[(3, 2)] = 0.0;
            let latitude = self.lat_lng(WrapMode::Unwrapped).lat;
            let pixels_per_meter = 1.0 / meters_per_pixel_at_latitude(latitude, self.zoom());
            projection[(0, 2)] = self.x_skew * pixels_per_meter;
            projection[(1, 2)] = self.y_skew * pixels_per_meter;
        }

        if aligned {
            let world = world_size(self.scale);
            let dx = self.x - 0.5 * world;
            let dy = self.y - 0.5 * world;
            let x_shift = f64::from(self.size.width % 2) / 2.0;
            let y_shift = f64::from(self.size.height % 2) / 2.0;
            let (bearing_sin, bearing_cos) = self.bearing.sin_cos();
            let dxa = -dx.fract() + bearing_cos * x_shift + bearing_sin * y_shift;
            let dya = -dy.fract() + bearing_cos * y_shift + bearing_sin * x_shift;
            let snap = |d: f64| if d > 0.5 { d - 1.0 } else { d };
            projection *= Matrix4::new_translation(&Vector3::new(snap(dxa), snap(dya), 0.0));
        }

        projection
    }

    fn compute_matrices(&self) -> TransformMatrices {
        if self.size.is_empty() {
            return TransformMatrices::identity();
        }

        let projection = self.proj_matrix(1.0, false);
        let coord = self.coordinate_point_matrix(&projection);
        TransformMatrices {
            inv_projection: invert(&projection, "projection matrix"),
            inverted: invert(&coord, "coordinate point matrix"),
            projection,
            coord,
        }
    }

    pub fn matrices(&self) -> &TransformMatrices {
        self.matrices.get_or_compute(|| self.compute_matrices())
    }

    pub fn projection_matrix(&self) -> &Matrix4<f64> {
        &self.matrices().projection
    }

    pub fn inv_projection_matrix(&self) -> &Matrix4<f64> {
        &self.matrices().inv_projection
    }

    pub fn coord_matrix(&self) -> &Matrix4<f64> {
        &self.matrices().coord
    }

    pub fn inverted_matrix(&self) -> &Matrix4<f64> {
        &self.matrices().inverted
    }

    fn invalidate(&mut self) {
        self.matrices.invalidate();
    }

    // Free camera

    /// The 3D camera equivalent to the current center, zoom, bearing and pitch
    pub fn camera(&self) -> Camera {
        let mut camera = Camera::new();
        if !self.valid() {
            return camera;
        }

        let world = world_size(self.scale);
        let center_distance = self.camera_to_center_distance();

        // x/y position the map, so the camera sits on the opposite side.
        let dx = 0.5 * world - self.x;
        let dy = 0.5 * world - self.y;

        camera.set_orientation_from_pitch_bearing(self.pitch, self.bearing);
        let forward = camera.forward();
        let position = Vector3::new(
            dx - forward.x * center_distance,
            dy - forward.y * center_distance,
            -forward.z * center_distance,
        ) / world;
        camera.set_position(position);
        camera
    }

    fn update_state_from_camera(&mut self, camera: &Camera) -> bool {
        let position = *camera.position();
        let forward = camera.forward();
        if !(position.z > 0.0 && forward.z < 0.0) {
            log::warn!("free camera does not look at the ground, state left unchanged");
            return false;
        }

        let (pitch, bearing) = camera.pitch_bearing();
        let pitch = pitch.clamp(self.min_pitch, self.max_pitch);

        let center_distance = self.camera_to_center_distance();
        let zoom = (center_distance / (position.z / pitch.cos() * TILE_SIZE)).log2();
        let new_scale = 2f64.powf(zoom).clamp(self.min_scale, self.max_scale);

        let travel = -position.z / forward.z;
        let mercator = Point::new(position.x + forward.x * travel, position.y + forward.y * travel);

        self.set_lat_lng_zoom(&lat_lng_from_mercator(&mercator), scale_zoom(new_scale));
        self.set_bearing(bearing);
        self.set_pitch(pitch);
        true
    }

    pub fn free_camera_options(&self) -> FreeCameraOptions {
        let camera = self.camera();
        FreeCameraOptions {
            position: Some(*camera.position()),
            orientation: Some(*camera.orientation().quaternion()),
        }
    }

    fn set_camera_position(&self, camera: &mut Camera, position: &Vector3<f64>) -> bool {
        if position.iter().any(|c| c.is_nan()) {
            log::warn!("ignoring free camera position with NaN components");
            return false;
        }

        let max_world_size = world_size(2f64.powf(self.max_zoom()));
        let min_world_size = world_size(2f64.powf(self.min_zoom()));
        let distance = self.camera_to_center_distance();

        camera.set_position(Vector3::new(
            position.x,
            position.y,
            position.z.clamp(distance / max_world_size, distance / min_world_size),
        ));
        true
    }

    fn set_camera_orientation(&self, camera: &mut Camera, orientation: &Quaternion<f64>) -> bool {
        if orientation.coords.iter().any(|c| c.is_nan()) {
            log::warn!("ignoring free camera orientation with NaN components");
            return false;
        }
        if orientation.norm() == 0.0 {
            log::warn!("ignoring zero-length free camera orientation");
            return false;
        }

        let unit = UnitQuaternion::from_quaternion(*orientation);
        let forward = unit * Vector3::new(0.0, 0.0, -1.0);
        let up = unit * Vector3::new(0.0, -1.0, 0.0);

        if up.z < 0.0 {
            log::warn!("ignoring upside-down free camera orientation");
            return false;
        }
        if forward.z >= 0.0 {
            log::warn!("ignoring free camera orientation that does not face the ground");
            return false;
        }

        match Camera::orientation_from_frame(&forward, &up) {
            Some(orientation) => {
                camera.set_orientation(orientation);
                true
            }
            None => {
                log::warn!("ignoring degenerate free camera orientation");
                false
            }
        }
    }

    /// Applies a free camera; position and orientation are validated
    /// separately. Returns whether the state changed.
    pub fn set_free_camera_options(&mut self, options: &FreeCameraOptions) -> bool {
        if !self.valid() {
            return false;
        }
        if options.position.is_none() && options.orientation.is_none() {
            return false;
        }

        let mut camera = self.camera();
        let mut changed = false;

        if let Some(orientation) = &options.orientation {
            if orientation != camera.orientation().quaternion() {
                changed |= self.set_camera_orientation(&mut camera, orientation);
            }
        }

        if let Some(position) = &options.position {
            if position != camera.position() {
                changed |= self.set_camera_position(&mut camera, position);
            }
        }

        if !changed {
            return false;
        }
        let applied = self.update_state_from_camera(&camera);
        self.invalidate();
        applied
    }

    // Dimensions

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn set_size(&mut self, size: Size) {
        if self.size != size {
            self.size = size;
            self.invalidate();
        }
    }

    /// Resizes the viewport and re-applies the constraint for the new size
    pub fn resize(&mut self, size: Size) -> Result<ResizeOutcome> {
        if size.is_empty() {
            return Err(TransformError::EmptySize);
        }
        if self.size == size {
            return Ok(ResizeOutcome::Unchanged);
        }

        self.set_size(size);

        if let Some((center, scale)) = self.constrain_screen() {
            return Ok(ResizeOutcome::ScreenCorrection {
                center,
                zoom: scale_zoom(scale),
            });
        }

        let (scale, x, y) = self.constrain(self.scale, self.x, self.y);
        self.set_properties(&TransformStateProperties::new().with_position(scale, x, y));
        Ok(ResizeOutcome::Resized)
    }

    pub fn frustum_offset(&self) -> EdgeInsets {
        self.frustum_offset
    }

    pub fn set_frustum_offset(&mut self, offset: EdgeInsets) {
        if self.frustum_offset != offset {
            self.frustum_offset = offset;
            self.invalidate();
        }
    }

    // Modes

    pub fn north_orientation(&self) -> NorthOrientation {
        self.north_orientation
    }

    pub fn set_north_orientation(&mut self, orientation: NorthOrientation) {
        if self.north_orientation != orientation {
            self.north_orientation = orientation;
            self.invalidate();
        }
    }

    pub fn north_orientation_angle(&self) -> f64 {
        self.north_orientation.angle()
    }

    pub fn constrain_mode(&self) -> ConstrainMode {
        self.constrain_mode
    }

    pub fn set_constrain_mode(&mut self, mode: ConstrainMode) {
        if self.constrain_mode != mode {
            self.constrain_mode = mode;
            self.invalidate();
        }
    }

    pub fn viewport_mode(&self) -> ViewportMode {
        self.viewport_mode
    }

    pub fn set_viewport_mode(&mut self, mode: ViewportMode) {
        if self.viewport_mode != mode {
            self.viewport_mode = mode;
            self.invalidate();
        }
    }

    /// Current camera as a request; bearing and pitch in degrees
    pub fn camera_options(&self, padding: Option<EdgeInsets>) -> CameraOptions {
        CameraOptions::new()
            .with_center(self.lat_lng(WrapMode::Unwrapped))
            .with_padding(padding.unwrap_or(self.edge_insets))
            .with_zoom(self.zoom())
            .with_bearing((-self.bearing).to_degrees())
            .with_pitch(self.pitch.to_degrees())
    }

    pub fn edge_insets(&self) -> EdgeInsets {
        self.edge_insets
    }

    pub fn set_edge_insets(&mut self, insets: EdgeInsets) {
        if self.edge_insets != insets {
            self.edge_insets = insets;
            self.invalidate();
        }
    }

    // Position

    /// Mercator pixels per degree of longitude at the current scale
    fn bc(&self) -> f64 {
        world_size(self.scale) / DEGREES_MAX
    }

    /// Mercator pixels per radian at the current scale
    fn cc(&self) -> f64 {
        world_size(self.scale) / (2.0 * PI)
    }

    pub fn lat_lng(&self, wrap: WrapMode) -> LatLng {
        LatLng::with_wrap(
            (2.0 * (self.y / self.cc()).exp().atan() - 0.5 * PI).to_degrees(),
            -self.x / self.bc(),
            wrap,
        )
    }

    pub fn pixel_x(&self) -> f64 {
        (f64::from(self.size.width) - world_size(self.scale)) / 2.0 + self.x
    }

    pub fn pixel_y(&self) -> f64 {
        (f64::from(self.size.height) - world_size(self.scale)) / 2.0 + self.y
    }

    // Zoom

    pub fn zoom(&self) -> f64 {
        scale_zoom(self.scale)
    }

    pub fn integer_zoom(&self) -> u8 {
        self.zoom().floor() as u8
    }

    pub fn zoom_fraction(&self) -> f64 {
        self.zoom() - f64::from(self.integer_zoom())
    }

    pub fn zoom_scale(&self, zoom: f64) -> f64 {
        zoom_scale(zoom)
    }

    pub fn scale_zoom(&self, scale: f64) -> f64 {
        scale_zoom(scale)
    }

    // Bounds

    pub fn lat_lng_bounds(&self) -> LatLngBounds {
        self.bounds
    }

    pub fn set_lat_lng_bounds(&mut self, bounds: LatLngBounds) {
        if self.bounds != bounds {
            self.bounds = bounds;
            let center = self.lat_lng(WrapMode::Unwrapped);
            self.set_lat_lng_zoom(&center, self.zoom());
        }
    }

    pub fn set_min_zoom(&mut self, min_zoom: f64) {
        if min_zoom <= self.max_zoom() {
            self.min_scale = zoom_scale(min_zoom.clamp(MIN_ZOOM, MAX_ZOOM));
        } else {
            log::warn!("trying to set minimum zoom above maximum zoom, no changes made");
        }
    }

    /// Effective minimum zoom, raised by the constraint for the viewport size
    pub fn min_zoom(&self) -> f64 {
        let (scale, _, _) = self.constrain(self.min_scale, self.x, self.y);
        scale_zoom(scale)
    }

    pub fn set_max_zoom(&mut self, max_zoom: f64) {
        if max_zoom >= self.min_zoom() {
            self.max_scale = zoom_scale(max_zoom.clamp(MIN_ZOOM, MAX_ZOOM));
        } else {
            log::warn!("trying to set maximum zoom below minimum zoom, no changes made");
        }
    }

    pub fn max_zoom(&self) -> f64 {
        scale_zoom(self.max_scale)
    }

    pub fn set_min_pitch(&mut self, pitch: f64) {
        if pitch <= self.max_pitch {
            self.min_pitch = pitch.clamp(PITCH_MIN, self.max_pitch);
        } else {
            log::warn!("trying to set minimum pitch larger than maximum pitch, no changes made");
        }
    }

    pub fn min_pitch(&self) -> f64 {
        self.min_pitch
    }

    pub fn set_max_pitch(&mut self, pitch: f64) {
        if pitch >= self.min_pitch {
            self.max_pitch = pitch.clamp(self.min_pitch, PITCH_MAX);
        } else {
            log::warn!("trying to set maximum pitch smaller than minimum pitch, no changes made");
        }
    }

    pub fn max_pitch(&self) -> f64 {
        self.max_pitch
    }

    // Scale and position

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: f64) {
        if self.scale != scale {
            self.scale = scale;
            self.invalidate();
        }
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn set_x(&mut self, x: f64) {
        if self.x != x {
            self.x = x;
            self.invalidate();
        }
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn set_y(&mut self, y: f64) {
        if self.y != y {
            self.y = y;
            self.invalidate();
        }
    }

    // Rotation and pitch

    /// Radians, counter-clockwise
    pub fn bearing(&self) -> f64 {
        self.bearing
    }

    pub fn set_bearing(&mut self, bearing: f64) {
        if self.bearing != bearing {
            self.bearing = bearing;
            self.invalidate();
        }
    }

    pub fn field_of_view(&self) -> f64 {
        FIELD_OF_VIEW
    }

    pub fn camera_to_center_distance(&self) -> f64 {
        0.5 * f64::from(self.size.height) / (FIELD_OF_VIEW / 2.0).tan()
    }

    /// Radians
    pub fn pitch(&self) -> f64 {
        self.pitch
    }

    pub fn set_pitch(&mut self, pitch: f64) {
        if self.pitch != pitch {
            self.pitch = pitch;
            self.invalidate();
        }
    }

    pub fn x_skew(&self) -> f64 {
        self.x_skew
    }

    pub fn set_x_skew(&mut self, x_skew: f64) {
        if self.x_skew != x_skew {
            self.x_skew = x_skew;
            self.invalidate();
        }
    }

    pub fn y_skew(&self) -> f64 {
        self.y_skew
    }

    pub fn set_y_skew(&mut self, y_skew: f64) {
        if self.y_skew != y_skew {
            self.y_skew = y_skew;
            self.invalidate();
        }
    }

    pub fn axonometric(&self) -> bool {
        self.axonometric
    }

    pub fn set_axonometric(&mut self, axonometric: bool) {
        if self.axonometric != axonometric {
            self.axonometric = axonometric;
            self.invalidate();
        }
    }

    // Motion state

    pub fn is_changing(&self) -> bool {
        self.rotating || self.scaling || self.panning || self.gesture_in_progress
    }

    pub fn is_rotating(&self) -> bool {
        self.rotating
    }

    pub fn is_scaling(&self) -> bool {
        self.scaling
    }

    pub fn is_panning(&self) -> bool {
        self.panning
    }

    pub fn is_gesture_in_progress(&self) -> bool {
        self.gesture_in_progress
    }

    pub fn set_gesture_in_progress(&mut self, in_progress: bool) {
        self.gesture_in_progress = in_progress;
    }

    /// Non-empty viewport with the scale inside its limits
    pub fn valid(&self) -> bool {
        !self.size.is_empty() && self.scale >= self.min_scale && self.scale <= self.max_scale
    }

    // Conversions

    pub fn lat_lng_to_screen_coordinate(&self, lat_lng: &LatLng) -> ScreenCoordinate {
        self.lat_lng_to_screen_coordinate_with_w(lat_lng).0
    }

    /// Also returns the homogeneous clip coordinate; `w <= 0` means the point
    /// lies behind the camera.
    pub fn lat_lng_to_screen_coordinate_with_w(
        &self,
        lat_lng: &LatLng,
    ) -> (ScreenCoordinate, Vector4<f64>) {
        if self.size.is_empty() {
            return (Point::default(), Vector4::zeros());
        }

        let pt = project(lat_lng, self.scale) / TILE_SIZE;
        let p = self.coord_matrix() * Vector4::new(pt.x, pt.y, 0.0, 1.0);
        let screen = Point::new(p.x / p.w, f64::from(self.size.height) - p.y / p.w);
        (screen, p)
    }

    /// Unprojects a screen point onto the ground plane.
    ///
    /// Under pitch a single inverse transform does not give the ground point,
    /// so the point is unprojected at clip z 0 and 1 and the ray between them
    /// is intersected with z = 0.
    pub fn screen_coordinate_to_tile_coordinate(
        &self,
        point: &ScreenCoordinate,
        at_zoom: u8,
    ) -> TileCoordinate {
        if self.size.is_empty() {
            return TileCoordinate::default();
        }

        let flipped_y = f64::from(self.size.height) - point.y;
        let inverted = self.inverted_matrix();
        let coord0 = inverted * Vector4::new(point.x, flipped_y, 0.0, 1.0);
        let coord1 = inverted * Vector4::new(point.x, flipped_y, 1.0, 1.0);

        let p0 = Point::new(coord0.x, coord0.y) / coord0.w;
        let p1 = Point::new(coord1.x, coord1.y) / coord1.w;
        let z0 = coord0.z / coord0.w;
        let z1 = coord1.z / coord1.w;
        let t = if z0 == z1 { 0.0 } else { (0.0 - z0) / (z1 - z0) };

        let p = p0.lerp(&p1, t) / self.scale * 2f64.powi(i32::from(at_zoom));
        TileCoordinate {
            p,
            z: f64::from(at_zoom),
        }
    }

    pub fn screen_coordinate_to_lat_lng(&self, point: &ScreenCoordinate, wrap: WrapMode) -> LatLng {
        let coord = self.screen_coordinate_to_tile_coordinate(point, 0);
        unproject(&coord.p, 1.0 / TILE_SIZE, wrap)
    }

    fn coordinate_point_matrix(&self, projection: &Matrix4<f64>) -> Matrix4<f64> {
        let tile_scale = Matrix4::new_nonuniform_scaling(&Vector3::new(TILE_SIZE, TILE_SIZE, 1.0));
        let proj = projection * tile_scale;
        self.pixel_matrix() * proj
    }

    fn pixel_matrix(&self) -> Matrix4<f64> {
        let width = f64::from(self.size.width);
        let height = f64::from(self.size.height);
        Matrix4::new_nonuniform_scaling(&Vector3::new(width / 2.0, -height / 2.0, 1.0))
            * Matrix4::new_translation(&Vector3::new(1.0, -1.0, 0.0))
    }

    // Constraints

    /// Screen-mode check used after a resize. Returns the corrected center and
    /// scale when the viewport no longer fits the bounds.
    pub fn constrain_screen(&self) -> Option<(LatLng, f64)> {
        if self.constrain_mode != ConstrainMode::Screen {
            return None;
        }
        let mut zoom = scale_zoom(self.scale);
        let mut options = CameraOptions::default();
        self.constrain_camera_and_zoom_to_bounds(&mut options, &mut zoom);
        options.center.map(|center| (center, zoom_scale(zoom)))
    }

    /// HeightOnly/WidthAndHeight clamping: never zoom or pan far enough to show
    /// off-world area on the constrained axes.
    pub fn constrain(&self, scale: f64, x: f64, y: f64) -> (f64, f64, f64) {
        if matches!(self.constrain_mode, ConstrainMode::None | ConstrainMode::Screen) {
            return (scale, x, y);
        }

        let rotated = self.north_orientation.is_rotated();
        let width = f64::from(self.size.width);
        let height = f64::from(self.size.height);
        let (vertical, horizontal) = if rotated { (width, height) } else { (height, width) };

        let scale = scale.max(vertical / TILE_SIZE);

        let max_y = (scale * TILE_SIZE - vertical) / 2.0;
        let y = (-max_y).max(y.min(max_y));

        let x = if self.constrain_mode == ConstrainMode::WidthAndHeight {
            let max_x = (scale * TILE_SIZE - horizontal) / 2.0;
            (-max_x).max(x.min(max_x))
        } else {
            x
        };

        (scale, x, y)
    }

    /// Screen-mode clamping of a camera request against the bounds.
    ///
    /// Rewrites `camera.center` (dropping any anchor) and raises `zoom` when the
    /// requested view would show area outside the bounds.
    pub fn constrain_camera_and_zoom_to_bounds(&self, camera: &mut CameraOptions, zoom: &mut f64) {
        if self.constrain_mode != ConstrainMode::Screen || !self.bounds.is_bounded() {
            return;
        }

        let current = self.lat_lng(WrapMode::Unwrapped);
        let center_lat_lng = camera.center.unwrap_or(current);
        let requested_scale = zoom_scale(*zoom);

        // Transitions fold the anchor into the result, so the same offset has
        // to be accounted for here.
        let mut anchor_offset = Point::default();
        if let Some(anchor) = camera.anchor {
            let anchor = Point::new(anchor.x, f64::from(self.size.height) - anchor.y);
            let anchor_lat_lng = self.screen_coordinate_to_lat_lng(&anchor, WrapMode::Unwrapped);

            // The conversion needs matrices at the requested scale.
            let mut scratch = self.clone();
            scratch.set_lat_lng_zoom(&current, scale_zoom(requested_scale));
            let screen_lat_lng = scratch.screen_coordinate_to_lat_lng(&anchor, WrapMode::Unwrapped);

            anchor_offset = project(&anchor_lat_lng, requested_scale)
                - project(&screen_lat_lng, requested_scale);
        }

        let ne = project(&self.bounds.north_east, requested_scale);
        let sw = project(&self.bounds.south_west, requested_scale);
        let center = project(&center_lat_lng, requested_scale);
        let current_center = project(&current, requested_scale);

        let (min_y, max_y) = (ne.y, sw.y);
        let (min_x, max_x) = (sw.x, ne.x);
        let (start_x, start_y) = (center.x, center.y);
        let (mut result_x, mut result_y) = (start_x, start_y);

        let screen_width = f64::from(self.size.width);
        let screen_height = f64::from(self.size.height);

        let h2 = screen_height / 2.0;
        if start_y - h2 + anchor_offset.y < min_y {
            result_y = min_y + h2;
        }
        if start_y + anchor_offset.y + h2 > max_y {
            result_y = max_y - h2;
        }

        let w2 = screen_width / 2.0;
        if start_x + anchor_offset.x - w2 < min_x {
            result_x = min_x + w2;
        }
        if start_x + anchor_offset.x + w2 > max_x {
            result_x = max_x - w2;
        }

        let mut scale_y = 0.0;
        if max_y - min_y < screen_height {
            scale_y = screen_height / (max_y - min_y);
            result_y = (max_y + min_y) / 2.0;
        }

        let mut scale_x = 0.0;
        if max_x - min_x < screen_width {
            scale_x = screen_width / (max_x - min_x);
            result_x = (max_x + min_x) / 2.0;
        }

        let max_scale = if scale_x > scale_y { scale_x } else { scale_y };

        // A scale of exactly 1 means the bounds match the screen on one axis.
        if max_scale > 1.000001 {
            *zoom += scale_zoom(max_scale);

            // Keep the axis that did not force the zoom where it currently is.
            if scale_y > scale_x {
                result_x = current_center.x;
            } else {
                result_y = current_center.y;
            }

            // Positions are still at the requested scale; check the edges at the new one.
            if result_x * max_scale - w2 <= min_x * max_scale {
                result_x = (min_x * max_scale + w2) / max_scale;
            } else if result_x * max_scale + w2 >= max_x * max_scale {
                result_x = (max_x * max_scale - w2) / max_scale;
            }

            if result_y * max_scale - h2 <= min_y * max_scale {
                result_y = (min_y * max_scale + h2) / max_scale;
            } else if result_y * max_scale + h2 >= max_y * max_scale {
                result_y = (max_y * max_scale - h2) / max_scale;
            }
        }

        if result_x != start_x || result_y != start_y {
            camera.anchor = None;
            camera.center = Some(unproject(
                &Point::new(result_x, result_y),
                requested_scale,
                WrapMode::Unwrapped,
            ));
        }
    }

    pub fn center_offset(&self) -> ScreenCoordinate {
        Point::new(
            0.5 * (self.edge_insets.left - self.edge_insets.right),
            0.5 * (self.edge_insets.top - self.edge_insets.bottom),
        )
    }

    /// Pans so that `lat_lng` ends up under `anchor` (bottom-left origin)
    pub fn move_lat_lng(&mut self, lat_lng: &LatLng, anchor: &ScreenCoordinate) {
        let center = project(&self.lat_lng(WrapMode::Unwrapped), self.scale);
        let target = project(lat_lng, self.scale);
        let under_anchor = project(
            &self.screen_coordinate_to_lat_lng(anchor, WrapMode::Unwrapped),
            self.scale,
        );
        let moved = unproject(&(center + target - under_anchor), self.scale, WrapMode::Unwrapped);
        self.set_lat_lng_zoom(&moved, self.zoom());
    }

    pub fn set_lat_lng_zoom(&mut self, lat_lng: &LatLng, zoom: f64) {
        let constrained = self.bounds.constrain(lat_lng);

        let new_scale = zoom_scale(zoom).clamp(self.min_scale, self.max_scale);
        let new_world_size = new_scale * TILE_SIZE;
        let bc = new_world_size / DEGREES_MAX;
        let cc = new_world_size / (2.0 * PI);

        let m = 1.0 - 1e-15;
        let f = constrained.lat.to_radians().sin().clamp(-m, m);

        let point = Point::new(-constrained.lng * bc, 0.5 * cc * ((1.0 + f) / (1.0 - f)).ln());
        self.set_scale_point(new_scale, &point);
    }

    pub fn set_scale_point(&mut self, new_scale: f64, point: &ScreenCoordinate) {
        let (scale, x, y) = self.constrain(new_scale, point.x, point.y);
        self.scale = scale;
        self.x = x;
        self.y = y;
        self.invalidate();
    }

    /// Clip-space w of a tile's center, proportional to its distance from the camera
    pub fn camera_to_tile_distance(&self, tile: &UnwrappedTileId) -> f64 {
        let tile_matrix = self.projection_matrix() * self.matrix_for(tile);
        let center = tile_matrix * Vector4::new(TILE_SIZE / 2.0, TILE_SIZE / 2.0, 0.0, 1.0);
        center.w
    }

    /// How much farther the top edge of the viewport is than the center
    pub fn max_pitch_scale_factor(&self) -> f64 {
        if self.size.is_empty() {
            return 0.0;
        }
        let lat_lng = self.screen_coordinate_to_lat_lng(
            &Point::new(0.0, f64::from(self.size.height)),
            WrapMode::Unwrapped,
        );
        let pt = project(&lat_lng, self.scale) / TILE_SIZE;
        let top = self.coord_matrix() * Vector4::new(pt.x, pt.y, 0.0, 1.0);
        top.w / self.camera_to_center_distance()
    }
}

fn invert(matrix: &Matrix4<f64>, name: &str) -> Matrix4<f64> {
    matrix.try_inverse().unwrap_or_else(|| {
        log::error!("failed to invert {name}");
        Matrix4::identity()
    })
}
