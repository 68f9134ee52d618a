use crate::core::constants::{EARTH_RADIUS_M, TILE_SIZE};
use crate::core::projection::lat_from_mercator_y;
use nalgebra::{Matrix4, UnitQuaternion, Vector2, Vector3};
use std::f64::consts::PI;

const FRAME_EPSILON: f64 = 1e-15;

/// 3D camera in mercator-normalized space.
///
/// `position` is expressed in world units where the whole world spans `[0, 1]`
/// on x and y; z is altitude divided by the world size. The camera looks down
/// its local -z axis with local -y as "up" on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    orientation: UnitQuaternion<f64>,
    position: Vector3<f64>,
}

impl Camera {
    /// Create a camera at the origin looking straight down
    pub fn new() -> Self {
        Self {
            orientation: UnitQuaternion::identity(),
            position: Vector3::zeros(),
        }
    }

    pub fn position(&self) -> &Vector3<f64> {
        &self.position
    }

    pub fn set_position(&mut self, position: Vector3<f64>) {
        self.position = position;
    }

    pub fn orientation(&self) -> &UnitQuaternion<f64> {
        &self.orientation
    }

    pub fn set_orientation(&mut self, orientation: UnitQuaternion<f64>) {
        self.orientation = orientation;
    }

    /// Orient the camera from map pitch and bearing (radians, map convention)
    pub fn set_orientation_from_pitch_bearing(&mut self, pitch: f64, bearing: f64) {
        self.orientation = Self::orientation_from_pitch_bearing(pitch, bearing);
    }

    pub fn forward(&self) -> Vector3<f64> {
        -self.orientation.to_rotation_matrix().matrix().column(2).into_owned()
    }

    pub fn right(&self) -> Vector3<f64> {
        self.orientation.to_rotation_matrix().matrix().column(0).into_owned()
    }

    pub fn up(&self) -> Vector3<f64> {
        -self.orientation.to_rotation_matrix().matrix().column(1).into_owned()
    }

    /// Returns `(pitch, bearing)` in radians
    pub fn pitch_bearing(&self) -> (f64, f64) {
        let forward = self.forward();
        let right = self.right();
        let bearing = (-right.y).atan2(right.x);
        let pitch = forward.x.hypot(forward.y).atan2(-forward.z);
        (pitch, bearing)
    }

    /// World-to-camera matrix at zoom `scale`. Height values are in meters, so
    /// the z column is scaled by pixels-per-meter at the camera latitude.
    pub fn world_to_camera(&self, scale: f64, flipped_y: bool) -> Matrix4<f64> {
        let world_size = scale * TILE_SIZE;
        let latitude = lat_from_mercator_y(self.position.y);
        let circumference = latitude.to_radians().cos() * 2.0 * PI * EARTH_RADIUS_M;
        let pixels_per_meter = world_size / circumference;

        let mut result = self.orientation.conjugate().to_homogeneous()
            * Matrix4::new_translation(&(-self.position * world_size));

        if !flipped_y {
            for col in 0..4 {
                result[(1, col)] *= -1.0;
            }
        }

        for row in 0..4 {
            result[(row, 2)] *= pixels_per_meter;
        }

        result
    }

    /// OpenGL-style perspective projection
    pub fn camera_to_clip_perspective(
        &self,
        fov_y: f64,
        aspect_ratio: f64,
        near_z: f64,
        far_z: f64,
    ) -> Matrix4<f64> {
        Matrix4::new_perspective(aspect_ratio, fov_y, near_z, far_z)
    }

    /// Both angles are negated to rotate clockwise around their axes
    pub fn orientation_from_pitch_bearing(pitch: f64, bearing: f64) -> UnitQuaternion<f64> {
        let rot_bearing = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), -bearing);
        let rot_pitch = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), -pitch);
        rot_bearing * rot_pitch
    }

    /// Builds the roll-free orientation matching a forward and up direction.
    ///
    /// Returns `None` when the frame is degenerate (e.g. looking straight down
    /// with an up vector parallel to forward).
    pub fn orientation_from_frame(
        forward: &Vector3<f64>,
        up: &Vector3<f64>,
    ) -> Option<UnitQuaternion<f64>> {
        let mut up_vector = *up;
        let xy_forward = Vector2::new(forward.x, forward.y);
        let xy_up = Vector2::new(up.x, up.y);

        // Remove roll by projecting the up vector onto the forward direction.
        if xy_forward.norm() >= FRAME_EPSILON {
            let xy_dir = xy_forward.normalize();
            let projected = xy_dir * xy_up.dot(&xy_dir);
            up_vector.x = projected.x;
            up_vector.y = projected.y;
        }

        let right = up_vector.cross(forward);
        if right.norm() < FRAME_EPSILON {
            return None;
        }

        let bearing = (-right.y).atan2(right.x);
        let pitch = forward.x.hypot(forward.y).atan2(-forward.z);

        Some(Self::orientation_from_pitch_bearing(pitch, bearing))
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_identity_looks_down() {
        let camera = Camera::new();
        assert_eq!(camera.forward(), Vector3::new(0.0, 0.0, -1.0));
        assert_eq!(camera.up(), Vector3::new(0.0, -1.0, 0.0));
        let (pitch, bearing) = camera.pitch_bearing();
        assert!(approx(pitch, 0.0));
        assert!(approx(bearing, 0.0));
    }

    #[test]
    fn test_pitch_bearing_roundtrip() {
        let mut camera = Camera::new();
        camera.set_orientation_from_pitch_bearing(0.6, -1.2);
        let (pitch, bearing) = camera.pitch_bearing();
        assert!(approx(pitch, 0.6));
        assert!(approx(bearing, -1.2));
    }

    #[test]
    fn test_orientation_from_frame_matches_pitch_bearing() {
        let mut camera = Camera::new();
        camera.set_orientation_from_pitch_bearing(0.8, 0.4);
        let q = Camera::orientation_from_frame(&camera.forward(), &camera.up()).unwrap();
        let mut rebuilt = Camera::new();
        rebuilt.set_orientation(q);
        assert!((rebuilt.forward() - camera.forward()).norm() < 1e-9);
        assert!((rebuilt.up() - camera.up()).norm() < 1e-9);
    }

    #[test]
    fn test_orientation_from_degenerate_frame() {
        let forward = Vector3::new(-1.0, 0.0, 0.0);
        let up = Vector3::new(0.0, -1.0, 0.0);
        assert!(Camera::orientation_from_frame(&forward, &up).is_none());
    }

    #[test]
    fn test_world_to_camera_moves_position_to_origin() {
        let mut camera = Camera::new();
        camera.set_position(Vector3::new(0.5, 0.5, 0.25));
        let m = camera.world_to_camera(1.0, true);
        let p = m * nalgebra::Vector4::new(256.0, 256.0, 0.0, 1.0);
        assert!(approx(p.x, 0.0));
        assert!(approx(p.y, 0.0));
    }
}
