//! Spherical mercator helpers.
//!
//! Two coordinate spaces are used: world pixels at a given scale, where the
//! world spans `scale * TILE_SIZE` pixels, and mercator-normalized units where it
//! spans `[0, 1]` on both axes (origin at the north-west corner).

use crate::core::constants::{
    DEGREES_MAX, EARTH_RADIUS_M, LATITUDE_MAX, LONGITUDE_MAX, MAX_ZOOM, MIN_ZOOM, TILE_SIZE,
};
use crate::core::geo::{LatLng, Point, WrapMode};
use std::f64::consts::PI;

pub fn world_size(scale: f64) -> f64 {
    scale * TILE_SIZE
}

pub fn project(lat_lng: &LatLng, scale: f64) -> Point {
    let lat = lat_lng.lat.clamp(-LATITUDE_MAX, LATITUDE_MAX);
    let point = Point::new(
        LONGITUDE_MAX + lat_lng.lng,
        LONGITUDE_MAX - (PI / 4.0 + lat * PI / DEGREES_MAX).tan().ln().to_degrees(),
    );
    point.multiply(world_size(scale) / DEGREES_MAX)
}

pub fn unproject(point: &Point, scale: f64, wrap_mode: WrapMode) -> LatLng {
    let p2 = point.multiply(DEGREES_MAX / world_size(scale));
    LatLng::with_wrap(
        DEGREES_MAX / PI * ((LONGITUDE_MAX - p2.y).to_radians()).exp().atan() - 90.0,
        p2.x - LONGITUDE_MAX,
        wrap_mode,
    )
}

pub fn meters_per_pixel_at_latitude(lat: f64, zoom: f64) -> f64 {
    let scale = 2f64.powf(zoom.clamp(MIN_ZOOM, MAX_ZOOM));
    let lat = lat.clamp(-LATITUDE_MAX, LATITUDE_MAX);
    lat.to_radians().cos() * 2.0 * PI * EARTH_RADIUS_M / world_size(scale)
}

pub fn mercator_x_from_lng(lng: f64) -> f64 {
    (LONGITUDE_MAX + lng) / DEGREES_MAX
}

pub fn mercator_y_from_lat(lat: f64) -> f64 {
    (LONGITUDE_MAX - (PI / 4.0 + lat * PI / DEGREES_MAX).tan().ln().to_degrees()) / DEGREES_MAX
}

pub fn lat_from_mercator_y(y: f64) -> f64 {
    (2.0 * (PI - y * 2.0 * PI).exp().atan() - PI / 2.0).to_degrees()
}

pub fn lat_lng_from_mercator(point: &Point) -> LatLng {
    LatLng::new(lat_from_mercator_y(point.y), point.x * DEGREES_MAX - LONGITUDE_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_origin_and_corners() {
        let center = project(&LatLng::new(0.0, 0.0), 1.0);
        assert!((center.x - 256.0).abs() < 1e-9);
        assert!((center.y - 256.0).abs() < 1e-9);

        let north_west = project(&LatLng::new(90.0, -180.0), 1.0);
        assert!(north_west.x.abs() < 1e-9);
        assert!(north_west.y.abs() < 1e-6);
    }

    #[test]
    fn test_unproject_inverts_project() {
        let sf = LatLng::new(37.7749, -122.4194);
        let back = unproject(&project(&sf, 1024.0), 1024.0, WrapMode::Unwrapped);
        assert!((back.lat - sf.lat).abs() < 1e-9);
        assert!((back.lng - sf.lng).abs() < 1e-9);
    }

    #[test]
    fn test_mercator_normalized_helpers() {
        assert!((mercator_x_from_lng(0.0) - 0.5).abs() < 1e-12);
        assert!((mercator_y_from_lat(0.0) - 0.5).abs() < 1e-12);
        let mercator = Point::new(mercator_x_from_lng(24.9), mercator_y_from_lat(60.2));
        let ll = lat_lng_from_mercator(&mercator);
        assert!((ll.lat - 60.2).abs() < 1e-9);
        assert!((ll.lng - 24.9).abs() < 1e-9);
    }

    #[test]
    fn test_meters_per_pixel_at_equator() {
        let mpp = meters_per_pixel_at_latitude(0.0, 0.0);
        assert!((mpp - 2.0 * PI * EARTH_RADIUS_M / 512.0).abs() < 1e-6);
        assert!(meters_per_pixel_at_latitude(60.0, 0.0) < mpp);
    }
}
