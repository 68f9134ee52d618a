use crate::animation::interpolation::{wrap, Interpolatable};
use crate::core::constants::{DEGREES_MAX, LONGITUDE_MAX};
use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Sub};

/// Whether a longitude is reported as-is or folded into `[-180, 180)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WrapMode {
    #[default]
    Unwrapped,
    Wrapped,
}

/// Represents a geographical coordinate with latitude and longitude.
///
/// Longitude is not wrapped on construction; an unwrapped longitude such as
/// `283.0` carries the number of world copies travelled, which animations rely on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    /// Creates a new LatLng coordinate
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Creates a coordinate, folding the longitude when `mode` is `Wrapped`
    pub fn with_wrap(lat: f64, lng: f64, mode: WrapMode) -> Self {
        let point = Self::new(lat, lng);
        match mode {
            WrapMode::Unwrapped => point,
            WrapMode::Wrapped => point.wrapped(),
        }
    }

    pub fn is_nan(&self) -> bool {
        self.lat.is_nan() || self.lng.is_nan()
    }

    /// Returns a copy with the longitude wrapped to `[-180, 180)`
    pub fn wrapped(&self) -> Self {
        Self::new(self.lat, wrap(self.lng, -LONGITUDE_MAX, LONGITUDE_MAX))
    }

    /// Shifts this longitude by one world when `end` is more than half a world
    /// (but less than a full one) away, so interpolation takes the short way round.
    pub fn unwrap_for_shortest_path(&mut self, end: &LatLng) {
        let delta = (end.lng - self.lng).abs();
        if delta <= LONGITUDE_MAX || delta >= DEGREES_MAX {
            return;
        }
        if self.lng > 0.0 && end.lng < 0.0 {
            self.lng -= DEGREES_MAX;
        } else if self.lng < 0.0 && end.lng > 0.0 {
            self.lng += DEGREES_MAX;
        }
    }
}

impl Default for LatLng {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

impl Interpolatable for LatLng {
    fn lerp(&self, other: &Self, t: f64) -> Self {
        LatLng::new(self.lat.lerp(&other.lat, t), self.lng.lerp(&other.lng, t))
    }
}

/// Represents a point in screen or projected coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Screen pixel position
pub type ScreenCoordinate = Point;

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn add(&self, other: &Point) -> Point {
        Point::new(self.x + other.x, self.y + other.y)
    }

    pub fn subtract(&self, other: &Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }

    pub fn multiply(&self, scalar: f64) -> Point {
        Point::new(self.x * scalar, self.y * scalar)
    }

    pub fn divide(&self, scalar: f64) -> Point {
        Point::new(self.x / scalar, self.y / scalar)
    }
}

impl Default for Point {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::add(&self, &rhs)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        self.subtract(&rhs)
    }
}

impl Mul<f64> for Point {
    type Output = Point;
    fn mul(self, rhs: f64) -> Point {
        self.multiply(rhs)
    }
}

impl Div<f64> for Point {
    type Output = Point;
    fn div(self, rhs: f64) -> Point {
        self.divide(rhs)
    }
}

impl Interpolatable for Point {
    fn lerp(&self, other: &Self, t: f64) -> Self {
        Point::new(self.x.lerp(&other.x, t), self.y.lerp(&other.y, t))
    }
}

/// Represents a bounding box of geographical coordinates.
///
/// The default value is *unbounded*: `constrain` returns its input unchanged and
/// arbitrary unwrapped longitudes are considered inside. This differs from
/// [`LatLngBounds::world`], which is a real box.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LatLngBounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
    bounded: bool,
}

impl LatLngBounds {
    pub fn new(south_west: LatLng, north_east: LatLng) -> Self {
        Self {
            south_west,
            north_east,
            bounded: true,
        }
    }

    /// The "no constraint" bounds
    pub fn unbounded() -> Self {
        Self {
            south_west: LatLng::new(-90.0, -180.0),
            north_east: LatLng::new(90.0, 180.0),
            bounded: false,
        }
    }

    /// Bounds covering the entire (unwrapped) world
    pub fn world() -> Self {
        Self::new(LatLng::new(-90.0, -180.0), LatLng::new(90.0, 180.0))
    }

    /// Bounds consisting of a single point
    pub fn singleton(point: LatLng) -> Self {
        Self::new(point, point)
    }

    /// The smallest bounds that contains both points
    pub fn hull(a: LatLng, b: LatLng) -> Self {
        let mut bounds = Self::singleton(a);
        bounds.extend(&b);
        bounds
    }

    /// Identity element for `extend`: an inverted world box
    pub fn empty() -> Self {
        Self::new(LatLng::new(90.0, 180.0), LatLng::new(-90.0, -180.0))
    }

    /// Creates bounds from individual coordinates
    pub fn from_coords(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self::new(LatLng::new(south, west), LatLng::new(north, east))
    }

    pub fn is_bounded(&self) -> bool {
        self.bounded
    }

    pub fn valid(&self) -> bool {
        self.south_west.lat <= self.north_east.lat && self.south_west.lng <= self.north_east.lng
    }

    pub fn is_empty(&self) -> bool {
        self.south_west.lat > self.north_east.lat || self.south_west.lng > self.north_east.lng
    }

    pub fn south(&self) -> f64 {
        self.south_west.lat
    }

    pub fn west(&self) -> f64 {
        self.south_west.lng
    }

    pub fn north(&self) -> f64 {
        self.north_east.lat
    }

    pub fn east(&self) -> f64 {
        self.north_east.lng
    }

    pub fn crosses_antimeridian(&self) -> bool {
        self.south_west.wrapped().lng > self.north_east.wrapped().lng
    }

    /// Checks if the bounds contain a point
    pub fn contains(&self, point: &LatLng) -> bool {
        point.lat >= self.south()
            && point.lat <= self.north()
            && point.lng >= self.west()
            && point.lng <= self.east()
    }

    /// Clamps a point lying outside the bounds onto its nearest edge
    pub fn constrain(&self, point: &LatLng) -> LatLng {
        if !self.bounded || self.contains(point) {
            return *point;
        }
        LatLng::new(
            point.lat.max(self.south()).min(self.north()),
            point.lng.max(self.west()).min(self.east()),
        )
    }

    /// Extends the bounds to include a point
    pub fn extend(&mut self, point: &LatLng) {
        self.south_west.lat = self.south_west.lat.min(point.lat);
        self.south_west.lng = self.south_west.lng.min(point.lng);
        self.north_east.lat = self.north_east.lat.max(point.lat);
        self.north_east.lng = self.north_east.lng.max(point.lng);
    }

    /// Gets the center point of the bounds
    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south_west.lat + self.north_east.lat) / 2.0,
            (self.south_west.lng + self.north_east.lng) / 2.0,
        )
    }
}

impl Default for LatLngBounds {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl PartialEq for LatLngBounds {
    fn eq(&self, other: &Self) -> bool {
        (!self.bounded && !other.bounded)
            || (self.bounded
                && other.bounded
                && self.south_west == other.south_west
                && self.north_east == other.north_east)
    }
}

/// Per-side padding in pixels that shifts the effective viewport center
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EdgeInsets {
    pub top: f64,
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
}

impl EdgeInsets {
    pub fn new(top: f64, left: f64, bottom: f64, right: f64) -> Self {
        Self {
            top,
            left,
            bottom,
            right,
        }
    }

    pub fn is_flush(&self) -> bool {
        self.top == 0.0 && self.left == 0.0 && self.bottom == 0.0 && self.right == 0.0
    }

    /// Center of the padded rectangle inside a `width` x `height` viewport
    pub fn center(&self, width: u32, height: u32) -> ScreenCoordinate {
        let width = f64::from(width);
        let height = f64::from(height);
        Point::new(
            (width - self.left - self.right) / 2.0 + self.left,
            (height - self.top - self.bottom) / 2.0 + self.top,
        )
    }
}

impl Interpolatable for EdgeInsets {
    fn lerp(&self, other: &Self, t: f64) -> Self {
        EdgeInsets::new(
            self.top.lerp(&other.top, t),
            self.left.lerp(&other.left, t),
            self.bottom.lerp(&other.bottom, t),
            self.right.lerp(&other.right, t),
        )
    }
}

/// Viewport dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A slippy-map tile coordinate together with the world copy it lies in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnwrappedTileId {
    pub wrap: i32,
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl UnwrappedTileId {
    pub fn new(wrap: i32, z: u8, x: u32, y: u32) -> Self {
        Self { wrap, z, x, y }
    }
}
