use crate::core::geo::Point;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Interpolation trait for values that can be smoothly transitioned
pub trait Interpolatable {
    fn lerp(&self, other: &Self, t: f64) -> Self;
}

impl Interpolatable for f64 {
    fn lerp(&self, other: &Self, t: f64) -> Self {
        (1.0 - t) * self + t * other
    }
}

/// Cubic bezier easing curve through `(0, 0)`, `(p1x, p1y)`, `(p2x, p2y)`, `(1, 1)`.
///
/// Same parameterisation as CSS `cubic-bezier()`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitBezier {
    pub p1x: f64,
    pub p1y: f64,
    pub p2x: f64,
    pub p2y: f64,
}

impl UnitBezier {
    pub const LINEAR: UnitBezier = UnitBezier::new(0.0, 0.0, 1.0, 1.0);
    pub const EASE: UnitBezier = UnitBezier::new(0.25, 0.1, 0.25, 1.0);
    pub const EASE_IN: UnitBezier = UnitBezier::new(0.42, 0.0, 1.0, 1.0);
    pub const EASE_OUT: UnitBezier = UnitBezier::new(0.0, 0.0, 0.58, 1.0);
    pub const EASE_IN_OUT: UnitBezier = UnitBezier::new(0.42, 0.0, 0.58, 1.0);

    pub const fn new(p1x: f64, p1y: f64, p2x: f64, p2y: f64) -> Self {
        Self { p1x, p1y, p2x, p2y }
    }

    /// Polynomial coefficients `(a, b, c)` of one axis
    fn coefficients(p1: f64, p2: f64) -> (f64, f64, f64) {
        let c = 3.0 * p1;
        let b = 3.0 * (p2 - p1) - c;
        let a = 1.0 - c - b;
        (a, b, c)
    }

    fn sample_curve_x(&self, t: f64) -> f64 {
        let (a, b, c) = Self::coefficients(self.p1x, self.p2x);
        ((a * t + b) * t + c) * t
    }

    fn sample_curve_y(&self, t: f64) -> f64 {
        let (a, b, c) = Self::coefficients(self.p1y, self.p2y);
        ((a * t + b) * t + c) * t
    }

    fn sample_curve_derivative_x(&self, t: f64) -> f64 {
        let (a, b, c) = Self::coefficients(self.p1x, self.p2x);
        (3.0 * a * t + 2.0 * b) * t + c
    }

    /// Finds the curve parameter whose x equals `x`. Newton's method first,
    /// bisection when the derivative flattens out.
    fn solve_curve_x(&self, x: f64, epsilon: f64) -> f64 {
        let mut t2 = x;
        for _ in 0..8 {
            let x2 = self.sample_curve_x(t2) - x;
            if x2.abs() < epsilon {
                return t2;
            }
            let d2 = self.sample_curve_derivative_x(t2);
            if d2.abs() < 1e-6 {
                break;
            }
            t2 -= x2 / d2;
        }

        let mut t0 = 0.0;
        let mut t1 = 1.0;
        t2 = x;
        if t2 < t0 {
            return t0;
        }
        if t2 > t1 {
            return t1;
        }

        while t0 < t1 {
            let x2 = self.sample_curve_x(t2);
            if (x2 - x).abs() < epsilon {
                return t2;
            }
            if x > x2 {
                t0 = t2;
            } else {
                t1 = t2;
            }
            t2 = (t1 - t0) * 0.5 + t0;
        }

        t2
    }

    /// Eased progress for linear progress `x` in `[0, 1]`
    pub fn solve(&self, x: f64, epsilon: f64) -> f64 {
        self.sample_curve_y(self.solve_curve_x(x, epsilon))
    }
}

impl Default for UnitBezier {
    fn default() -> Self {
        crate::core::constants::DEFAULT_TRANSITION_EASE
    }
}

/// Wraps `value` into `[min, max)`
pub fn wrap(value: f64, min: f64, max: f64) -> f64 {
    if value >= min && value < max {
        return value;
    }
    if value == max {
        return min;
    }
    let delta = max - min;
    ((value - min) % delta + delta) % delta + min
}

/// Converts `angle` (radians) to the representative closest to `anchor`, so
/// interpolating between the two never spins the long way round.
pub fn normalize_angle(angle: f64, anchor: f64) -> f64 {
    if angle.is_nan() || anchor.is_nan() {
        return 0.0;
    }

    let mut angle = wrap(angle, -PI, PI);
    if angle == -PI {
        angle = PI;
    }
    let diff = (angle - anchor).abs();
    if (angle - 2.0 * PI - anchor).abs() < diff {
        angle -= 2.0 * PI;
    }
    if (angle + 2.0 * PI - anchor).abs() < diff {
        angle += 2.0 * PI;
    }
    angle
}

/// Signed angle in radians from `a` to `b`
pub fn angle_between(a: &Point, b: &Point) -> f64 {
    (a.x * b.y - a.y * b.x).atan2(a.x * b.x + a.y * b.y)
}
