use crate::animation::interpolation::Interpolatable;
use crate::core::constants::{DEFAULT_TRANSITION_EASE, EASE_EPSILON};
use crate::core::geo::{EdgeInsets, LatLng, Point, ScreenCoordinate, WrapMode};
use crate::core::options::AnimationOptions;
use crate::core::projection::unproject;
use crate::core::state::scale_zoom;
use instant::Instant;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

/// Several property slots may point at the same animation (one request that
/// moves center and zoom installs a single animation into both).
pub type SharedAnimation = Rc<RefCell<Animation>>;

/// One in-flight camera transition
#[derive(Debug)]
pub struct Animation {
    start: Instant,
    duration: Duration,
    options: AnimationOptions,
    pub panning: bool,
    pub scaling: bool,
    pub rotating: bool,
    /// Screen point (bottom-left origin) that must keep showing `anchor.1`
    anchor: Option<(ScreenCoordinate, LatLng)>,
    /// Stepped during the current update pass
    pub(crate) ran: bool,
    /// Reached `t == 1`
    pub(crate) done: bool,
    /// Finish callback already delivered
    pub(crate) finished: bool,
}

impl Animation {
    pub fn new(
        start: Instant,
        duration: Duration,
        options: AnimationOptions,
        panning: bool,
        scaling: bool,
        rotating: bool,
    ) -> Self {
        Self {
            start,
            duration,
            options,
            panning,
            scaling,
            rotating,
            anchor: None,
            ran: false,
            done: false,
            finished: false,
        }
    }

    pub fn shared(self) -> SharedAnimation {
        Rc::new(RefCell::new(self))
    }

    pub fn start(&self) -> Instant {
        self.start
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn options(&self) -> &AnimationOptions {
        &self.options
    }

    pub fn is_animated(&self) -> bool {
        !self.duration.is_zero()
    }

    pub fn anchor(&self) -> Option<(ScreenCoordinate, LatLng)> {
        self.anchor
    }

    pub(crate) fn set_anchor(&mut self, anchor: Option<(ScreenCoordinate, LatLng)>) {
        self.anchor = anchor;
    }

    /// Eased progress in `[0, 1]`; exactly `1.0` once the duration has elapsed
    pub fn interpolant(&self, now: Instant) -> f64 {
        if !self.is_animated() {
            return 1.0;
        }
        let elapsed = if now > self.start {
            now - self.start
        } else {
            Duration::ZERO
        };
        let t = elapsed.as_secs_f64() / self.duration.as_secs_f64();
        if t >= 1.0 {
            return 1.0;
        }
        self.options
            .easing
            .unwrap_or(DEFAULT_TRANSITION_EASE)
            .solve(t, EASE_EPSILON)
    }
}

/// Van Wijk & Nuij optimal zoom-and-pan path between two views.
///
/// Distances are in pixels at the starting scale; `s` runs from 0 to
/// [`FlightPath::length`] measured in rho-screenfuls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlightPath {
    w0: f64,
    w1: f64,
    u1: f64,
    rho: f64,
    r0: f64,
    is_close: bool,
    length: f64,
}

impl FlightPath {
    /// `w0`/`w1`: visible span at start and end, `u1`: ground distance,
    /// `rho`: zoom exaggeration
    pub fn new(w0: f64, w1: f64, u1: f64, rho: f64) -> Self {
        let rho2 = rho * rho;
        let r = |descent: bool| {
            let (sign, w) = if descent { (-1.0, w1) } else { (1.0, w0) };
            let b = (w1 * w1 - w0 * w0 + sign * rho2 * rho2 * u1 * u1) / (2.0 * w * rho2 * u1);
            ((b * b + 1.0).sqrt() - b).ln()
        };

        let (r0, r1) = if u1 != 0.0 {
            (r(false), r(true))
        } else {
            (f64::INFINITY, f64::INFINITY)
        };

        // Without ground distance the path degenerates to a pure zoom.
        let is_close = u1.abs() < 0.000001 || !r0.is_finite() || !r1.is_finite();
        let length = if is_close {
            (w1 / w0).ln().abs() / rho
        } else {
            (r1 - r0) / rho
        };

        Self {
            w0,
            w1,
            u1,
            rho,
            r0,
            is_close,
            length,
        }
    }

    pub fn is_close(&self) -> bool {
        self.is_close
    }

    /// Total path length `S`
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Visible span at `s`, relative to the starting span
    pub fn w(&self, s: f64) -> f64 {
        if self.is_close {
            let sign = if self.w1 < self.w0 { -1.0 } else { 1.0 };
            (sign * self.rho * s).exp()
        } else {
            self.r0.cosh() / (self.r0 + self.rho * s).cosh()
        }
    }

    /// Fraction of the ground distance covered at `s`
    pub fn u(&self, s: f64) -> f64 {
        if self.is_close {
            0.0
        } else {
            self.w0 * (self.r0.cosh() * (self.r0 + self.rho * s).tanh() - self.r0.sinh())
                / (self.rho * self.rho)
                / self.u1
        }
    }
}

/// How the zoom slot turns progress into a zoom level
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ZoomFrame {
    Interpolated,
    FlyTo(FlightPath),
}

/// How the center slot turns progress into a coordinate. Points are in world
/// pixels at `scale`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CenterFrame {
    Interpolated { scale: f64 },
    FlyTo { path: FlightPath, scale: f64 },
}

/// One animated property: an animation plus the interpolation endpoints
#[derive(Debug, Clone)]
pub struct PropertySlot<T, F = ()> {
    pub animation: SharedAnimation,
    pub current: T,
    pub target: T,
    pub frame: F,
}

impl<T: Interpolatable, F> PropertySlot<T, F> {
    pub fn new(animation: SharedAnimation, current: T, target: T, frame: F) -> Self {
        Self {
            animation,
            current,
            target,
            frame,
        }
    }

    pub fn interpolant(&self, now: Instant) -> f64 {
        self.animation.borrow().interpolant(now)
    }

    pub fn interpolated(&self, t: f64) -> T {
        self.current.lerp(&self.target, t)
    }
}

impl PropertySlot<f64, ZoomFrame> {
    pub fn frame_zoom(&self, t: f64) -> f64 {
        let zoom = match self.frame {
            ZoomFrame::Interpolated => self.interpolated(t),
            ZoomFrame::FlyTo(path) => self.current + scale_zoom(1.0 / path.w(t * path.length())),
        };
        if zoom.is_nan() {
            self.target
        } else {
            zoom
        }
    }
}

impl PropertySlot<Point, CenterFrame> {
    pub fn frame_lat_lng(&self, t: f64) -> LatLng {
        match self.frame {
            CenterFrame::Interpolated { scale } => {
                unproject(&self.interpolated(t), scale, WrapMode::Unwrapped)
            }
            CenterFrame::FlyTo { path, scale } => {
                let us = if t == 1.0 { 1.0 } else { path.u(t * path.length()) };
                unproject(&self.interpolated(us), scale, WrapMode::Unwrapped)
            }
        }
    }
}

/// The independently animated camera properties. `None` means not animating.
#[derive(Debug, Default)]
pub struct TransitionProperties {
    pub zoom: Option<PropertySlot<f64, ZoomFrame>>,
    pub lat_lng: Option<PropertySlot<Point, CenterFrame>>,
    pub bearing: Option<PropertySlot<f64>>,
    pub padding: Option<PropertySlot<EdgeInsets>>,
    pub pitch: Option<PropertySlot<f64>>,
}

impl TransitionProperties {
    pub fn is_empty(&self) -> bool {
        self.zoom.is_none()
            && self.lat_lng.is_none()
            && self.bearing.is_none()
            && self.padding.is_none()
            && self.pitch.is_none()
    }

    /// Distinct animations referenced by any slot, in slot order
    pub fn animations(&self) -> Vec<SharedAnimation> {
        let candidates = [
            self.lat_lng.as_ref().map(|s| &s.animation),
            self.zoom.as_ref().map(|s| &s.animation),
            self.bearing.as_ref().map(|s| &s.animation),
            self.padding.as_ref().map(|s| &s.animation),
            self.pitch.as_ref().map(|s| &s.animation),
        ];
        let mut unique: Vec<SharedAnimation> = Vec::new();
        for animation in candidates.into_iter().flatten() {
            if !unique.iter().any(|a| Rc::ptr_eq(a, animation)) {
                unique.push(animation.clone());
            }
        }
        unique
    }

    /// Clears every slot whose animation has completed
    pub fn clear_done(&mut self) {
        fn keep<T, F>(slot: &mut Option<PropertySlot<T, F>>) {
            if slot.as_ref().is_some_and(|s| s.animation.borrow().done) {
                *slot = None;
            }
        }
        keep(&mut self.zoom);
        keep(&mut self.lat_lng);
        keep(&mut self.bearing);
        keep(&mut self.padding);
        keep(&mut self.pitch);
    }
}
