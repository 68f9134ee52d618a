pub mod interpolation;
pub mod transitions;

// Re-export commonly used types and functions for convenience
pub use interpolation::{angle_between, normalize_angle, wrap, Interpolatable, UnitBezier};
pub use transitions::{Animation, FlightPath, SharedAnimation, TransitionProperties};
