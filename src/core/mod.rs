pub mod config;
pub mod constants;
pub mod geo;
pub mod options;
pub mod projection;
pub mod state;
pub mod transform;
