//! UWB Indoor Positioning Core
//!
//! Estimates the 3D position of a moving tag from hybrid TDOA/TOA range
//! measurements against four fixed anchors, then smooths the trajectory
//! with an adaptive GMC-weighted robust Kalman filter. The two stages are
//! bound by a warm-start/gating protocol: the filter seeds each solve, and
//! the solver's cost decides whether its output is trusted, gated, or
//! treated as a re-acquisition.

pub mod algorithms;
pub mod core;
pub mod filtering;
pub mod fusion;
pub mod utils;
pub mod validation;

// Re-export commonly used types
pub use crate::core::{AnchorSet, MeasurementVector, Point3, SolverResult, TrackerOutput};
pub use algorithms::gamma::{safe_gamma, GammaError};
pub use algorithms::lm::{LevenbergMarquardt, SolverConfig};
pub use algorithms::residual::{measurement_from_ground_truth, residual_and_jacobian};
pub use filtering::kalman::{AdaptiveGmcKalman, FilterConfig, UpdateTrace};
pub use fusion::{room_to_solver, solver_to_room, FusionConfig, TagTracker};
pub use utils::config::{ConfigError, SystemConfig};
pub use validation::accuracy::{AccuracyStatistics, AccuracyValidator};
