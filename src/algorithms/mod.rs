//! Multilateration solver building blocks

pub mod gamma;
pub mod linear3;
pub mod lm;
pub mod residual;

pub use gamma::{safe_gamma, GammaError};
pub use linear3::solve_3x3;
pub use lm::{LevenbergMarquardt, SolverConfig};
pub use residual::{measurement_from_ground_truth, residual_and_jacobian};
