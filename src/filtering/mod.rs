//! Robust temporal filtering of solver outputs

pub mod gmc;
pub mod kalman;

pub use gmc::{adaptive_beta, gmc_kernel, gmc_weights, robust_sigma};
pub use kalman::{AdaptiveGmcKalman, FilterConfig, UpdateTrace};
