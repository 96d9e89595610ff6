//! Damped Gauss–Newton (Levenberg–Marquardt) multilateration solver.
//!
//! Each iteration builds the damped normal equations from the 5x3 residual
//! model, solves them in closed form, applies a trust-region cap to the
//! step, and accepts or rejects the candidate on cost. The z coordinate is
//! soft-clamped into the valid room band so the optimizer stays smooth near
//! the floor/ceiling instead of hitting a hard wall.

use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

use crate::algorithms::linear3::solve_3x3;
use crate::algorithms::residual::residual_and_jacobian;
use crate::core::types::{AnchorSet, MeasurementVector, Point3, SolverResult};

/// Tuning knobs for the LM solver, with defaults from the tuned indoor setup
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Iteration cap; guarantees termination
    pub max_iter: usize,
    /// Initial damping factor λ
    pub lambda_init: f64,
    /// Step-norm convergence tolerance (meters)
    pub tol_step: f64,
    /// Residual-cost convergence tolerance
    pub tol_res: f64,
    /// Lower bound of the valid z band (meters)
    pub z_min: f64,
    /// Upper bound of the valid z band (meters)
    pub z_max: f64,
    /// Trust region: maximum step length per iteration (meters)
    pub max_step: f64,
    /// Best-effort cost threshold: a non-converged solve whose best cost is
    /// below this is still reported as converged
    pub accept_cost: f64,
    /// Default height for the anchor-midpoint initial guess (meters)
    pub init_height: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iter: 120,
            lambda_init: 0.1,
            tol_step: 1e-4,
            tol_res: 1e-6,
            z_min: 0.2,
            z_max: 3.5,
            max_step: 0.25,
            accept_cost: 0.05,
            init_height: 1.5,
        }
    }
}

/// Damping floor after successful steps
const LAMBDA_MIN: f64 = 1e-7;
/// Damping ceiling; exceeding it aborts the solve
const LAMBDA_MAX: f64 = 1e7;
/// Multiplicative damping decay on an accepted step
const LAMBDA_DECAY: f64 = 0.7;
/// Multiplicative damping growth on a rejected step
const LAMBDA_GROWTH: f64 = 2.0;

/// Levenberg–Marquardt multilateration solver
#[derive(Debug, Clone, Copy, Default)]
pub struct LevenbergMarquardt {
    pub config: SolverConfig,
}

impl LevenbergMarquardt {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Solve for the tag position from one measurement vector.
    ///
    /// `init` warm-starts the iteration (typically the filter's current
    /// state); without it, the midpoint of anchors 0 and 3 at the default
    /// height is used. Never fails: degraded conditions surface as
    /// `converged = false` on the best-effort result.
    pub fn solve(
        &self,
        anchors: &AnchorSet,
        s: &MeasurementVector,
        init: Option<Point3>,
    ) -> SolverResult {
        let cfg = &self.config;

        let mut x0 = init.unwrap_or_else(|| {
            let a0 = anchors.get(0);
            let a3 = anchors.get(3);
            Point3::new(
                (a0.x + a3.x) * 0.5,
                (a0.y + a3.y) * 0.5,
                cfg.init_height,
            )
        });

        let mut lambda = cfg.lambda_init;

        let (mut f, mut j) = residual_and_jacobian(anchors, s, &x0);
        let mut chi2 = f.norm_squared();
        let mut converged = false;
        let mut last_good = x0;
        let mut last_good_cost = chi2;
        let mut iterations = 0;

        for it in 0..cfg.max_iter {
            iterations = it + 1;

            let jtj = j.transpose() * j + Matrix3::identity() * lambda;
            let jtf = j.transpose() * f;

            let delta = solve_3x3(&jtj, &(-jtf));
            let step_norm = delta.norm();

            // Trust region: rescale, never truncate direction
            let delta = if step_norm > cfg.max_step {
                delta * (cfg.max_step / step_norm)
            } else {
                delta
            };

            if step_norm < cfg.tol_step && chi2 < last_good_cost + 1e-6 {
                converged = true;
                break;
            }

            let mut candidate = Point3::new(x0.x + delta.x, x0.y + delta.y, x0.z + delta.z);

            // Soft z-clamp: pull halfway toward the bound instead of snapping
            if candidate.z < cfg.z_min {
                candidate.z = (candidate.z + cfg.z_min) * 0.5;
            }
            if candidate.z > cfg.z_max {
                candidate.z = (candidate.z + cfg.z_max) * 0.5;
            }

            let (f_new, j_new) = residual_and_jacobian(anchors, s, &candidate);
            let chi2_new = f_new.norm_squared();

            if chi2_new < chi2 {
                last_good = candidate;
                last_good_cost = chi2_new;
                x0 = candidate;
                f = f_new;
                j = j_new;
                chi2 = chi2_new;

                lambda = (lambda * LAMBDA_DECAY).max(LAMBDA_MIN);

                if chi2 < cfg.tol_res {
                    converged = true;
                    break;
                }
            } else {
                lambda *= LAMBDA_GROWTH;
                if lambda > LAMBDA_MAX {
                    break;
                }
            }
        }

        // Best-effort acceptance: a near-fit is still usable even if the
        // damping schedule never formally converged
        if !converged && last_good_cost < cfg.accept_cost {
            return SolverResult {
                position: last_good,
                iterations: cfg.max_iter,
                converged: true,
                final_cost: last_good_cost,
            };
        }

        SolverResult {
            position: last_good,
            iterations,
            converged,
            final_cost: last_good_cost,
        }
    }
}

/// One-shot convenience wrapper around [`LevenbergMarquardt::solve`]
pub fn solve_position(
    anchors: &AnchorSet,
    s: &MeasurementVector,
    init: Option<Point3>,
    config: SolverConfig,
) -> SolverResult {
    LevenbergMarquardt::new(config).solve(anchors, s, init)
}
