//! Adaptive robust Kalman filter for tag trajectory smoothing.
//!
//! 3-state constant-position filter over the solver's position output
//! (identity observation model). Each update reweights the measurement
//! noise per axis with the GMC kernel, so outliers inflate their own axis's
//! variance and shrink that axis's gain instead of dragging the whole
//! state. A cost gate skips updates fed by a distrusted solve.

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::core::types::Point3;
use crate::filtering::gmc::{adaptive_beta, gmc_weights, robust_sigma};

/// Filter tuning, defaults from the tuned indoor tracking setup
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Process variance q (m²/s); high values trust the process model when
    /// the measurement looks suspicious
    pub process_var: f64,
    /// Base measurement variance r (m²)
    pub meas_var: f64,
    /// GMC shape parameter α; 1.0 (Laplace) rejects outliers aggressively
    pub alpha: f64,
    /// Fallback kernel bandwidth when the adaptive estimate fails
    pub beta_init: f64,
    /// Solver-cost gate: updates with a higher reported cost are skipped
    pub gate_max_cost: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            process_var: 0.9,
            meas_var: 0.25,
            alpha: 1.0,
            beta_init: 1.0,
            gate_max_cost: 2.0,
        }
    }
}

/// Construction-time position uncertainty (large, for fast convergence)
const INITIAL_P: f64 = 10.0;
/// Post-reset position uncertainty (moderate trust in the solver estimate)
const RESET_P: f64 = 0.5;
/// Weight regularizer: keeps the effective variance finite at weight 0
const WEIGHT_EPS: f64 = 1e-8;
/// Tikhonov ridge for the innovation-covariance inverse fallback
const S_RIDGE: f64 = 1e-9;

/// Diagnostic record of one filter update
#[derive(Debug, Clone)]
pub struct UpdateTrace {
    /// Update was skipped by the cost gate; numeric fields are NaN
    pub gated: bool,
    /// Why the update was skipped
    pub gate_reason: Option<String>,
    /// Innovation `meas − x` per axis
    pub innovation: Vector3<f64>,
    /// MAD-based robust innovation scale
    pub sigma: f64,
    /// Adaptive kernel bandwidth
    pub beta: f64,
    /// Per-axis GMC weights
    pub weights: Vector3<f64>,
    /// Effective measurement-variance diagonal `r / (w + ε)`
    pub r_diag: Vector3<f64>,
}

impl UpdateTrace {
    fn gated(reason: &str) -> Self {
        Self {
            gated: true,
            gate_reason: Some(reason.to_string()),
            innovation: Vector3::repeat(f64::NAN),
            sigma: f64::NAN,
            beta: f64::NAN,
            weights: Vector3::repeat(f64::NAN),
            r_diag: Vector3::repeat(f64::NAN),
        }
    }
}

/// Adaptive GMC-weighted Kalman filter over 3D position.
///
/// One instance per tracked tag; state is never shared.
#[derive(Debug, Clone)]
pub struct AdaptiveGmcKalman {
    pub config: FilterConfig,
    /// Position estimate
    x: Vector3<f64>,
    /// State covariance
    p: Matrix3<f64>,
}

impl AdaptiveGmcKalman {
    pub fn new(config: FilterConfig) -> Self {
        Self {
            config,
            x: Vector3::zeros(),
            p: Matrix3::identity() * INITIAL_P,
        }
    }

    /// Hard-reset the state to a known position (first fix, or
    /// re-acquisition after an occlusion). Always allowed.
    pub fn reset(&mut self, x0: Point3) {
        self.x = x0.to_vector();
        self.p = Matrix3::identity() * RESET_P;
    }

    /// Time update: inflate covariance, leave the position unchanged
    /// (constant-position process model for a slow-moving tag).
    pub fn predict(&mut self, dt: f64) {
        self.p += Matrix3::identity() * (self.config.process_var * dt);
    }

    /// Measurement update with optional solver-cost gating.
    ///
    /// When `solver_cost` exceeds the gate, the state is returned
    /// unchanged. Returns the (possibly unchanged) position estimate.
    pub fn update(&mut self, meas: Point3, solver_cost: Option<f64>) -> Point3 {
        self.update_debug(meas, solver_cost).0
    }

    /// Like [`update`](Self::update), but also returns the per-update
    /// diagnostics (innovation, scale, bandwidth, weights, gate outcome).
    pub fn update_debug(&mut self, meas: Point3, solver_cost: Option<f64>) -> (Point3, UpdateTrace) {
        if let Some(cost) = solver_cost {
            if cost > self.config.gate_max_cost {
                return (self.position(), UpdateTrace::gated("solver cost above gate"));
            }
        }

        let z = meas.to_vector();
        let v = z - self.x; // innovation, H = I

        let sigma = robust_sigma(&v);
        let beta = adaptive_beta(sigma, self.config.alpha, self.config.beta_init);
        let w = gmc_weights(&v, self.config.alpha, beta);

        let r_diag = Vector3::new(
            self.config.meas_var / (w.x + WEIGHT_EPS),
            self.config.meas_var / (w.y + WEIGHT_EPS),
            self.config.meas_var / (w.z + WEIGHT_EPS),
        );
        let r_eff = Matrix3::from_diagonal(&r_diag);

        // Innovation covariance and gain; S = P + R since H = I
        let s_mat = self.p + r_eff;
        let s_inv = match s_mat.try_inverse() {
            Some(inv) => inv,
            // Ridge retry; a still-singular S yields zero gain, i.e. the
            // measurement is ignored for this cycle
            None => (s_mat + Matrix3::identity() * S_RIDGE)
                .try_inverse()
                .unwrap_or_else(Matrix3::zeros),
        };
        let k = self.p * s_inv;

        self.x += k * v;
        self.p = (Matrix3::identity() - k) * self.p;

        let trace = UpdateTrace {
            gated: false,
            gate_reason: None,
            innovation: v,
            sigma,
            beta,
            weights: w,
            r_diag,
        };
        (self.position(), trace)
    }

    /// Current position estimate
    pub fn position(&self) -> Point3 {
        Point3::from_vector(&self.x)
    }

    /// Current state covariance
    pub fn covariance(&self) -> &Matrix3<f64> {
        &self.p
    }
}

impl Default for AdaptiveGmcKalman {
    fn default() -> Self {
        Self::new(FilterConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;
    use rand_distr::{Distribution, Normal};

    #[test]
    fn test_reset_sets_state_and_covariance() {
        let mut kf = AdaptiveGmcKalman::default();
        kf.reset(Point3::new(2.0, 3.0, 1.5));
        assert_eq!(kf.position(), Point3::new(2.0, 3.0, 1.5));
        assert_eq!(kf.covariance()[(0, 0)], RESET_P);
    }

    #[test]
    fn test_predict_leaves_position_unchanged() {
        let mut kf = AdaptiveGmcKalman::default();
        kf.reset(Point3::new(1.0, 2.0, 1.2));
        let p_before = kf.covariance()[(1, 1)];
        kf.predict(0.1);
        assert_eq!(kf.position(), Point3::new(1.0, 2.0, 1.2));
        assert!(kf.covariance()[(1, 1)] > p_before);
    }

    #[test]
    fn test_gated_update_leaves_state_unchanged() {
        let mut kf = AdaptiveGmcKalman::default();
        kf.reset(Point3::new(2.0, 2.0, 1.5));
        let before = kf.position();
        let p_before = *kf.covariance();

        let (pos, trace) = kf.update_debug(Point3::new(9.0, 9.0, 9.0), Some(5.0));

        assert!(trace.gated);
        assert!(trace.gate_reason.is_some());
        assert_eq!(pos, before);
        assert_eq!(*kf.covariance(), p_before);
    }

    #[test]
    fn test_update_moves_toward_measurement() {
        let mut kf = AdaptiveGmcKalman::default();
        kf.reset(Point3::new(0.0, 0.0, 1.0));
        kf.predict(0.1);
        let pos = kf.update(Point3::new(0.5, 0.5, 1.0), None);
        assert!(pos.x > 0.0 && pos.x < 0.5);
        assert!(pos.y > 0.0 && pos.y < 0.5);
    }

    #[test]
    fn test_covariance_contracts_on_update() {
        let mut kf = AdaptiveGmcKalman::default();
        kf.reset(Point3::new(1.0, 1.0, 1.0));
        kf.predict(0.1);
        let p_before = kf.covariance()[(0, 0)];
        kf.update(Point3::new(1.05, 0.95, 1.0), None);
        assert!(kf.covariance()[(0, 0)] < p_before);
    }

    #[test]
    fn test_single_outlier_is_rejected_per_axis() {
        let truth = Point3::new(2.5, 2.5, 1.5);
        let mut kf = AdaptiveGmcKalman::default();
        kf.reset(truth);

        let mut rng = StdRng::seed_from_u64(2024);
        let normal = Normal::new(0.0, 0.2).unwrap();

        let mut raw_err_sum = 0.0;
        let mut est_err_sum = 0.0;
        let mut outlier_weights = None;

        for cycle in 1..=30 {
            let mut meas = Point3::new(
                truth.x + normal.sample(&mut rng),
                truth.y + normal.sample(&mut rng),
                truth.z + normal.sample(&mut rng),
            );
            if cycle == 15 {
                meas.z += 1.8;
            }

            kf.predict(0.1);
            let (est, trace) = kf.update_debug(meas, None);

            if cycle == 15 {
                outlier_weights = Some(trace.weights);
            }

            raw_err_sum += (meas.to_vector() - truth.to_vector()).norm();
            est_err_sum += (est.to_vector() - truth.to_vector()).norm();
        }

        assert!(
            est_err_sum < raw_err_sum,
            "filter mean error {} not below raw mean error {}",
            est_err_sum / 30.0,
            raw_err_sum / 30.0
        );

        let w = outlier_weights.expect("cycle 15 traced");
        assert!(w.z < w.x, "outlier axis weight {} not below x weight {}", w.z, w.x);
        assert!(w.z < w.y, "outlier axis weight {} not below y weight {}", w.z, w.y);
    }
}
