//! Synthetic-noise accuracy trials for the solver and the tracker.
//!
//! Drives the full pipeline with ground-truth-derived measurements plus
//! Gaussian range noise, and accumulates error statistics. Used by the demo
//! binary and by integration tests; a live deployment has no ground truth
//! and never touches this module.

use std::collections::VecDeque;

use rand::prelude::*;

use crate::algorithms::lm::{solve_position, SolverConfig};
use crate::algorithms::residual::measurement_from_ground_truth;
use crate::core::geometry::distance;
use crate::core::types::{AnchorSet, Point3};
use crate::filtering::kalman::FilterConfig;
use crate::fusion::{FusionConfig, TagTracker};

/// One trial's error record
#[derive(Debug, Clone, Copy)]
pub struct TrialError {
    pub true_position: Point3,
    pub estimated_position: Point3,
    pub error_m: f64,
    pub converged: bool,
}

/// Error statistics over a batch of trials
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccuracyStatistics {
    pub mean_error_m: f64,
    pub rmse_m: f64,
    pub p95_error_m: f64,
    pub max_error_m: f64,
    pub convergence_rate: f64,
    pub sample_count: usize,
}

/// Accumulates trial errors and computes statistics
pub struct AccuracyValidator {
    history: VecDeque<TrialError>,
    max_history: usize,
}

impl Default for AccuracyValidator {
    fn default() -> Self {
        Self {
            history: VecDeque::new(),
            max_history: 1000,
        }
    }
}

impl AccuracyValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, trial: TrialError) {
        self.history.push_back(trial);
        while self.history.len() > self.max_history {
            self.history.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    pub fn statistics(&self) -> AccuracyStatistics {
        let n = self.history.len();
        if n == 0 {
            return AccuracyStatistics {
                mean_error_m: 0.0,
                rmse_m: 0.0,
                p95_error_m: 0.0,
                max_error_m: 0.0,
                convergence_rate: 0.0,
                sample_count: 0,
            };
        }

        let mean_error_m =
            self.history.iter().map(|t| t.error_m).sum::<f64>() / n as f64;
        let rmse_m = (self.history.iter().map(|t| t.error_m * t.error_m).sum::<f64>()
            / n as f64)
            .sqrt();
        let max_error_m = self.history.iter().map(|t| t.error_m).fold(0.0, f64::max);
        let convergence_rate =
            self.history.iter().filter(|t| t.converged).count() as f64 / n as f64;

        let mut sorted: Vec<f64> = self.history.iter().map(|t| t.error_m).collect();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let idx = ((n as f64 * 0.95).ceil() as usize).saturating_sub(1);
        let p95_error_m = sorted[idx.min(n - 1)];

        AccuracyStatistics {
            mean_error_m,
            rmse_m,
            p95_error_m,
            max_error_m,
            convergence_rate,
            sample_count: n,
        }
    }

    /// Random-region trial: cold solves at uniformly random tag positions
    /// inside the anchor footprint, with Gaussian range noise.
    pub fn run_solver_trials<R: Rng + ?Sized>(
        &mut self,
        anchors: &AnchorSet,
        solver_config: SolverConfig,
        noise_std_m: f64,
        num_trials: usize,
        rng: &mut R,
    ) -> AccuracyStatistics {
        self.clear();

        for _ in 0..num_trials {
            let tag = Point3::new(
                rng.gen_range(0.5..4.5),
                rng.gen_range(0.5..4.5),
                rng.gen_range(1.0..2.0),
            );
            let s = measurement_from_ground_truth(anchors, &tag, noise_std_m, rng);
            let result = solve_position(anchors, &s, None, solver_config);

            self.record(TrialError {
                true_position: tag,
                estimated_position: result.position,
                error_m: distance(&tag, &result.position),
                converged: result.converged,
            });
        }

        self.statistics()
    }

    /// Stationary-tag tracking trial: runs the full tracker for
    /// `num_cycles` and reports (raw solver stats, filtered stats).
    pub fn run_tracking_trial<R: Rng + ?Sized>(
        &mut self,
        anchors: &AnchorSet,
        tag: Point3,
        noise_std_m: f64,
        num_cycles: usize,
        rng: &mut R,
    ) -> (AccuracyStatistics, AccuracyStatistics) {
        let fusion = FusionConfig {
            height_prior_alpha: 0.0,
            ..FusionConfig::default()
        };
        let mut tracker = TagTracker::new(fusion, SolverConfig::default(), FilterConfig::default());

        let mut raw = AccuracyValidator::new();
        self.clear();

        for _ in 0..num_cycles {
            let s = measurement_from_ground_truth(anchors, &tag, noise_std_m, rng);
            let out = tracker.step(anchors, &s);

            raw.record(TrialError {
                true_position: tag,
                estimated_position: out.solver.position,
                error_m: distance(&tag, &out.solver.position),
                converged: out.solver.converged,
            });
            self.record(TrialError {
                true_position: tag,
                estimated_position: out.position,
                error_m: distance(&tag, &out.position),
                converged: out.solver.converged,
            });
        }

        (raw.statistics(), self.statistics())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_room_anchors() -> AnchorSet {
        AnchorSet::new([
            Point3::new(0.0, 0.0, 2.0),
            Point3::new(5.0, 0.0, 2.6),
            Point3::new(0.0, 5.0, 2.3),
            Point3::new(5.0, 5.0, 2.9),
        ])
    }

    #[test]
    fn test_empty_statistics_are_zero() {
        let validator = AccuracyValidator::new();
        let stats = validator.statistics();
        assert_eq!(stats.sample_count, 0);
        assert_eq!(stats.mean_error_m, 0.0);
    }

    #[test]
    fn test_random_region_trials_stay_accurate() {
        let anchors = square_room_anchors();
        let mut validator = AccuracyValidator::new();
        let mut rng = StdRng::seed_from_u64(123);

        let stats = validator.run_solver_trials(
            &anchors,
            SolverConfig::default(),
            0.05,
            30,
            &mut rng,
        );

        assert_eq!(stats.sample_count, 30);
        assert!(stats.convergence_rate > 0.9, "rate {}", stats.convergence_rate);
        assert!(stats.mean_error_m < 0.3, "mean error {} m", stats.mean_error_m);
        assert!(stats.p95_error_m >= stats.mean_error_m * 0.5);
        assert!(stats.max_error_m >= stats.p95_error_m);
    }

    #[test]
    fn test_filtering_improves_on_raw_solver() {
        let anchors = square_room_anchors();
        let mut validator = AccuracyValidator::new();
        let mut rng = StdRng::seed_from_u64(456);

        let (raw, filtered) = validator.run_tracking_trial(
            &anchors,
            Point3::new(2.5, 2.5, 1.5),
            0.02,
            60,
            &mut rng,
        );

        assert_eq!(raw.sample_count, 60);
        assert!(
            filtered.mean_error_m < raw.mean_error_m,
            "filtered {} m not below raw {} m",
            filtered.mean_error_m,
            raw.mean_error_m
        );
    }

    #[test]
    fn test_history_is_bounded() {
        let mut validator = AccuracyValidator::new();
        for i in 0..1500 {
            validator.record(TrialError {
                true_position: Point3::zeros(),
                estimated_position: Point3::zeros(),
                error_m: i as f64,
                converged: true,
            });
        }
        assert_eq!(validator.statistics().sample_count, 1000);
    }
}
