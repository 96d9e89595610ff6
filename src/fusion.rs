//! Per-cycle composition of the multilateration solver and the robust
//! filter.
//!
//! The tracker warm-starts each solve from the filter's current estimate,
//! time-updates the filter, then either hard-resets it (confident solve far
//! from the prediction — re-acquisition after an occlusion, where gradual
//! correction would lag for seconds) or feeds it the gated measurement
//! update. A non-converged solve holds the previous filtered state.

use serde::{Deserialize, Serialize};

use crate::algorithms::lm::{LevenbergMarquardt, SolverConfig};
use crate::core::geometry::distance;
use crate::core::types::{AnchorSet, MeasurementVector, Point3, TrackerOutput};
use crate::filtering::kalman::{AdaptiveGmcKalman, FilterConfig};

/// Fusion-layer tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionConfig {
    /// Measurement cycle period (seconds)
    pub dt: f64,
    /// Divergence guard: a solve with cost at or below this is considered
    /// high-confidence
    pub guard_cost_ok: f64,
    /// Divergence guard: solver-vs-prediction distance beyond which a
    /// high-confidence solve triggers a hard reset (meters)
    pub guard_innovation_m: f64,
    /// Height prior the tag is pulled toward (meters); a UWB badge is worn
    /// at roughly constant height
    pub height_prior_m: f64,
    /// Blend factor toward the height prior; 0 disables the prior
    pub height_prior_alpha: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            dt: 0.1,
            guard_cost_ok: 0.02,
            guard_innovation_m: 0.5,
            height_prior_m: 1.55,
            height_prior_alpha: 0.3,
        }
    }
}

/// Room frame (y up) to solver frame (z up)
pub fn room_to_solver(p: Point3) -> Point3 {
    Point3::new(p.x, p.z, p.y)
}

/// Solver frame (z up) back to room frame (y up)
pub fn solver_to_room(p: Point3) -> Point3 {
    Point3::new(p.x, p.z, p.y)
}

/// Single-tag tracking session: one solver, one filter, one owner.
#[derive(Debug, Clone)]
pub struct TagTracker {
    pub config: FusionConfig,
    solver: LevenbergMarquardt,
    filter: AdaptiveGmcKalman,
    initialized: bool,
}

impl TagTracker {
    pub fn new(config: FusionConfig, solver: SolverConfig, filter: FilterConfig) -> Self {
        Self {
            config,
            solver: LevenbergMarquardt::new(solver),
            filter: AdaptiveGmcKalman::new(filter),
            initialized: false,
        }
    }

    /// Current filter estimate
    pub fn position(&self) -> Point3 {
        self.filter.position()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Drop the current track; the next converged solve re-seeds the filter.
    pub fn restart(&mut self) {
        self.initialized = false;
    }

    fn apply_height_prior(&self, p: Point3) -> Point3 {
        let alpha = self.config.height_prior_alpha;
        if alpha <= 0.0 {
            return p;
        }
        Point3::new(
            p.x,
            p.y,
            (1.0 - alpha) * p.z + alpha * self.config.height_prior_m,
        )
    }

    /// Run one measurement cycle: solve, predict, guard, update.
    pub fn step(&mut self, anchors: &AnchorSet, s: &MeasurementVector) -> TrackerOutput {
        if !self.initialized {
            return self.acquire(anchors, s);
        }

        let init = self.apply_height_prior(self.filter.position());
        let result = self.solver.solve(anchors, s, Some(init));

        self.filter.predict(self.config.dt);

        if !result.converged {
            // Distrusted solve: hold the filtered state for this cycle
            return TrackerOutput {
                position: self.filter.position(),
                solver: result,
                gated: true,
                did_reset: false,
                innovation_m: f64::NAN,
            };
        }

        let meas = self.apply_height_prior(result.position);
        let predicted = self.apply_height_prior(self.filter.position());
        let innovation_m = distance(&meas, &predicted);

        // Re-acquisition guard: a confident solve far from the prediction
        // means the track is stale, not the measurement
        if result.final_cost <= self.config.guard_cost_ok
            && innovation_m > self.config.guard_innovation_m
        {
            self.filter.reset(meas);
            return TrackerOutput {
                position: meas,
                solver: result,
                gated: false,
                did_reset: true,
                innovation_m,
            };
        }

        let (position, trace) = self.filter.update_debug(meas, Some(result.final_cost));
        TrackerOutput {
            position,
            solver: result,
            gated: trace.gated,
            did_reset: false,
            innovation_m,
        }
    }

    /// First fix: cold solve, then seed the filter from it.
    fn acquire(&mut self, anchors: &AnchorSet, s: &MeasurementVector) -> TrackerOutput {
        let result = self.solver.solve(anchors, s, None);

        if !result.converged {
            return TrackerOutput {
                position: self.filter.position(),
                solver: result,
                gated: true,
                did_reset: false,
                innovation_m: f64::NAN,
            };
        }

        let est = self.apply_height_prior(result.position);
        self.filter.reset(est);
        self.initialized = true;

        TrackerOutput {
            position: est,
            solver: result,
            gated: false,
            did_reset: true,
            innovation_m: 0.0,
        }
    }
}

impl Default for TagTracker {
    fn default() -> Self {
        Self::new(
            FusionConfig::default(),
            SolverConfig::default(),
            FilterConfig::default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::residual::measurement_from_ground_truth;
    use rand::prelude::*;

    // Anchor heights are staggered so z is observable
    fn square_room_anchors() -> AnchorSet {
        AnchorSet::new([
            Point3::new(0.0, 0.0, 2.0),
            Point3::new(5.0, 0.0, 2.6),
            Point3::new(0.0, 5.0, 2.3),
            Point3::new(5.0, 5.0, 2.9),
        ])
    }

    fn no_prior_tracker() -> TagTracker {
        let fusion = FusionConfig {
            height_prior_alpha: 0.0,
            ..FusionConfig::default()
        };
        TagTracker::new(fusion, SolverConfig::default(), FilterConfig::default())
    }

    #[test]
    fn test_frame_swap_round_trip() {
        let p = Point3::new(1.0, 2.0, 3.0);
        assert_eq!(solver_to_room(room_to_solver(p)), p);
        assert_eq!(room_to_solver(p), Point3::new(1.0, 3.0, 2.0));
    }

    #[test]
    fn test_first_cycle_acquires_track() {
        let anchors = square_room_anchors();
        let gt = Point3::new(2.5, 2.5, 1.5);
        let mut rng = StdRng::seed_from_u64(10);
        let s = measurement_from_ground_truth(&anchors, &gt, 0.0, &mut rng);

        let mut tracker = no_prior_tracker();
        assert!(!tracker.is_initialized());

        let out = tracker.step(&anchors, &s);
        assert!(tracker.is_initialized());
        assert!(out.did_reset);
        assert!(distance(&out.position, &gt) < 0.05);
    }

    #[test]
    fn test_stationary_tag_tracks_smoothly() {
        let anchors = square_room_anchors();
        let gt = Point3::new(2.0, 3.0, 1.4);
        let mut rng = StdRng::seed_from_u64(20);
        let mut tracker = no_prior_tracker();

        let mut last = Point3::zeros();
        for _ in 0..30 {
            let s = measurement_from_ground_truth(&anchors, &gt, 0.02, &mut rng);
            let out = tracker.step(&anchors, &s);
            last = out.position;
        }
        assert!(
            distance(&last, &gt) < 0.2,
            "tracking error {} m after 30 cycles",
            distance(&last, &gt)
        );
    }

    #[test]
    fn test_teleport_triggers_hard_reset() {
        let anchors = square_room_anchors();
        let mut rng = StdRng::seed_from_u64(30);
        let mut tracker = no_prior_tracker();

        let start = Point3::new(1.0, 1.0, 1.5);
        for _ in 0..10 {
            let s = measurement_from_ground_truth(&anchors, &start, 0.0, &mut rng);
            tracker.step(&anchors, &s);
        }

        // Tag reappears across the room with a clean (noise-free) solve
        let far = Point3::new(4.0, 4.0, 1.5);
        let s = measurement_from_ground_truth(&anchors, &far, 0.0, &mut rng);
        let out = tracker.step(&anchors, &s);

        assert!(out.did_reset, "confident far solve should hard-reset");
        assert!(distance(&out.position, &far) < 0.05);
    }

    #[test]
    fn test_height_prior_pulls_toward_configured_height() {
        let anchors = square_room_anchors();
        let gt = Point3::new(2.5, 2.5, 1.0);
        let mut rng = StdRng::seed_from_u64(40);

        let mut tracker = TagTracker::default(); // prior at 1.55, alpha 0.3
        let s = measurement_from_ground_truth(&anchors, &gt, 0.0, &mut rng);
        let out = tracker.step(&anchors, &s);

        assert!(out.position.z > gt.z, "prior should lift z toward 1.55");
        assert!(out.position.z < tracker.config.height_prior_m);
    }
}
