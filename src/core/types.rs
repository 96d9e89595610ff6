//! Core data types for the positioning system

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::core::constants::SPEED_OF_LIGHT;

/// 3D position in the local room frame (meters)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn zeros() -> Self {
        Self { x: 0.0, y: 0.0, z: 0.0 }
    }

    pub fn to_vector(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    pub fn from_vector(v: &Vector3<f64>) -> Self {
        Self { x: v.x, y: v.y, z: v.z }
    }
}

impl From<Vector3<f64>> for Point3 {
    fn from(v: Vector3<f64>) -> Self {
        Self::from_vector(&v)
    }
}

impl From<Point3> for Vector3<f64> {
    fn from(p: Point3) -> Self {
        p.to_vector()
    }
}

/// Fixed set of four ranging anchors, indices 0..3.
///
/// Anchor positions are immutable once configured; a new set is built when
/// the deployment geometry changes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnchorSet {
    positions: [Point3; 4],
}

impl AnchorSet {
    pub fn new(positions: [Point3; 4]) -> Self {
        Self { positions }
    }

    pub fn get(&self, index: usize) -> Point3 {
        self.positions[index]
    }

    pub fn positions(&self) -> &[Point3; 4] {
        &self.positions
    }
}

/// Hybrid TDOA/TOA measurement vector `[Δd2, Δd3, Δd4, d01, d02]` (meters).
///
/// With `r_k` the range from the tag to anchor k (1-based):
/// `Δd_k = r_k − r_1` for k = 2..4, `d01 = r_1`, `d02 = r_2`.
/// The element order is fixed; the residual model is hard-wired to it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeasurementVector {
    values: [f64; 5],
}

impl MeasurementVector {
    pub fn new(dd2: f64, dd3: f64, dd4: f64, d01: f64, d02: f64) -> Self {
        Self { values: [dd2, dd3, dd4, d01, d02] }
    }

    pub fn from_array(values: [f64; 5]) -> Self {
        Self { values }
    }

    /// Build the vector from raw timing measurements (seconds), in the same
    /// element order: three time differences of arrival, then two times of
    /// flight. Ranging hardware reports timestamps; everything downstream
    /// works in meters.
    pub fn from_times(seconds: [f64; 5]) -> Self {
        let mut values = [0.0; 5];
        for (v, t) in values.iter_mut().zip(seconds) {
            *v = SPEED_OF_LIGHT * t;
        }
        Self { values }
    }

    /// Range difference to anchor 2: `r2 − r1`
    pub fn dd2(&self) -> f64 {
        self.values[0]
    }

    /// Range difference to anchor 3: `r3 − r1`
    pub fn dd3(&self) -> f64 {
        self.values[1]
    }

    /// Range difference to anchor 4: `r4 − r1`
    pub fn dd4(&self) -> f64 {
        self.values[2]
    }

    /// Absolute range to anchor 1
    pub fn d01(&self) -> f64 {
        self.values[3]
    }

    /// Absolute range to anchor 2
    pub fn d02(&self) -> f64 {
        self.values[4]
    }

    pub fn as_array(&self) -> &[f64; 5] {
        &self.values
    }
}

/// Outcome of a single multilateration solve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverResult {
    /// Estimated tag position (solver frame)
    pub position: Point3,
    /// Iterations consumed before termination
    pub iterations: usize,
    /// Whether the solve converged (or was accepted as good enough)
    pub converged: bool,
    /// Final sum-of-squared-residuals cost
    pub final_cost: f64,
}

/// Result of one fused tracking cycle
#[derive(Debug, Clone, Copy)]
pub struct TrackerOutput {
    /// Smoothed position after filtering
    pub position: Point3,
    /// Raw solver output feeding this cycle
    pub solver: SolverResult,
    /// Update was skipped because the solver cost exceeded the gate
    pub gated: bool,
    /// Filter was hard-reset to the solver estimate (re-acquisition)
    pub did_reset: bool,
    /// Distance between solver estimate and predicted state (NaN when the
    /// solver did not converge)
    pub innovation_m: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_vector_round_trip() {
        let p = Point3::new(1.5, -2.0, 0.75);
        let v: Vector3<f64> = p.into();
        let back = Point3::from(v);
        assert_eq!(p, back);
    }

    #[test]
    fn test_measurement_layout() {
        let s = MeasurementVector::new(0.1, 0.2, 0.3, 4.0, 4.1);
        assert_eq!(s.dd2(), 0.1);
        assert_eq!(s.dd3(), 0.2);
        assert_eq!(s.dd4(), 0.3);
        assert_eq!(s.d01(), 4.0);
        assert_eq!(s.d02(), 4.1);
        assert_eq!(*s.as_array(), [0.1, 0.2, 0.3, 4.0, 4.1]);
    }

    #[test]
    fn test_measurement_from_times() {
        // 10 ns of flight is just under 3 m of range
        let s = MeasurementVector::from_times([0.0, 0.0, 0.0, 10e-9, 10e-9]);
        assert!((s.d01() - 2.99792458).abs() < 1e-12);
        assert_eq!(s.dd2(), 0.0);
    }

    #[test]
    fn test_anchor_indexing() {
        let anchors = AnchorSet::new([
            Point3::new(0.0, 0.0, 2.0),
            Point3::new(5.0, 0.0, 2.0),
            Point3::new(0.0, 5.0, 2.0),
            Point3::new(5.0, 5.0, 2.0),
        ]);
        assert_eq!(anchors.get(0), Point3::new(0.0, 0.0, 2.0));
        assert_eq!(anchors.get(3), Point3::new(5.0, 5.0, 2.0));
    }
}
