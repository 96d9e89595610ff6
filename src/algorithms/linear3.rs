//! Closed-form 3x3 linear solve for the normal equations.
//!
//! The damped normal equations are always 3x3, so the solve uses the
//! explicit adjugate/determinant inverse: deterministic, branch-free in the
//! non-singular case, and free of iterative linear-algebra machinery.

use nalgebra::{Matrix3, Vector3};

use crate::core::constants::SINGULAR_DET;

/// Solve `A x = b` for symmetric 3x3 `A` via the cofactor inverse.
///
/// A singular (or near-singular) matrix yields the zero vector: callers
/// must treat that as "no safe step", not as an error.
pub fn solve_3x3(a: &Matrix3<f64>, b: &Vector3<f64>) -> Vector3<f64> {
    let det = a[(0, 0)] * (a[(1, 1)] * a[(2, 2)] - a[(1, 2)] * a[(2, 1)])
        - a[(0, 1)] * (a[(1, 0)] * a[(2, 2)] - a[(1, 2)] * a[(2, 0)])
        + a[(0, 2)] * (a[(1, 0)] * a[(2, 1)] - a[(1, 1)] * a[(2, 0)]);

    if det.abs() < SINGULAR_DET {
        return Vector3::zeros();
    }

    let inv_det = 1.0 / det;

    let inv = Matrix3::new(
        (a[(1, 1)] * a[(2, 2)] - a[(1, 2)] * a[(2, 1)]) * inv_det,
        -(a[(0, 1)] * a[(2, 2)] - a[(0, 2)] * a[(2, 1)]) * inv_det,
        (a[(0, 1)] * a[(1, 2)] - a[(0, 2)] * a[(1, 1)]) * inv_det,
        -(a[(1, 0)] * a[(2, 2)] - a[(1, 2)] * a[(2, 0)]) * inv_det,
        (a[(0, 0)] * a[(2, 2)] - a[(0, 2)] * a[(2, 0)]) * inv_det,
        -(a[(0, 0)] * a[(1, 2)] - a[(0, 2)] * a[(1, 0)]) * inv_det,
        (a[(1, 0)] * a[(2, 1)] - a[(1, 1)] * a[(2, 0)]) * inv_det,
        -(a[(0, 0)] * a[(2, 1)] - a[(0, 1)] * a[(2, 0)]) * inv_det,
        (a[(0, 0)] * a[(1, 1)] - a[(0, 1)] * a[(1, 0)]) * inv_det,
    );

    inv * b
}
