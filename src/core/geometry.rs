//! Geometry primitives shared by the residual model and the fusion layer

use nalgebra::Vector3;

use crate::core::constants::DEGENERATE_DISTANCE;
use crate::core::types::Point3;

/// Euclidean distance between two points
pub fn distance(a: &Point3, b: &Point3) -> f64 {
    (a.to_vector() - b.to_vector()).norm()
}

/// Unit vector from `b` toward `a`.
///
/// Returns the zero vector when the points are closer than the degenerate
/// threshold, so a tag sitting exactly on an anchor cannot produce NaNs.
pub fn unit_direction(a: &Point3, b: &Point3) -> Vector3<f64> {
    let diff = a.to_vector() - b.to_vector();
    let d = diff.norm();
    if d < DEGENERATE_DISTANCE {
        return Vector3::zeros();
    }
    diff / d
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_axioms() {
        let a = Point3::new(1.0, 2.0, 3.0);
        let b = Point3::new(-2.0, 0.5, 7.0);
        assert!(distance(&a, &b) >= 0.0);
        assert!((distance(&a, &b) - distance(&b, &a)).abs() < 1e-15);
        assert_eq!(distance(&a, &a), 0.0);
    }

    #[test]
    fn test_unit_direction_norm() {
        let a = Point3::new(3.0, -1.0, 2.0);
        let b = Point3::new(0.0, 0.0, 0.0);
        let u = unit_direction(&a, &b);
        assert!((u.norm() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_unit_direction_degenerate() {
        let a = Point3::new(1.0, 1.0, 1.0);
        let b = Point3::new(1.0, 1.0, 1.0 + 1e-13);
        let u = unit_direction(&a, &b);
        assert_eq!(u, Vector3::zeros());
    }
}
