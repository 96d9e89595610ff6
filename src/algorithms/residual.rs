//! Residual vector and analytic Jacobian for the hybrid TDOA/TOA geometry.
//!
//! Five observations over four anchors: three range differences relative to
//! anchor 1, plus two absolute ranges. Anchor numbering follows the 1-based
//! paper convention; anchor k is `AnchorSet` index k−1.

use nalgebra::{Matrix5x3, Vector5};
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::core::geometry::{distance, unit_direction};
use crate::core::types::{AnchorSet, MeasurementVector, Point3};

/// Residuals `f` (5x1) and Jacobian `J = df/dx` (5x3) at trial position `x`.
///
/// Residual layout, with `r_k = ‖x − anchor_k‖`:
/// ```text
/// f1 = (r2 − r1) − Δd2      J row 1 = u2 − u1
/// f2 = (r3 − r1) − Δd3      J row 2 = u3 − u1
/// f3 = (r4 − r1) − Δd4      J row 3 = u4 − u1
/// f4 =  r1 − d01            J row 4 = u1
/// f5 =  r2 − d02            J row 5 = u2
/// ```
/// where `u_k` is the unit direction from anchor k toward `x`.
pub fn residual_and_jacobian(
    anchors: &AnchorSet,
    s: &MeasurementVector,
    x: &Point3,
) -> (Vector5<f64>, Matrix5x3<f64>) {
    let r1 = distance(x, &anchors.get(0));
    let r2 = distance(x, &anchors.get(1));
    let r3 = distance(x, &anchors.get(2));
    let r4 = distance(x, &anchors.get(3));

    let f = Vector5::new(
        (r2 - r1) - s.dd2(),
        (r3 - r1) - s.dd3(),
        (r4 - r1) - s.dd4(),
        r1 - s.d01(),
        r2 - s.d02(),
    );

    let u1 = unit_direction(x, &anchors.get(0));
    let u2 = unit_direction(x, &anchors.get(1));
    let u3 = unit_direction(x, &anchors.get(2));
    let u4 = unit_direction(x, &anchors.get(3));

    let j = Matrix5x3::new(
        u2.x - u1.x, u2.y - u1.y, u2.z - u1.z, //
        u3.x - u1.x, u3.y - u1.y, u3.z - u1.z, //
        u4.x - u1.x, u4.y - u1.y, u4.z - u1.z, //
        u1.x, u1.y, u1.z, //
        u2.x, u2.y, u2.z,
    );

    (f, j)
}

/// Sum-of-squared-residuals cost at `x`
pub fn residual_cost(anchors: &AnchorSet, s: &MeasurementVector, x: &Point3) -> f64 {
    let (f, _) = residual_and_jacobian(anchors, s, x);
    f.norm_squared()
}

/// Forward model: build the measurement vector a tag at `tag` would produce.
///
/// With `noise_std_m > 0`, independent zero-mean Gaussian noise is added to
/// each of the five elements. Used by validation trials and tests; real
/// deployments get `s` from the ranging hardware.
pub fn measurement_from_ground_truth<R: Rng + ?Sized>(
    anchors: &AnchorSet,
    tag: &Point3,
    noise_std_m: f64,
    rng: &mut R,
) -> MeasurementVector {
    let r1 = distance(tag, &anchors.get(0));
    let r2 = distance(tag, &anchors.get(1));
    let r3 = distance(tag, &anchors.get(2));
    let r4 = distance(tag, &anchors.get(3));

    let mut values = [r2 - r1, r3 - r1, r4 - r1, r1, r2];

    if noise_std_m > 0.0 {
        let normal = Normal::new(0.0, noise_std_m).expect("valid std dev");
        for v in &mut values {
            *v += normal.sample(rng);
        }
    }

    MeasurementVector::from_array(values)
}
