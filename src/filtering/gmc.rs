//! Generalized Maximum Correntropy weighting.
//!
//! Each innovation axis gets an independent weight from the GMC kernel, so
//! a single corrupted axis (a z-bounce off the ceiling, say) is
//! down-weighted without penalizing the clean axes. The kernel bandwidth
//! adapts to the innovation scale via the MAD estimator and the
//! Gamma-function relation between the generalized-Gaussian shape and its
//! second moment.

use nalgebra::Vector3;

use crate::algorithms::gamma::safe_gamma;
use crate::core::constants::MAD_CONSISTENCY;

/// Robust scale floor: keeps the kernel from collapsing to zero width when
/// the innovations are all tiny
pub const SIGMA_FLOOR: f64 = 0.1;

/// Adaptive bandwidth floor (meters)
pub const BETA_FLOOR: f64 = 0.3;

/// Unnormalized generalized-Gaussian kernel `exp(−(|e|/β)^α)`.
///
/// Equals 1 at e = 0 and decreases monotonically in |e|; α = 2 is the
/// Gaussian kernel, α = 1 the Laplace kernel (aggressive outlier rejection).
pub fn gmc_kernel(e: f64, alpha: f64, beta: f64) -> f64 {
    (-(e.abs() / beta).powf(alpha)).exp()
}

/// Per-axis GMC weights for an innovation vector
pub fn gmc_weights(v: &Vector3<f64>, alpha: f64, beta: f64) -> Vector3<f64> {
    Vector3::new(
        gmc_kernel(v.x, alpha, beta),
        gmc_kernel(v.y, alpha, beta),
        gmc_kernel(v.z, alpha, beta),
    )
}

/// Robust innovation scale: `median(|v|) / 0.6745`, floored.
///
/// The MAD-based estimate stays finite in the presence of one wild axis,
/// unlike a mean-square scale.
pub fn robust_sigma(v: &Vector3<f64>) -> f64 {
    let sigma = median3(v.x.abs(), v.y.abs(), v.z.abs()) / MAD_CONSISTENCY;
    sigma.max(SIGMA_FLOOR)
}

/// Adaptive kernel bandwidth `β = σ·√(Γ(1/α)/Γ(3/α))`, floored.
///
/// Falls back to `beta_default` if the Gamma evaluation fails (α ≤ 0 or a
/// degenerate shape); the filter must never crash on a bad parameter.
pub fn adaptive_beta(sigma: f64, alpha: f64, beta_default: f64) -> f64 {
    match (safe_gamma(1.0 / alpha), safe_gamma(3.0 / alpha)) {
        (Ok(g1), Ok(g3)) => (sigma * (g1 / g3).sqrt()).max(BETA_FLOOR),
        _ => beta_default,
    }
}

fn median3(a: f64, b: f64, c: f64) -> f64 {
    a.max(b).min(a.min(b).max(c))
}
