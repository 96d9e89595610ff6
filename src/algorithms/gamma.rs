//! Numerically safe Gamma function for the adaptive kernel bandwidth.
//!
//! The standard library has no `f64::gamma`, so this provides one robust
//! implementation: reflection formula below 0.5, Lanczos series (g = 7,
//! n = 9) elsewhere. Relative accuracy is better than 1e-12 over the
//! argument range the bandwidth estimator uses.

use std::f64::consts::PI;
use std::fmt;

/// Gamma evaluation failure
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GammaError {
    /// Γ(z) is not defined for z ≤ 0 (poles at the non-positive integers)
    NonPositiveArgument { z: f64 },
}

impl fmt::Display for GammaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GammaError::NonPositiveArgument { z } => {
                write!(f, "Gamma function not defined for z = {z} (requires z > 0)")
            }
        }
    }
}

impl std::error::Error for GammaError {}

/// Lanczos coefficients, g = 7, n = 9
const LANCZOS_G: f64 = 7.0;
const LANCZOS_COEFFS: [f64; 9] = [
    0.99999999999980993,
    676.5203681218851,
    -1259.1392167224028,
    771.32342877765313,
    -176.61502916214059,
    12.507343278686905,
    -0.13857109526572012,
    9.9843695780195716e-6,
    1.5056327351493116e-7,
];

/// Evaluate Γ(z) for z > 0.
pub fn safe_gamma(z: f64) -> Result<f64, GammaError> {
    if z <= 0.0 {
        return Err(GammaError::NonPositiveArgument { z });
    }
    Ok(gamma_positive(z))
}

fn gamma_positive(z: f64) -> f64 {
    if z < 0.5 {
        // Reflection formula: Γ(z) = π / (sin(πz) · Γ(1−z))
        PI / ((PI * z).sin() * gamma_positive(1.0 - z))
    } else {
        let x = z - 1.0;
        let mut acc = LANCZOS_COEFFS[0];
        for (i, c) in LANCZOS_COEFFS.iter().enumerate().skip(1) {
            acc += c / (x + i as f64);
        }
        let t = x + LANCZOS_G + 0.5;
        (2.0 * PI).sqrt() * t.powf(x + 0.5) * (-t).exp() * acc
    }
}
