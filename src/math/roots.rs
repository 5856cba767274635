//! Real roots of a cubic polynomial.
//!
//! Roots are the eigenvalues of the companion matrix of the monic polynomial,
//! which is the standard approach for small dense polynomials. We then keep the
//! eigenvalues whose imaginary part is negligible and polish them with a few
//! Newton steps on the original coefficients.
//!
//! Numerical notes:
//! - The Schur decomposition reports real eigenvalues with an imaginary part of
//!   exactly zero in the well-separated case; the relative tolerance only
//!   matters near a double root.
//! - Returned roots are sorted ascending so downstream selection never depends
//!   on the eigen-solver's internal ordering.

use nalgebra::Matrix3;

/// Relative tolerance on `|Im(z)| / max(1, |Re(z)|)` for treating a root as real.
const IMAG_TOL: f64 = 1e-10;

/// Maximum number of Newton polishing steps per root.
const POLISH_STEPS: usize = 4;

/// Evaluate `c0 x^3 + c1 x^2 + c2 x + c3` and its derivative (Horner).
pub fn eval_cubic(coeffs: &[f64; 4], x: f64) -> (f64, f64) {
    let mut p = coeffs[0];
    let mut dp = 0.0;
    for &c in &coeffs[1..] {
        dp = dp * x + p;
        p = p * x + c;
    }
    (p, dp)
}

/// Real roots of the cubic with coefficients `coeffs` (highest degree first).
///
/// Returns an empty vector when the leading coefficient is zero or any
/// coefficient is non-finite; the caller decides whether that is an error.
pub fn real_cubic_roots(coeffs: &[f64; 4]) -> Vec<f64> {
    let a = coeffs[0];
    if a == 0.0 || coeffs.iter().any(|c| !c.is_finite()) {
        return Vec::new();
    }

    let b = coeffs[1] / a;
    let c = coeffs[2] / a;
    let d = coeffs[3] / a;

    #[rustfmt::skip]
    let companion = Matrix3::new(
        -b,  -c,  -d,
        1.0, 0.0, 0.0,
        0.0, 1.0, 0.0,
    );

    let mut roots: Vec<f64> = companion
        .complex_eigenvalues()
        .iter()
        .filter(|z| z.im.abs() <= IMAG_TOL * z.re.abs().max(1.0))
        .map(|z| polish(coeffs, z.re))
        .collect();

    roots.sort_by(|x, y| x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal));
    roots
}

fn polish(coeffs: &[f64; 4], mut x: f64) -> f64 {
    for _ in 0..POLISH_STEPS {
        let (p, dp) = eval_cubic(coeffs, x);
        if p == 0.0 || dp == 0.0 {
            break;
        }
        let next = x - p / dp;
        if !next.is_finite() || eval_cubic(coeffs, next).0.abs() >= p.abs() {
            break;
        }
        x = next;
    }
    x
}
