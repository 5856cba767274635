//! Posterior-mode distances from parallaxes.
//!
//! With an exponentially decreasing space-density prior of length scale `L`,
//! the unnormalized posterior of the distance `r` given a parallax `w` with
//! uncertainty `s` is
//!
//! ```text
//! P(r | w, s) ~ r^2 exp(-r / L) exp(-(w - 1/r)^2 / (2 s^2))
//! ```
//!
//! and its stationary points are the real roots of
//!
//! ```text
//! r^3 / L - 2 r^2 + (w / s^2) r - 1 / s^2 = 0
//! ```
//!
//! Mode selection (Bailer-Jones 2015):
//! - one real root: that root
//! - three real roots, `w >= 0`: the smallest root
//! - three real roots, `w < 0`: the smallest positive root
//! - anything else: the star is reported as degenerate
//!
//! For `w < 0` the coefficients have a single sign change, so there is exactly
//! one positive root; "smallest positive" is therefore unambiguous.

use rayon::prelude::*;

use crate::domain::{Observable, batch_len};
use crate::error::{AppError, ErrorKind};
use crate::math::real_cubic_roots;

/// Result of the mode search for one star.
#[derive(Debug, Clone, PartialEq)]
pub enum DistanceEstimate {
    /// Most probable distance (pc).
    Mode(f64),
    /// The cubic had a real-root count other than 1 or 3.
    Degenerate { real_roots: Vec<f64> },
}

impl DistanceEstimate {
    pub fn distance(&self) -> Option<f64> {
        match self {
            DistanceEstimate::Mode(r) => Some(*r),
            DistanceEstimate::Degenerate { .. } => None,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        matches!(self, DistanceEstimate::Degenerate { .. })
    }

    pub fn into_result(self) -> Result<f64, AppError> {
        match self {
            DistanceEstimate::Mode(r) => Ok(r),
            DistanceEstimate::Degenerate { real_roots } => Err(AppError::new(
                ErrorKind::NumericalDegeneracy,
                format!(
                    "Posterior cubic has {} real roots ({real_roots:?}); expected 1 or 3.",
                    real_roots.len()
                ),
            )),
        }
    }
}

/// Coefficients (highest degree first) of the cubic whose real roots are the
/// stationary points of the posterior. Units: arcsec and pc.
pub fn posterior_cubic(parallax: f64, sigma: f64, length_scale: f64) -> [f64; 4] {
    let inv_var = 1.0 / (sigma * sigma);
    [1.0 / length_scale, -2.0, parallax * inv_var, -inv_var]
}

/// Apply the selection rule to the real roots of the posterior cubic.
pub fn select_mode(parallax: f64, real_roots: &[f64]) -> DistanceEstimate {
    let mut roots = real_roots.to_vec();
    roots.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    match roots.len() {
        1 => DistanceEstimate::Mode(roots[0]),
        3 if parallax >= 0.0 => DistanceEstimate::Mode(roots[0]),
        3 => match roots.iter().copied().find(|&r| r > 0.0) {
            Some(r) => DistanceEstimate::Mode(r),
            None => DistanceEstimate::Degenerate { real_roots: roots },
        },
        _ => DistanceEstimate::Degenerate { real_roots: roots },
    }
}

/// Mode distance (pc) for a single star.
///
/// `parallax` and `sigma` in arcsec, `length_scale` in pc.
pub fn mode_distance(parallax: f64, sigma: f64, length_scale: f64) -> Result<DistanceEstimate, AppError> {
    if !(sigma.is_finite() && sigma > 0.0) {
        return Err(AppError::invalid_input(format!(
            "Parallax uncertainty must be finite and > 0, got {sigma}."
        )));
    }
    if !(length_scale.is_finite() && length_scale > 0.0) {
        return Err(AppError::invalid_input(format!(
            "Prior length scale must be finite and > 0, got {length_scale}."
        )));
    }
    if !parallax.is_finite() {
        return Err(AppError::invalid_input(format!("Non-finite parallax {parallax}.")));
    }

    // Solve in units of the length scale (r = L x) so the coefficients stay
    // O(1)-ish; the roots are identical up to that rescaling.
    let [a, b, c, d] = posterior_cubic(parallax, sigma, length_scale);
    let l2 = length_scale * length_scale;
    let scaled = [a * length_scale, b, c / length_scale, d / l2];
    let roots: Vec<f64> = real_cubic_roots(&scaled)
        .into_iter()
        .map(|x| x * length_scale)
        .collect();

    Ok(select_mode(parallax, &roots))
}

/// Mode distances for a batch of stars.
///
/// `parallax` (arcsec) must carry an uncertainty for every star. A scalar
/// `length_scale` (pc) broadcasts. The output keeps the input order.
pub fn mode_distances(parallax: &Observable, length_scale: &Observable) -> Result<Vec<DistanceEstimate>, AppError> {
    let n = batch_len(&[("parallax", parallax), ("length scale", length_scale)])?;

    (0..n)
        .into_par_iter()
        .map(|i| {
            let sigma = parallax.error(i).ok_or_else(|| {
                AppError::invalid_input(format!("Star {i} has no parallax uncertainty."))
            })?;
            mode_distance(parallax.value(i), sigma, length_scale.value(i))
        })
        .collect()
}

/// Same as [`mode_distances`] with parallaxes and uncertainties in milliarcseconds.
pub fn mode_distances_mas(parallax_mas: &Observable, length_scale: &Observable) -> Result<Vec<DistanceEstimate>, AppError> {
    let arcsec = parallax_mas.map(|w| w / 1000.0, |_, s| s / 1000.0);
    mode_distances(&arcsec, length_scale)
}
