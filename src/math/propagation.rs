//! First-order error propagation.
//!
//! For a derived quantity `f(x_1, ..., x_n)` with independent Gaussian inputs:
//!
//! ```text
//! sigma_f^2 = sum_i (df/dx_i)^2 * sigma_i^2
//! ```
//!
//! Partials are evaluated at the point estimate. Inputs without an uncertainty
//! are exact and simply add no term, so callers can pass `Option<f64>` straight
//! through from an [`Observable`](crate::domain::Observable).

/// Accumulates squared first-order terms.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Propagation {
    variance: f64,
}

impl Propagation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `(partial * sigma)^2`. A missing `sigma` contributes nothing.
    pub fn term(mut self, partial: f64, sigma: Option<f64>) -> Self {
        if let Some(sigma) = sigma {
            self.variance += (partial * sigma).powi(2);
        }
        self
    }

    pub fn variance(&self) -> f64 {
        self.variance
    }

    pub fn sigma(&self) -> f64 {
        self.variance.sqrt()
    }
}

/// Quadrature sum of independent 1-sigma contributions.
pub fn quadrature(sigmas: &[f64]) -> f64 {
    sigmas.iter().map(|s| s * s).sum::<f64>().sqrt()
}
