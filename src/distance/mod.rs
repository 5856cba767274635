//! Distances from parallaxes.
//!
//! The posterior-mode estimator replaces the naive `1 / parallax` inversion,
//! which is biased (and undefined for negative parallaxes) once the fractional
//! parallax error is non-negligible.

pub mod posterior;

pub use posterior::*;
