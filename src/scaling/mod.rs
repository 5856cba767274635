//! Asteroseismic scaling relations.
//!
//! Responsibilities:
//!
//! - radius, mass, log g, luminosity and bolometric magnitude from
//!   numax / dnu / Teff, each with propagated uncertainty
//! - explicit radius/mass overrides and the dnu correction factor
//! - band absolute magnitudes through a bolometric-correction provider

pub mod bolometric;
pub mod relations;

pub use bolometric::*;
pub use relations::*;
