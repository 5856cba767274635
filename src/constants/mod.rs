//! Literature constants: solar reference values and per-band coefficients.

pub mod table;

pub use table::*;
