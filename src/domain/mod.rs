//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - batched measurements (`Observable`) and derived values (`Measured`)
//! - sky positions and reference frames (`SkyPositions`, `Frame`)
//! - distance provenance (`DistanceKind`)

pub mod types;

pub use types::*;
