//! `stellar-mags` library crate.
//!
//! The binary (`smag`) is a thin wrapper around this library so that:
//!
//! - the numeric core is testable without spawning processes
//! - the scaling relations, distance solver and magnitude pipeline can be
//!   used directly from other Rust code

pub mod app;
pub mod cli;
pub mod constants;
pub mod data;
pub mod distance;
pub mod domain;
pub mod error;
pub mod io;
pub mod math;
pub mod photometry;
pub mod report;
pub mod scaling;
