//! Input/output helpers.
//!
//! - CSV star-table ingest (`ingest`)
//! - CSV result exports (`export`)
//! - JSON result files (`json`)

pub mod export;
pub mod ingest;
pub mod json;

pub use export::*;
pub use ingest::*;
pub use json::*;
