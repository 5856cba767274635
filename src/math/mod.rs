//! Mathematical utilities: error propagation, cubic roots, frame rotation.

pub mod frames;
pub mod propagation;
pub mod roots;

pub use frames::*;
pub use propagation::*;
pub use roots::*;
