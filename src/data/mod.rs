//! External data sources.
//!
//! - dust reddening maps (`bayestar`)

pub mod bayestar;

pub use bayestar::*;
