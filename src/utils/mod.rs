//! Shared utilities
//!
//! Currently this module only carries the seedable random number generator
//! used for parameter initialization and dropout masks.

pub mod rng;

pub use rng::SimpleRng;
