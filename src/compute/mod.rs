//! Compute module - evaluator boundary and design search.

mod evaluator;
mod surrogate;

pub mod evolution;

pub use evaluator::*;
pub use surrogate::*;
