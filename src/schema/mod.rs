//! Schema module - Design, configuration and result types for the optimizer.

mod config;
mod design;
mod job;
mod result;

pub use config::*;
pub use design::*;
pub use job::*;
pub use result::*;
