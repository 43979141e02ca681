//! Yagi Evolve - Genetic optimization of Yagi-Uda antenna geometry.
//!
//! This crate searches the element lengths and spacings of a baseline Yagi
//! design for a configuration that scores better against a chosen goal
//! (gain, front-to-back ratio, match, or a weighted blend). Performance
//! figures come from an external electromagnetic solver reached through the
//! asynchronous [`compute::PerformanceEvaluator`] trait.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Designs, configuration, jobs and result types
//! - `compute`: Evaluator boundary, surrogate solver and the genetic search
//!
//! # Example
//!
//! ```rust,no_run
//! use yagi_evolve::{
//!     compute::{EvaluatorPool, SurrogateEvaluator},
//!     optimize,
//!     schema::{AntennaDesign, Goal, OptimizerConfig},
//! };
//!
//! # async fn run() -> Result<(), yagi_evolve::OptimizeError> {
//! let design = AntennaDesign::three_element(144.0);
//! let pool = EvaluatorPool::single(SurrogateEvaluator::new());
//!
//! let result = optimize(&design, Goal::MaxGain, OptimizerConfig::default(), pool).await?;
//! println!("Best fitness after {} generations: {:.3}",
//!     result.stats.generations, result.best_fitness);
//! # Ok(())
//! # }
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::evolution::{OptimizeError, Optimizer, optimize};
pub use compute::{EvaluatorPool, PerformanceEvaluator};
pub use schema::{AntennaDesign, Goal, OptimizationResult, OptimizerConfig};
