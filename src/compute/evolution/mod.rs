//! Genetic search over Yagi element lengths and spacings.
//!
//! # Overview
//!
//! The search is assembled from small pieces:
//!
//! - **Constraints** (`constraints`): per-parameter ranges derived from the baseline
//! - **Fitness** (`fitness`): geometry materialization, plausibility gate and goal scoring
//! - **Operators** (`operators`): seeded sampling, tournament, crossover and mutation
//! - **Population** (`population`): the current generation and its statistics
//! - **Batching** (`batch`): bounded-concurrency evaluation against an evaluator pool
//! - **Search** (`search`): the generational controller tying it together
//!
//! # Example
//!
//! ```rust,no_run
//! use yagi_evolve::compute::{EvaluatorPool, SurrogateEvaluator};
//! use yagi_evolve::compute::evolution::Optimizer;
//! use yagi_evolve::schema::{AntennaDesign, Goal, OptimizerConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let design = AntennaDesign::three_element(144.0);
//! let pool = EvaluatorPool::single(SurrogateEvaluator::new());
//!
//! let mut optimizer = Optimizer::new(&design, Goal::MaxGain, OptimizerConfig::default(), pool)?;
//! let result = optimizer
//!     .run_with_callback(|progress| {
//!         println!(
//!             "Generation {}: best fitness = {:.3}",
//!             progress.generation, progress.best_fitness
//!         );
//!     })
//!     .await?;
//!
//! println!("Best fitness: {:.3}", result.best_fitness);
//! # Ok(())
//! # }
//! ```

mod batch;
mod constraints;
mod fitness;
mod operators;
mod population;
mod search;

pub use batch::{BatchReport, BatchScheduler};
pub use constraints::{
    Constraint, DesignError, ParameterConstraints, SPACING_RANGE, derive_constraints,
    length_range,
};
pub use fitness::{
    EvaluationFailure, Fitness, FitnessAdapter, FitnessProjection, GeometryError, VSWR_CEILING,
    vswr,
};
pub use operators::{DesignRng, design_distance};
pub use population::{Individual, Population};
pub use search::{OptimizeError, Optimizer, optimize};
