//! Run history, progress and result types.

use serde::{Deserialize, Serialize};

use super::{AntennaDesign, DesignParameters};

/// Statistics for one generation. Immutable once appended to the history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationRecord {
    /// Generation index, 0 for the initial population.
    pub index: usize,
    /// Best fitness in this generation.
    pub best_fitness: f64,
    /// Mean fitness over the whole generation, penalties included.
    pub average_fitness: f64,
    /// Standard deviation of fitness.
    pub fitness_std: f64,
    /// Individuals that were scored normally.
    pub valid_solution_count: usize,
    /// Individuals whose solver output failed the plausibility gate.
    pub implausible_count: usize,
    /// Individuals whose evaluation failed outright.
    pub evaluator_failure_count: usize,
    /// Mean normalized pairwise distance between parameter vectors.
    pub diversity: f64,
}

/// Reason the optimizer stopped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    /// Reached maximum generations.
    MaxGenerations,
    /// No improvement for too long.
    Stagnation,
    /// Reached target fitness.
    TargetReached,
    /// Cancelled between generations.
    Cancelled,
}

/// Statistics from an optimization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStats {
    /// Index of the last generation evaluated.
    pub generations: usize,
    /// Evaluator invocations, elites excluded.
    pub total_evaluations: u64,
    /// Evaluations that failed outright.
    pub evaluator_failures: u64,
    /// Evaluations rejected by the plausibility gate.
    pub implausible_results: u64,
    /// Wall time in seconds.
    pub elapsed_seconds: f64,
    /// Reason for stopping.
    pub stop_reason: StopReason,
}

/// Final result of an optimization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationResult {
    /// Best parameter vector found.
    pub best_parameters: DesignParameters,
    /// Fitness of `best_parameters`.
    pub best_fitness: f64,
    /// Baseline design with the best parameters applied.
    pub best_design: AntennaDesign,
    /// One record per generation, in order.
    pub history: Vec<GenerationRecord>,
    /// Run statistics.
    pub stats: RunStats,
}

/// Controller state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum OptimizationPhase {
    /// Building the initial population.
    #[default]
    Initializing,
    /// Scoring a generation.
    Evaluating,
    /// Breeding the next generation.
    Selecting,
    /// Run finished.
    Terminated,
}

/// Snapshot handed to progress callbacks after each generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationProgress {
    pub generation: usize,
    pub max_generations: usize,
    pub phase: OptimizationPhase,
    /// Best fitness seen so far.
    pub best_fitness: f64,
    pub stagnation_count: usize,
    /// Record of the generation just evaluated.
    pub record: GenerationRecord,
}
