//! Generational controller driving the design search.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::compute::evaluator::{EvaluatorError, EvaluatorPool, PerformanceEvaluator};
use crate::schema::{
    AntennaDesign, GenerationRecord, Goal, OptimizationPhase, OptimizationProgress,
    OptimizationResult, OptimizerConfig, OptimizerConfigError, RunStats, StopReason,
};

use super::batch::BatchScheduler;
use super::constraints::{DesignError, ParameterConstraints, derive_constraints};
use super::fitness::{Fitness, FitnessAdapter};
use super::operators::DesignRng;
use super::population::{Individual, Population};

/// Errors that prevent a run from starting.
#[derive(Debug, thiserror::Error)]
pub enum OptimizeError {
    #[error("Invalid baseline design: {0}")]
    Design(#[from] DesignError),
    #[error("Invalid optimizer configuration: {0}")]
    Config(#[from] OptimizerConfigError),
    #[error("Evaluator not ready after {timeout_ms} ms")]
    EvaluatorNotReady { timeout_ms: u64 },
    #[error("Evaluator failed to start: {0}")]
    Evaluator(#[from] EvaluatorError),
}

/// Optimize `baseline` for `goal`, consuming the evaluator pool.
pub async fn optimize<E: PerformanceEvaluator>(
    baseline: &AntennaDesign,
    goal: Goal,
    config: OptimizerConfig,
    pool: EvaluatorPool<E>,
) -> Result<OptimizationResult, OptimizeError> {
    Optimizer::new(baseline, goal, config, pool)?.run().await
}

/// Genetic search over the element lengths and spacings of one design.
pub struct Optimizer<E> {
    config: OptimizerConfig,
    constraints: ParameterConstraints,
    adapter: FitnessAdapter,
    scheduler: BatchScheduler,
    pool: EvaluatorPool<E>,
    rng: DesignRng,
    population: Population,
    history: Vec<GenerationRecord>,
    generation: usize,
    best: Option<Individual>,
    stagnation_count: usize,
    phase: OptimizationPhase,
    evaluations: u64,
    failures: u64,
    implausible: u64,
    cancelled: Arc<AtomicBool>,
}

impl<E: PerformanceEvaluator> Optimizer<E> {
    /// Validate inputs and derive the parameter constraints.
    pub fn new(
        baseline: &AntennaDesign,
        goal: Goal,
        config: OptimizerConfig,
        pool: EvaluatorPool<E>,
    ) -> Result<Self, OptimizeError> {
        config.validate()?;
        let constraints = derive_constraints(baseline)?;
        let driven_index = baseline
            .driven_index()
            .ok_or(DesignError::NoDrivenElement)?;

        let adapter = FitnessAdapter::new(
            baseline.clone(),
            driven_index,
            goal,
            config.scoring.clone(),
            &config.evaluation,
        );
        let rng = match config.random_seed {
            Some(seed) => DesignRng::new(seed),
            None => DesignRng::random(),
        };

        Ok(Self {
            scheduler: BatchScheduler::new(config.evaluation.batch_size),
            config,
            constraints,
            adapter,
            pool,
            rng,
            population: Population::default(),
            history: Vec::new(),
            generation: 0,
            best: None,
            stagnation_count: 0,
            phase: OptimizationPhase::Initializing,
            evaluations: 0,
            failures: 0,
            implausible: 0,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Flag checked between generations; setting it ends the run early.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn constraints(&self) -> &ParameterConstraints {
        &self.constraints
    }

    pub fn phase(&self) -> OptimizationPhase {
        self.phase
    }

    /// Give back the evaluator pool.
    pub fn into_pool(self) -> EvaluatorPool<E> {
        self.pool
    }

    /// Progress as of the last evaluated generation.
    pub fn progress(&self) -> Option<OptimizationProgress> {
        let record = self.history.last()?;
        Some(OptimizationProgress {
            generation: self.generation,
            max_generations: self.config.population.max_generations,
            phase: self.phase,
            best_fitness: self.best_value(),
            stagnation_count: self.stagnation_count,
            record: record.clone(),
        })
    }

    fn best_value(&self) -> f64 {
        self.best
            .as_ref()
            .map(|ind| ind.fitness.value(&self.adapter.projection()))
            .unwrap_or(f64::NEG_INFINITY)
    }

    async fn wait_ready(&self) -> Result<(), OptimizeError> {
        let timeout_ms = self.config.evaluation.ready_timeout_ms;
        match tokio::time::timeout(Duration::from_millis(timeout_ms), self.pool.ready()).await {
            Ok(result) => result.map_err(OptimizeError::from),
            Err(_) => Err(OptimizeError::EvaluatorNotReady { timeout_ms }),
        }
    }

    /// Build generation 0 and reset run state.
    fn initialize(&mut self) {
        self.phase = OptimizationPhase::Initializing;
        self.generation = 0;
        self.history.clear();
        self.best = None;
        self.stagnation_count = 0;
        self.evaluations = 0;
        self.failures = 0;
        self.implausible = 0;

        self.population = Population::initialize(
            &self.constraints,
            self.config.population.size,
            &mut self.rng,
        );
        if self.config.population.seed_baseline
            && let Some(first) = self.population.individuals_mut().first_mut()
        {
            *first = Individual::new(self.constraints.baseline());
        }
    }

    /// Evaluate the current generation and append its record.
    async fn evaluate_generation(&mut self) {
        self.phase = OptimizationPhase::Evaluating;

        let report = self
            .scheduler
            .evaluate(&mut self.population, &self.adapter, &mut self.pool)
            .await;
        self.evaluations += report.evaluated;
        self.failures += report.failures;
        self.implausible += report.implausible;

        self.update_best();

        let record = self.population.statistics(
            self.generation,
            &self.adapter.projection(),
            &self.constraints,
        );
        log::debug!(
            "Generation {}: best {:.4}, avg {:.4}, valid {}/{}, diversity {:.3}",
            record.index,
            record.best_fitness,
            record.average_fitness,
            record.valid_solution_count,
            self.population.len(),
            record.diversity
        );
        self.history.push(record);
    }

    /// Replace the running best only on strict improvement.
    fn update_best(&mut self) {
        let Some(generation_best) = self.population.best() else {
            return;
        };

        let improved = match &self.best {
            Some(best) => generation_best.fitness.beats(&best.fitness),
            None => true,
        };
        if improved {
            self.best = Some(generation_best.clone());
            self.stagnation_count = 0;
        } else {
            self.stagnation_count += 1;
        }
    }

    /// Elites first, then tournament → crossover → mutation until full.
    fn breed_next_generation(&mut self) {
        self.phase = OptimizationPhase::Selecting;

        let genetic = &self.config.genetic;
        let size = self.config.population.size;
        let mut next = self.population.top(genetic.elitism.min(size));

        let parents = self.population.individuals();
        while next.len() < size {
            let first = self.rng.tournament(parents, genetic.tournament_size);
            let second = self.rng.tournament(parents, genetic.tournament_size);

            let mut child = self.rng.breed(
                &parents[first].parameters,
                &parents[second].parameters,
                genetic.crossover_rate,
            );
            self.rng.mutate(&mut child, genetic, &self.constraints);
            next.push(Individual::new(child));
        }

        self.population.replace(next);
    }

    fn should_stop(&self) -> Option<StopReason> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Some(StopReason::Cancelled);
        }

        let population = &self.config.population;
        if self.generation >= population.max_generations {
            return Some(StopReason::MaxGenerations);
        }

        if let Some(target) = population.target_fitness
            && self
                .best
                .as_ref()
                .is_some_and(|best| matches!(best.fitness, Fitness::Scored(v) if v >= target))
        {
            return Some(StopReason::TargetReached);
        }

        if let Some(limit) = population.max_stagnant_generations
            && self.stagnation_count >= limit
            && self.generation * 2 >= population.max_generations
        {
            return Some(StopReason::Stagnation);
        }

        None
    }

    /// Run the search, reporting after every evaluated generation.
    pub async fn run_with_callback<F>(
        &mut self,
        callback: F,
    ) -> Result<OptimizationResult, OptimizeError>
    where
        F: Fn(&OptimizationProgress),
    {
        let start_time = Instant::now();

        log::info!(
            "Optimizing {} elements at {} MHz for {:?}: population {}, up to {} generations",
            self.adapter.baseline().elements.len(),
            self.adapter.baseline().frequency_mhz,
            self.adapter.goal(),
            self.config.population.size,
            self.config.population.max_generations
        );

        self.wait_ready().await?;

        self.initialize();
        self.evaluate_generation().await;
        if let Some(progress) = self.progress() {
            callback(&progress);
        }

        let stop_reason = loop {
            if let Some(reason) = self.should_stop() {
                break reason;
            }

            self.breed_next_generation();
            self.generation += 1;
            self.evaluate_generation().await;

            if let Some(progress) = self.progress() {
                callback(&progress);
            }
        };

        self.phase = OptimizationPhase::Terminated;

        let best = self
            .best
            .clone()
            .unwrap_or_else(|| Individual::new(self.constraints.baseline()));
        let best_design = self
            .adapter
            .materialize(&best.parameters)
            .unwrap_or_else(|_| self.adapter.baseline().clone());
        let best_fitness = best.fitness.value(&self.adapter.projection());
        let elapsed = start_time.elapsed().as_secs_f64();

        log::info!(
            "Stopped after generation {} ({:?}): best fitness {:.4}, {} evaluations in {:.2}s",
            self.generation,
            stop_reason,
            best_fitness,
            self.evaluations,
            elapsed
        );

        Ok(OptimizationResult {
            best_parameters: best.parameters,
            best_fitness,
            best_design,
            history: self.history.clone(),
            stats: RunStats {
                generations: self.generation,
                total_evaluations: self.evaluations,
                evaluator_failures: self.failures,
                implausible_results: self.implausible,
                elapsed_seconds: elapsed,
                stop_reason,
            },
        })
    }

    /// Run the search to completion.
    pub async fn run(&mut self) -> Result<OptimizationResult, OptimizeError> {
        self.run_with_callback(|_| {}).await
    }
}
