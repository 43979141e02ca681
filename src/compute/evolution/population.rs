//! Population manager: the current generation and its cached fitness.

use crate::schema::{DesignParameters, GenerationRecord};

use super::constraints::ParameterConstraints;
use super::fitness::{Fitness, FitnessProjection};
use super::operators::{DesignRng, design_distance};

/// One candidate design.
#[derive(Debug, Clone, PartialEq)]
pub struct Individual {
    /// The parameter vector.
    pub parameters: DesignParameters,
    /// Cached fitness.
    pub fitness: Fitness,
}

impl Individual {
    /// A fresh, unevaluated individual.
    pub fn new(parameters: DesignParameters) -> Self {
        Self {
            parameters,
            fitness: Fitness::Unevaluated,
        }
    }
}

/// The individuals of one generation.
#[derive(Debug, Clone, Default)]
pub struct Population {
    individuals: Vec<Individual>,
}

impl Population {
    /// Sample `size` individuals uniformly within `constraints`.
    pub fn initialize(
        constraints: &ParameterConstraints,
        size: usize,
        rng: &mut DesignRng,
    ) -> Self {
        Self {
            individuals: (0..size)
                .map(|_| Individual::new(rng.random_parameters(constraints)))
                .collect(),
        }
    }

    /// Swap in a new generation; the old one is dropped in full.
    pub fn replace(&mut self, individuals: Vec<Individual>) {
        self.individuals = individuals;
    }

    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    pub(crate) fn individuals_mut(&mut self) -> &mut [Individual] {
        &mut self.individuals
    }

    /// Indices of individuals still waiting for a fitness value.
    pub fn unevaluated_indices(&self) -> Vec<usize> {
        self.individuals
            .iter()
            .enumerate()
            .filter(|(_, ind)| !ind.fitness.is_evaluated())
            .map(|(i, _)| i)
            .collect()
    }

    /// The fittest individual; the earliest wins ties.
    pub fn best(&self) -> Option<&Individual> {
        self.individuals
            .iter()
            .reduce(|best, ind| if ind.fitness.beats(&best.fitness) { ind } else { best })
    }

    /// Value copies of the `n` fittest individuals, best first.
    pub fn top(&self, n: usize) -> Vec<Individual> {
        let mut ranked: Vec<&Individual> = self.individuals.iter().collect();
        ranked.sort_by(|a, b| b.fitness.rank_cmp(&a.fitness));
        ranked.into_iter().take(n).cloned().collect()
    }

    /// Aggregate statistics for the history.
    pub fn statistics(
        &self,
        index: usize,
        projection: &FitnessProjection,
        constraints: &ParameterConstraints,
    ) -> GenerationRecord {
        let values: Vec<f64> = self
            .individuals
            .iter()
            .map(|ind| ind.fitness.value(projection))
            .collect();
        let n = values.len().max(1) as f64;

        let average = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - average).powi(2)).sum::<f64>() / n;

        let mut valid = 0;
        let mut implausible = 0;
        let mut failures = 0;
        for ind in &self.individuals {
            match &ind.fitness {
                Fitness::Scored(_) => valid += 1,
                Fitness::Penalized(f) if f.is_evaluator_failure() => failures += 1,
                Fitness::Penalized(_) => implausible += 1,
                Fitness::Unevaluated => {}
            }
        }

        GenerationRecord {
            index,
            best_fitness: self
                .best()
                .map(|ind| ind.fitness.value(projection))
                .unwrap_or(f64::NEG_INFINITY),
            average_fitness: average,
            fitness_std: variance.sqrt(),
            valid_solution_count: valid,
            implausible_count: implausible,
            evaluator_failure_count: failures,
            diversity: self.diversity(constraints),
        }
    }

    /// Mean pairwise design distance.
    fn diversity(&self, constraints: &ParameterConstraints) -> f64 {
        if self.individuals.len() < 2 {
            return 0.0;
        }

        let mut total = 0.0;
        let mut count = 0;
        for i in 0..self.individuals.len() {
            for j in (i + 1)..self.individuals.len() {
                total += design_distance(
                    &self.individuals[i].parameters,
                    &self.individuals[j].parameters,
                    constraints,
                );
                count += 1;
            }
        }
        total / count as f64
    }
}
