//! Genetic operators over design parameter vectors.
//!
//! Provides random sampling, tournament selection, uniform crossover and
//! hybrid Gaussian/uniform mutation, all driven by one seedable generator.

use rand::prelude::*;
use rand_distr::StandardNormal;

use crate::schema::{DesignParameters, GeneticConfig};

use super::constraints::{Constraint, ParameterConstraints};
use super::population::Individual;

/// Random number generator wrapper for design operations.
pub struct DesignRng {
    rng: StdRng,
}

impl DesignRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create with random seed.
    pub fn random() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Uniform sample within a constraint, inclusive.
    pub fn uniform(&mut self, constraint: &Constraint) -> f64 {
        if constraint.span() <= 0.0 {
            return constraint.min;
        }
        self.rng.gen_range(constraint.min..=constraint.max)
    }

    /// Draw a parameter vector with every gene sampled independently.
    pub fn random_parameters(&mut self, constraints: &ParameterConstraints) -> DesignParameters {
        DesignParameters {
            lengths: constraints.lengths.iter().map(|c| self.uniform(c)).collect(),
            spacings: constraints.spacings.iter().map(|c| self.uniform(c)).collect(),
        }
    }

    /// Tournament selection: sample `size` indices with replacement and return
    /// the fittest. Ties go to the first sampled.
    pub fn tournament(&mut self, population: &[Individual], size: usize) -> usize {
        let mut best = self.rng.gen_range(0..population.len());
        for _ in 1..size {
            let idx = self.rng.gen_range(0..population.len());
            if population[idx].fitness.beats(&population[best].fitness) {
                best = idx;
            }
        }
        best
    }

    /// Uniform crossover: each gene comes from either parent with equal odds.
    pub fn crossover(
        &mut self,
        parent1: &DesignParameters,
        parent2: &DesignParameters,
    ) -> DesignParameters {
        DesignParameters {
            lengths: self.mix(&parent1.lengths, &parent2.lengths),
            spacings: self.mix(&parent1.spacings, &parent2.spacings),
        }
    }

    fn mix(&mut self, a: &[f64], b: &[f64]) -> Vec<f64> {
        a.iter()
            .zip(b)
            .map(|(&x, &y)| if self.rng.gen_bool(0.5) { x } else { y })
            .collect()
    }

    /// Produce a child: crossover with probability `crossover_rate`,
    /// otherwise a copy of one randomly chosen parent.
    pub fn breed(
        &mut self,
        parent1: &DesignParameters,
        parent2: &DesignParameters,
        crossover_rate: f64,
    ) -> DesignParameters {
        if self.rng.r#gen::<f64>() < crossover_rate {
            self.crossover(parent1, parent2)
        } else if self.rng.gen_bool(0.5) {
            parent1.clone()
        } else {
            parent2.clone()
        }
    }

    /// Gaussian mutation: add noise scaled to the constraint span, clamped.
    pub fn gaussian_mutate(&mut self, value: f64, strength: f64, constraint: &Constraint) -> f64 {
        let noise: f64 = self.rng.sample(StandardNormal);
        constraint.clamp(value + noise * strength * constraint.span())
    }

    /// Mutate a parameter vector in place.
    ///
    /// Each gene mutates with probability `mutation_rate`; a mutation is
    /// Gaussian with probability `gaussian_share` and a fresh uniform sample
    /// over the full range otherwise.
    pub fn mutate(
        &mut self,
        params: &mut DesignParameters,
        config: &GeneticConfig,
        constraints: &ParameterConstraints,
    ) {
        for (gene, constraint) in params.genes_mut().zip(constraints.iter()) {
            if self.rng.r#gen::<f64>() >= config.mutation_rate {
                continue;
            }
            *gene = if self.rng.r#gen::<f64>() < config.gaussian_share {
                self.gaussian_mutate(*gene, config.mutation_strength, constraint)
            } else {
                self.uniform(constraint)
            };
        }
    }
}

/// Mean absolute gene distance, each gene normalized by its constraint span.
pub fn design_distance(
    a: &DesignParameters,
    b: &DesignParameters,
    constraints: &ParameterConstraints,
) -> f64 {
    let mut distance = 0.0;
    let mut count = 0;

    for ((x, y), c) in a.genes().zip(b.genes()).zip(constraints.iter()) {
        let span = c.span();
        if span > 0.0 {
            distance += (x - y).abs() / span;
        }
        count += 1;
    }

    if count > 0 {
        distance / count as f64
    } else {
        0.0
    }
}
