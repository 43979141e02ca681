//! Configuration types for the antenna design optimizer.

use serde::{Deserialize, Serialize};

/// Performance goal the optimizer scores designs against.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Goal {
    /// Maximize forward gain.
    #[default]
    #[serde(rename = "maxGain")]
    MaxGain,
    /// Maximize front-to-back ratio.
    #[serde(rename = "maxFBRatio")]
    MaxFrontToBack,
    /// Minimize VSWR against the reference impedance.
    #[serde(rename = "minVSWR")]
    MinVswr,
    /// Weighted blend of gain, front-to-back and match.
    #[serde(rename = "balancedPerformance")]
    Balanced,
}

/// Top-level optimizer configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OptimizerConfig {
    /// Population and termination settings.
    #[serde(default)]
    pub population: PopulationConfig,
    /// Genetic operator settings.
    #[serde(default)]
    pub genetic: GeneticConfig,
    /// Evaluation scheduling settings.
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    /// Goal scoring weights.
    #[serde(default)]
    pub scoring: ScoringConfig,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

/// Population and generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Number of individuals per generation.
    #[serde(default = "default_population_size")]
    pub size: usize,
    /// Maximum number of generations after generation 0.
    #[serde(default = "default_max_generations")]
    pub max_generations: usize,
    /// Generations without improvement before stopping early.
    /// Only honoured once half of `max_generations` has elapsed.
    #[serde(default = "default_max_stagnant_generations")]
    pub max_stagnant_generations: Option<usize>,
    /// Stop as soon as the best fitness reaches this value.
    #[serde(default)]
    pub target_fitness: Option<f64>,
    /// Place the unmodified baseline into the initial population.
    #[serde(default = "default_seed_baseline")]
    pub seed_baseline: bool,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            size: default_population_size(),
            max_generations: default_max_generations(),
            max_stagnant_generations: default_max_stagnant_generations(),
            target_fitness: None,
            seed_baseline: default_seed_baseline(),
        }
    }
}

fn default_population_size() -> usize {
    30
}
fn default_max_generations() -> usize {
    50
}
fn default_max_stagnant_generations() -> Option<usize> {
    Some(10)
}
fn default_seed_baseline() -> bool {
    true
}

/// Genetic operator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneticConfig {
    /// Tournament size for parent selection.
    #[serde(default = "default_tournament_size")]
    pub tournament_size: usize,
    /// Probability of uniform crossover (0.0-1.0).
    #[serde(default = "default_crossover_rate")]
    pub crossover_rate: f64,
    /// Mutation probability per parameter (0.0-1.0).
    #[serde(default = "default_mutation_rate")]
    pub mutation_rate: f64,
    /// Gaussian standard deviation as a fraction of the parameter range.
    #[serde(default = "default_mutation_strength")]
    pub mutation_strength: f64,
    /// Share of mutations that are Gaussian; the rest resample uniformly.
    #[serde(default = "default_gaussian_share")]
    pub gaussian_share: f64,
    /// Number of best individuals copied unchanged into the next generation.
    #[serde(default = "default_elitism")]
    pub elitism: usize,
}

impl Default for GeneticConfig {
    fn default() -> Self {
        Self {
            tournament_size: default_tournament_size(),
            crossover_rate: default_crossover_rate(),
            mutation_rate: default_mutation_rate(),
            mutation_strength: default_mutation_strength(),
            gaussian_share: default_gaussian_share(),
            elitism: default_elitism(),
        }
    }
}

fn default_tournament_size() -> usize {
    3
}
fn default_crossover_rate() -> f64 {
    0.8
}
fn default_mutation_rate() -> f64 {
    0.1
}
fn default_mutation_strength() -> f64 {
    0.1
}
fn default_gaussian_share() -> f64 {
    0.7
}
fn default_elitism() -> usize {
    2
}

/// Evaluation scheduling and penalty settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Maximum number of evaluations in flight per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Reference impedance for VSWR, in ohms.
    #[serde(default = "default_reference_impedance")]
    pub reference_impedance: f64,
    /// Per-evaluation timeout in milliseconds.
    #[serde(default)]
    pub evaluation_timeout_ms: Option<u64>,
    /// How long to wait for the evaluator to report ready.
    #[serde(default = "default_ready_timeout_ms")]
    pub ready_timeout_ms: u64,
    /// Plausibility limits on solver output.
    #[serde(default)]
    pub plausibility: PlausibilityLimits,
    /// Fitness values used to rank penalized individuals.
    #[serde(default)]
    pub penalties: PenaltyConfig,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            reference_impedance: default_reference_impedance(),
            evaluation_timeout_ms: None,
            ready_timeout_ms: default_ready_timeout_ms(),
            plausibility: PlausibilityLimits::default(),
            penalties: PenaltyConfig::default(),
        }
    }
}

fn default_batch_size() -> usize {
    5
}
fn default_reference_impedance() -> f64 {
    50.0
}
fn default_ready_timeout_ms() -> u64 {
    30_000
}

/// Bounds beyond which solver output is considered physically implausible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlausibilityLimits {
    #[serde(default = "default_max_vswr")]
    pub max_vswr: f64,
    #[serde(default = "default_min_gain_dbi")]
    pub min_gain_dbi: f64,
    #[serde(default = "default_min_front_to_back_db")]
    pub min_front_to_back_db: f64,
}

impl Default for PlausibilityLimits {
    fn default() -> Self {
        Self {
            max_vswr: default_max_vswr(),
            min_gain_dbi: default_min_gain_dbi(),
            min_front_to_back_db: default_min_front_to_back_db(),
        }
    }
}

fn default_max_vswr() -> f64 {
    10.0
}
fn default_min_gain_dbi() -> f64 {
    -20.0
}
fn default_min_front_to_back_db() -> f64 {
    -40.0
}

/// Fitness reported for penalized individuals, as offsets below the lowest
/// score the goal can give a plausible design.
///
/// With a floor of 0 (`minVSWR`, `balancedPerformance`) the defaults read as
/// -5 and -10; for `maxGain` they sit below `min_gain_dbi`. Ranking never
/// depends on these numbers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PenaltyConfig {
    /// Offset for a design whose solver output failed the plausibility gate.
    #[serde(default = "default_implausible_penalty")]
    pub implausible: f64,
    /// Offset for a design whose evaluation failed outright.
    #[serde(default = "default_failure_penalty")]
    pub evaluator_failure: f64,
}

impl Default for PenaltyConfig {
    fn default() -> Self {
        Self {
            implausible: default_implausible_penalty(),
            evaluator_failure: default_failure_penalty(),
        }
    }
}

fn default_implausible_penalty() -> f64 {
    -5.0
}
fn default_failure_penalty() -> f64 {
    -10.0
}

/// Goal scoring weights and bonus multipliers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Multiplier for `maxGain` when gain is positive and the match is good.
    #[serde(default = "default_gain_bonus")]
    pub gain_bonus: f64,
    /// Multiplier for `maxFBRatio` when F/B, gain and match are all good.
    #[serde(default = "default_front_to_back_bonus")]
    pub front_to_back_bonus: f64,
    /// Multiplier for `minVSWR` when the match is excellent and gain positive.
    #[serde(default = "default_match_bonus")]
    pub match_bonus: f64,
    /// Weights for `balancedPerformance`.
    #[serde(default)]
    pub balanced: BalancedWeights,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            gain_bonus: default_gain_bonus(),
            front_to_back_bonus: default_front_to_back_bonus(),
            match_bonus: default_match_bonus(),
            balanced: BalancedWeights::default(),
        }
    }
}

fn default_gain_bonus() -> f64 {
    1.1
}
fn default_front_to_back_bonus() -> f64 {
    1.1
}
fn default_match_bonus() -> f64 {
    1.15
}

/// Weights of the normalized terms in the balanced objective.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BalancedWeights {
    pub gain: f64,
    pub front_to_back: f64,
    pub vswr: f64,
    /// Final scale applied to the weighted sum.
    pub scale: f64,
}

impl Default for BalancedWeights {
    fn default() -> Self {
        Self {
            gain: 0.4,
            front_to_back: 0.4,
            vswr: 0.2,
            scale: 10.0,
        }
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Optimizer configuration validation errors.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum OptimizerConfigError {
    #[error("Population size must be at least 2")]
    PopulationTooSmall,
    #[error("Elitism ({elitism}) must be smaller than the population size ({size})")]
    ElitismTooLarge { elitism: usize, size: usize },
    #[error("Tournament size must be at least 1")]
    InvalidTournamentSize,
    #[error("Batch size must be at least 1")]
    InvalidBatchSize,
    #[error("{name} must lie in [0, 1], got {value}")]
    InvalidProbability { name: &'static str, value: f64 },
    #[error("Mutation strength must be positive and finite, got {0}")]
    InvalidMutationStrength(f64),
    #[error("Reference impedance must be positive and finite, got {0}")]
    InvalidReferenceImpedance(f64),
    #[error("Penalties must satisfy failure < implausible < 0, got {failure} and {implausible}")]
    InvalidPenalties { implausible: f64, failure: f64 },
    #[error("{name} must be non-negative and finite, got {value}")]
    InvalidWeight { name: &'static str, value: f64 },
    #[error("Plausibility limit {name} must be finite, got {value}")]
    InvalidPlausibilityLimit { name: &'static str, value: f64 },
}

impl OptimizerConfig {
    /// Validate optimizer configuration.
    pub fn validate(&self) -> Result<(), OptimizerConfigError> {
        if self.population.size < 2 {
            return Err(OptimizerConfigError::PopulationTooSmall);
        }
        if self.genetic.elitism >= self.population.size {
            return Err(OptimizerConfigError::ElitismTooLarge {
                elitism: self.genetic.elitism,
                size: self.population.size,
            });
        }
        if self.genetic.tournament_size == 0 {
            return Err(OptimizerConfigError::InvalidTournamentSize);
        }
        if self.evaluation.batch_size == 0 {
            return Err(OptimizerConfigError::InvalidBatchSize);
        }

        let check_probability = |value: f64, name: &'static str| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(OptimizerConfigError::InvalidProbability { name, value })
            }
        };

        check_probability(self.genetic.crossover_rate, "crossover_rate")?;
        check_probability(self.genetic.mutation_rate, "mutation_rate")?;
        check_probability(self.genetic.gaussian_share, "gaussian_share")?;

        let strength = self.genetic.mutation_strength;
        if !(strength.is_finite() && strength > 0.0) {
            return Err(OptimizerConfigError::InvalidMutationStrength(strength));
        }

        let z0 = self.evaluation.reference_impedance;
        if !(z0.is_finite() && z0 > 0.0) {
            return Err(OptimizerConfigError::InvalidReferenceImpedance(z0));
        }

        let penalties = &self.evaluation.penalties;
        let penalties_ordered = penalties.implausible.is_finite()
            && penalties.evaluator_failure.is_finite()
            && penalties.implausible < 0.0
            && penalties.evaluator_failure < penalties.implausible;
        if !penalties_ordered {
            return Err(OptimizerConfigError::InvalidPenalties {
                implausible: penalties.implausible,
                failure: penalties.evaluator_failure,
            });
        }

        let limits = &self.evaluation.plausibility;
        for (name, value) in [
            ("max_vswr", limits.max_vswr),
            ("min_gain_dbi", limits.min_gain_dbi),
            ("min_front_to_back_db", limits.min_front_to_back_db),
        ] {
            if !value.is_finite() {
                return Err(OptimizerConfigError::InvalidPlausibilityLimit { name, value });
            }
        }

        // Scores only stay above the penalty floor with non-negative weights
        let scoring = &self.scoring;
        for (name, value) in [
            ("gain_bonus", scoring.gain_bonus),
            ("front_to_back_bonus", scoring.front_to_back_bonus),
            ("match_bonus", scoring.match_bonus),
            ("balanced.gain", scoring.balanced.gain),
            ("balanced.front_to_back", scoring.balanced.front_to_back),
            ("balanced.vswr", scoring.balanced.vswr),
            ("balanced.scale", scoring.balanced.scale),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(OptimizerConfigError::InvalidWeight { name, value });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = OptimizerConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_elitism_must_leave_room() {
        let mut config = OptimizerConfig::default();
        config.population.size = 4;
        config.genetic.elitism = 4;
        assert_eq!(
            config.validate(),
            Err(OptimizerConfigError::ElitismTooLarge {
                elitism: 4,
                size: 4
            })
        );
    }

    #[test]
    fn test_rates_are_probabilities() {
        let mut config = OptimizerConfig::default();
        config.genetic.mutation_rate = 1.5;
        assert!(matches!(
            config.validate(),
            Err(OptimizerConfigError::InvalidProbability {
                name: "mutation_rate",
                ..
            })
        ));
    }

    #[test]
    fn test_penalty_order_enforced() {
        let mut config = OptimizerConfig::default();
        config.evaluation.penalties.evaluator_failure = -1.0;
        assert!(matches!(
            config.validate(),
            Err(OptimizerConfigError::InvalidPenalties { .. })
        ));
    }

    #[test]
    fn test_penalties_must_sit_below_floor() {
        let mut config = OptimizerConfig::default();
        config.evaluation.penalties.implausible = 2.0;
        config.evaluation.penalties.evaluator_failure = 1.0;
        assert!(matches!(
            config.validate(),
            Err(OptimizerConfigError::InvalidPenalties { .. })
        ));

        for (implausible, failure) in [
            (f64::NAN, -10.0),
            (0.0, -10.0),
            (-5.0, -5.0),
            (-10.0, -5.0),
            (-5.0, f64::NEG_INFINITY),
        ] {
            config.evaluation.penalties.implausible = implausible;
            config.evaluation.penalties.evaluator_failure = failure;
            assert!(matches!(
                config.validate(),
                Err(OptimizerConfigError::InvalidPenalties { .. })
            ));
        }

        config.evaluation.penalties.implausible = -1.0;
        config.evaluation.penalties.evaluator_failure = -2.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_negative_weights_rejected() {
        let mut config = OptimizerConfig::default();
        config.scoring.gain_bonus = -1.1;
        assert_eq!(
            config.validate(),
            Err(OptimizerConfigError::InvalidWeight {
                name: "gain_bonus",
                value: -1.1
            })
        );

        let mut config = OptimizerConfig::default();
        config.scoring.balanced.vswr = -0.2;
        assert!(matches!(
            config.validate(),
            Err(OptimizerConfigError::InvalidWeight {
                name: "balanced.vswr",
                ..
            })
        ));
    }

    #[test]
    fn test_plausibility_limits_finite() {
        let mut config = OptimizerConfig::default();
        config.evaluation.plausibility.min_gain_dbi = f64::NEG_INFINITY;
        assert!(matches!(
            config.validate(),
            Err(OptimizerConfigError::InvalidPlausibilityLimit {
                name: "min_gain_dbi",
                ..
            })
        ));
    }

    #[test]
    fn test_goal_names() {
        let goal: Goal = serde_json::from_str("\"maxFBRatio\"").unwrap();
        assert_eq!(goal, Goal::MaxFrontToBack);
        assert_eq!(
            serde_json::to_string(&Goal::Balanced).unwrap(),
            "\"balancedPerformance\""
        );
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{"population": {"size": 12}, "random_seed": 7}"#;
        let config: OptimizerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.population.size, 12);
        assert_eq!(config.population.max_generations, 50);
        assert_eq!(config.genetic.tournament_size, 3);
        assert_eq!(config.evaluation.batch_size, 5);
        assert_eq!(config.random_seed, Some(7));
    }
}
