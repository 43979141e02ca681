//! Fitness adapter: parameter vector → geometry → solver → goal-specific score.
//!
//! Solver failures and physically implausible output are never raised to the
//! caller. They are folded into [`Fitness::Penalized`] so one bad evaluation
//! cannot abort a generation, while staying distinguishable from poor designs.

use std::cmp::Ordering;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::compute::evaluator::{AnalysisReport, EvaluatorError, PerformanceEvaluator, WireElement};
use crate::schema::{
    AntennaDesign, DesignParameters, EvaluationConfig, Goal, PenaltyConfig, PlausibilityLimits,
    ScoringConfig,
};

/// VSWR reported when the reflection coefficient reaches 1.
pub const VSWR_CEILING: f64 = 999.0;

/// Voltage standing wave ratio of `resistance + j·reactance` against `z0`.
pub fn vswr(resistance: f64, reactance: f64, z0: f64) -> f64 {
    let num = ((resistance - z0).powi(2) + reactance.powi(2)).sqrt();
    let den = ((resistance + z0).powi(2) + reactance.powi(2)).sqrt();
    let gamma = num / den;
    if !gamma.is_finite() || gamma >= 1.0 {
        return VSWR_CEILING;
    }
    ((1.0 + gamma) / (1.0 - gamma)).min(VSWR_CEILING)
}

/// Geometry could not be built from a parameter vector.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Serialize, Deserialize)]
pub enum GeometryError {
    #[error("Expected {expected} lengths and one spacing fewer, got {lengths} and {spacings}")]
    ShapeMismatch {
        expected: usize,
        lengths: usize,
        spacings: usize,
    },
    #[error("Parameter vector contains non-finite values")]
    NonFinite,
    #[error("Element {0} has non-positive length")]
    NonPositiveLength(usize),
}

/// Why an individual received a penalty instead of a score.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Serialize, Deserialize)]
pub enum EvaluationFailure {
    #[error("Implausible solver output: {0}")]
    Implausible(String),
    #[error(transparent)]
    Evaluator(#[from] EvaluatorError),
    #[error(transparent)]
    MalformedGeometry(#[from] GeometryError),
}

impl EvaluationFailure {
    /// True for failures of the evaluation itself rather than of the design.
    pub fn is_evaluator_failure(&self) -> bool {
        !matches!(self, Self::Implausible(_))
    }
}

/// Fitness of an individual.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum Fitness {
    /// Not yet evaluated.
    #[default]
    Unevaluated,
    /// Goal-specific score, always finite.
    Scored(f64),
    /// Evaluation produced a penalty.
    Penalized(EvaluationFailure),
}

impl Fitness {
    /// Numeric value used for statistics and reporting.
    pub fn value(&self, projection: &FitnessProjection) -> f64 {
        projection.value(self)
    }

    #[inline]
    pub fn is_evaluated(&self) -> bool {
        !matches!(self, Self::Unevaluated)
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Scored(_))
    }

    fn tier(&self) -> u8 {
        match self {
            Self::Unevaluated => 0,
            Self::Penalized(f) if f.is_evaluator_failure() => 1,
            Self::Penalized(_) => 2,
            Self::Scored(_) => 3,
        }
    }

    /// Total order: any score beats any implausible result, which beats any
    /// evaluator failure, which beats an unevaluated individual.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Scored(a), Self::Scored(b)) => a.total_cmp(b),
            _ => self.tier().cmp(&other.tier()),
        }
    }

    /// True if `self` ranks strictly above `other`.
    #[inline]
    pub fn beats(&self, other: &Self) -> bool {
        self.rank_cmp(other) == Ordering::Greater
    }
}

/// Maps [`Fitness`] onto numbers that sort the same way as [`Fitness::rank_cmp`].
///
/// Scores of a goal never fall below its `floor`. Penalties are reported as
/// offsets below that floor, so a penalized individual always reads lower
/// than any scored one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitnessProjection {
    floor: f64,
    implausible: f64,
    evaluator_failure: f64,
}

impl FitnessProjection {
    /// Penalty offsets are expected negative, failure below implausible.
    pub fn new(floor: f64, penalties: &PenaltyConfig) -> Self {
        Self {
            floor,
            implausible: floor + penalties.implausible,
            evaluator_failure: floor + penalties.evaluator_failure,
        }
    }

    /// Lowest score a plausible design can receive.
    pub fn floor(&self) -> f64 {
        self.floor
    }

    pub fn value(&self, fitness: &Fitness) -> f64 {
        match fitness {
            Fitness::Unevaluated => f64::NEG_INFINITY,
            Fitness::Scored(score) => *score,
            Fitness::Penalized(failure) if failure.is_evaluator_failure() => {
                self.evaluator_failure
            }
            Fitness::Penalized(_) => self.implausible,
        }
    }
}

const GAIN_BONUS_MAX_VSWR: f64 = 2.0;
const FB_BONUS_MIN_RATIO: f64 = 10.0;
const FB_BONUS_MIN_GAIN: f64 = 5.0;
const FB_BONUS_MAX_VSWR: f64 = 2.5;
const MATCH_BONUS_MAX_VSWR: f64 = 1.5;
const MATCH_NUMERATOR: f64 = 15.0;
const MATCH_OFFSET: f64 = 0.2;
const BALANCED_GAIN_SPAN: f64 = 15.0;
const BALANCED_FB_SPAN: f64 = 20.0;
const BALANCED_VSWR_SPAN: f64 = 3.0;

/// Turns parameter vectors into fitness values for one goal.
#[derive(Debug, Clone)]
pub struct FitnessAdapter {
    baseline: AntennaDesign,
    driven_index: usize,
    goal: Goal,
    scoring: ScoringConfig,
    plausibility: PlausibilityLimits,
    reference_impedance: f64,
    timeout: Option<Duration>,
    projection: FitnessProjection,
}

impl FitnessAdapter {
    /// Create an adapter for a baseline design that has a driven element.
    pub fn new(
        baseline: AntennaDesign,
        driven_index: usize,
        goal: Goal,
        scoring: ScoringConfig,
        evaluation: &EvaluationConfig,
    ) -> Self {
        let floor = score_floor(goal, &evaluation.plausibility);
        Self {
            baseline,
            driven_index,
            goal,
            scoring,
            plausibility: evaluation.plausibility.clone(),
            reference_impedance: evaluation.reference_impedance,
            timeout: evaluation.evaluation_timeout_ms.map(Duration::from_millis),
            projection: FitnessProjection::new(floor, &evaluation.penalties),
        }
    }

    /// Numeric projection consistent with the ranking for this goal.
    pub fn projection(&self) -> FitnessProjection {
        self.projection
    }

    pub fn goal(&self) -> Goal {
        self.goal
    }

    pub fn baseline(&self) -> &AntennaDesign {
        &self.baseline
    }

    /// Copy the baseline with `params` applied. The first element stays put;
    /// later positions are cumulative sums of the spacings.
    pub fn materialize(&self, params: &DesignParameters) -> Result<AntennaDesign, GeometryError> {
        let expected = self.baseline.elements.len();
        if params.lengths.len() != expected || params.spacings.len() + 1 != expected {
            return Err(GeometryError::ShapeMismatch {
                expected,
                lengths: params.lengths.len(),
                spacings: params.spacings.len(),
            });
        }
        if !params.is_finite() {
            return Err(GeometryError::NonFinite);
        }
        if let Some(i) = params.lengths.iter().position(|&l| l <= 0.0) {
            return Err(GeometryError::NonPositiveLength(i));
        }

        let mut design = self.baseline.clone();
        let mut position = design.elements[0].position;
        for (i, element) in design.elements.iter_mut().enumerate() {
            if i > 0 {
                position += params.spacings[i - 1];
            }
            element.length = params.lengths[i];
            element.position = position;
        }
        Ok(design)
    }

    /// Score `params` using `evaluator`. Never fails.
    pub async fn evaluate<E>(&self, evaluator: &mut E, params: &DesignParameters) -> Fitness
    where
        E: PerformanceEvaluator + ?Sized,
    {
        let design = match self.materialize(params) {
            Ok(design) => design,
            Err(err) => return Fitness::Penalized(err.into()),
        };

        let report = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, self.analyse(evaluator, &design)).await
            {
                Ok(result) => result,
                Err(_) => Err(EvaluatorError::Timeout(limit.as_millis() as u64)),
            },
            None => self.analyse(evaluator, &design).await,
        };

        match report {
            Ok(report) => self.score(&report),
            Err(err) => {
                log::warn!("Evaluation failed: {err}");
                Fitness::Penalized(err.into())
            }
        }
    }

    /// One exclusive configure → set frequency → analyse cycle.
    async fn analyse<E>(
        &self,
        evaluator: &mut E,
        design: &AntennaDesign,
    ) -> Result<AnalysisReport, EvaluatorError>
    where
        E: PerformanceEvaluator + ?Sized,
    {
        evaluator.reset().await?;
        for element in &design.elements {
            let wire = WireElement {
                position: element.position,
                half_length: element.half_length(),
                radius: element.radius,
                segments: element.segments,
            };
            evaluator.add_element(&wire).await?;
        }
        let driven = &design.elements[self.driven_index];
        evaluator
            .add_feed_point(self.driven_index, driven.centre_segment())
            .await?;
        evaluator.set_frequency(design.frequency_mhz).await?;
        evaluator.run_analysis().await
    }

    /// Apply the plausibility gate and the goal's scoring formula.
    pub fn score(&self, report: &AnalysisReport) -> Fitness {
        let gain = report.gain_dbi;
        let fb = report.front_to_back_db;

        if !(gain.is_finite() && fb.is_finite() && report.impedance.is_finite()) {
            return implausible("non-finite solver output".into());
        }

        let swr = vswr(
            report.impedance.resistance,
            report.impedance.reactance,
            self.reference_impedance,
        );
        if swr > self.plausibility.max_vswr {
            return implausible(format!("VSWR {swr:.2} above {}", self.plausibility.max_vswr));
        }
        if gain < self.plausibility.min_gain_dbi {
            return implausible(format!(
                "gain {gain:.2} dBi below {}",
                self.plausibility.min_gain_dbi
            ));
        }
        if fb < self.plausibility.min_front_to_back_db {
            return implausible(format!(
                "front-to-back {fb:.2} dB below {}",
                self.plausibility.min_front_to_back_db
            ));
        }

        let scoring = &self.scoring;
        let score = match self.goal {
            Goal::MaxGain => {
                let bonus = gain > 0.0 && swr < GAIN_BONUS_MAX_VSWR;
                gain * if bonus { scoring.gain_bonus } else { 1.0 }
            }
            Goal::MaxFrontToBack => {
                let bonus =
                    fb > FB_BONUS_MIN_RATIO && gain > FB_BONUS_MIN_GAIN && swr < FB_BONUS_MAX_VSWR;
                fb * if bonus {
                    scoring.front_to_back_bonus
                } else {
                    1.0
                }
            }
            Goal::MinVswr => {
                let bonus = swr < MATCH_BONUS_MAX_VSWR && gain > 0.0;
                MATCH_NUMERATOR / (swr + MATCH_OFFSET)
                    * if bonus { scoring.match_bonus } else { 1.0 }
            }
            Goal::Balanced => {
                let w = &scoring.balanced;
                let gain_term = (gain / BALANCED_GAIN_SPAN).clamp(0.0, 1.0);
                let fb_term = (fb / BALANCED_FB_SPAN).clamp(0.0, 1.0);
                let match_term = 1.0 - (swr / BALANCED_VSWR_SPAN).clamp(0.0, 1.0);
                w.scale * (w.gain * gain_term + w.front_to_back * fb_term + w.vswr * match_term)
            }
        };

        if score.is_finite() {
            Fitness::Scored(score)
        } else {
            implausible(format!("non-finite score for {:?}", self.goal))
        }
    }
}

/// Lowest score `goal` can assign to output that passed the plausibility gate.
///
/// Relies on non-negative bonus multipliers and balanced weights.
fn score_floor(goal: Goal, limits: &PlausibilityLimits) -> f64 {
    match goal {
        Goal::MaxGain => limits.min_gain_dbi.min(0.0),
        Goal::MaxFrontToBack => limits.min_front_to_back_db.min(0.0),
        Goal::MinVswr | Goal::Balanced => 0.0,
    }
}

fn implausible(reason: String) -> Fitness {
    Fitness::Penalized(EvaluationFailure::Implausible(reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::evaluator::Impedance;
    use crate::compute::surrogate::SurrogateEvaluator;

    fn adapter(goal: Goal) -> FitnessAdapter {
        let design = AntennaDesign::three_element(144.0);
        FitnessAdapter::new(
            design,
            1,
            goal,
            ScoringConfig::default(),
            &EvaluationConfig::default(),
        )
    }

    fn report(gain: f64, fb: f64, r: f64, x: f64) -> AnalysisReport {
        AnalysisReport {
            gain_dbi: gain,
            front_to_back_db: fb,
            impedance: Impedance::new(r, x),
        }
    }

    #[test]
    fn test_vswr_matched() {
        assert!((vswr(50.0, 0.0, 50.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_vswr_half_impedance() {
        assert!((vswr(25.0, 0.0, 50.0) - 2.0).abs() < 0.01);
    }

    #[test]
    fn test_vswr_short_circuit_hits_ceiling() {
        assert_eq!(vswr(0.0, 0.0, 50.0), VSWR_CEILING);
        assert_eq!(vswr(f64::NAN, 0.0, 50.0), VSWR_CEILING);
    }

    #[test]
    fn test_implausible_gain_penalized() {
        let fitness = adapter(Goal::MaxGain).score(&report(-50.0, 10.0, 50.0, 0.0));
        assert!(matches!(
            fitness,
            Fitness::Penalized(EvaluationFailure::Implausible(_))
        ));
        // Reported below the lowest plausible gain score of -20.
        let projection = adapter(Goal::MaxGain).projection();
        assert_eq!(projection.floor(), -20.0);
        assert_eq!(fitness.value(&projection), -25.0);
        assert_eq!(fitness.value(&adapter(Goal::MinVswr).projection()), -5.0);
    }

    #[test]
    fn test_implausible_vswr_and_nan() {
        let a = adapter(Goal::MaxGain);
        assert!(!a.score(&report(6.0, 10.0, 2.0, 0.0)).is_valid());
        assert!(!a.score(&report(f64::NAN, 10.0, 50.0, 0.0)).is_valid());
        assert!(!a.score(&report(6.0, 10.0, 50.0, f64::INFINITY)).is_valid());
    }

    #[test]
    fn test_max_gain_bonus() {
        let a = adapter(Goal::MaxGain);
        assert_eq!(a.score(&report(6.0, 10.0, 50.0, 0.0)), Fitness::Scored(6.0 * 1.1));
        // VSWR 3 forfeits the bonus.
        assert_eq!(a.score(&report(6.0, 10.0, 150.0, 0.0)), Fitness::Scored(6.0));
    }

    #[test]
    fn test_front_to_back_bonus_conditions() {
        let a = adapter(Goal::MaxFrontToBack);
        assert_eq!(a.score(&report(6.0, 15.0, 50.0, 0.0)), Fitness::Scored(15.0 * 1.1));
        assert_eq!(a.score(&report(4.0, 15.0, 50.0, 0.0)), Fitness::Scored(15.0));
    }

    #[test]
    fn test_min_vswr_score() {
        let a = adapter(Goal::MinVswr);
        let Fitness::Scored(matched) = a.score(&report(5.0, 10.0, 50.0, 0.0)) else {
            panic!("expected score");
        };
        assert!((matched - 15.0 / 1.2 * 1.15).abs() < 1e-9);
        let Fitness::Scored(mismatched) = a.score(&report(5.0, 10.0, 25.0, 0.0)) else {
            panic!("expected score");
        };
        assert!((mismatched - 15.0 / 2.2).abs() < 1e-6);
    }

    #[test]
    fn test_balanced_score() {
        let a = adapter(Goal::Balanced);
        let Fitness::Scored(score) = a.score(&report(7.5, 10.0, 50.0, 0.0)) else {
            panic!("expected score");
        };
        let expected = 10.0 * (0.4 * 0.5 + 0.4 * 0.5 + 0.2 * (1.0 - 1.0 / 3.0));
        assert!((score - expected).abs() < 1e-9);
    }

    #[test]
    fn test_bonus_weights_configurable() {
        let mut scoring = ScoringConfig::default();
        scoring.gain_bonus = 1.0;
        let a = FitnessAdapter::new(
            AntennaDesign::default(),
            1,
            Goal::MaxGain,
            scoring,
            &EvaluationConfig::default(),
        );
        assert_eq!(a.score(&report(6.0, 10.0, 50.0, 0.0)), Fitness::Scored(6.0));
    }

    #[test]
    fn test_materialize_positions() {
        let a = adapter(Goal::MaxGain);
        let params = DesignParameters {
            lengths: vec![1.0, 0.95, 0.9],
            spacings: vec![0.4, 0.5],
        };
        let design = a.materialize(&params).unwrap();
        assert_eq!(design.elements[0].position, 0.0);
        assert!((design.elements[1].position - 0.4).abs() < 1e-12);
        assert!((design.elements[2].position - 0.9).abs() < 1e-12);
        assert_eq!(design.elements[2].length, 0.9);
        assert_eq!(design.frequency_mhz, 144.0);
    }

    #[test]
    fn test_materialize_rejects_bad_shape() {
        let a = adapter(Goal::MaxGain);
        let params = DesignParameters {
            lengths: vec![1.0, 0.95],
            spacings: vec![0.4],
        };
        assert!(matches!(
            a.materialize(&params),
            Err(GeometryError::ShapeMismatch { expected: 3, .. })
        ));
    }

    #[tokio::test]
    async fn test_malformed_geometry_is_failure_penalty() {
        let a = adapter(Goal::MaxGain);
        let mut evaluator = SurrogateEvaluator::new();
        let params = DesignParameters {
            lengths: vec![1.0, f64::NAN, 0.9],
            spacings: vec![0.4, 0.5],
        };
        let fitness = a.evaluate(&mut evaluator, &params).await;
        assert_eq!(fitness.value(&a.projection()), -30.0);
        assert_eq!(evaluator.analyses(), 0);
    }

    #[tokio::test]
    async fn test_evaluate_baseline_with_surrogate() {
        let a = adapter(Goal::MaxGain);
        let mut evaluator = SurrogateEvaluator::new();
        let fitness = a
            .evaluate(&mut evaluator, &AntennaDesign::three_element(144.0).parameters())
            .await;
        assert!(fitness.is_valid());
        assert!(fitness.value(&a.projection()) > 5.0);
    }

    #[test]
    fn test_implausible_front_to_back() {
        let a = adapter(Goal::MaxFrontToBack);
        let fitness = a.score(&report(6.0, -60.0, 50.0, 0.0));
        assert!(matches!(
            fitness,
            Fitness::Penalized(EvaluationFailure::Implausible(_))
        ));
        assert_eq!(fitness.value(&a.projection()), -45.0);
    }

    #[test]
    fn test_projection_agrees_with_ranking() {
        let failed = Fitness::Penalized(EvaluatorError::Solver("boom".into()).into());
        let cases = [
            (Goal::MaxGain, report(-20.0, 10.0, 50.0, 0.0)),
            (Goal::MaxFrontToBack, report(2.0, -40.0, 50.0, 0.0)),
            (Goal::MinVswr, report(-20.0, 0.0, 50.0, 120.0)),
            (Goal::Balanced, report(-20.0, -40.0, 150.0, 0.0)),
        ];

        for (goal, worst) in cases {
            let a = adapter(goal);
            let projection = a.projection();
            let lowest = a.score(&worst);
            assert!(lowest.is_valid(), "{goal:?}: {lowest:?}");
            let lowest_value = lowest.value(&projection);
            assert!(lowest_value >= projection.floor());

            let ranked = [
                Fitness::Unevaluated,
                failed.clone(),
                implausible("x".into()),
                lowest,
                Fitness::Scored(lowest_value + 1.0),
            ];
            for pair in ranked.windows(2) {
                assert!(pair[1].beats(&pair[0]));
                assert!(
                    pair[1].value(&projection) > pair[0].value(&projection),
                    "{goal:?}: {:?} vs {:?}",
                    pair[1],
                    pair[0]
                );
            }
        }
    }

    #[tokio::test]
    async fn test_slow_evaluation_times_out() {
        let evaluation = EvaluationConfig {
            evaluation_timeout_ms: Some(5),
            ..Default::default()
        };
        let a = FitnessAdapter::new(
            AntennaDesign::three_element(144.0),
            1,
            Goal::MaxGain,
            ScoringConfig::default(),
            &evaluation,
        );
        let mut evaluator = SurrogateEvaluator::new().with_latency(Duration::from_millis(50));

        let fitness = a
            .evaluate(&mut evaluator, &AntennaDesign::three_element(144.0).parameters())
            .await;
        assert_eq!(
            fitness,
            Fitness::Penalized(EvaluationFailure::Evaluator(EvaluatorError::Timeout(5)))
        );
        assert_eq!(evaluator.analyses(), 0);
    }

    #[test]
    fn test_rank_order() {
        let scored_low = Fitness::Scored(-15.0);
        let implausible = implausible("x".into());
        let failed = Fitness::Penalized(EvaluatorError::Solver("boom".into()).into());

        assert!(scored_low.beats(&implausible));
        assert!(implausible.beats(&failed));
        assert!(failed.beats(&Fitness::Unevaluated));
        assert!(Fitness::Scored(2.0).beats(&Fitness::Scored(1.0)));
        assert!(!Fitness::Scored(1.0).beats(&Fitness::Scored(1.0)));
    }
}
