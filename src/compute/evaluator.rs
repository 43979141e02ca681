//! Boundary to the external electromagnetic performance evaluator.
//!
//! The evaluator holds a single mutable simulation context: the geometry and
//! frequency last configured. Every method therefore takes `&mut self`, and a
//! complete configure → set frequency → analyse cycle runs while holding that
//! exclusive borrow. Running evaluations concurrently requires one evaluator
//! instance per worker, which is what [`EvaluatorPool`] provides.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One straight wire as handed to the solver.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct WireElement {
    /// Position along the boom in metres.
    pub position: f64,
    /// Half of the tip-to-tip length in metres.
    pub half_length: f64,
    /// Conductor radius in metres.
    pub radius: f64,
    /// Number of segments.
    pub segments: usize,
}

/// Complex feed-point impedance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Impedance {
    /// Resistance in ohms.
    pub resistance: f64,
    /// Reactance in ohms.
    pub reactance: f64,
}

impl Impedance {
    pub fn new(resistance: f64, reactance: f64) -> Self {
        Self {
            resistance,
            reactance,
        }
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.resistance.is_finite() && self.reactance.is_finite()
    }
}

/// Result of one analysis run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AnalysisReport {
    /// Forward gain in dBi.
    pub gain_dbi: f64,
    /// Front-to-back ratio in dB.
    pub front_to_back_db: f64,
    /// Feed-point impedance.
    pub impedance: Impedance,
}

/// Errors raised by an evaluator.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Serialize, Deserialize)]
pub enum EvaluatorError {
    #[error("Evaluator is not ready: {0}")]
    NotReady(String),
    #[error("Evaluation timed out after {0} ms")]
    Timeout(u64),
    #[error("Invalid geometry rejected by solver: {0}")]
    InvalidGeometry(String),
    #[error("Solver failed: {0}")]
    Solver(String),
    #[error("Malformed solver response: {0}")]
    MalformedResponse(String),
}

/// The external electromagnetic solver.
///
/// All calls are asynchronous and may fail; the optimizer never assumes success.
#[async_trait]
pub trait PerformanceEvaluator: Send + Sync {
    /// Resolves once the evaluator can accept work.
    async fn ready(&self) -> Result<(), EvaluatorError> {
        Ok(())
    }

    /// Clear the configured geometry.
    async fn reset(&mut self) -> Result<(), EvaluatorError>;

    /// Append a wire element.
    async fn add_element(&mut self, element: &WireElement) -> Result<(), EvaluatorError>;

    /// Place the excitation on a segment of an element.
    async fn add_feed_point(
        &mut self,
        element_index: usize,
        segment_index: usize,
    ) -> Result<(), EvaluatorError>;

    /// Set the analysis frequency.
    async fn set_frequency(&mut self, frequency_mhz: f64) -> Result<(), EvaluatorError>;

    /// Run the analysis on the configured geometry.
    async fn run_analysis(&mut self) -> Result<AnalysisReport, EvaluatorError>;
}

#[async_trait]
impl<E: PerformanceEvaluator + ?Sized> PerformanceEvaluator for Box<E> {
    async fn ready(&self) -> Result<(), EvaluatorError> {
        (**self).ready().await
    }

    async fn reset(&mut self) -> Result<(), EvaluatorError> {
        (**self).reset().await
    }

    async fn add_element(&mut self, element: &WireElement) -> Result<(), EvaluatorError> {
        (**self).add_element(element).await
    }

    async fn add_feed_point(
        &mut self,
        element_index: usize,
        segment_index: usize,
    ) -> Result<(), EvaluatorError> {
        (**self).add_feed_point(element_index, segment_index).await
    }

    async fn set_frequency(&mut self, frequency_mhz: f64) -> Result<(), EvaluatorError> {
        (**self).set_frequency(frequency_mhz).await
    }

    async fn run_analysis(&mut self) -> Result<AnalysisReport, EvaluatorError> {
        (**self).run_analysis().await
    }
}

/// Evaluator instances available to the batch scheduler.
///
/// A pool of one evaluates strictly sequentially. Each additional instance
/// must be an independent session with its own simulation context.
pub struct EvaluatorPool<E> {
    instances: Vec<E>,
}

impl<E: PerformanceEvaluator> EvaluatorPool<E> {
    /// A single shared evaluator; all evaluations are sequential.
    pub fn single(evaluator: E) -> Self {
        Self {
            instances: vec![evaluator],
        }
    }

    /// Independent evaluator sessions that may run concurrently.
    ///
    /// Returns `None` if `instances` is empty.
    pub fn isolated(instances: Vec<E>) -> Option<Self> {
        if instances.is_empty() {
            None
        } else {
            Some(Self { instances })
        }
    }

    /// Number of evaluator instances.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Wait until every instance reports ready.
    pub async fn ready(&self) -> Result<(), EvaluatorError> {
        let results = futures::future::join_all(self.instances.iter().map(|e| e.ready())).await;
        results.into_iter().collect()
    }

    pub(crate) fn instances_mut(&mut self) -> &mut [E] {
        &mut self.instances
    }

    /// Release the evaluator instances.
    pub fn into_inner(self) -> Vec<E> {
        self.instances
    }
}
