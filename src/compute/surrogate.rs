//! Closed-form surrogate for the external solver.
//!
//! This is not an electromagnetic simulation. It maps a Yagi geometry onto
//! smooth, bounded gain / front-to-back / impedance figures with the right
//! qualitative shape (resonant lengths near the textbook fractions of a
//! wavelength, an optimum spacing per element) so the optimizer can be run
//! end-to-end without a real solver attached.

use std::time::Duration;

use async_trait::async_trait;

use crate::schema::C_MHZ_METRES;

use super::evaluator::{
    AnalysisReport, EvaluatorError, Impedance, PerformanceEvaluator, WireElement,
};

/// Free-space dipole gain in dBi.
const DIPOLE_GAIN_DBI: f64 = 2.15;
/// Free-space dipole radiation resistance in ohms.
const DIPOLE_RESISTANCE: f64 = 73.0;

/// Analytic stand-in for the Performance Evaluator.
#[derive(Debug, Clone, Default)]
pub struct SurrogateEvaluator {
    elements: Vec<WireElement>,
    feed: Option<(usize, usize)>,
    frequency_mhz: Option<f64>,
    latency: Option<Duration>,
    analyses: u64,
}

impl SurrogateEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suspend for `latency` on every analysis, like a remote solver would.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of completed analyses.
    pub fn analyses(&self) -> u64 {
        self.analyses
    }

    fn analyse(&self) -> Result<AnalysisReport, EvaluatorError> {
        let frequency = self
            .frequency_mhz
            .ok_or_else(|| EvaluatorError::InvalidGeometry("frequency not set".into()))?;
        let (feed_index, _) = self
            .feed
            .ok_or_else(|| EvaluatorError::InvalidGeometry("no feed point".into()))?;
        let driven = self.elements.get(feed_index).ok_or_else(|| {
            EvaluatorError::InvalidGeometry(format!("feed on missing element {feed_index}"))
        })?;

        let lambda = C_MHZ_METRES / frequency;
        let electrical = |wire: &WireElement| 2.0 * wire.half_length / lambda;

        let mut gain = DIPOLE_GAIN_DBI;
        let mut front_to_back = 3.0;
        let mut resistance = DIPOLE_RESISTANCE;
        let reactance = 900.0 * (electrical(driven) - 0.475);

        // Closest reflector behind the driven element.
        let reflector = self
            .elements
            .iter()
            .filter(|w| w.position < driven.position)
            .max_by(|a, b| a.position.total_cmp(&b.position));
        if let Some(reflector) = reflector {
            let spacing = (driven.position - reflector.position) / lambda;
            let term = bump(electrical(reflector), 0.505, 0.025) * bump(spacing, 0.2, 0.1);
            gain += 2.0 * term;
            front_to_back += 14.0 * term;
            resistance *= 0.45 + 0.55 * (spacing / 0.25).min(1.0);
        }

        // Directors in boom order, each spaced from its predecessor.
        let mut directors: Vec<&WireElement> = self
            .elements
            .iter()
            .filter(|w| w.position > driven.position)
            .collect();
        directors.sort_by(|a, b| a.position.total_cmp(&b.position));

        let mut previous = driven.position;
        for (k, director) in directors.iter().enumerate() {
            let rank = (k + 1) as f64;
            let spacing = (director.position - previous) / lambda;
            let optimum_length = 0.44 - 0.008 * k as f64;
            let term =
                bump(electrical(director), optimum_length, 0.025) * bump(spacing, 0.25, 0.12);
            gain += 2.6 * term / rank.sqrt();
            front_to_back += 4.0 * term / rank;
            if k == 0 {
                resistance *= 0.55 + 0.45 * (spacing / 0.3).min(1.0);
            }
            previous = director.position;
        }

        Ok(AnalysisReport {
            gain_dbi: gain,
            front_to_back_db: front_to_back,
            impedance: Impedance::new(resistance, reactance),
        })
    }
}

/// Gaussian bump with peak 1 at `centre`.
fn bump(x: f64, centre: f64, width: f64) -> f64 {
    (-((x - centre) / width).powi(2)).exp()
}

#[async_trait]
impl PerformanceEvaluator for SurrogateEvaluator {
    async fn reset(&mut self) -> Result<(), EvaluatorError> {
        self.elements.clear();
        self.feed = None;
        self.frequency_mhz = None;
        Ok(())
    }

    async fn add_element(&mut self, element: &WireElement) -> Result<(), EvaluatorError> {
        if !(element.half_length > 0.0 && element.radius > 0.0 && element.segments > 0) {
            return Err(EvaluatorError::InvalidGeometry(format!(
                "degenerate wire {element:?}"
            )));
        }
        self.elements.push(*element);
        Ok(())
    }

    async fn add_feed_point(
        &mut self,
        element_index: usize,
        segment_index: usize,
    ) -> Result<(), EvaluatorError> {
        match self.elements.get(element_index) {
            Some(wire) if segment_index < wire.segments => {
                self.feed = Some((element_index, segment_index));
                Ok(())
            }
            _ => Err(EvaluatorError::InvalidGeometry(format!(
                "no segment {segment_index} on element {element_index}"
            ))),
        }
    }

    async fn set_frequency(&mut self, frequency_mhz: f64) -> Result<(), EvaluatorError> {
        if !(frequency_mhz.is_finite() && frequency_mhz > 0.0) {
            return Err(EvaluatorError::InvalidGeometry(format!(
                "frequency {frequency_mhz} MHz"
            )));
        }
        self.frequency_mhz = Some(frequency_mhz);
        Ok(())
    }

    async fn run_analysis(&mut self) -> Result<AnalysisReport, EvaluatorError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let report = self.analyse()?;
        self.analyses += 1;
        Ok(report)
    }
}
