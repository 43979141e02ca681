//! Batch scheduler: bounded-concurrency fitness evaluation.
//!
//! Pending individuals are split into batches of at most `batch_size`. Within
//! a batch the members are dealt round-robin to the pool's evaluator
//! instances; each instance works through its share sequentially while the
//! instances run concurrently. With a single instance evaluation is strictly
//! sequential. A batch completes in full before the next one starts.

use futures::future::join_all;

use crate::compute::evaluator::{EvaluatorPool, PerformanceEvaluator};

use super::fitness::{Fitness, FitnessAdapter};
use super::population::{Individual, Population};

/// Tally of one scheduling pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Individuals evaluated.
    pub evaluated: u64,
    /// Of those, rejected by the plausibility gate.
    pub implausible: u64,
    /// Of those, failed outright.
    pub failures: u64,
    /// Number of batches issued.
    pub batches: u64,
}

impl BatchReport {
    fn record(&mut self, fitness: &Fitness) {
        self.evaluated += 1;
        if let Fitness::Penalized(failure) = fitness {
            if failure.is_evaluator_failure() {
                self.failures += 1;
            } else {
                self.implausible += 1;
            }
        }
    }
}

/// Groups evaluations into bounded batches.
#[derive(Debug, Clone, Copy)]
pub struct BatchScheduler {
    batch_size: usize,
}

impl BatchScheduler {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Evaluate every unevaluated individual of `population`.
    ///
    /// Individuals that already carry a fitness (elites) are skipped.
    pub async fn evaluate<E: PerformanceEvaluator>(
        &self,
        population: &mut Population,
        adapter: &FitnessAdapter,
        pool: &mut EvaluatorPool<E>,
    ) -> BatchReport {
        let pending = population.unevaluated_indices();
        let mut report = BatchReport::default();

        for batch in pending.chunks(self.batch_size) {
            let outcomes =
                run_batch(batch, population.individuals(), adapter, pool.instances_mut()).await;

            for (idx, fitness) in outcomes {
                report.record(&fitness);
                population.individuals_mut()[idx].fitness = fitness;
            }
            report.batches += 1;
        }

        log::debug!(
            "Evaluated {} individuals in {} batches ({} implausible, {} failed)",
            report.evaluated,
            report.batches,
            report.implausible,
            report.failures
        );
        report
    }
}

async fn run_batch<E: PerformanceEvaluator>(
    batch: &[usize],
    individuals: &[Individual],
    adapter: &FitnessAdapter,
    instances: &mut [E],
) -> Vec<(usize, Fitness)> {
    let workers = instances.len().min(batch.len());
    if workers == 0 {
        return Vec::new();
    }

    let jobs = instances
        .iter_mut()
        .take(workers)
        .enumerate()
        .map(|(worker, evaluator)| {
            let assigned: Vec<usize> =
                batch.iter().copied().skip(worker).step_by(workers).collect();
            async move {
                let mut outcomes = Vec::with_capacity(assigned.len());
                for idx in assigned {
                    let fitness = adapter
                        .evaluate(&mut *evaluator, &individuals[idx].parameters)
                        .await;
                    outcomes.push((idx, fitness));
                }
                outcomes
            }
        });

    join_all(jobs).await.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::compute::evaluator::{
        AnalysisReport, EvaluatorError, Impedance, PerformanceEvaluator, WireElement,
    };
    use crate::compute::evolution::constraints::derive_constraints;
    use crate::compute::evolution::operators::DesignRng;
    use crate::schema::{AntennaDesign, EvaluationConfig, Goal, ScoringConfig};

    /// Tracks how many analyses are in flight across all instances.
    struct CountingEvaluator {
        in_flight: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
        calls: Arc<AtomicUsize>,
        fail_every: Option<usize>,
    }

    impl CountingEvaluator {
        fn new(
            in_flight: &Arc<AtomicUsize>,
            peak: &Arc<AtomicUsize>,
            calls: &Arc<AtomicUsize>,
        ) -> Self {
            Self {
                in_flight: Arc::clone(in_flight),
                peak: Arc::clone(peak),
                calls: Arc::clone(calls),
                fail_every: None,
            }
        }
    }

    #[async_trait]
    impl PerformanceEvaluator for CountingEvaluator {
        async fn reset(&mut self) -> Result<(), EvaluatorError> {
            Ok(())
        }
        async fn add_element(&mut self, _: &WireElement) -> Result<(), EvaluatorError> {
            Ok(())
        }
        async fn add_feed_point(&mut self, _: usize, _: usize) -> Result<(), EvaluatorError> {
            Ok(())
        }
        async fn set_frequency(&mut self, _: f64) -> Result<(), EvaluatorError> {
            Ok(())
        }
        async fn run_analysis(&mut self) -> Result<AnalysisReport, EvaluatorError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(2)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(n) = self.fail_every
                && call % n == 0
            {
                return Err(EvaluatorError::Solver(format!("call {call} crashed")));
            }
            Ok(AnalysisReport {
                gain_dbi: 6.0,
                front_to_back_db: 12.0,
                impedance: Impedance::new(50.0, 0.0),
            })
        }
    }

    fn fixture(size: usize) -> (Population, FitnessAdapter) {
        let design = AntennaDesign::three_element(144.0);
        let constraints = derive_constraints(&design).unwrap();
        let population = Population::initialize(&constraints, size, &mut DesignRng::new(1));
        let adapter = FitnessAdapter::new(
            design,
            1,
            Goal::MaxGain,
            ScoringConfig::default(),
            &EvaluationConfig::default(),
        );
        (population, adapter)
    }

    fn counters() -> (Arc<AtomicUsize>, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        (
            Arc::new(AtomicUsize::new(0)),
            Arc::new(AtomicUsize::new(0)),
            Arc::new(AtomicUsize::new(0)),
        )
    }

    #[tokio::test]
    async fn test_single_instance_is_sequential() {
        let (mut population, adapter) = fixture(12);
        let (in_flight, peak, calls) = counters();
        let mut pool = EvaluatorPool::single(CountingEvaluator::new(&in_flight, &peak, &calls));

        let report = BatchScheduler::new(5)
            .evaluate(&mut population, &adapter, &mut pool)
            .await;

        assert_eq!(report.evaluated, 12);
        assert_eq!(report.batches, 3);
        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert!(population.unevaluated_indices().is_empty());
    }

    #[tokio::test]
    async fn test_isolated_instances_bounded_by_batch_size() {
        let (mut population, adapter) = fixture(20);
        let (in_flight, peak, calls) = counters();
        let instances = (0..8)
            .map(|_| CountingEvaluator::new(&in_flight, &peak, &calls))
            .collect();
        let mut pool = EvaluatorPool::isolated(instances).unwrap();

        let report = BatchScheduler::new(4)
            .evaluate(&mut population, &adapter, &mut pool)
            .await;

        assert_eq!(report.evaluated, 20);
        assert_eq!(report.batches, 5);
        assert_eq!(calls.load(Ordering::SeqCst), 20);
        let peak = peak.load(Ordering::SeqCst);
        assert!(peak >= 2 && peak <= 4, "peak in-flight {peak}");
    }

    #[tokio::test]
    async fn test_failures_are_absorbed() {
        let (mut population, adapter) = fixture(10);
        let (in_flight, peak, calls) = counters();
        let mut evaluator = CountingEvaluator::new(&in_flight, &peak, &calls);
        evaluator.fail_every = Some(3);
        let mut pool = EvaluatorPool::single(evaluator);

        let report = BatchScheduler::new(5)
            .evaluate(&mut population, &adapter, &mut pool)
            .await;

        assert_eq!(report.evaluated, 10);
        assert_eq!(report.failures, 3);
        let failed = population
            .individuals()
            .iter()
            .filter(|ind| matches!(&ind.fitness, Fitness::Penalized(f) if f.is_evaluator_failure()))
            .count();
        assert_eq!(failed, 3);
    }

    #[tokio::test]
    async fn test_evaluated_individuals_are_skipped() {
        let (mut population, adapter) = fixture(6);
        population.individuals_mut()[0].fitness = Fitness::Scored(42.0);
        let (in_flight, peak, calls) = counters();
        let mut pool = EvaluatorPool::single(CountingEvaluator::new(&in_flight, &peak, &calls));

        let report = BatchScheduler::new(5)
            .evaluate(&mut population, &adapter, &mut pool)
            .await;

        assert_eq!(report.evaluated, 5);
        assert_eq!(population.individuals()[0].fitness, Fitness::Scored(42.0));
    }
}
