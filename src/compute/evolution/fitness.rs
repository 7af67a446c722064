//! Fitness evaluator interface.
//!
//! An evaluator sees the whole population and returns one score per
//! individual. Scores are maximized; callers with a cost must negate it.

use rayon::prelude::*;

use crate::compute::tensor::Population;

/// Error type evaluators may return. Carried unmodified by
/// [`EvolutionError::EvaluationFailed`](super::EvolutionError::EvaluationFailed).
pub type EvaluationError = Box<dyn std::error::Error + Send + Sync>;

/// Scores a population.
///
/// Implementations must not mutate the population (it is only borrowed) and
/// must return exactly `population.pop_size()` scores in population order.
pub trait FitnessEvaluator {
    fn evaluate(&self, population: &Population) -> Result<Vec<f32>, EvaluationError>;
}

impl<T: FitnessEvaluator + ?Sized> FitnessEvaluator for Box<T> {
    fn evaluate(&self, population: &Population) -> Result<Vec<f32>, EvaluationError> {
        (**self).evaluate(population)
    }
}

impl<T: FitnessEvaluator + ?Sized> FitnessEvaluator for &T {
    fn evaluate(&self, population: &Population) -> Result<Vec<f32>, EvaluationError> {
        (**self).evaluate(population)
    }
}

/// Evaluator backed by a closure over the whole population.
pub struct FnEvaluator<F>(F);

/// Wrap a closure as an evaluator.
pub fn from_fn<F>(f: F) -> FnEvaluator<F>
where
    F: Fn(&Population) -> Result<Vec<f32>, EvaluationError>,
{
    FnEvaluator(f)
}

impl<F> FitnessEvaluator for FnEvaluator<F>
where
    F: Fn(&Population) -> Result<Vec<f32>, EvaluationError>,
{
    fn evaluate(&self, population: &Population) -> Result<Vec<f32>, EvaluationError> {
        (self.0)(population)
    }
}

/// Evaluator that scores each individual independently, in parallel.
///
/// The closure receives the individual's flat row-major genes.
pub struct PerIndividual<F>(pub F);

impl<F> FitnessEvaluator for PerIndividual<F>
where
    F: Fn(&[f32]) -> f32 + Sync,
{
    fn evaluate(&self, population: &Population) -> Result<Vec<f32>, EvaluationError> {
        let len = population.shape().len();
        Ok(population
            .data()
            .par_chunks(len)
            .map(|genes| (self.0)(genes))
            .collect())
    }
}

/// Sum of all genes of an individual. Useful as a benchmark problem whose
/// optimum (every gene near 1) is known.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeneSum;

impl FitnessEvaluator for GeneSum {
    fn evaluate(&self, population: &Population) -> Result<Vec<f32>, EvaluationError> {
        PerIndividual(|genes: &[f32]| genes.iter().sum::<f32>()).evaluate(population)
    }
}
