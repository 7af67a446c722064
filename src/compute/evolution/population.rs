//! Live population and best-so-far record.

use crate::compute::tensor::{GeneShape, Individual, Population};
use crate::schema::ConfigError;

use super::EvolutionError;
use super::genome::GenomeRng;

/// Owns the current generation and the best individual seen so far.
pub struct PopulationStore {
    population: Population,
    best: Option<Individual>,
    best_score: f32,
}

impl PopulationStore {
    /// Allocate a uniform-random population in `[0, 1)`.
    ///
    /// An odd `pop_size` is rounded up to the next even number.
    pub fn initialize(
        pop_size: usize,
        genes_x: usize,
        genes_y: usize,
        rng: &mut GenomeRng,
    ) -> Result<Self, ConfigError> {
        if pop_size == 0 || genes_x == 0 || genes_y == 0 {
            return Err(ConfigError::InvalidDimensions {
                pop_size,
                genes_x,
                genes_y,
            });
        }

        let pop_size = pop_size + pop_size % 2;
        let population = rng.random_population(pop_size, GeneShape::new(genes_x, genes_y));

        Ok(Self {
            population,
            best: None,
            best_score: f32::NEG_INFINITY,
        })
    }

    /// Current population.
    pub fn population(&self) -> &Population {
        &self.population
    }

    /// Swap in a whole new population. Its dimensions must match exactly.
    pub fn replace_all(&mut self, population: Population) -> Result<(), EvolutionError> {
        if population.dims() != self.population.dims() {
            return Err(EvolutionError::ShapeMismatch {
                expected: self.population.dims(),
                actual: population.dims(),
            });
        }
        self.population = population;
        Ok(())
    }

    /// Replace the best-so-far record iff `score` is strictly greater.
    /// Returns whether the record changed.
    pub fn record_if_better(&mut self, candidate: &Individual, score: f32) -> bool {
        if score > self.best_score {
            self.best = Some(candidate.clone());
            self.best_score = score;
            true
        } else {
            false
        }
    }

    /// Best individual, `None` until a score has been recorded.
    pub fn best(&self) -> Option<&Individual> {
        self.best.as_ref()
    }

    /// Best score, `f32::NEG_INFINITY` until a score has been recorded.
    pub fn best_score(&self) -> f32 {
        self.best_score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(pop_size: usize) -> PopulationStore {
        PopulationStore::initialize(pop_size, 3, 2, &mut GenomeRng::new(42)).unwrap()
    }

    #[test]
    fn test_initialize_rounds_to_even() {
        assert_eq!(store(5).population().pop_size(), 6);
        assert_eq!(store(6).population().pop_size(), 6);
        assert_eq!(store(1).population().dims(), (2, 3, 2));
    }

    #[test]
    fn test_initialize_rejects_zero_dimensions() {
        let mut rng = GenomeRng::new(0);
        assert!(PopulationStore::initialize(0, 3, 2, &mut rng).is_err());
        assert!(PopulationStore::initialize(4, 0, 2, &mut rng).is_err());
        assert!(PopulationStore::initialize(4, 3, 0, &mut rng).is_err());
    }

    #[test]
    fn test_replace_all_checks_shape() {
        let mut store = store(4);
        let wrong = Population::zeros(4, GeneShape::new(2, 3));
        assert!(matches!(
            store.replace_all(wrong),
            Err(EvolutionError::ShapeMismatch {
                expected: (4, 3, 2),
                actual: (4, 2, 3)
            })
        ));

        let right = Population::zeros(4, GeneShape::new(3, 2));
        store.replace_all(right.clone()).unwrap();
        assert_eq!(store.population(), &right);
    }

    #[test]
    fn test_record_if_better_is_strict() {
        let mut store = store(2);
        assert!(store.best().is_none());
        assert_eq!(store.best_score(), f32::NEG_INFINITY);

        let a = store.population().individual(0);
        let b = store.population().individual(1);

        assert!(store.record_if_better(&a, 1.0));
        assert!(!store.record_if_better(&b, 1.0));
        assert_eq!(store.best(), Some(&a));

        assert!(store.record_if_better(&b, 1.5));
        assert_eq!(store.best(), Some(&b));
        assert!(!store.record_if_better(&a, 0.5));
        assert_eq!(store.best_score(), 1.5);
    }
}
