//! Genetic operators over whole population tensors.
//!
//! Each operator returns a new [`Population`]; the engine swaps it in. Work is
//! split across individuals with rayon, and every individual draws from its own
//! `StdRng` seeded from the master stream, so results depend only on the
//! master seed and never on the thread count.

use rand::prelude::*;
use rayon::prelude::*;

use crate::compute::tensor::{GeneShape, Individual, Population};

/// Random number generator wrapper for genome operations.
pub struct GenomeRng {
    rng: StdRng,
}

impl GenomeRng {
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

    /// Generate next u64 for seeding child RNGs.
    pub fn next_seed(&mut self) -> u64 {
        self.rng.r#gen()
    }

    fn row_seeds(&mut self, rows: usize) -> Vec<u64> {
        (0..rows).map(|_| self.next_seed()).collect()
    }

    /// Population with independent uniform entries in `[0, 1)`.
    pub fn random_population(&mut self, pop_size: usize, shape: GeneShape) -> Population {
        let mut population = Population::zeros(pop_size, shape);
        let seeds = self.row_seeds(pop_size);

        population
            .data_mut()
            .par_chunks_mut(shape.len())
            .zip(seeds)
            .for_each(|(genes, seed)| {
                let mut rng = StdRng::seed_from_u64(seed);
                genes.iter_mut().for_each(|g| *g = rng.r#gen::<f32>());
            });

        population
    }

    /// Champion-inheritance crossover.
    ///
    /// Draws `R ~ U[0, 1)` per gene per individual; the gene becomes the
    /// champion's where `R < threshold` and is kept otherwise. A threshold of
    /// 1.0 clones the champion into every slot.
    pub fn champion_crossover(
        &mut self,
        population: &Population,
        champion: &Individual,
        threshold: f32,
    ) -> Population {
        let mut next = population.clone();
        let seeds = self.row_seeds(population.pop_size());
        let champion = champion.genes();

        next.data_mut()
            .par_chunks_mut(champion.len())
            .zip(seeds)
            .for_each(|(genes, seed)| {
                inherit_from(genes, champion, threshold, &mut StdRng::seed_from_u64(seed));
            });

        next
    }

    /// Pull the listed individuals toward the champion: per gene, champion
    /// value where `R < rate`. Indices past the population are ignored.
    pub fn renew_toward(
        &mut self,
        population: &Population,
        rows: &[usize],
        champion: &Individual,
        rate: f32,
    ) -> Population {
        let mut next = population.clone();
        let seeds = self.row_seeds(population.pop_size());
        let champion = champion.genes();

        let mut selected = vec![false; population.pop_size()];
        for &row in rows {
            if let Some(flag) = selected.get_mut(row) {
                *flag = true;
            }
        }

        next.data_mut()
            .par_chunks_mut(champion.len())
            .zip(seeds)
            .zip(selected)
            .filter(|(_, selected)| *selected)
            .for_each(|((genes, seed), _)| {
                inherit_from(genes, champion, rate, &mut StdRng::seed_from_u64(seed));
            });

        next
    }

    /// Pairwise exchange between rows `2k` and `2k + 1`: gene `(x, y)` is
    /// swapped where `R > threshold`. A trailing unpaired row is left alone.
    pub fn pairwise_exchange(&mut self, population: &Population, threshold: f32) -> Population {
        let mut next = population.clone();
        let len = population.shape().len();
        let seeds = self.row_seeds(population.pop_size() / 2);

        next.data_mut()
            .par_chunks_exact_mut(2 * len)
            .zip(seeds)
            .for_each(|(pair, seed)| {
                let mut rng = StdRng::seed_from_u64(seed);
                let (first, second) = pair.split_at_mut(len);
                for (a, b) in first.iter_mut().zip(second.iter_mut()) {
                    if rng.r#gen::<f32>() > threshold {
                        std::mem::swap(a, b);
                    }
                }
            });

        next
    }

    /// Uniform-reset mutation.
    ///
    /// Draws `r, u ~ U[0, 1)` per gene; the gene becomes `u` where
    /// `r < rate` and is kept otherwise. Values stay in `[0, 1)`.
    pub fn mutate(&mut self, population: &Population, rate: f32) -> Population {
        let mut next = population.clone();
        let seeds = self.row_seeds(population.pop_size());

        next.data_mut()
            .par_chunks_mut(population.shape().len())
            .zip(seeds)
            .for_each(|(genes, seed)| {
                let mut rng = StdRng::seed_from_u64(seed);
                for g in genes.iter_mut() {
                    let r = rng.r#gen::<f32>();
                    let u = rng.r#gen::<f32>();
                    if r < rate {
                        *g = u;
                    }
                }
            });

        next
    }
}

fn inherit_from(genes: &mut [f32], champion: &[f32], threshold: f32, rng: &mut StdRng) {
    for (g, &c) in genes.iter_mut().zip(champion) {
        if rng.r#gen::<f32>() < threshold {
            *g = c;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape() -> GeneShape {
        GeneShape::new(4, 3)
    }

    #[test]
    fn test_random_population_bounds() {
        let mut rng = GenomeRng::new(42);
        let pop = rng.random_population(16, shape());

        assert_eq!(pop.dims(), (16, 4, 3));
        assert!(pop.data().iter().all(|&g| (0.0..1.0).contains(&g)));
    }

    #[test]
    fn test_seeded_reproducibility() {
        let a = GenomeRng::new(7).random_population(8, shape());
        let b = GenomeRng::new(7).random_population(8, shape());
        let c = GenomeRng::new(8).random_population(8, shape());
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_champion_crossover_extremes() {
        let mut rng = GenomeRng::new(1);
        let pop = rng.random_population(6, shape());
        let champion = pop.individual(2);

        let cloned = rng.champion_crossover(&pop, &champion, 1.0);
        assert!(cloned.iter().all(|genes| genes == champion.genes()));

        let untouched = rng.champion_crossover(&pop, &champion, 0.0);
        assert_eq!(untouched, pop);
    }

    #[test]
    fn test_champion_crossover_mixes_genes() {
        let mut rng = GenomeRng::new(3);
        let pop = rng.random_population(50, GeneShape::new(10, 10));
        let champion = pop.individual(0);
        let next = rng.champion_crossover(&pop, &champion, 0.5);

        let mut inherited = 0usize;
        for i in 1..pop.pop_size() {
            for (j, (&new, &old)) in next
                .individual_genes(i)
                .iter()
                .zip(pop.individual_genes(i))
                .enumerate()
            {
                assert!(new == old || new == champion.genes()[j]);
                if new == champion.genes()[j] && new != old {
                    inherited += 1;
                }
            }
        }
        let total = 49 * 100;
        let fraction = inherited as f32 / total as f32;
        assert!((0.4..0.6).contains(&fraction), "fraction = {fraction}");
    }

    #[test]
    fn test_renew_only_listed_rows() {
        let mut rng = GenomeRng::new(5);
        let pop = rng.random_population(4, shape());
        let champion = pop.individual(0);
        let next = rng.renew_toward(&pop, &[3], &champion, 1.0);

        assert_eq!(next.individual_genes(1), pop.individual_genes(1));
        assert_eq!(next.individual_genes(2), pop.individual_genes(2));
        assert_eq!(next.individual_genes(3), champion.genes());

        // Repeated and out-of-range indices select nothing extra.
        let next = rng.renew_toward(&pop, &[2, 2, 9], &champion, 1.0);
        assert_eq!(next.individual_genes(1), pop.individual_genes(1));
        assert_eq!(next.individual_genes(2), champion.genes());
        assert_eq!(next.individual_genes(3), pop.individual_genes(3));
    }

    #[test]
    fn test_pairwise_exchange() {
        let mut rng = GenomeRng::new(9);
        let pop = rng.random_population(4, shape());

        // Draws are always in [0, 1), so threshold 1.0 never swaps.
        assert_eq!(rng.pairwise_exchange(&pop, 1.0), pop);

        // Negative threshold: every gene swaps within its pair.
        let swapped = rng.pairwise_exchange(&pop, -1.0);
        assert_eq!(swapped.individual_genes(0), pop.individual_genes(1));
        assert_eq!(swapped.individual_genes(1), pop.individual_genes(0));
        assert_eq!(swapped.individual_genes(2), pop.individual_genes(3));
    }

    #[test]
    fn test_mutation_extremes() {
        let mut rng = GenomeRng::new(11);
        let pop = rng.random_population(8, shape());

        assert_eq!(rng.mutate(&pop, 0.0), pop);

        let mutated = rng.mutate(&pop, 1.0);
        assert!(
            mutated
                .data()
                .iter()
                .zip(pop.data())
                .all(|(new, old)| new != old)
        );
        assert!(mutated.data().iter().all(|&g| (0.0..1.0).contains(&g)));
    }
}
