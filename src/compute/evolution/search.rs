//! Generational run loop.

use std::time::{Duration, Instant};

use crate::compute::tensor::{Individual, Population};
use crate::schema::{
    CrossoverStrategy, EngineConfig, EnginePhase, EvolutionHistory, EvolutionProgress,
    EvolutionResult, EvolutionStats, StopReason,
};

use super::EvolutionError;
use super::fitness::FitnessEvaluator;
use super::genome::GenomeRng;
use super::population::PopulationStore;

/// Evolution engine that runs the search.
///
/// Owns the population, the best-so-far record, the random source and the
/// fitness evaluator for its whole lifetime.
pub struct EvolutionEngine<E> {
    config: EngineConfig,
    rng: GenomeRng,
    evaluator: E,
    store: PopulationStore,
    history: EvolutionHistory,
    generation: usize,
    /// Generation count at which the active (or last) run ends.
    run_end: usize,
    stagnation_count: usize,
    phase: EnginePhase,
    elapsed: Duration,
    stop_reason: Option<StopReason>,
}

impl<E: FitnessEvaluator> EvolutionEngine<E> {
    /// Validate the configuration and allocate a random population.
    pub fn new(config: EngineConfig, evaluator: E) -> Result<Self, EvolutionError> {
        let rng = match config.random_seed {
            Some(seed) => GenomeRng::new(seed),
            None => GenomeRng::random(),
        };
        Self::with_rng(config, evaluator, rng)
    }

    /// Like [`new`](Self::new), with an explicitly supplied random source.
    /// `config.random_seed` is ignored.
    pub fn with_rng(
        config: EngineConfig,
        evaluator: E,
        mut rng: GenomeRng,
    ) -> Result<Self, EvolutionError> {
        config.validate()?;
        let store =
            PopulationStore::initialize(config.pop_size, config.genes_x, config.genes_y, &mut rng)?;

        log::debug!(
            "Initialized population {:?} ({:?} crossover)",
            store.population().dims(),
            config.crossover
        );

        let run_end = config.max_generations;
        Ok(Self {
            config,
            rng,
            evaluator,
            store,
            history: EvolutionHistory::default(),
            generation: 0,
            run_end,
            stagnation_count: 0,
            phase: EnginePhase::Idle,
            elapsed: Duration::ZERO,
            stop_reason: None,
        })
    }

    /// Run the configured generation budget.
    pub fn run(&mut self) -> Result<StopReason, EvolutionError> {
        self.run_generations(self.config.max_generations)
    }

    /// Run up to `generations` more generations.
    pub fn run_generations(&mut self, generations: usize) -> Result<StopReason, EvolutionError> {
        self.run_with_callback(generations, |_| {})
    }

    /// Run up to `generations` more generations, reporting after each one.
    ///
    /// Any error aborts the run; the best-so-far record is never updated from
    /// a generation that failed.
    pub fn run_with_callback<F>(
        &mut self,
        generations: usize,
        mut callback: F,
    ) -> Result<StopReason, EvolutionError>
    where
        F: FnMut(&EvolutionProgress),
    {
        let start = Instant::now();
        self.phase = EnginePhase::Running;
        self.run_end = self.generation + generations;

        let mut outcome = Ok(StopReason::MaxGenerations);
        for _ in 0..generations {
            if let Err(e) = self.step() {
                outcome = Err(e);
                break;
            }
            callback(&self.progress());

            if let Some(limit) = self.config.stagnation_limit
                && self.stagnation_count >= limit
            {
                log::info!(
                    "Stopping after {} generations without improvement",
                    self.stagnation_count
                );
                outcome = Ok(StopReason::Stagnation);
                break;
            }
        }

        self.elapsed += start.elapsed();
        self.phase = EnginePhase::Done;
        if let Ok(reason) = outcome {
            self.stop_reason = Some(reason);
        }
        outcome
    }

    /// Run a single generation: evaluate, select, crossover, mutate.
    pub fn step(&mut self) -> Result<(), EvolutionError> {
        let scores = self.evaluate()?;
        let (champion_idx, champion_score) = champion(&scores);
        let champion = self.store.population().individual(champion_idx);

        let next = match self.config.crossover {
            CrossoverStrategy::Champion => self.rng.champion_crossover(
                self.store.population(),
                &champion,
                self.config.crossover_threshold,
            ),
            CrossoverStrategy::PairwiseRenewal { renewal_rate } => {
                self.pairwise_renewal(&scores, &champion, renewal_rate)
            }
        };
        let next = self.rng.mutate(&next, self.config.mutation_rate);
        self.store.replace_all(next)?;

        if self.store.record_if_better(&champion, champion_score) {
            log::info!(
                "Generation {}: new best score {}",
                self.generation,
                champion_score
            );
            self.stagnation_count = 0;
        } else {
            self.stagnation_count += 1;
        }

        self.history.record(&scores);
        self.generation += 1;

        log::debug!(
            "Generation {}: best={:.4} avg={:.4} std={:.4}",
            self.generation,
            champion_score,
            self.history.avg_fitness.last().copied().unwrap_or_default(),
            self.history.fitness_std.last().copied().unwrap_or_default()
        );

        Ok(())
    }

    /// Score the current population and check the evaluator's contract.
    fn evaluate(&self) -> Result<Vec<f32>, EvolutionError> {
        let population = self.store.population();
        let scores = self
            .evaluator
            .evaluate(population)
            .map_err(EvolutionError::EvaluationFailed)?;

        if scores.len() != population.pop_size() {
            return Err(EvolutionError::ScoreCountMismatch {
                expected: population.pop_size(),
                actual: scores.len(),
            });
        }
        if let Some((index, &score)) = scores.iter().enumerate().find(|(_, s)| !s.is_finite()) {
            return Err(EvolutionError::NonFiniteScore { index, score });
        }

        Ok(scores)
    }

    /// Renew the below-median half toward the champion, then exchange genes
    /// between row pairs.
    fn pairwise_renewal(
        &mut self,
        scores: &[f32],
        champion: &Individual,
        renewal_rate: f32,
    ) -> Population {
        let population = self.store.population();

        let renewed = match below_median(scores) {
            Some(rows) if !rows.is_empty() => {
                self.rng
                    .renew_toward(population, &rows, champion, renewal_rate)
            }
            Some(_) => population.clone(),
            None => {
                log::warn!(
                    "Generation {}: all scores equal, skipping renewal",
                    self.generation
                );
                population.clone()
            }
        };

        self.rng
            .pairwise_exchange(&renewed, self.config.crossover_threshold)
    }

    /// Best individual found so far.
    pub fn best_individual(&self) -> Result<&Individual, EvolutionError> {
        match self.store.best() {
            Some(best) if self.generation > 0 => Ok(best),
            _ => Err(EvolutionError::NotReady),
        }
    }

    /// Score of the best individual found so far.
    pub fn best_score(&self) -> Result<f32, EvolutionError> {
        self.best_individual()?;
        Ok(self.store.best_score())
    }

    /// Current population.
    pub fn population(&self) -> &Population {
        self.store.population()
    }

    /// Generations completed.
    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn history(&self) -> &EvolutionHistory {
        &self.history
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    /// Give back the evaluator, e.g. to render the best individual.
    pub fn into_evaluator(self) -> E {
        self.evaluator
    }

    /// Get current progress.
    pub fn progress(&self) -> EvolutionProgress {
        EvolutionProgress {
            generation: self.generation,
            total_generations: self.run_end,
            best_fitness: self.store.best_score(),
            generation_best: self
                .history
                .best_fitness
                .last()
                .copied()
                .unwrap_or(f32::NEG_INFINITY),
            avg_fitness: self.history.avg_fitness.last().copied().unwrap_or(0.0),
            stagnation_count: self.stagnation_count,
            phase: self.phase,
        }
    }

    /// Summary of everything run so far.
    pub fn result(&self) -> Result<EvolutionResult, EvolutionError> {
        let best = self.best_individual()?.clone();
        let best_score = self.store.best_score();

        let total_evaluations = self.generation as u64 * self.population().pop_size() as u64;
        let elapsed_seconds = self.elapsed.as_secs_f64();
        let evaluations_per_second = if elapsed_seconds > 0.0 {
            total_evaluations as f64 / elapsed_seconds
        } else {
            0.0
        };

        Ok(EvolutionResult {
            best,
            best_score,
            stats: EvolutionStats {
                generations: self.generation,
                total_evaluations,
                best_fitness: best_score,
                final_avg_fitness: self.history.avg_fitness.last().copied().unwrap_or(0.0),
                elapsed_seconds,
                evaluations_per_second,
                stop_reason: self.stop_reason.unwrap_or(StopReason::MaxGenerations),
            },
            history: self.history.clone(),
        })
    }
}

/// Index and score of the maximum; the first index wins ties.
fn champion(scores: &[f32]) -> (usize, f32) {
    let mut best = (0, scores[0]);
    for (i, &s) in scores.iter().enumerate().skip(1) {
        if s > best.1 {
            best = (i, s);
        }
    }
    best
}

/// Indices whose normalized score is strictly below the median.
///
/// Scores are shifted by their minimum and divided by their sum. Returns
/// `None` when that sum is zero (every score equal), where ranking carries no
/// information.
fn below_median(scores: &[f32]) -> Option<Vec<usize>> {
    let min = scores.iter().copied().fold(f32::INFINITY, f32::min);
    let total: f32 = scores.iter().map(|s| s - min).sum();
    if !(total.is_finite() && total > 0.0) {
        return None;
    }

    let normalized: Vec<f32> = scores.iter().map(|s| (s - min) / total).collect();
    let mut sorted = normalized.clone();
    sorted.sort_by(f32::total_cmp);
    let mid = sorted.len() / 2;
    let median = if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    };

    Some(
        normalized
            .iter()
            .enumerate()
            .filter(|(_, s)| **s < median)
            .map(|(i, _)| i)
            .collect(),
    )
}
