//! Progress, history and result types reported by the evolution engine.

use serde::{Deserialize, Serialize};

use crate::compute::Individual;

/// Progress update emitted after each generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionProgress {
    /// Generations completed so far.
    pub generation: usize,
    /// Generation count at which the current run ends.
    pub total_generations: usize,
    /// Best-so-far score.
    pub best_fitness: f32,
    /// Best score of the generation just evaluated.
    pub generation_best: f32,
    /// Mean score of the generation just evaluated.
    pub avg_fitness: f32,
    /// Generations since the best-so-far score last improved.
    pub stagnation_count: usize,
    /// Current phase of the engine.
    pub phase: EnginePhase,
}

/// Per-generation statistics for plotting.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EvolutionHistory {
    /// Best score per generation.
    pub best_fitness: Vec<f32>,
    /// Mean score per generation.
    pub avg_fitness: Vec<f32>,
    /// Score standard deviation per generation.
    pub fitness_std: Vec<f32>,
}

impl EvolutionHistory {
    /// Number of recorded generations.
    pub fn len(&self) -> usize {
        self.best_fitness.len()
    }

    pub fn is_empty(&self) -> bool {
        self.best_fitness.is_empty()
    }

    /// Append one generation's score summary.
    pub fn record(&mut self, scores: &[f32]) {
        let n = scores.len().max(1) as f32;
        let best = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let mean = scores.iter().sum::<f32>() / n;
        let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f32>() / n;

        self.best_fitness.push(best);
        self.avg_fitness.push(mean);
        self.fitness_std.push(variance.sqrt());
    }
}

/// Engine lifecycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum EnginePhase {
    /// Population allocated, no generation run yet.
    #[default]
    Idle,
    /// Inside `run`.
    Running,
    /// Last run finished.
    Done,
}

/// Statistics from an evolution run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionStats {
    /// Total generations completed.
    pub generations: usize,
    /// Total individual evaluations performed.
    pub total_evaluations: u64,
    /// Best score achieved.
    pub best_fitness: f32,
    /// Mean score of the last evaluated generation.
    pub final_avg_fitness: f32,
    /// Time spent inside `run` (in seconds).
    pub elapsed_seconds: f64,
    /// Evaluations per second.
    pub evaluations_per_second: f64,
    /// Reason the last run stopped.
    pub stop_reason: StopReason,
}

/// Reason a run stopped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    /// Generation budget exhausted.
    MaxGenerations,
    /// Best score unchanged for `stagnation_limit` generations.
    Stagnation,
}

/// Final result of an evolution run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionResult {
    /// Best individual found.
    pub best: Individual,
    /// Its score.
    pub best_score: f32,
    /// Statistics from the run.
    pub stats: EvolutionStats,
    /// Full history for analysis.
    pub history: EvolutionHistory,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_record() {
        let mut history = EvolutionHistory::default();
        history.record(&[1.0, 3.0]);
        history.record(&[2.0, 2.0]);

        assert_eq!(history.len(), 2);
        assert_eq!(history.best_fitness, vec![3.0, 2.0]);
        assert_eq!(history.avg_fitness, vec![2.0, 2.0]);
        assert!((history.fitness_std[0] - 1.0).abs() < 1e-6);
        assert!(history.fitness_std[1].abs() < 1e-6);
    }

    #[test]
    fn test_stop_reason_serialization() {
        let json = serde_json::to_string(&StopReason::Stagnation).unwrap();
        let parsed: StopReason = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, StopReason::Stagnation);
    }
}
