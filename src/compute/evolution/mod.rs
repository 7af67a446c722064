//! Evolutionary search over batched gene tensors.
//!
//! # Overview
//!
//! - **Fitness Evaluators** (`fitness`): pluggable scoring of a whole population
//! - **Genome Operations** (`genome`): random initialization, crossover and mutation
//! - **Population Store** (`population`): the live population and the best-so-far record
//! - **Search** (`search`): the generational run loop
//!
//! # Generation
//!
//! Each generation runs, in this order:
//!
//! 1. Evaluate the whole population once (higher score = better).
//! 2. Pick the champion (first index with the maximum score) and update the
//!    best-so-far record on strict improvement.
//! 3. Crossover toward the champion. This replaces classical
//!    fitness-proportional selection: everyone is bred toward the current
//!    champion with a single broadcast operation.
//! 4. Mutation: each gene is replaced by a fresh uniform value with
//!    probability `mutation_rate`.
//!
//! # Example
//!
//! ```rust,no_run
//! use evo_canvas::compute::evolution::{EvolutionEngine, GeneSum};
//! use evo_canvas::schema::EngineConfig;
//!
//! let config = EngineConfig {
//!     pop_size: 200,
//!     genes_x: 10,
//!     genes_y: 10,
//!     mutation_rate: 0.001,
//!     crossover_threshold: 0.8,
//!     max_generations: 1000,
//!     random_seed: Some(7),
//!     ..Default::default()
//! };
//!
//! let mut engine = EvolutionEngine::new(config, GeneSum).unwrap();
//! engine.run().unwrap();
//! println!("best score: {}", engine.best_score().unwrap());
//! ```

mod fitness;
mod genome;
mod population;
mod search;

pub use fitness::{EvaluationError, FitnessEvaluator, FnEvaluator, GeneSum, PerIndividual, from_fn};
pub use genome::GenomeRng;
pub use population::PopulationStore;
pub use search::EvolutionEngine;

use crate::schema::ConfigError;

/// Errors raised while building or running the engine.
#[derive(Debug, thiserror::Error)]
pub enum EvolutionError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),
    #[error("Population shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize, usize),
        actual: (usize, usize, usize),
    },
    #[error("Fitness evaluator returned {actual} scores for {expected} individuals")]
    ScoreCountMismatch { expected: usize, actual: usize },
    #[error("Fitness evaluator returned non-finite score {score} for individual {index}")]
    NonFiniteScore { index: usize, score: f32 },
    #[error("Fitness evaluation failed: {0}")]
    EvaluationFailed(#[source] EvaluationError),
    #[error("No generation has completed yet")]
    NotReady,
}
