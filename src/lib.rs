//! evo-canvas - Batched genetic search over gene matrices.
//!
//! A population is a dense `(pop_size, genes_x, genes_y)` tensor of floats in
//! `[0, 1)`. Every generation scores the whole population at once, breeds
//! everyone toward the current champion, and applies uniform-reset mutation.
//! The best individual ever seen is kept. What a gene means is left entirely
//! to the fitness evaluator; the bundled adapters read genes as brush strokes
//! or stamp placements over a target image.
//!
//! # Architecture
//!
//! - `schema`: configuration, progress and result types
//! - `compute`: gene tensors, the evolutionary engine, rasters and adapters
//! - `genes`: the plain-text gene file format
//!
//! # Example
//!
//! ```rust,no_run
//! use evo_canvas::{
//!     compute::evolution::{EvolutionEngine, PerIndividual},
//!     schema::EngineConfig,
//! };
//!
//! // Push every gene toward 0.5.
//! let evaluator = PerIndividual(|genes: &[f32]| {
//!     -genes.iter().map(|g| (g - 0.5).powi(2)).sum::<f32>()
//! });
//!
//! let config = EngineConfig {
//!     genes_x: 8,
//!     genes_y: 2,
//!     random_seed: Some(1),
//!     ..Default::default()
//! };
//! let mut engine = EvolutionEngine::new(config, evaluator).unwrap();
//! engine.run().unwrap();
//!
//! let result = engine.result().unwrap();
//! println!("best score {} after {} generations", result.best_score, result.stats.generations);
//! ```

pub mod compute;
pub mod genes;
pub mod schema;

// Re-export commonly used types
pub use compute::evolution::{EvolutionEngine, EvolutionError, FitnessEvaluator};
pub use compute::{Individual, Population, Raster};
pub use genes::GeneFile;
pub use schema::{EngineConfig, EvolutionResult, RunConfig};
