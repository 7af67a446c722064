//! Configuration types for the evolutionary engine.

use serde::{Deserialize, Serialize};

/// Engine configuration.
///
/// Every gene is a float in `[0, 1)`; what a gene means (coordinate, scale,
/// color, angle) is decided by the fitness evaluator, never by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of individuals. Rounded up to the next even number.
    #[serde(default = "default_pop_size")]
    pub pop_size: usize,
    /// Rows per individual.
    pub genes_x: usize,
    /// Columns per individual.
    pub genes_y: usize,
    /// Per-gene probability of being replaced by a fresh uniform value.
    #[serde(default = "default_mutation_rate")]
    pub mutation_rate: f32,
    /// Per-gene probability used by the crossover operator.
    #[serde(default = "default_crossover_threshold")]
    pub crossover_threshold: f32,
    /// Generation budget for [`run`](crate::compute::evolution::EvolutionEngine::run).
    #[serde(default = "default_max_generations")]
    pub max_generations: usize,
    /// Crossover operator. Held fixed for the whole run.
    #[serde(default)]
    pub crossover: CrossoverStrategy,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
    /// Stop once the best score has not improved for this many generations.
    #[serde(default)]
    pub stagnation_limit: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pop_size: default_pop_size(),
            genes_x: 10,
            genes_y: 10,
            mutation_rate: default_mutation_rate(),
            crossover_threshold: default_crossover_threshold(),
            max_generations: default_max_generations(),
            crossover: CrossoverStrategy::default(),
            random_seed: None,
            stagnation_limit: None,
        }
    }
}

fn default_pop_size() -> usize {
    100
}
fn default_mutation_rate() -> f32 {
    0.001
}
fn default_crossover_threshold() -> f32 {
    0.5
}
fn default_max_generations() -> usize {
    100
}

/// Crossover operator applied after selection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "type")]
pub enum CrossoverStrategy {
    /// Every gene of every individual inherits the champion's gene with
    /// probability `crossover_threshold`.
    #[default]
    Champion,
    /// Individuals scoring below the median are pulled toward the champion
    /// (per gene, with probability `renewal_rate`), then rows `2k` and `2k+1`
    /// exchange every gene whose draw exceeds `crossover_threshold`.
    PairwiseRenewal {
        #[serde(default = "default_renewal_rate")]
        renewal_rate: f32,
    },
}

fn default_renewal_rate() -> f32 {
    0.8
}

impl EngineConfig {
    /// Population size actually allocated (even, `>= pop_size`).
    #[inline]
    pub fn effective_pop_size(&self) -> usize {
        self.pop_size + self.pop_size % 2
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pop_size == 0 || self.genes_x == 0 || self.genes_y == 0 {
            return Err(ConfigError::InvalidDimensions {
                pop_size: self.pop_size,
                genes_x: self.genes_x,
                genes_y: self.genes_y,
            });
        }
        check_probability("mutation_rate", self.mutation_rate)?;
        check_probability("crossover_threshold", self.crossover_threshold)?;
        if let CrossoverStrategy::PairwiseRenewal { renewal_rate } = self.crossover {
            check_probability("renewal_rate", renewal_rate)?;
        }
        if self.max_generations == 0 {
            return Err(ConfigError::InvalidGenerations);
        }
        if self.stagnation_limit == Some(0) {
            return Err(ConfigError::InvalidStagnationLimit);
        }
        Ok(())
    }
}

fn check_probability(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { name, value })
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error(
        "Population and gene dimensions must be positive (pop_size={pop_size}, genes_x={genes_x}, genes_y={genes_y})"
    )]
    InvalidDimensions {
        pop_size: usize,
        genes_x: usize,
        genes_y: usize,
    },
    #[error("{name} must lie in [0, 1], got {value}")]
    OutOfRange { name: &'static str, value: f32 },
    #[error("Generation budget must be positive")]
    InvalidGenerations,
    #[error("Stagnation limit must be positive when set")]
    InvalidStagnationLimit,
    #[error("Invalid problem setup: {0}")]
    InvalidProblem(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(pop_size: usize) -> EngineConfig {
        EngineConfig {
            pop_size,
            genes_x: 2,
            genes_y: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_pop_size_rounds_up_to_even() {
        assert_eq!(config(1).effective_pop_size(), 2);
        assert_eq!(config(4).effective_pop_size(), 4);
        assert_eq!(config(7).effective_pop_size(), 8);
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        assert!(matches!(
            config(0).validate(),
            Err(ConfigError::InvalidDimensions { .. })
        ));

        let mut c = config(4);
        c.genes_y = 0;
        assert!(matches!(
            c.validate(),
            Err(ConfigError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_rates_out_of_range_rejected() {
        let mut c = config(4);
        c.mutation_rate = 1.5;
        assert_eq!(
            c.validate(),
            Err(ConfigError::OutOfRange {
                name: "mutation_rate",
                value: 1.5
            })
        );

        let mut c = config(4);
        c.crossover_threshold = -0.1;
        assert!(matches!(c.validate(), Err(ConfigError::OutOfRange { .. })));

        let mut c = config(4);
        c.crossover_threshold = f32::NAN;
        assert!(c.validate().is_err());

        let mut c = config(4);
        c.crossover = CrossoverStrategy::PairwiseRenewal { renewal_rate: 2.0 };
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_serialization_defaults() {
        let parsed: EngineConfig =
            serde_json::from_str(r#"{"genes_x": 3, "genes_y": 2}"#).unwrap();
        assert_eq!(parsed.pop_size, 100);
        assert_eq!(parsed.crossover, CrossoverStrategy::Champion);
        assert!((parsed.crossover_threshold - 0.5).abs() < 1e-6);

        let parsed: EngineConfig = serde_json::from_str(
            r#"{"genes_x": 3, "genes_y": 2, "crossover": {"type": "PairwiseRenewal"}}"#,
        )
        .unwrap();
        assert_eq!(
            parsed.crossover,
            CrossoverStrategy::PairwiseRenewal { renewal_rate: 0.8 }
        );
    }
}
