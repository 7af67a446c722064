//! Problem descriptions driven by the command-line runner.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::config::{ConfigError, EngineConfig};

/// Genes per painter stroke: `(x, y, color)`.
pub const GENES_PER_STROKE: usize = 3;

/// Genes per packer object: `(x, y, scale, angle)`.
pub const GENES_PER_OBJECT: usize = 4;

/// Upper bound on the stamp and brush resize factors.
pub const MAX_RESIZE_SCALE: f32 = 4.0;

/// A complete run: engine settings plus the problem being optimized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    pub problem: ProblemConfig,
}

impl RunConfig {
    /// Engine configuration with the gene layout the problem dictates.
    ///
    /// The painter fixes `genes_y`; the packer fixes both `genes_x`
    /// (one row per object) and `genes_y`.
    pub fn resolved_engine(&self) -> EngineConfig {
        let mut engine = self.engine.clone();
        match &self.problem {
            ProblemConfig::GeneSum => {}
            ProblemConfig::Painter(_) => engine.genes_y = GENES_PER_STROKE,
            ProblemConfig::Packer(packer) => {
                engine.genes_x = packer.max_objects;
                engine.genes_y = GENES_PER_OBJECT;
            }
        }
        engine
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.resolved_engine().validate()?;
        match &self.problem {
            ProblemConfig::GeneSum => Ok(()),
            ProblemConfig::Painter(painter) => painter.validate(),
            ProblemConfig::Packer(packer) => packer.validate(),
        }
    }

    /// Small self-contained run used by `--example`.
    pub fn example() -> Self {
        Self {
            engine: EngineConfig {
                pop_size: 50,
                genes_x: 10,
                genes_y: 10,
                max_generations: 200,
                random_seed: Some(42),
                ..Default::default()
            },
            problem: ProblemConfig::GeneSum,
        }
    }
}

/// What the genes encode and how they are scored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProblemConfig {
    /// Score is the sum of all genes.
    GeneSum,
    /// Approximate a target image with colored brush strokes.
    Painter(PainterConfig),
    /// Cover a target silhouette with rotated, scaled stamp images.
    Packer(PackerConfig),
}

/// Brush painter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PainterConfig {
    /// Target image.
    pub target: PathBuf,
    /// Brush image. A round brush is generated when absent.
    #[serde(default)]
    pub brush: Option<PathBuf>,
    /// Factor applied to the target before painting.
    #[serde(default = "default_downsample")]
    pub downsample: f32,
    /// Median filter window applied to the target and brush; 0 or 1 disables it.
    #[serde(default = "default_median_size")]
    pub median_size: usize,
    /// Factor applied to a loaded brush.
    #[serde(default = "default_brush_scale")]
    pub brush_scale: f32,
    /// Diameter in pixels of the generated round brush.
    #[serde(default = "default_brush_diameter")]
    pub brush_diameter: usize,
    #[serde(default = "default_tiles")]
    pub tiles_x: usize,
    #[serde(default = "default_tiles")]
    pub tiles_y: usize,
}

impl PainterConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.downsample > 0.0 && self.downsample <= 1.0) {
            return Err(ConfigError::InvalidProblem("downsample must lie in (0, 1]"));
        }
        if !(self.brush_scale > 0.0 && self.brush_scale <= MAX_RESIZE_SCALE) {
            return Err(ConfigError::InvalidProblem("brush_scale must lie in (0, 4]"));
        }
        if self.brush_diameter == 0 {
            return Err(ConfigError::InvalidProblem("brush_diameter must be positive"));
        }
        if self.tiles_x == 0 || self.tiles_y == 0 {
            return Err(ConfigError::InvalidProblem("tile counts must be positive"));
        }
        Ok(())
    }
}

fn default_downsample() -> f32 {
    0.5
}
fn default_median_size() -> usize {
    5
}
fn default_brush_scale() -> f32 {
    0.02
}
fn default_brush_diameter() -> usize {
    5
}
fn default_tiles() -> usize {
    1
}

/// Stamp packer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackerConfig {
    /// Target image.
    pub target: PathBuf,
    /// Stamp images, each with an alpha channel.
    pub stamps: Vec<PathBuf>,
    /// Number of objects placed; one gene row each.
    #[serde(default = "default_max_objects")]
    pub max_objects: usize,
    /// Global resize factor applied to every stamp on load.
    #[serde(default = "default_scale")]
    pub scale: f32,
    #[serde(default)]
    pub weights: PackerWeights,
}

impl PackerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stamps.is_empty() {
            return Err(ConfigError::InvalidProblem("at least one stamp is required"));
        }
        if self.max_objects == 0 {
            return Err(ConfigError::InvalidProblem("max_objects must be positive"));
        }
        if !(self.scale > 0.0 && self.scale <= MAX_RESIZE_SCALE) {
            return Err(ConfigError::InvalidProblem("scale must lie in (0, 4]"));
        }
        Ok(())
    }
}

fn default_max_objects() -> usize {
    120
}
fn default_scale() -> f32 {
    0.05
}

/// Packer cost weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PackerWeights {
    /// Per uncovered target pixel.
    #[serde(default = "default_area_weight")]
    pub area_weight: f32,
    /// Per stamp pixel outside the target.
    #[serde(default = "default_cost_weight")]
    pub cost_weight: f32,
}

impl Default for PackerWeights {
    fn default() -> Self {
        Self {
            area_weight: default_area_weight(),
            cost_weight: default_cost_weight(),
        }
    }
}

fn default_area_weight() -> f32 {
    800.0
}
fn default_cost_weight() -> f32 {
    50.0
}
