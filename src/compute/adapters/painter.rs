//! Brush painter.
//!
//! A gene row `(x, y, color)` is one stroke of a gray brush tinted to
//! `color`, stamped with its top-left corner at `(x * width, y * height)`.

use rayon::prelude::*;

use crate::compute::evolution::{EvaluationError, EvolutionEngine, FitnessEvaluator, PerIndividual};
use crate::compute::raster::{Raster, RasterError};
use crate::compute::tensor::{GeneShape, Individual, Population};
use crate::schema::{EngineConfig, GENES_PER_STROKE};

use super::{AdapterError, check_layout};

/// Lower bound on the stroke coordinate spread, keeping the penalty finite.
const MIN_SPREAD: f32 = 1e-6;

/// Weight of the penalty on strokes bunched together.
const SPREAD_WEIGHT: f32 = 0.1;

/// Downsample then median-smooth a target image.
pub fn preprocess_target(
    raw: &Raster,
    downsample: f32,
    median_size: usize,
) -> Result<Raster, RasterError> {
    let resized = if downsample < 1.0 {
        raw.resize(downsample)?
    } else {
        raw.clone()
    };
    Ok(if median_size > 1 {
        resized.median_filter(median_size)
    } else {
        resized
    })
}

/// Fitness evaluator and renderer for brush painting.
#[derive(Debug, Clone)]
pub struct BrushPainter {
    target: Raster,
    brush: Raster,
}

impl BrushPainter {
    /// The target is converted to gray; the brush's alpha becomes a binary mask.
    pub fn new(target: &Raster, brush: &Raster) -> Result<Self, AdapterError> {
        target.validate()?;
        brush.validate()?;

        let mask = brush.alpha_mask(0.0);
        let brush = Raster::from_fn(brush.width, brush.height, |x, y| {
            if mask[y * brush.width + x] { 1.0 } else { 0.0 }
        });

        Ok(Self {
            target: target.to_gray(),
            brush,
        })
    }

    /// Opaque disc brush, gray + alpha.
    pub fn round_brush(diameter: usize) -> Raster {
        let diameter = diameter.max(1);
        let center = (diameter as f32 - 1.0) / 2.0;
        let radius = diameter as f32 / 2.0;

        let mut brush = Raster::new(diameter, diameter, 2);
        for y in 0..diameter {
            for x in 0..diameter {
                let dx = x as f32 - center;
                let dy = y as f32 - center;
                if dx * dx + dy * dy <= radius * radius {
                    brush.set(x, y, 0, 1.0);
                    brush.set(x, y, 1, 1.0);
                }
            }
        }
        brush
    }

    pub fn target(&self) -> &Raster {
        &self.target
    }

    /// Negated sum of squared stroke errors.
    ///
    /// A stroke's error is the distance between its color and the target
    /// under it, plus a penalty inversely proportional to the spread of
    /// all stroke coordinates.
    pub fn score(&self, genes: &[f32]) -> f32 {
        let width = self.target.width as f32;
        let height = self.target.height as f32;

        let xs: Vec<f32> = genes
            .chunks_exact(GENES_PER_STROKE)
            .map(|s| s[0] * width)
            .collect();
        let ys: Vec<f32> = genes
            .chunks_exact(GENES_PER_STROKE)
            .map(|s| s[1] * height)
            .collect();
        let penalty =
            SPREAD_WEIGHT * (1.0 / spread(&xs).max(MIN_SPREAD) + 1.0 / spread(&ys).max(MIN_SPREAD));

        -genes
            .chunks_exact(GENES_PER_STROKE)
            .zip(xs.iter().zip(&ys))
            .map(|(stroke, (&x, &y))| {
                let e = (self.target.sample(x, y, 0) - stroke[2]).abs() + penalty;
                e * e
            })
            .sum::<f32>()
    }

    /// RGBA canvas the size of the target with every stroke painted in order.
    pub fn render(&self, genes: &[f32]) -> Raster {
        let mut canvas = Raster::new(self.target.width, self.target.height, 4);
        self.paint(&mut canvas, genes);
        canvas
    }

    /// Paint strokes onto an existing canvas, positions relative to its size.
    pub fn paint(&self, canvas: &mut Raster, genes: &[f32]) {
        let width = canvas.width as f32;
        let height = canvas.height as f32;

        for stroke in genes.chunks_exact(GENES_PER_STROKE) {
            let tinted = self.tinted(stroke[2]);
            canvas.blend(
                &tinted,
                (stroke[0] * width).floor() as isize,
                (stroke[1] * height).floor() as isize,
            );
        }
    }

    fn tinted(&self, color: f32) -> Raster {
        let mut tinted = Raster::new(self.brush.width, self.brush.height, 4);
        for y in 0..self.brush.height {
            for x in 0..self.brush.width {
                let alpha = self.brush.get(x, y, 0);
                for c in 0..3 {
                    tinted.set(x, y, c, color);
                }
                tinted.set(x, y, 3, alpha);
            }
        }
        tinted
    }
}

impl FitnessEvaluator for BrushPainter {
    fn evaluate(&self, population: &Population) -> Result<Vec<f32>, EvaluationError> {
        let shape = population.shape();
        check_layout(GeneShape::new(shape.genes_x, GENES_PER_STROKE), shape)?;
        PerIndividual(|genes: &[f32]| self.score(genes)).evaluate(population)
    }
}

/// Population standard deviation.
fn spread(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n).sqrt()
}

/// Strokes from every tile, in full-image coordinates.
#[derive(Debug, Clone)]
pub struct TiledPainting {
    /// `(tiles * genes_x, 3)` strokes, tile by tile.
    pub strokes: Individual,
    /// Best score reached on each tile.
    pub tile_scores: Vec<f32>,
}

/// Paint a target tile by tile.
///
/// The target is split into `tiles_x * tiles_y` equal tiles (leftover edge
/// pixels are dropped), each optimized by its own engine. Tile `(tx, ty)`
/// remaps a stroke's `x` to `x / tiles_x + tx / tiles_x`, and `y` likewise.
/// Tiles are ordered `tx`-major. With a seed, tile `i` uses `seed + i`.
pub fn paint_tiled(
    target: &Raster,
    brush: &Raster,
    tiles_x: usize,
    tiles_y: usize,
    config: &EngineConfig,
) -> Result<TiledPainting, AdapterError> {
    target.validate()?;
    let step_x = target.width / tiles_x.max(1);
    let step_y = target.height / tiles_y.max(1);
    if tiles_x == 0 || tiles_y == 0 || step_x == 0 || step_y == 0 {
        return Err(AdapterError::TileGrid {
            tiles_x,
            tiles_y,
            width: target.width,
            height: target.height,
        });
    }

    let mut tile_config = config.clone();
    tile_config.genes_y = GENES_PER_STROKE;
    let tiles = tiles_x * tiles_y;

    let painted = (0..tiles)
        .into_par_iter()
        .map(|index| -> Result<(Vec<f32>, f32), AdapterError> {
            let (tx, ty) = (index / tiles_y, index % tiles_y);
            let tile = target.crop(tx * step_x, ty * step_y, step_x, step_y);

            let mut config = tile_config.clone();
            config.random_seed = tile_config
                .random_seed
                .map(|seed| seed.wrapping_add(index as u64));

            let mut engine = EvolutionEngine::new(config, BrushPainter::new(&tile, brush)?)?;
            engine.run()?;
            let score = engine.best_score()?;
            log::info!("Tile {}/{} ({tx}, {ty}): best score {score:.4}", index + 1, tiles);

            let mut strokes = engine.best_individual()?.genes().to_vec();
            for stroke in strokes.chunks_exact_mut(GENES_PER_STROKE) {
                stroke[0] = (stroke[0] + tx as f32) / tiles_x as f32;
                stroke[1] = (stroke[1] + ty as f32) / tiles_y as f32;
            }
            Ok((strokes, score))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let shape = GeneShape::new(tiles * tile_config.genes_x, GENES_PER_STROKE);
    let mut genes = Vec::with_capacity(shape.len());
    let mut tile_scores = Vec::with_capacity(tiles);
    for (strokes, score) in painted {
        genes.extend(strokes);
        tile_scores.push(score);
    }
    let actual = GeneShape::new(genes.len() / GENES_PER_STROKE, GENES_PER_STROKE);
    let strokes = Individual::from_genes(shape, genes).ok_or(AdapterError::GeneLayout {
        expected: shape,
        actual,
    })?;

    Ok(TiledPainting {
        strokes,
        tile_scores,
    })
}
