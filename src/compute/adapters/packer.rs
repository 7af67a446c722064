//! Stamp packer.
//!
//! Each object slot is bound to one stamp when the packer is built. A gene
//! row `(x, y, scale, angle)` places that stamp with its top-left corner at
//! `(x * width, y * height)`, scaled by `0.7 * scale + 0.3` and rotated by
//! `2π * angle - π`.

use std::f32::consts::{PI, TAU};

use rand::prelude::*;

use crate::compute::evolution::{EvaluationError, FitnessEvaluator, GenomeRng, PerIndividual};
use crate::compute::raster::Raster;
use crate::compute::tensor::{GeneShape, Population};
use crate::schema::{GENES_PER_OBJECT, PackerWeights};

use super::{AdapterError, check_layout};

/// Pixels above this are "on" in the target and stamp masks.
const MASK_THRESHOLD: f32 = 0.01;

/// A named stamp image, ideally with an alpha channel.
#[derive(Debug, Clone)]
pub struct Stamp {
    pub name: String,
    pub image: Raster,
}

/// Fitness evaluator and renderer for stamp packing.
pub struct StampPacker {
    target: Raster,
    target_mask: Vec<bool>,
    stamps: Vec<Stamp>,
    silhouettes: Vec<Raster>,
    slots: Vec<usize>,
    weights: PackerWeights,
}

impl StampPacker {
    /// Build a packer with `max_objects` slots, each bound to a random stamp.
    ///
    /// The target is converted to gray (alpha premultiplied) and normalized
    /// by its maximum. Stamps are resized by `scale`.
    pub fn new(
        target: &Raster,
        stamps: Vec<Stamp>,
        max_objects: usize,
        scale: f32,
        weights: PackerWeights,
        rng: &mut GenomeRng,
    ) -> Result<Self, AdapterError> {
        if stamps.is_empty() {
            return Err(AdapterError::NoStamps);
        }
        let mut pick = StdRng::seed_from_u64(rng.next_seed());
        let slots = (0..max_objects)
            .map(|_| pick.gen_range(0..stamps.len()))
            .collect();
        Self::with_slots(target, stamps, slots, scale, weights)
    }

    /// Build a packer with an explicit stamp index per slot.
    pub fn with_slots(
        target: &Raster,
        stamps: Vec<Stamp>,
        slots: Vec<usize>,
        scale: f32,
        weights: PackerWeights,
    ) -> Result<Self, AdapterError> {
        target.validate()?;
        if stamps.is_empty() {
            return Err(AdapterError::NoStamps);
        }
        if let Some(&index) = slots.iter().find(|&&i| i >= stamps.len()) {
            return Err(AdapterError::UnknownStamp {
                index,
                available: stamps.len(),
            });
        }

        let mut gray = target.to_gray();
        gray.normalize_max();
        let target_mask = gray.mask_above(MASK_THRESHOLD);

        let mut scaled = Vec::with_capacity(stamps.len());
        for stamp in stamps {
            stamp.image.validate()?;
            scaled.push(Stamp {
                name: stamp.name,
                image: stamp.image.resize(scale)?,
            });
        }
        let silhouettes = scaled.iter().map(|s| silhouette(&s.image)).collect();

        Ok(Self {
            target: gray,
            target_mask,
            stamps: scaled,
            silhouettes,
            slots,
            weights,
        })
    }

    /// Gene layout: one `(x, y, scale, angle)` row per slot.
    pub fn gene_shape(&self) -> GeneShape {
        GeneShape::new(self.slots.len(), GENES_PER_OBJECT)
    }

    /// Name of the stamp bound to each slot, in slot order.
    pub fn slot_names(&self) -> Vec<&str> {
        self.slots
            .iter()
            .map(|&i| self.stamps[i].name.as_str())
            .collect()
    }

    /// Normalized gray target.
    pub fn target(&self) -> &Raster {
        &self.target
    }

    pub fn weights(&self) -> &PackerWeights {
        &self.weights
    }

    /// Binary coverage of all placed stamps, row-major over the target.
    pub fn coverage(&self, genes: &[f32]) -> Vec<bool> {
        let (width, height) = (self.target.width, self.target.height);
        let mut covered = vec![false; width * height];

        for (row, &slot) in genes.chunks_exact(GENES_PER_OBJECT).zip(&self.slots) {
            let placement = Placement::from_row(row, width, height);
            let mask = placement.transform(&self.silhouettes[slot]);

            for my in 0..mask.height {
                let y = placement.y0 + my as isize;
                if y < 0 || y >= height as isize {
                    continue;
                }
                for mx in 0..mask.width {
                    let x = placement.x0 + mx as isize;
                    if x < 0 || x >= width as isize {
                        continue;
                    }
                    if mask.get(mx, my, 0) > 0.5 {
                        covered[y as usize * width + x as usize] = true;
                    }
                }
            }
        }
        covered
    }

    /// Weighted count of uncovered target pixels plus covered background pixels.
    pub fn cost(&self, genes: &[f32]) -> f32 {
        let (mut uncovered, mut spill) = (0usize, 0usize);
        for (&target, covered) in self.target_mask.iter().zip(self.coverage(genes)) {
            match (target, covered) {
                (true, false) => uncovered += 1,
                (false, true) => spill += 1,
                _ => {}
            }
        }
        self.weights.area_weight * uncovered as f32 + self.weights.cost_weight * spill as f32
    }

    /// Full-color RGBA composite of the placed stamps.
    pub fn render(&self, genes: &[f32]) -> Raster {
        let (width, height) = (self.target.width, self.target.height);
        let mut canvas = Raster::new(width, height, 4);

        for (row, &slot) in genes.chunks_exact(GENES_PER_OBJECT).zip(&self.slots) {
            let placement = Placement::from_row(row, width, height);
            let image = placement.transform(&self.stamps[slot].image);
            canvas.blend(&image, placement.x0, placement.y0);
        }
        canvas
    }
}

impl FitnessEvaluator for StampPacker {
    fn evaluate(&self, population: &Population) -> Result<Vec<f32>, EvaluationError> {
        check_layout(self.gene_shape(), population.shape())?;
        PerIndividual(|genes: &[f32]| -self.cost(genes)).evaluate(population)
    }
}

struct Placement {
    x0: isize,
    y0: isize,
    scale: f32,
    angle: f32,
}

impl Placement {
    fn from_row(row: &[f32], width: usize, height: usize) -> Self {
        Self {
            x0: (row[0] * width as f32).floor() as isize,
            y0: (row[1] * height as f32).floor() as isize,
            scale: 0.7 * row[2] + 0.3,
            angle: TAU * row[3] - PI,
        }
    }

    fn transform(&self, image: &Raster) -> Raster {
        let width = ((image.width as f32 * self.scale).round() as usize).max(1);
        let height = ((image.height as f32 * self.scale).round() as usize).max(1);
        image.resize_to(width, height).rotate(self.angle)
    }
}

/// Single-channel 0/1 mask of the stamp's opaque pixels.
fn silhouette(image: &Raster) -> Raster {
    let mask = image.alpha_mask(MASK_THRESHOLD);
    Raster::from_fn(image.width, image.height, |x, y| {
        if mask[y * image.width + x] { 1.0 } else { 0.0 }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::raster::RasterError;

    /// 8x8 target with a 4x4 square at (2..6, 2..6).
    fn target() -> Raster {
        Raster::from_fn(8, 8, |x, y| {
            if (2..6).contains(&x) && (2..6).contains(&y) {
                1.0
            } else {
                0.0
            }
        })
    }

    /// Opaque 4x4 gray + alpha stamp.
    fn square(name: &str) -> Stamp {
        Stamp {
            name: name.to_string(),
            image: Raster::from_data(4, 4, 2, [0.5, 1.0].repeat(16)).unwrap(),
        }
    }

    fn packer(slots: Vec<usize>) -> StampPacker {
        StampPacker::with_slots(
            &target(),
            vec![square("a"), square("b")],
            slots,
            1.0,
            PackerWeights::default(),
        )
        .unwrap()
    }

    // Full scale, no rotation.
    fn row(x: f32, y: f32) -> [f32; 4] {
        [x, y, 1.0, 0.5]
    }

    #[test]
    fn test_exact_cover_costs_nothing() {
        let packer = packer(vec![0]);
        assert_eq!(packer.cost(&row(0.25, 0.25)), 0.0);
    }

    #[test]
    fn test_cost_weights_miss_and_spill() {
        let packer = packer(vec![0]);
        // Overlaps the target square on a 2x2 corner only.
        let cost = packer.cost(&row(0.0, 0.0));
        assert_eq!(cost, 800.0 * 12.0 + 50.0 * 12.0);
    }

    #[test]
    fn test_offscreen_stamp_is_clipped() {
        let packer = packer(vec![0]);
        let coverage = packer.coverage(&row(0.99, 0.99));
        assert_eq!(coverage.iter().filter(|&&c| c).count(), 1);
    }

    #[test]
    fn test_evaluate_negates_cost_and_checks_layout() {
        let packer = packer(vec![0, 1]);
        let mut genes = row(0.25, 0.25).to_vec();
        genes.extend(row(0.0, 0.0));
        let population = Population::from_data(1, packer.gene_shape(), genes.clone()).unwrap();

        let scores = packer.evaluate(&population).unwrap();
        assert_eq!(scores, vec![-packer.cost(&genes)]);

        let wrong = Population::zeros(2, GeneShape::new(3, 4));
        assert!(packer.evaluate(&wrong).is_err());
    }

    #[test]
    fn test_render_places_color() {
        let packer = packer(vec![1]);
        let image = packer.render(&row(0.25, 0.25));
        assert_eq!((image.width, image.height, image.channels), (8, 8, 4));
        assert!((image.get(3, 3, 0) - 0.5).abs() < 1e-6);
        assert!((image.get(3, 3, 3) - 1.0).abs() < 1e-6);
        assert_eq!(image.get(0, 0, 3), 0.0);
    }

    #[test]
    fn test_random_slots_and_names() {
        let mut rng = GenomeRng::new(3);
        let packer = StampPacker::new(
            &target(),
            vec![square("a"), square("b")],
            6,
            0.5,
            PackerWeights::default(),
            &mut rng,
        )
        .unwrap();

        assert_eq!(packer.gene_shape(), GeneShape::new(6, 4));
        let names = packer.slot_names();
        assert_eq!(names.len(), 6);
        assert!(names.iter().all(|n| *n == "a" || *n == "b"));
    }

    #[test]
    fn test_setup_errors() {
        assert!(matches!(
            StampPacker::with_slots(&target(), vec![], vec![], 1.0, PackerWeights::default()),
            Err(AdapterError::NoStamps)
        ));
        assert!(matches!(
            StampPacker::with_slots(
                &target(),
                vec![square("a")],
                vec![0],
                1e30,
                PackerWeights::default()
            ),
            Err(AdapterError::Raster(RasterError::TooLarge { .. }))
        ));
        assert!(matches!(
            StampPacker::with_slots(
                &target(),
                vec![square("a")],
                vec![0, 3],
                1.0,
                PackerWeights::default()
            ),
            Err(AdapterError::UnknownStamp {
                index: 3,
                available: 1
            })
        ));
    }
}
