//! Fitness evaluators that turn genes into images.
//!
//! - [`StampPacker`]: one row `(x, y, scale, angle)` per placed stamp.
//! - [`BrushPainter`]: one row `(x, y, color)` per brush stroke, with
//!   [`paint_tiled`] running an independent search per image tile.

mod packer;
mod painter;

pub use packer::{Stamp, StampPacker};
pub use painter::{BrushPainter, TiledPainting, paint_tiled, preprocess_target};

use crate::compute::evolution::EvolutionError;
use crate::compute::raster::RasterError;
use crate::compute::tensor::GeneShape;

/// Adapter setup and evaluation errors.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("Population shape {actual:?} does not match the adapter layout {expected:?}")]
    GeneLayout {
        expected: GeneShape,
        actual: GeneShape,
    },
    #[error("At least one stamp is required")]
    NoStamps,
    #[error("Stamp index {index} out of range for {available} stamps")]
    UnknownStamp { index: usize, available: usize },
    #[error("Tile grid {tiles_x}x{tiles_y} does not fit a {width}x{height} target")]
    TileGrid {
        tiles_x: usize,
        tiles_y: usize,
        width: usize,
        height: usize,
    },
    #[error(transparent)]
    Raster(#[from] RasterError),
    #[error(transparent)]
    Evolution(#[from] EvolutionError),
}

/// Reject a population whose individuals are not laid out as the adapter expects.
pub(crate) fn check_layout(expected: GeneShape, actual: GeneShape) -> Result<(), AdapterError> {
    if expected == actual {
        Ok(())
    } else {
        Err(AdapterError::GeneLayout { expected, actual })
    }
}
