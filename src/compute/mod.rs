//! Compute module - Gene tensors, evolutionary search and image adapters.

pub mod adapters;
pub mod evolution;
pub mod raster;
mod tensor;

pub use raster::{Raster, RasterError};
pub use tensor::*;
