//! Schema module - Configuration, progress and result types.

mod config;
mod evolution;
mod problem;

pub use config::*;
pub use evolution::*;
pub use problem::*;
