//! Mathematical utilities: grids, integration, descriptive statistics.

pub mod grid;
pub mod integrate;
pub mod stats;

pub use grid::*;
pub use integrate::*;
pub use stats::*;
