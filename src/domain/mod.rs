//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - temperature grids (`TempBins`) and binned DEMs (`BinnedDem`)
//! - run configuration (`InversionConfig`, `GridConfig`, `SyntheticConfig`)

pub mod types;

pub use types::*;
