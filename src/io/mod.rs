//! Input/output helpers.
//!
//! - CSV ingest of contribution functions and intensities (`ingest`)
//! - CSV exports for synthetic data and summaries (`export`)
//!
//! DEM results are saved as JSON by `output::DemOutput`.

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
