//! MCMC estimation of DEMs.
//!
//! Responsibilities:
//!
//! - score candidate DEM vectors (`log_prob`)
//! - explore the posterior with an affine-invariant ensemble (`ensemble`)
//! - orchestrate warm-up + full sampling into a `DemOutput` (`inversion`)

pub mod ensemble;
pub mod inversion;
pub mod log_prob;

pub use ensemble::*;
pub use inversion::*;
pub use log_prob::*;
