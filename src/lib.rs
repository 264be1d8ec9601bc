//! `demcmc` library crate: differential emission measure (DEM) estimation
//! with Markov chain Monte Carlo.
//!
//! The binary (`demcmc`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the forward model and sampler are reusable from other tools

pub mod app;
pub mod cli;
pub mod domain;
pub mod emission;
pub mod error;
pub mod forward;
pub mod io;
pub mod math;
pub mod mcmc;
pub mod output;
pub mod report;
pub mod synthetic;
