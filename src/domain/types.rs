//! Shared domain types.
//!
//! Units are fixed throughout the crate and values are stored as bare `f64`:
//!
//! - temperature: K
//! - DEM: cm^-5
//! - contribution function: cm^5 K^-1
//!
//! so that `Σ C · DEM · ΔT` is a dimensionless intensity.

use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::math::{lin_space, log_space};

/// Kelvin per megakelvin.
pub const MK: f64 = 1.0e6;

/// A set of temperature bins, defined through the bin edges (K).
///
/// Widths and centres are computed once at construction; the edges cannot
/// be changed afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct TempBins {
    edges: Vec<f64>,
    widths: Vec<f64>,
    centers: Vec<f64>,
}

impl TempBins {
    /// Create bins from edges in Kelvin.
    ///
    /// Edges must be finite and strictly increasing, with at least two of them.
    pub fn new(edges: Vec<f64>) -> Result<Self, AppError> {
        if edges.len() < 2 {
            return Err(AppError::invalid(format!(
                "Temperature bins need at least 2 edges, got {}.",
                edges.len()
            )));
        }
        if let Some(bad) = edges.iter().find(|t| !t.is_finite()) {
            return Err(AppError::invalid(format!(
                "Temperature bin edges must be finite, got {bad}."
            )));
        }
        if let Some(w) = edges.windows(2).find(|w| w[1] <= w[0]) {
            return Err(AppError::invalid(format!(
                "Temperature bin edges must be strictly increasing ({} K followed by {} K).",
                w[0], w[1]
            )));
        }

        let widths = edges.windows(2).map(|w| w[1] - w[0]).collect();
        let centers = edges.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect();
        Ok(Self {
            edges,
            widths,
            centers,
        })
    }

    /// Create bins from edges in MK.
    pub fn from_mk(edges_mk: &[f64]) -> Result<Self, AppError> {
        Self::new(edges_mk.iter().map(|t| t * MK).collect())
    }

    /// `n_bins` equal-width bins spanning `[min, max]` K.
    pub fn linear(min: f64, max: f64, n_bins: usize) -> Result<Self, AppError> {
        Self::new(lin_space(min, max, n_bins.saturating_add(1))?)
    }

    /// `n_bins` bins equally spaced in `log T` spanning `[min, max]` K.
    pub fn log_spaced(min: f64, max: f64, n_bins: usize) -> Result<Self, AppError> {
        Self::new(log_space(min, max, n_bins.saturating_add(1))?)
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Lower bound of the temperature bins.
    pub fn min(&self) -> f64 {
        self.edges[0]
    }

    /// Upper bound of the temperature bins.
    pub fn max(&self) -> f64 {
        self.edges[self.edges.len() - 1]
    }

    pub fn bin_widths(&self) -> &[f64] {
        &self.widths
    }

    pub fn bin_centers(&self) -> &[f64] {
        &self.centers
    }

    pub fn bin_centers_mk(&self) -> Vec<f64> {
        self.centers.iter().map(|t| t / MK).collect()
    }

    /// Number of bins.
    pub fn len(&self) -> usize {
        self.edges.len() - 1
    }

    /// Always `false`: construction guarantees at least one bin.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterate through `(lower, upper)` edges of each bin.
    pub fn iter_bins(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.edges.windows(2).map(|w| (w[0], w[1]))
    }
}

/// A DEM binned over a range of temperature values.
#[derive(Debug, Clone, PartialEq)]
pub struct BinnedDem {
    pub temp_bins: TempBins,
    /// DEM value per bin (cm^-5).
    pub values: Vec<f64>,
}

impl BinnedDem {
    pub fn new(temp_bins: TempBins, values: Vec<f64>) -> Result<Self, AppError> {
        if values.len() != temp_bins.len() {
            return Err(AppError::invalid(format!(
                "DEM has {} values but there are {} temperature bins.",
                values.len(),
                temp_bins.len()
            )));
        }
        Ok(Self { temp_bins, values })
    }
}

/// How the temperature grid is spaced between its endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum GridSpacing {
    Linear,
    Log,
}

/// Temperature grid requested on the command line.
#[derive(Debug, Clone)]
pub struct GridConfig {
    /// Lowest bin edge (K).
    pub temp_min: f64,
    /// Highest bin edge (K).
    pub temp_max: f64,
    pub n_bins: usize,
    pub spacing: GridSpacing,
}

impl GridConfig {
    pub fn build(&self) -> Result<TempBins, AppError> {
        match self.spacing {
            GridSpacing::Linear => TempBins::linear(self.temp_min, self.temp_max, self.n_bins),
            GridSpacing::Log => TempBins::log_spaced(self.temp_min, self.temp_max, self.n_bins),
        }
    }
}

/// Where the bins of an inversion come from.
#[derive(Debug, Clone)]
pub enum BinSpec {
    Grid(GridConfig),
    /// Explicit bin edges (K).
    Edges(Vec<f64>),
}

impl BinSpec {
    pub fn build(&self) -> Result<TempBins, AppError> {
        match self {
            BinSpec::Grid(grid) => grid.build(),
            BinSpec::Edges(edges) => TempBins::new(edges.clone()),
        }
    }
}

/// Everything `demcmc invert` needs: inputs, bins, sampler knobs, outputs.
#[derive(Debug, Clone)]
pub struct InvertConfig {
    pub cont_funcs_path: PathBuf,
    pub intensities_path: PathBuf,
    pub bins: BinSpec,
    pub inversion: InversionConfig,
    /// Worst-fitting lines to list.
    pub top_n: usize,
    /// Save the DEM samples as JSON.
    pub output_path: Option<PathBuf>,
    /// Export the per-bin summary as CSV.
    pub export_summary: Option<PathBuf>,
}

/// Knobs for a single DEM inversion.
#[derive(Debug, Clone)]
pub struct InversionConfig {
    /// Steps taken by the full N-dimensional ensemble.
    pub nsteps: usize,
    /// Walkers in the full ensemble; `None` picks `2 * n_bins + 2`.
    pub nwalkers: Option<usize>,
    pub seed: u64,
    /// Starting DEM value in every bin (cm^-5).
    pub initial_dem: f64,
    /// Steps per bin in the 1-D warm-up pass (0 skips the warm-up).
    pub warmup_steps: usize,
    /// Walkers per bin in the 1-D warm-up pass.
    pub warmup_walkers: usize,
    /// Relative uniform jitter applied to starting positions.
    pub jitter: f64,
    /// Log sampler progress at info level.
    pub progress: bool,
}

impl Default for InversionConfig {
    fn default() -> Self {
        Self {
            nsteps: 1000,
            nwalkers: None,
            seed: 42,
            initial_dem: 1.0e22,
            warmup_steps: 100,
            warmup_walkers: 3,
            jitter: 0.01,
            progress: true,
        }
    }
}

/// Settings for generating a synthetic data set.
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    /// Number of lines; centres are evenly spaced over `[center_min, center_max]` K.
    pub n_lines: usize,
    pub center_min: f64,
    pub center_max: f64,
    /// Gaussian contribution-function width (K).
    pub line_width: f64,
    /// Temperature grid on which contribution functions are tabulated.
    pub table_grid: GridConfig,
    /// Bins carrying the input DEM.
    pub dem_grid: GridConfig,
    /// Peak temperature of the Gaussian input DEM (K).
    pub dem_peak: f64,
    /// Width of the Gaussian input DEM (K).
    pub dem_width: f64,
    /// Peak DEM value (cm^-5).
    pub dem_scale: f64,
    /// Relative uncertainty assigned to each synthetic intensity.
    pub rel_error: f64,
    /// Perturb intensities with Gaussian noise of the assigned sigma.
    pub add_noise: bool,
    pub seed: u64,
    pub output_dir: PathBuf,
}

impl Default for SyntheticConfig {
    /// 21 lines from 1 to 2 MK observing a Gaussian DEM peaked at 1.2 MK.
    fn default() -> Self {
        Self {
            n_lines: 21,
            center_min: 1.0 * MK,
            center_max: 2.0 * MK,
            line_width: 0.1 * MK,
            table_grid: GridConfig {
                temp_min: 0.5 * MK,
                temp_max: 2.5 * MK,
                n_bins: 600,
                spacing: GridSpacing::Linear,
            },
            dem_grid: GridConfig {
                temp_min: 1.0 * MK,
                temp_max: 2.0 * MK,
                n_bins: 5,
                spacing: GridSpacing::Linear,
            },
            dem_peak: 1.2 * MK,
            dem_width: 0.2 * MK,
            dem_scale: 1.0e22,
            rel_error: 0.1,
            add_noise: false,
            seed: 42,
            output_dir: PathBuf::from("synthetic"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn temp_bins() -> TempBins {
        TempBins::new(vec![1.0, 2.0, 4.0]).unwrap()
    }

    #[test]
    fn widths_and_len() {
        let bins = temp_bins();
        assert_eq!(bins.bin_widths(), &[1.0, 2.0]);
        assert_eq!(bins.len(), 2);
        assert_eq!(bins.min(), 1.0);
        assert_eq!(bins.max(), 4.0);
    }

    #[test]
    fn centers() {
        assert_eq!(temp_bins().bin_centers(), &[1.5, 3.0]);
    }

    #[test]
    fn iter_bins_yields_edge_pairs() {
        let pairs: Vec<(f64, f64)> = temp_bins().iter_bins().collect();
        assert_eq!(pairs, vec![(1.0, 2.0), (2.0, 4.0)]);
    }

    #[test]
    fn rejects_unsorted_or_short_edges() {
        assert_eq!(TempBins::new(vec![1.0]).unwrap_err().exit_code(), 2);
        assert!(TempBins::new(vec![1.0, 1.0]).is_err());
        assert!(TempBins::new(vec![2.0, 1.0]).is_err());
        assert!(TempBins::new(vec![1.0, f64::NAN]).is_err());
    }

    #[test]
    fn mk_constructor_scales_edges() {
        let bins = TempBins::from_mk(&[1.0, 3.0, 5.0]).unwrap();
        assert_eq!(bins.edges(), &[1.0e6, 3.0e6, 5.0e6]);
        assert_relative_eq!(bins.bin_centers_mk()[1], 4.0);
    }

    #[test]
    fn log_spaced_grid_has_requested_bins() {
        let bins = TempBins::log_spaced(1e5, 1e8, 15).unwrap();
        assert_eq!(bins.len(), 15);
        assert_eq!(bins.min(), 1e5);
        assert_eq!(bins.max(), 1e8);
    }

    #[test]
    fn bin_spec_builds_grid_or_edges() {
        let grid = BinSpec::Grid(GridConfig {
            temp_min: 1.0 * MK,
            temp_max: 2.0 * MK,
            n_bins: 4,
            spacing: GridSpacing::Linear,
        });
        let bins = grid.build().unwrap();
        assert_eq!(bins.len(), 4);
        assert_relative_eq!(bins.bin_widths()[0], 0.25 * MK);

        let edges = BinSpec::Edges(vec![1.0, 3.0, 5.0]);
        assert_eq!(edges.build().unwrap().edges(), &[1.0, 3.0, 5.0]);
        assert!(BinSpec::Edges(vec![3.0, 1.0]).build().is_err());
    }

    #[test]
    fn binned_dem_checks_length() {
        assert!(BinnedDem::new(temp_bins(), vec![1.0, 2.0]).is_ok());
        assert_eq!(
            BinnedDem::new(temp_bins(), vec![1.0]).unwrap_err().exit_code(),
            2
        );
    }
}
