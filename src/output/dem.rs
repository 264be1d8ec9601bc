//! Output from running a DEM inversion.
//!
//! A `DemOutput` keeps the final position of every walker (one DEM sample
//! per walker) together with the temperature bins, and, when it came
//! straight from an inversion, the sampler that produced it.
//!
//! Saved files are JSON:
//! - tool name and creation time
//! - bin edges and centres (K)
//! - samples (`nwalkers` rows of `n_bins` values, cm^-5)

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use chrono::{DateTime, Utc};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::domain::TempBins;
use crate::error::AppError;
use crate::math::{median, percentile};
use crate::mcmc::EnsembleSampler;

const TOOL: &str = "demcmc";

/// Per-bin summary of the DEM samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinSummary {
    pub temp_low: f64,
    pub temp_high: f64,
    pub temp_center: f64,
    pub median: f64,
    /// 16th percentile (lower 1σ for a Gaussian).
    pub lower: f64,
    /// 84th percentile (upper 1σ for a Gaussian).
    pub upper: f64,
}

/// Serialized form of a [`DemOutput`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemFile {
    pub tool: String,
    pub created: DateTime<Utc>,
    pub temp_bin_edges: Vec<f64>,
    pub temp_bin_centers: Vec<f64>,
    pub samples: Vec<Vec<f64>>,
}

#[derive(Debug, Clone)]
pub struct DemOutput {
    temp_bins: TempBins,
    samples: DMatrix<f64>,
    sampler: Option<EnsembleSampler>,
    created: DateTime<Utc>,
}

impl DemOutput {
    /// Wrap a finished sampler; the samples are its walkers' last positions.
    pub fn from_sampler(sampler: EnsembleSampler, temp_bins: TempBins) -> Result<Self, AppError> {
        let samples = sampler
            .last_positions()
            .cloned()
            .ok_or_else(|| AppError::numeric("Sampler has not taken any steps."))?;
        let mut out = Self::from_samples(temp_bins, samples)?;
        out.sampler = Some(sampler);
        Ok(out)
    }

    /// Build from raw samples (`n_samples × n_bins`).
    pub fn from_samples(temp_bins: TempBins, samples: DMatrix<f64>) -> Result<Self, AppError> {
        if samples.ncols() != temp_bins.len() {
            return Err(AppError::invalid(format!(
                "Samples have {} columns but there are {} temperature bins.",
                samples.ncols(),
                temp_bins.len()
            )));
        }
        Ok(Self {
            temp_bins,
            samples,
            sampler: None,
            created: Utc::now(),
        })
    }

    pub fn temp_bins(&self) -> &TempBins {
        &self.temp_bins
    }

    /// Last set of samples from the walkers (`nwalkers × n_bins`).
    pub fn samples(&self) -> &DMatrix<f64> {
        &self.samples
    }

    /// Sampler used to compute the DEM; `None` for outputs loaded from disk.
    pub fn sampler(&self) -> Option<&EnsembleSampler> {
        self.sampler.as_ref()
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    /// Median and 16th/84th percentiles of the samples in each bin.
    pub fn summary(&self) -> Vec<BinSummary> {
        self.temp_bins
            .iter_bins()
            .zip(self.temp_bins.bin_centers())
            .enumerate()
            .map(|(j, ((lo, hi), &center))| {
                let column: Vec<f64> = self.samples.column(j).iter().copied().collect();
                BinSummary {
                    temp_low: lo,
                    temp_high: hi,
                    temp_center: center,
                    median: median(&column).unwrap_or(f64::NAN),
                    lower: percentile(&column, 16.0).unwrap_or(f64::NAN),
                    upper: percentile(&column, 84.0).unwrap_or(f64::NAN),
                }
            })
            .collect()
    }

    pub fn to_file(&self) -> DemFile {
        DemFile {
            tool: TOOL.to_string(),
            created: self.created,
            temp_bin_edges: self.temp_bins.edges().to_vec(),
            temp_bin_centers: self.temp_bins.bin_centers().to_vec(),
            samples: self
                .samples
                .row_iter()
                .map(|row| row.iter().copied().collect())
                .collect(),
        }
    }

    pub fn from_file(file: DemFile) -> Result<Self, AppError> {
        let temp_bins = TempBins::new(file.temp_bin_edges)?;
        let n_bins = temp_bins.len();
        if let Some((i, row)) = file
            .samples
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != n_bins)
        {
            return Err(AppError::invalid(format!(
                "Sample row {i} has {} values, expected {n_bins}.",
                row.len()
            )));
        }

        let n_samples = file.samples.len();
        let flat: Vec<f64> = file.samples.into_iter().flatten().collect();
        let samples = DMatrix::from_row_slice(n_samples, n_bins, &flat);
        let mut out = Self::from_samples(temp_bins, samples)?;
        out.created = file.created;
        Ok(out)
    }

    /// Save to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        let file = File::create(path)
            .map_err(|e| AppError::io(format!("Failed to create DEM file '{}': {e}", path.display())))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &self.to_file())
            .map_err(|e| AppError::io(format!("Failed to write DEM file: {e}")))?;
        Ok(())
    }

    /// Load a file written by [`DemOutput::save`].
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let file = File::open(path)
            .map_err(|e| AppError::io(format!("Failed to open DEM file '{}': {e}", path.display())))?;
        let parsed: DemFile = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| AppError::invalid(format!("Invalid DEM file: {e}")))?;
        Self::from_file(parsed)
    }
}
