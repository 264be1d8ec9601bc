//! Forward model: DEM → predicted line intensities.
//!
//! For a fixed set of lines and temperature bins the prediction is linear in
//! the DEM values:
//!
//! ```text
//! I_i = Σ_j K_ij · DEM_j,    K_ij = C_i(bin j) · ΔT_j
//! ```
//!
//! so the binned contribution functions are evaluated once and kept in a
//! response matrix. The sampler then only pays for a matrix-vector product
//! per log-probability evaluation.

use nalgebra::{DMatrix, DVector};

use crate::domain::{BinnedDem, TempBins};
use crate::emission::LineCollection;
use crate::error::AppError;

/// Precomputed `n_lines × n_bins` response of each line to each bin.
#[derive(Debug, Clone)]
pub struct ResponseMatrix {
    temp_bins: TempBins,
    kernel: DMatrix<f64>,
}

impl ResponseMatrix {
    pub fn new(lines: &LineCollection, temp_bins: &TempBins) -> Result<Self, AppError> {
        if lines.is_empty() {
            return Err(AppError::data("No emission lines to build a response matrix from."));
        }

        let n_bins = temp_bins.len();
        let mut kernel = DMatrix::<f64>::zeros(lines.len(), n_bins);
        for (i, line) in lines.iter().enumerate() {
            let binned = line.cont_func.binned(temp_bins).map_err(|e| {
                AppError::new(e.exit_code(), format!("{}: {}", line.label(i), e.message()))
            })?;
            if binned.len() != n_bins {
                return Err(AppError::numeric(format!(
                    "{}: contribution function returned {} bins, expected {n_bins}.",
                    line.label(i),
                    binned.len()
                )));
            }
            for (j, (c, w)) in binned.iter().zip(temp_bins.bin_widths()).enumerate() {
                kernel[(i, j)] = c * w;
            }
        }

        if kernel.iter().any(|v| !v.is_finite()) {
            return Err(AppError::numeric("Non-finite entry in the line response matrix."));
        }

        Ok(Self {
            temp_bins: temp_bins.clone(),
            kernel,
        })
    }

    pub fn temp_bins(&self) -> &TempBins {
        &self.temp_bins
    }

    pub fn kernel(&self) -> &DMatrix<f64> {
        &self.kernel
    }

    pub fn n_lines(&self) -> usize {
        self.kernel.nrows()
    }

    pub fn n_bins(&self) -> usize {
        self.kernel.ncols()
    }

    /// Predicted intensity of every line for raw DEM values (cm^-5).
    ///
    /// # Panics
    /// Panics if `dem.len() != self.n_bins()`.
    pub fn predict(&self, dem: &[f64]) -> DVector<f64> {
        &self.kernel * DVector::from_column_slice(dem)
    }

    /// Predicted intensities for a [`BinnedDem`] on the same bins.
    pub fn predict_binned(&self, dem: &BinnedDem) -> Result<DVector<f64>, AppError> {
        if dem.temp_bins != self.temp_bins {
            return Err(AppError::invalid(
                "DEM temperature bins differ from the response matrix bins.",
            ));
        }
        Ok(self.predict(&dem.values))
    }
}
