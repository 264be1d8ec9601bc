//! Log-posterior for DEM inversion.
//!
//! Likelihood: each line contributes `-((I_obs - I_pred) / σ)^2`.
//! Prior: flat for non-negative DEM values, zero probability otherwise.
//!
//! The posterior therefore peaks at `0.0` when every predicted intensity
//! matches its observation exactly.

use crate::domain::TempBins;
use crate::emission::LineCollection;
use crate::error::AppError;
use crate::forward::ResponseMatrix;

/// Something the ensemble sampler can score.
///
/// Implementations must be `Sync`: the sampler evaluates proposals for half
/// of the ensemble in parallel.
pub trait LogProb: Sync {
    fn log_prob(&self, x: &[f64]) -> f64;
}

impl<F> LogProb for F
where
    F: Fn(&[f64]) -> f64 + Sync,
{
    fn log_prob(&self, x: &[f64]) -> f64 {
        self(x)
    }
}

/// Log-probability contribution of a single line.
pub fn log_prob_line(intensity_obs: f64, sigma: f64, intensity_pred: f64) -> f64 {
    let r = (intensity_obs - intensity_pred) / sigma;
    -(r * r)
}

/// Posterior over DEM values for a fixed set of observed lines and bins.
#[derive(Debug, Clone)]
pub struct DemPosterior {
    response: ResponseMatrix,
    /// `(intensity, sigma)` per line, in the same order as the response rows.
    observed: Vec<(f64, f64)>,
}

impl DemPosterior {
    pub fn new(lines: &LineCollection, temp_bins: &TempBins) -> Result<Self, AppError> {
        let observed = lines.observed()?;
        let response = ResponseMatrix::new(lines, temp_bins)?;
        Ok(Self { response, observed })
    }

    pub fn response(&self) -> &ResponseMatrix {
        &self.response
    }

    pub fn n_bins(&self) -> usize {
        self.response.n_bins()
    }

    /// Sum of per-line log-probabilities, without the positivity prior.
    ///
    /// A DEM with the wrong number of bins has log-probability `-inf`.
    pub fn log_prob_lines(&self, dem: &[f64]) -> f64 {
        if dem.len() != self.n_bins() {
            return f64::NEG_INFINITY;
        }
        let predicted = self.response.predict(dem);
        self.observed
            .iter()
            .zip(predicted.iter())
            .map(|(&(obs, sigma), &pred)| log_prob_line(obs, sigma, pred))
            .sum()
    }

    /// Full log-posterior: `-inf` if any DEM value is negative.
    pub fn log_prob(&self, dem: &[f64]) -> f64 {
        if dem.iter().any(|&v| v < 0.0) {
            return f64::NEG_INFINITY;
        }
        self.log_prob_lines(dem)
    }

    /// Log-posterior of `dem_guess` with component `idx` replaced by `value`.
    pub fn log_prob_single_variation(&self, value: f64, idx: usize, dem_guess: &[f64]) -> f64 {
        if idx >= dem_guess.len() {
            return f64::NEG_INFINITY;
        }
        let mut dem = dem_guess.to_vec();
        dem[idx] = value;
        self.log_prob(&dem)
    }
}

impl LogProb for DemPosterior {
    fn log_prob(&self, x: &[f64]) -> f64 {
        DemPosterior::log_prob(self, x)
    }
}
