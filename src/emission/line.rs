//! Emission lines and collections of lines.

use std::sync::Arc;

use crate::domain::BinnedDem;
use crate::emission::ContFunc;
use crate::error::AppError;

/// A single emission line: its contribution function plus (optionally) an
/// observed intensity and its uncertainty.
#[derive(Debug, Clone)]
pub struct EmissionLine {
    pub name: Option<String>,
    pub cont_func: Arc<dyn ContFunc>,
    pub intensity_obs: Option<f64>,
    pub sigma_intensity_obs: Option<f64>,
}

impl EmissionLine {
    pub fn new(cont_func: Arc<dyn ContFunc>) -> Self {
        Self {
            name: None,
            cont_func,
            intensity_obs: None,
            sigma_intensity_obs: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_observation(mut self, intensity: f64, sigma: f64) -> Self {
        self.intensity_obs = Some(intensity);
        self.sigma_intensity_obs = Some(sigma);
        self
    }

    /// Name for messages; falls back to the line's index in its collection.
    pub fn label(&self, idx: usize) -> String {
        self.name.clone().unwrap_or_else(|| format!("line #{idx}"))
    }

    /// Predicted intensity of this line for the given DEM:
    /// `Σ_j C_j · DEM_j · ΔT_j`.
    pub fn intensity_pred(&self, dem: &BinnedDem) -> Result<f64, AppError> {
        let cont_func = self.cont_func.binned(&dem.temp_bins)?;
        let total = cont_func
            .iter()
            .zip(dem.values.iter())
            .zip(dem.temp_bins.bin_widths())
            .map(|((c, d), w)| c * d * w)
            .sum();
        Ok(total)
    }

    /// Observed intensity and sigma, if both are present and usable.
    fn observation(&self) -> Option<(f64, f64)> {
        let intensity = self.intensity_obs.filter(|v| v.is_finite())?;
        let sigma = self
            .sigma_intensity_obs
            .filter(|s| s.is_finite() && *s > 0.0)?;
        Some((intensity, sigma))
    }
}

/// A collection of several emission lines.
#[derive(Debug, Clone, Default)]
pub struct LineCollection {
    pub lines: Vec<EmissionLine>,
}

impl LineCollection {
    pub fn new(lines: Vec<EmissionLine>) -> Self {
        Self { lines }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EmissionLine> {
        self.lines.iter()
    }

    /// Check that every line can be scored against a DEM.
    ///
    /// Each line needs a finite observed intensity and a finite, strictly
    /// positive uncertainty. Returns `(intensity, sigma)` per line.
    pub fn observed(&self) -> Result<Vec<(f64, f64)>, AppError> {
        if self.lines.is_empty() {
            return Err(AppError::data("No emission lines to fit."));
        }
        self.lines
            .iter()
            .enumerate()
            .map(|(idx, line)| {
                line.observation().ok_or_else(|| {
                    AppError::invalid(format!(
                        "{} is missing a finite observed intensity or a positive uncertainty.",
                        line.label(idx)
                    ))
                })
            })
            .collect()
    }
}

impl From<Vec<EmissionLine>> for LineCollection {
    fn from(lines: Vec<EmissionLine>) -> Self {
        Self::new(lines)
    }
}

impl<'a> IntoIterator for &'a LineCollection {
    type Item = &'a EmissionLine;
    type IntoIter = std::slice::Iter<'a, EmissionLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TempBins, MK};
    use crate::emission::{ContFuncDiscrete, ContFuncGaussian};
    use approx::assert_relative_eq;

    fn flat_line() -> EmissionLine {
        let cf = ContFuncDiscrete::new(vec![1.0, 2.0, 4.0], vec![2.0, 2.0, 2.0]).unwrap();
        EmissionLine::new(Arc::new(cf))
    }

    #[test]
    fn intensity_pred_integrates_over_bins() {
        let bins = TempBins::new(vec![1.0, 2.0, 4.0]).unwrap();
        let dem = BinnedDem::new(bins, vec![3.0, 5.0]).unwrap();
        // 2*3*1 + 2*5*2
        assert_relative_eq!(flat_line().intensity_pred(&dem).unwrap(), 26.0);
    }

    #[test]
    fn zero_dem_predicts_zero_intensity() {
        let cf = ContFuncGaussian::new(1.5 * MK, 0.2 * MK).unwrap();
        let line = EmissionLine::new(Arc::new(cf));
        let bins = TempBins::linear(1.0 * MK, 2.0 * MK, 10).unwrap();
        let dem = BinnedDem::new(bins, vec![0.0; 10]).unwrap();
        assert_eq!(line.intensity_pred(&dem).unwrap(), 0.0);
    }

    #[test]
    fn observed_requires_positive_sigma() {
        let good = flat_line().named("Fe XII").with_observation(10.0, 1.0);
        let bad = flat_line().named("Fe XIII").with_observation(10.0, 0.0);
        let lines = LineCollection::new(vec![good.clone(), bad]);
        let err = lines.observed().unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().contains("Fe XIII"));

        let ok = LineCollection::new(vec![good]).observed().unwrap();
        assert_eq!(ok, vec![(10.0, 1.0)]);
    }

    #[test]
    fn observed_rejects_unobserved_and_empty() {
        let lines = LineCollection::new(vec![flat_line()]);
        let err = lines.observed().unwrap_err();
        assert!(err.message().contains("line #0"));
        assert_eq!(LineCollection::default().observed().unwrap_err().exit_code(), 3);
    }
}
