//! Reporting utilities: per-line residuals, misfit rankings, and formatted
//! terminal output (`format`).

pub mod format;

pub use format::*;

use crate::emission::LineCollection;
use crate::error::AppError;
use crate::forward::ResponseMatrix;
use crate::output::DemOutput;

/// How well the median DEM reproduces one observed line.
#[derive(Debug, Clone, PartialEq)]
pub struct LineResidual {
    pub name: String,
    pub intensity_obs: f64,
    pub sigma: f64,
    pub intensity_pred: f64,
    /// `(I_obs - I_pred) / sigma`.
    pub chi: f64,
}

/// Compare each observed line against the prediction of the median DEM.
pub fn compute_line_residuals(lines: &LineCollection, output: &DemOutput) -> Result<Vec<LineResidual>, AppError> {
    let observed = lines.observed()?;
    let median_dem: Vec<f64> = output.summary().iter().map(|s| s.median).collect();
    let response = ResponseMatrix::new(lines, output.temp_bins())?;
    let predicted = response.predict(&median_dem);

    let mut out = Vec::with_capacity(observed.len());
    for (idx, ((line, (i_obs, sigma)), &i_pred)) in lines.iter().zip(observed).zip(predicted.iter()).enumerate() {
        if !i_pred.is_finite() {
            return Err(AppError::numeric(format!(
                "Non-finite predicted intensity for {}.",
                line.label(idx)
            )));
        }
        out.push(LineResidual {
            name: line.label(idx),
            intensity_obs: i_obs,
            sigma,
            intensity_pred: i_pred,
            chi: (i_obs - i_pred) / sigma,
        });
    }
    Ok(out)
}

/// Sum of squared normalized residuals.
pub fn chi_squared(residuals: &[LineResidual]) -> f64 {
    residuals.iter().map(|r| r.chi * r.chi).sum()
}

/// The `top_n` lines with the largest `|chi|`, worst first.
pub fn rank_by_misfit(residuals: &[LineResidual], top_n: usize) -> Vec<LineResidual> {
    let mut sorted = residuals.to_vec();
    sorted.sort_by(|a, b| b.chi.abs().total_cmp(&a.chi.abs()));
    sorted.truncate(top_n);
    sorted
}
