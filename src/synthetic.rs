//! Synthetic data sets: Gaussian-contribution lines observing a known DEM.
//!
//! Line centres are evenly spaced over a range and share one width. The
//! input DEM is a Gaussian in temperature on (usually coarse) bins. The
//! Gaussians are tabulated on a fine grid, and each line's intensity is the
//! forward-model prediction for that DEM through the tabulated function,
//! with a sigma of `rel_error · intensity`. DEM bin edges must therefore lie
//! on the table grid.

use std::sync::Arc;

use log::debug;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{BinnedDem, SyntheticConfig, TempBins};
use crate::emission::{ContFuncDiscrete, ContFuncGaussian, EmissionLine, LineCollection};
use crate::error::AppError;
use crate::forward::ResponseMatrix;
use crate::io::LineIntensity;
use crate::math::lin_space;

#[derive(Debug, Clone)]
pub struct SyntheticData {
    /// Lines with the tabulated contribution functions and their observations.
    pub lines: LineCollection,
    pub centers: Vec<f64>,
    pub dem_in: BinnedDem,
    /// Temperatures (K) at which the contribution functions are tabulated.
    pub table_temps: Vec<f64>,
    /// `(line name, C(T) at each table temperature)`.
    pub cont_func_table: Vec<(String, Vec<f64>)>,
    pub intensities: Vec<LineIntensity>,
}

pub fn generate_synthetic(config: &SyntheticConfig) -> Result<SyntheticData, AppError> {
    validate(config)?;

    let centers = if config.n_lines == 1 {
        vec![config.center_min]
    } else {
        lin_space(config.center_min, config.center_max, config.n_lines)?
    };
    let gaussians = centers
        .iter()
        .map(|&c| ContFuncGaussian::new(c, config.line_width))
        .collect::<Result<Vec<_>, _>>()?;
    let names: Vec<String> = (1..=centers.len()).map(|i| format!("line_{i:02}")).collect();

    let table_temps = config.table_grid.build()?.edges().to_vec();
    let cont_func_table: Vec<(String, Vec<f64>)> = names
        .iter()
        .zip(&gaussians)
        .map(|(name, g)| (name.clone(), table_temps.iter().map(|&t| g.eval(t)).collect()))
        .collect();

    // Intensities come from the tabulated functions so that the written
    // table reproduces them exactly.
    let unobserved = cont_func_table
        .iter()
        .map(|(name, values)| {
            let cf = ContFuncDiscrete::new(table_temps.clone(), values.clone())?;
            Ok(EmissionLine::new(Arc::new(cf)).named(name.clone()))
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    let dem_bins = config.dem_grid.build()?;
    let dem_in = gaussian_dem(&dem_bins, config.dem_peak, config.dem_width, config.dem_scale)?;
    let response = ResponseMatrix::new(&LineCollection::new(unobserved.clone()), &dem_bins)?;
    let predicted = response.predict_binned(&dem_in)?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| AppError::numeric(format!("Noise distribution error: {e}")))?;

    let mut lines = Vec::with_capacity(unobserved.len());
    let mut intensities = Vec::with_capacity(unobserved.len());
    for ((line, name), &i_pred) in unobserved.into_iter().zip(&names).zip(predicted.iter()) {
        if !(i_pred.is_finite() && i_pred > 0.0) {
            return Err(AppError::numeric(format!(
                "Synthetic intensity for {name} is {i_pred}; line centres must overlap the DEM bins."
            )));
        }
        let sigma = config.rel_error * i_pred;
        let intensity = if config.add_noise {
            i_pred + sigma * normal.sample(&mut rng)
        } else {
            i_pred
        };
        lines.push(line.with_observation(intensity, sigma));
        intensities.push(LineIntensity {
            line: name.clone(),
            intensity,
            error: sigma,
        });
    }

    debug!(
        "synthetic set: {} lines, {} DEM bins, {} tabulated temperatures",
        lines.len(),
        dem_bins.len(),
        table_temps.len()
    );

    Ok(SyntheticData {
        lines: LineCollection::new(lines),
        centers,
        dem_in,
        table_temps,
        cont_func_table,
        intensities,
    })
}

/// `scale · exp(-((T_center - peak) / width)²)` in each bin.
pub fn gaussian_dem(temp_bins: &TempBins, peak: f64, width: f64, scale: f64) -> Result<BinnedDem, AppError> {
    let values = temp_bins
        .bin_centers()
        .iter()
        .map(|&t| scale * (-((t - peak) / width).powi(2)).exp())
        .collect();
    BinnedDem::new(temp_bins.clone(), values)
}

fn validate(config: &SyntheticConfig) -> Result<(), AppError> {
    if config.n_lines == 0 {
        return Err(AppError::invalid("Number of lines must be > 0."));
    }
    if !(config.center_min.is_finite() && config.center_max.is_finite() && config.center_max >= config.center_min) {
        return Err(AppError::invalid("Invalid line centre range."));
    }
    if !(config.dem_width.is_finite() && config.dem_width > 0.0) {
        return Err(AppError::invalid("DEM width must be finite and > 0."));
    }
    if !(config.dem_scale.is_finite() && config.dem_scale > 0.0) {
        return Err(AppError::invalid("DEM scale must be finite and > 0."));
    }
    if !(config.rel_error.is_finite() && config.rel_error > 0.0) {
        return Err(AppError::invalid("Relative error must be finite and > 0."));
    }
    Ok(())
}
