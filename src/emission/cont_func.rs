//! Contribution functions.
//!
//! A contribution function `C(T)` gives the emissivity of one spectral line
//! as a function of temperature (cm^5 K^-1). The forward model only ever
//! needs it averaged over temperature bins, which is what [`ContFunc::binned`]
//! provides.

use std::fmt::Debug;

use crate::domain::TempBins;
use crate::error::AppError;
use crate::math::{linear_interp, trapezoid};

/// Relative tolerance used when matching bin edges to tabulated temperatures.
const EDGE_RTOL: f64 = 1e-9;

/// Peak value of [`ContFuncGaussian`] (cm^5 K^-1).
const GAUSSIAN_PEAK: f64 = 1e6;

/// A contribution function that can be averaged over temperature bins.
pub trait ContFunc: Debug + Send + Sync {
    /// Contribution function averaged over each bin, one value per bin.
    fn binned(&self, temp_bins: &TempBins) -> Result<Vec<f64>, AppError>;
}

/// A pre-computed contribution function tabulated at discrete temperatures.
#[derive(Debug, Clone, PartialEq)]
pub struct ContFuncDiscrete {
    temps: Vec<f64>,
    values: Vec<f64>,
}

impl ContFuncDiscrete {
    /// `temps` in K (strictly increasing), `values` in cm^5 K^-1.
    pub fn new(temps: Vec<f64>, values: Vec<f64>) -> Result<Self, AppError> {
        if temps.len() != values.len() {
            return Err(AppError::invalid(format!(
                "Contribution function has {} temperatures but {} values.",
                temps.len(),
                values.len()
            )));
        }
        if temps.len() < 2 {
            return Err(AppError::invalid(
                "Contribution function needs at least 2 tabulated temperatures.",
            ));
        }
        if temps.iter().chain(values.iter()).any(|v| !v.is_finite()) {
            return Err(AppError::invalid(
                "Contribution function contains non-finite values.",
            ));
        }
        if temps.windows(2).any(|w| w[1] <= w[0]) {
            return Err(AppError::invalid(
                "Contribution function temperatures must be strictly increasing.",
            ));
        }
        Ok(Self { temps, values })
    }

    pub fn temps(&self) -> &[f64] {
        &self.temps
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Linearly interpolated value at temperature `t` (K).
    ///
    /// Outside the tabulated range the end values are returned.
    pub fn eval(&self, t: f64) -> f64 {
        linear_interp(&self.temps, &self.values, t)
    }

    fn index_of(&self, t: f64) -> Option<usize> {
        let i = self.temps.partition_point(|&v| v < t);
        [i.checked_sub(1), Some(i)]
            .into_iter()
            .flatten()
            .filter(|&j| j < self.temps.len())
            .find(|&j| {
                let tj = self.temps[j];
                (tj - t).abs() <= EDGE_RTOL * tj.abs().max(t.abs())
            })
    }
}

impl ContFunc for ContFuncDiscrete {
    /// Average over each bin by trapezoid integration of the tabulated points
    /// inside the bin.
    ///
    /// Every bin edge must coincide with one of the tabulated temperatures.
    fn binned(&self, temp_bins: &TempBins) -> Result<Vec<f64>, AppError> {
        let mut indices = Vec::with_capacity(temp_bins.edges().len());
        let mut missing = Vec::new();
        for &edge in temp_bins.edges() {
            match self.index_of(edge) {
                Some(i) => indices.push(i),
                None => missing.push(edge),
            }
        }

        if !missing.is_empty() {
            let listed: Vec<String> = missing.iter().map(|t| format!("{t} K")).collect();
            return Err(AppError::invalid(format!(
                "The following bin edges in temp_bins are missing from the contribution \
                 function temperature coordinates: [{}]",
                listed.join(", ")
            )));
        }
        if let Some(k) = indices.windows(2).position(|w| w[1] <= w[0]) {
            let edges = temp_bins.edges();
            return Err(AppError::invalid(format!(
                "Bin edges {} K and {} K both match contribution function temperature {} K.",
                edges[k],
                edges[k + 1],
                self.temps[indices[k]]
            )));
        }

        let out = indices
            .windows(2)
            .zip(temp_bins.bin_widths())
            .map(|(w, &width)| {
                let (i0, i1) = (w[0], w[1]);
                trapezoid(&self.temps[i0..=i1], &self.values[i0..=i1]) / width
            })
            .collect();
        Ok(out)
    }
}

/// A contribution function with a Gaussian profile in temperature.
///
/// `C(T) = 1e6 · exp(-((center - T) / width)^2)`, evaluated at bin centres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContFuncGaussian {
    center: f64,
    width: f64,
}

impl ContFuncGaussian {
    /// `center` and `width` in K.
    pub fn new(center: f64, width: f64) -> Result<Self, AppError> {
        if !(center.is_finite() && width.is_finite() && width > 0.0) {
            return Err(AppError::invalid(format!(
                "Invalid Gaussian contribution function: center={center}, width={width}."
            )));
        }
        Ok(Self { center, width })
    }

    pub fn center(&self) -> f64 {
        self.center
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn eval(&self, t: f64) -> f64 {
        let x = (self.center - t) / self.width;
        GAUSSIAN_PEAK * (-(x * x)).exp()
    }
}

impl ContFunc for ContFuncGaussian {
    fn binned(&self, temp_bins: &TempBins) -> Result<Vec<f64>, AppError> {
        Ok(temp_bins.bin_centers().iter().map(|&t| self.eval(t)).collect())
    }
}
