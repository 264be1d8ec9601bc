//! CSV exports.
//!
//! Contribution-function and intensity tables use the same layout that
//! `ingest` reads, so a synthetic data set can be fed straight back into
//! `demcmc invert`. Numbers are written in shortest round-trip `e` notation;
//! `csv::Writer` quotes line names that contain delimiters.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::domain::BinnedDem;
use crate::error::AppError;
use crate::io::LineIntensity;
use crate::output::BinSummary;

type CsvWriter = csv::Writer<BufWriter<File>>;

/// Write a `temperature,<line>,<line>,...` table.
pub fn write_cont_funcs_csv(path: &Path, temps: &[f64], columns: &[(String, Vec<f64>)]) -> Result<(), AppError> {
    if let Some((name, _)) = columns.iter().find(|(_, v)| v.len() != temps.len()) {
        return Err(AppError::invalid(format!(
            "Column `{name}` does not have one value per temperature."
        )));
    }

    let mut writer = create(path)?;
    let header = std::iter::once("temperature").chain(columns.iter().map(|(n, _)| n.as_str()));
    writer.write_record(header).map_err(write_err)?;

    for (i, t) in temps.iter().enumerate() {
        let row = std::iter::once(*t).chain(columns.iter().map(|(_, values)| values[i]));
        writer.write_record(row.map(|v| format!("{v:e}"))).map_err(write_err)?;
    }
    finish(writer)
}

/// Write a `line,intensity,error` table.
pub fn write_intensities_csv(path: &Path, intensities: &[LineIntensity]) -> Result<(), AppError> {
    let mut writer = create(path)?;
    writer.write_record(["line", "intensity", "error"]).map_err(write_err)?;
    for obs in intensities {
        writer
            .write_record([obs.line.clone(), format!("{:e}", obs.intensity), format!("{:e}", obs.error)])
            .map_err(write_err)?;
    }
    finish(writer)
}

/// Write a binned DEM as `temp_low,temp_high,dem`.
pub fn write_binned_dem_csv(path: &Path, dem: &BinnedDem) -> Result<(), AppError> {
    let mut writer = create(path)?;
    writer.write_record(["temp_low", "temp_high", "dem"]).map_err(write_err)?;
    for ((lo, hi), v) in dem.temp_bins.iter_bins().zip(&dem.values) {
        writer.write_record(sci(&[lo, hi, *v])).map_err(write_err)?;
    }
    finish(writer)
}

/// Write the per-bin DEM summary (median and 16th/84th percentiles).
pub fn write_summary_csv(path: &Path, summary: &[BinSummary]) -> Result<(), AppError> {
    let mut writer = create(path)?;
    writer
        .write_record(["temp_low", "temp_high", "temp_center", "median", "p16", "p84"])
        .map_err(write_err)?;
    for s in summary {
        writer
            .write_record(sci(&[s.temp_low, s.temp_high, s.temp_center, s.median, s.lower, s.upper]))
            .map_err(write_err)?;
    }
    finish(writer)
}

fn sci(values: &[f64]) -> Vec<String> {
    values.iter().map(|v| format!("{v:e}")).collect()
}

fn create(path: &Path) -> Result<CsvWriter, AppError> {
    File::create(path)
        .map(|file| csv::Writer::from_writer(BufWriter::new(file)))
        .map_err(|e| AppError::io(format!("Failed to create CSV '{}': {e}", path.display())))
}

fn finish(mut writer: CsvWriter) -> Result<(), AppError> {
    writer
        .flush()
        .map_err(|e| AppError::io(format!("Failed to write CSV: {e}")))
}

fn write_err(e: csv::Error) -> AppError {
    AppError::io(format!("Failed to write CSV: {e}"))
}
