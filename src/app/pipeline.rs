//! Shared workflows behind the CLI subcommands.
//!
//! - inversion: CSV ingest -> line assembly -> bins -> MCMC -> residuals
//! - synthetic: generate -> write CSVs
//!
//! The front-end in `app` only deals with presentation and exports.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::domain::{InvertConfig, SyntheticConfig};
use crate::emission::LineCollection;
use crate::error::AppError;
use crate::io::{
    IngestedIntensities, assemble_lines, load_cont_funcs, load_line_intensities, write_binned_dem_csv,
    write_cont_funcs_csv, write_intensities_csv,
};
use crate::mcmc::predict_dem;
use crate::output::DemOutput;
use crate::report::{LineResidual, compute_line_residuals, rank_by_misfit};
use crate::synthetic::{SyntheticData, generate_synthetic};

/// All computed outputs of a single `demcmc invert` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub ingest: IngestedIntensities,
    pub lines: LineCollection,
    pub output: DemOutput,
    pub residuals: Vec<LineResidual>,
    pub worst: Vec<LineResidual>,
}

/// Files written by [`run_synthetic`].
#[derive(Debug, Clone)]
pub struct SyntheticFiles {
    pub cont_funcs: PathBuf,
    pub intensities: PathBuf,
    pub dem_in: PathBuf,
}

/// Execute the full inversion pipeline and return the computed outputs.
pub fn run_inversion(config: &InvertConfig) -> Result<RunOutput, AppError> {
    let cont_funcs = load_cont_funcs(&config.cont_funcs_path)?;
    let ingest = load_line_intensities(&config.intensities_path)?;
    let lines = assemble_lines(&ingest.intensities, &cont_funcs)?;
    info!(
        "{} of {} intensity rows matched {} contribution functions",
        lines.len(),
        ingest.rows_read,
        cont_funcs.len()
    );

    let temp_bins = config.bins.build()?;
    let output = predict_dem(&lines, &temp_bins, &config.inversion)?;

    let residuals = compute_line_residuals(&lines, &output)?;
    let worst = rank_by_misfit(&residuals, config.top_n);

    Ok(RunOutput {
        ingest,
        lines,
        output,
        residuals,
        worst,
    })
}

/// Generate a synthetic data set and write it to `config.output_dir`.
pub fn run_synthetic(config: &SyntheticConfig) -> Result<(SyntheticData, SyntheticFiles), AppError> {
    let data = generate_synthetic(config)?;
    let files = write_synthetic(&data, &config.output_dir)?;
    Ok((data, files))
}

fn write_synthetic(data: &SyntheticData, dir: &Path) -> Result<SyntheticFiles, AppError> {
    fs::create_dir_all(dir)
        .map_err(|e| AppError::io(format!("Failed to create directory '{}': {e}", dir.display())))?;

    let files = SyntheticFiles {
        cont_funcs: dir.join("cont_funcs.csv"),
        intensities: dir.join("intensities.csv"),
        dem_in: dir.join("dem_in.csv"),
    };
    write_cont_funcs_csv(&files.cont_funcs, &data.table_temps, &data.cont_func_table)?;
    write_intensities_csv(&files.intensities, &data.intensities)?;
    write_binned_dem_csv(&files.dem_in, &data.dem_in)?;
    Ok(files)
}
