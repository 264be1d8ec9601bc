//! Command-line parsing for the `demcmc` DEM inversion tool.
//!
//! Argument parsing stays separate from the sampling code; `app` turns the
//! parsed arguments into config structs.
//!
//! Temperatures on the command line are in MK; everything downstream is K.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::GridSpacing;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "demcmc",
    version,
    about = "Differential emission measure (DEM) estimation with MCMC"
)]
pub struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Estimate a DEM from contribution functions and observed intensities.
    Invert(InvertArgs),
    /// Write a synthetic data set (Gaussian lines observing a known DEM).
    Synthetic(SyntheticArgs),
    /// Print the per-bin summary of a saved DEM.
    Summary(SummaryArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct InvertArgs {
    /// CSV with a `temperature` column (K) and one column per line.
    #[arg(long, value_name = "CSV")]
    pub cont_funcs: PathBuf,

    /// CSV with `line,intensity,error` columns.
    #[arg(long, value_name = "CSV")]
    pub intensities: PathBuf,

    /// Explicit bin edges in MK (comma separated); overrides the grid flags.
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    pub edges: Option<Vec<f64>>,

    /// Lowest bin edge (MK).
    #[arg(long, default_value_t = 1.0)]
    pub temp_min: f64,

    /// Highest bin edge (MK).
    #[arg(long, default_value_t = 2.0)]
    pub temp_max: f64,

    /// Number of temperature bins.
    #[arg(short = 'b', long, default_value_t = 5)]
    pub bins: usize,

    /// Bin spacing between `--temp-min` and `--temp-max`.
    #[arg(long, value_enum, default_value_t = GridSpacing::Linear)]
    pub spacing: GridSpacing,

    /// Steps for the full ensemble.
    #[arg(short = 'n', long, default_value_t = 1000)]
    pub nsteps: usize,

    /// Walkers in the full ensemble (default: 2 * bins + 2).
    #[arg(long)]
    pub nwalkers: Option<usize>,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Starting DEM value in every bin (cm^-5).
    #[arg(long, default_value_t = 1.0e22)]
    pub initial_dem: f64,

    /// Steps per bin in the one-bin-at-a-time warm-up (0 disables it).
    #[arg(long, default_value_t = 100)]
    pub warmup_steps: usize,

    /// Walkers per bin in the warm-up.
    #[arg(long, default_value_t = 3)]
    pub warmup_walkers: usize,

    /// Relative jitter applied to walker starting positions.
    #[arg(long, default_value_t = 0.01)]
    pub jitter: f64,

    /// Do not log sampler progress.
    #[arg(short, long)]
    pub quiet: bool,

    /// Show the N worst-fitting lines.
    #[arg(long, default_value_t = 10)]
    pub top: usize,

    /// Save the DEM samples to JSON.
    #[arg(short, long, value_name = "JSON")]
    pub output: Option<PathBuf>,

    /// Export the per-bin summary to CSV.
    #[arg(long = "export-summary", value_name = "CSV")]
    pub export_summary: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct SyntheticArgs {
    /// Directory for `cont_funcs.csv`, `intensities.csv` and `dem_in.csv`.
    #[arg(short, long, default_value = "synthetic")]
    pub output_dir: PathBuf,

    /// Number of lines.
    #[arg(long, default_value_t = 21)]
    pub lines: usize,

    /// Centre of the first line (MK).
    #[arg(long, default_value_t = 1.0)]
    pub center_min: f64,

    /// Centre of the last line (MK).
    #[arg(long, default_value_t = 2.0)]
    pub center_max: f64,

    /// Width of every line's Gaussian contribution function (MK).
    #[arg(long, default_value_t = 0.1)]
    pub line_width: f64,

    /// Lowest tabulated temperature (MK).
    #[arg(long, default_value_t = 0.5)]
    pub table_min: f64,

    /// Highest tabulated temperature (MK).
    #[arg(long, default_value_t = 2.5)]
    pub table_max: f64,

    /// Intervals in the tabulation grid (points = intervals + 1).
    #[arg(long, default_value_t = 600)]
    pub table_intervals: usize,

    /// Lowest edge of the input DEM bins (MK).
    #[arg(long, default_value_t = 1.0)]
    pub dem_min: f64,

    /// Highest edge of the input DEM bins (MK).
    #[arg(long, default_value_t = 2.0)]
    pub dem_max: f64,

    /// Number of input DEM bins.
    #[arg(long, default_value_t = 5)]
    pub dem_bins: usize,

    /// Peak temperature of the input DEM (MK).
    #[arg(long, default_value_t = 1.2)]
    pub dem_peak: f64,

    /// Width of the input DEM (MK).
    #[arg(long, default_value_t = 0.2)]
    pub dem_width: f64,

    /// Peak value of the input DEM (cm^-5).
    #[arg(long, default_value_t = 1.0e22)]
    pub dem_scale: f64,

    /// Intensity uncertainty as a fraction of the intensity.
    #[arg(long, default_value_t = 0.1)]
    pub rel_error: f64,

    /// Add Gaussian noise to the intensities.
    #[arg(long)]
    pub noise: bool,

    /// Random seed for the noise.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

#[derive(Debug, Parser, Clone)]
pub struct SummaryArgs {
    /// DEM JSON written by `demcmc invert --output`.
    #[arg(value_name = "JSON")]
    pub dem: PathBuf,

    /// Export the per-bin summary to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_invert_with_edges() {
        let cli = Cli::parse_from([
            "demcmc",
            "invert",
            "--cont-funcs",
            "cf.csv",
            "--intensities",
            "obs.csv",
            "--edges",
            "1,1.5,2",
            "-v",
        ]);
        assert!(cli.verbose);
        let Command::Invert(args) = cli.command else {
            panic!("expected invert");
        };
        assert_eq!(args.edges, Some(vec![1.0, 1.5, 2.0]));
        assert_eq!(args.nsteps, 1000);
        assert_eq!(args.nwalkers, None);
    }

    #[test]
    fn synthetic_defaults() {
        let cli = Cli::parse_from(["demcmc", "synthetic", "--noise"]);
        let Command::Synthetic(args) = cli.command else {
            panic!("expected synthetic");
        };
        assert!(args.noise);
        assert_eq!(args.lines, 21);
        assert_eq!(args.output_dir, PathBuf::from("synthetic"));
    }

    #[test]
    fn invert_requires_inputs() {
        assert!(Cli::try_parse_from(["demcmc", "invert"]).is_err());
    }
}
