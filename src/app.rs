//! Top-level application orchestration.
//!
//! `src/main.rs` only parses arguments and sets up logging; this module is
//! the "real main" that:
//! - turns CLI arguments into config structs
//! - runs the inversion / synthetic pipelines
//! - prints reports
//! - writes optional exports

use log::info;

use crate::cli::{Cli, Command, InvertArgs, SummaryArgs, SyntheticArgs};
use crate::domain::{BinSpec, GridConfig, GridSpacing, InversionConfig, InvertConfig, MK, SyntheticConfig};
use crate::error::AppError;
use crate::io::write_summary_csv;
use crate::output::DemOutput;
use crate::report::{format_dem_table, format_file_summary, format_line_residuals, format_run_summary};

pub mod pipeline;

/// Entry point for the `demcmc` binary.
pub fn run(cli: Cli) -> Result<(), AppError> {
    match cli.command {
        Command::Invert(args) => handle_invert(args),
        Command::Synthetic(args) => handle_synthetic(args),
        Command::Summary(args) => handle_summary(args),
    }
}

fn handle_invert(args: InvertArgs) -> Result<(), AppError> {
    let config = invert_config_from_args(&args);
    let run = pipeline::run_inversion(&config)?;

    println!(
        "{}",
        format_run_summary(&run.output, run.lines.len(), &config.inversion)
    );
    println!("{}", format_dem_table(&run.output.summary()));
    if config.top_n > 0 {
        println!(
            "{}",
            format_line_residuals("Worst-fitting lines (median DEM)", &run.worst, &run.residuals)
        );
    }

    if let Some(path) = &config.output_path {
        run.output.save(path)?;
        info!("saved DEM samples to '{}'", path.display());
    }
    if let Some(path) = &config.export_summary {
        write_summary_csv(path, &run.output.summary())?;
        info!("exported DEM summary to '{}'", path.display());
    }
    Ok(())
}

fn handle_synthetic(args: SyntheticArgs) -> Result<(), AppError> {
    let config = synthetic_config_from_args(&args);
    let (data, files) = pipeline::run_synthetic(&config)?;

    println!("=== demcmc - synthetic data ===");
    println!(
        "Lines: n={} | centres=[{:.3}, {:.3}] MK | width={:.3} MK",
        data.lines.len(),
        config.center_min / MK,
        config.center_max / MK,
        config.line_width / MK
    );
    println!("Contribution functions: {}", files.cont_funcs.display());
    println!("Intensities: {}", files.intensities.display());
    println!("Input DEM: {}", files.dem_in.display());
    Ok(())
}

fn handle_summary(args: SummaryArgs) -> Result<(), AppError> {
    let output = DemOutput::load(&args.dem)?;
    let summary = output.summary();

    println!("{}", format_file_summary(&output));
    println!("{}", format_dem_table(&summary));

    if let Some(path) = &args.export {
        write_summary_csv(path, &summary)?;
    }
    Ok(())
}

pub fn invert_config_from_args(args: &InvertArgs) -> InvertConfig {
    let bins = match &args.edges {
        Some(edges) => BinSpec::Edges(edges.iter().map(|e| e * MK).collect()),
        None => BinSpec::Grid(GridConfig {
            temp_min: args.temp_min * MK,
            temp_max: args.temp_max * MK,
            n_bins: args.bins,
            spacing: args.spacing,
        }),
    };

    InvertConfig {
        cont_funcs_path: args.cont_funcs.clone(),
        intensities_path: args.intensities.clone(),
        bins,
        inversion: InversionConfig {
            nsteps: args.nsteps,
            nwalkers: args.nwalkers,
            seed: args.seed,
            initial_dem: args.initial_dem,
            warmup_steps: args.warmup_steps,
            warmup_walkers: args.warmup_walkers,
            jitter: args.jitter,
            progress: !args.quiet,
        },
        top_n: args.top,
        output_path: args.output.clone(),
        export_summary: args.export_summary.clone(),
    }
}

pub fn synthetic_config_from_args(args: &SyntheticArgs) -> SyntheticConfig {
    SyntheticConfig {
        n_lines: args.lines,
        center_min: args.center_min * MK,
        center_max: args.center_max * MK,
        line_width: args.line_width * MK,
        table_grid: GridConfig {
            temp_min: args.table_min * MK,
            temp_max: args.table_max * MK,
            n_bins: args.table_intervals,
            spacing: GridSpacing::Linear,
        },
        dem_grid: GridConfig {
            temp_min: args.dem_min * MK,
            temp_max: args.dem_max * MK,
            n_bins: args.dem_bins,
            spacing: GridSpacing::Linear,
        },
        dem_peak: args.dem_peak * MK,
        dem_width: args.dem_width * MK,
        dem_scale: args.dem_scale,
        rel_error: args.rel_error,
        add_noise: args.noise,
        seed: args.seed,
        output_dir: args.output_dir.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn invert_args_convert_mk_to_kelvin() {
        let cli = Cli::parse_from([
            "demcmc",
            "invert",
            "--cont-funcs",
            "cf.csv",
            "--intensities",
            "obs.csv",
            "--temp-min",
            "0.5",
            "--bins",
            "3",
            "--quiet",
        ]);
        let Command::Invert(args) = cli.command else {
            panic!("expected invert");
        };
        let config = invert_config_from_args(&args);
        let bins = config.bins.build().unwrap();
        assert_eq!(bins.len(), 3);
        assert_eq!(bins.min(), 0.5e6);
        assert_eq!(bins.max(), 2.0e6);
        assert!(!config.inversion.progress);
    }

    #[test]
    fn synthetic_args_match_default_config() {
        let cli = Cli::parse_from(["demcmc", "synthetic"]);
        let Command::Synthetic(args) = cli.command else {
            panic!("expected synthetic");
        };
        let from_args = synthetic_config_from_args(&args);
        let default = SyntheticConfig::default();
        assert_eq!(from_args.n_lines, default.n_lines);
        assert_eq!(from_args.table_grid.n_bins, default.table_grid.n_bins);
        assert_eq!(from_args.dem_grid.n_bins, default.dem_grid.n_bins);
        assert_eq!(from_args.dem_scale, default.dem_scale);
        assert!((from_args.dem_peak - default.dem_peak).abs() < 1e-6);
    }
}
