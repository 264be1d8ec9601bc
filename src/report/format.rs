//! Formatted terminal output.
//!
//! Formatting lives here so the sampling code stays free of presentation
//! details and output changes stay localized.

use crate::domain::{InversionConfig, MK};
use crate::output::{BinSummary, DemOutput};
use crate::report::{LineResidual, chi_squared};

/// Header for an inversion run: inputs, sampler settings, acceptance.
pub fn format_run_summary(output: &DemOutput, n_lines: usize, config: &InversionConfig) -> String {
    let bins = output.temp_bins();
    let mut out = String::new();

    out.push_str("=== demcmc - DEM inversion (MCMC) ===\n");
    out.push_str(&format!("Lines: n={n_lines}\n"));
    out.push_str(&format!(
        "Bins: n={} | T=[{:.3}, {:.3}] MK\n",
        bins.len(),
        bins.min() / MK,
        bins.max() / MK
    ));
    out.push_str(&format!(
        "Sampler: walkers={} | steps={} | warm-up={}x{} | seed={}\n",
        output.samples().nrows(),
        config.nsteps,
        config.warmup_walkers,
        config.warmup_steps,
        config.seed
    ));
    if let Some(sampler) = output.sampler() {
        let acc = sampler.acceptance_fraction();
        let mean = acc.iter().sum::<f64>() / acc.len().max(1) as f64;
        out.push_str(&format!("Acceptance: mean={mean:.3}\n"));
    }
    out.push('\n');
    out
}

/// Header for a DEM loaded from disk.
pub fn format_file_summary(output: &DemOutput) -> String {
    let bins = output.temp_bins();
    format!(
        "=== demcmc - saved DEM ===\nCreated: {}\nSamples: n={}\nBins: n={} | T=[{:.3}, {:.3}] MK\n\n",
        output.created().format("%Y-%m-%d %H:%M:%S UTC"),
        output.samples().nrows(),
        bins.len(),
        bins.min() / MK,
        bins.max() / MK
    )
}

/// Per-bin DEM table (median and 16th/84th percentiles, cm^-5).
pub fn format_dem_table(summary: &[BinSummary]) -> String {
    let mut out = String::new();
    out.push_str("DEM per temperature bin:\n");
    push_row(
        &mut out,
        format!("{:>10} {:>10} {:>12} {:>12} {:>12}", "T_lo[MK]", "T_hi[MK]", "p16", "median", "p84"),
    );
    push_row(
        &mut out,
        format!("{:-<10} {:-<10} {:-<12} {:-<12} {:-<12}", "", "", "", "", ""),
    );
    for s in summary {
        push_row(
            &mut out,
            format!(
                "{:>10.4} {:>10.4} {:>12} {:>12} {:>12}",
                s.temp_low / MK,
                s.temp_high / MK,
                fmt_sci(s.lower),
                fmt_sci(s.median),
                fmt_sci(s.upper)
            ),
        );
    }
    out
}

/// Table of line residuals, with the total chi² as a footer.
pub fn format_line_residuals(title: &str, residuals: &[LineResidual], total: &[LineResidual]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{title}:\n"));
    push_row(
        &mut out,
        format!("{:<24} {:>12} {:>12} {:>12} {:>8}", "line", "I_obs", "I_pred", "sigma", "chi"),
    );
    push_row(
        &mut out,
        format!("{:-<24} {:-<12} {:-<12} {:-<12} {:-<8}", "", "", "", "", ""),
    );
    for r in residuals {
        push_row(
            &mut out,
            format!(
                "{:<24} {:>12} {:>12} {:>12} {:>8.2}",
                truncate(&r.name, 24),
                fmt_sci(r.intensity_obs),
                fmt_sci(r.intensity_pred),
                fmt_sci(r.sigma),
                r.chi
            ),
        );
    }
    out.push_str(&format!("chi2={:.3} over {} lines\n", chi_squared(total), total.len()));
    out
}

fn push_row(out: &mut String, row: String) {
    out.push_str(row.trim_end());
    out.push('\n');
}

fn fmt_sci(v: f64) -> String {
    format!("{v:.3e}")
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
