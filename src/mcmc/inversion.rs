//! DEM inversion: the full warm-up + ensemble workflow.
//!
//! 1. Start every bin at the same DEM value.
//! 2. Warm-up: vary one bin at a time with a tiny 1-D ensemble while the
//!    other bins stay fixed, and move the bin to the mean of the last few
//!    steps. N one-dimensional searches converge much faster than a cold
//!    start in N dimensions.
//! 3. Replicate the guess across the full ensemble, jitter it, and sample
//!    the N-dimensional posterior.

use log::{debug, info};
use nalgebra::DMatrix;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Uniform;

use crate::domain::{InversionConfig, TempBins};
use crate::emission::LineCollection;
use crate::error::AppError;
use crate::math::mean;
use crate::mcmc::{DemPosterior, EnsembleSampler};
use crate::output::DemOutput;

/// Steps at the end of each warm-up run that are averaged into the guess.
const WARMUP_TAIL: usize = 10;

/// Estimate the DEM from a number of observed emission lines.
pub fn predict_dem(
    lines: &LineCollection,
    temp_bins: &TempBins,
    config: &InversionConfig,
) -> Result<DemOutput, AppError> {
    validate_config(config)?;

    let posterior = DemPosterior::new(lines, temp_bins)?;
    let n_dem = temp_bins.len();
    let nwalkers = resolve_nwalkers(config, n_dem);

    info!(
        "inverting {} lines over {} temperature bins ({:.3e}..{:.3e} K) with {} walkers",
        lines.len(),
        n_dem,
        temp_bins.min(),
        temp_bins.max(),
        nwalkers
    );

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut dem_guess = vec![config.initial_dem; n_dem];

    if config.warmup_steps > 0 {
        dem_guess = vary_values_independently(&posterior, dem_guess, config, &mut rng)?;
        debug!(
            "warm-up guess log-prob {:.4e}",
            posterior.log_prob(&dem_guess)
        );
    }

    let initial = jittered(&dem_guess, nwalkers, config.jitter, &mut rng)?;
    let mut sampler = EnsembleSampler::new(nwalkers, n_dem, rng.r#gen())?;
    sampler.run_mcmc(&initial, config.nsteps, &posterior, config.progress)?;

    DemOutput::from_sampler(sampler, temp_bins.clone())
}

/// Walker count actually used for `n_dem` bins.
pub fn resolve_nwalkers(config: &InversionConfig, n_dem: usize) -> usize {
    config.nwalkers.unwrap_or(2 * n_dem + 2)
}

/// Improve `dem_guess` one bin at a time.
///
/// Bins are visited in order, so later bins see the already-updated values
/// of earlier ones.
pub fn vary_values_independently(
    posterior: &DemPosterior,
    mut dem_guess: Vec<f64>,
    config: &InversionConfig,
    rng: &mut StdRng,
) -> Result<Vec<f64>, AppError> {
    let nwalkers = config.warmup_walkers;
    let n_dem = dem_guess.len();
    if n_dem != posterior.n_bins() {
        return Err(AppError::invalid(format!(
            "DEM guess has {n_dem} values but there are {} bins.",
            posterior.n_bins()
        )));
    }

    let mut parameter_guess = jittered(&dem_guess, nwalkers, config.jitter, rng)?;

    for i in 0..n_dem {
        let initial = parameter_guess.columns(i, 1).into_owned();
        let mut sampler = EnsembleSampler::new(nwalkers, 1, rng.r#gen())?;

        let base = dem_guess.clone();
        let single = |x: &[f64]| posterior.log_prob_single_variation(x[0], i, &base);
        sampler.run_mcmc(&initial, config.warmup_steps, &single, false)?;

        let chain = sampler.chain();
        let tail_start = chain.len().saturating_sub(WARMUP_TAIL);
        let tail: Vec<f64> = chain[tail_start..]
            .iter()
            .flat_map(|step| step.iter().copied().collect::<Vec<_>>())
            .collect();
        dem_guess[i] = mean(&tail)
            .ok_or_else(|| AppError::numeric(format!("Warm-up for bin {i} produced no samples.")))?;

        if let Some(last) = sampler.last_positions() {
            parameter_guess.set_column(i, &last.column(0));
        }
        debug!("warm-up bin {i}: dem={:.4e}", dem_guess[i]);
    }

    Ok(dem_guess)
}

/// Replicate `guess` across `nwalkers` rows and add `U(0, 1) · jitter · guess`.
fn jittered(
    guess: &[f64],
    nwalkers: usize,
    jitter: f64,
    rng: &mut StdRng,
) -> Result<DMatrix<f64>, AppError> {
    let unit = Uniform::new(0.0, 1.0);
    let mut out = DMatrix::from_fn(nwalkers, guess.len(), |_, j| guess[j]);
    for k in 0..nwalkers {
        for j in 0..guess.len() {
            out[(k, j)] += unit.sample(rng) * jitter * guess[j];
        }
    }
    if out.iter().any(|v| !v.is_finite()) {
        return Err(AppError::numeric("Non-finite starting position for walkers."));
    }
    Ok(out)
}

fn validate_config(config: &InversionConfig) -> Result<(), AppError> {
    if config.nsteps == 0 {
        return Err(AppError::invalid("nsteps must be > 0."));
    }
    if !(config.initial_dem.is_finite() && config.initial_dem > 0.0) {
        return Err(AppError::invalid(format!(
            "Initial DEM must be finite and > 0, got {}.",
            config.initial_dem
        )));
    }
    if !(config.jitter.is_finite() && config.jitter > 0.0) {
        return Err(AppError::invalid("Jitter must be finite and > 0."));
    }
    if config.warmup_steps > 0 && config.warmup_walkers < 2 {
        return Err(AppError::invalid("Warm-up needs at least 2 walkers."));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::domain::MK;
    use crate::emission::{ContFuncGaussian, EmissionLine};
    use crate::forward::ResponseMatrix;

    /// Lines with Gaussian contribution functions observing `dem_true`.
    fn synthetic_lines(bins: &TempBins, dem_true: &[f64]) -> LineCollection {
        let unobserved: Vec<EmissionLine> = (0..8)
            .map(|i| {
                let center = (1.0 + i as f64 / 7.0) * MK;
                EmissionLine::new(Arc::new(ContFuncGaussian::new(center, 0.15 * MK).unwrap()))
            })
            .collect();
        let response = ResponseMatrix::new(&LineCollection::new(unobserved.clone()), bins).unwrap();
        let intensities = response.predict(dem_true);
        unobserved
            .into_iter()
            .zip(intensities.iter())
            .map(|(line, &i)| line.with_observation(i, i / 10.0))
            .collect::<Vec<_>>()
            .into()
    }

    fn quick_config() -> InversionConfig {
        InversionConfig {
            nsteps: 300,
            nwalkers: Some(12),
            seed: 7,
            initial_dem: 1.0e-3,
            warmup_steps: 100,
            warmup_walkers: 3,
            jitter: 0.01,
            progress: false,
        }
    }

    #[test]
    fn output_has_one_sample_per_walker() {
        let bins = TempBins::linear(1.0 * MK, 2.0 * MK, 4).unwrap();
        let truth = [1e-3, 4e-3, 3e-3, 1e-3];
        let lines = synthetic_lines(&bins, &truth);

        let out = predict_dem(&lines, &bins, &quick_config()).unwrap();
        assert_eq!(out.samples().nrows(), 12);
        assert_eq!(out.samples().ncols(), 4);
        assert!(out.samples().iter().all(|&v| v >= 0.0 && v.is_finite()));
        assert_eq!(out.sampler().map(|s| s.iterations()), Some(300));
    }

    #[test]
    fn inversion_improves_on_starting_guess() {
        let bins = TempBins::linear(1.0 * MK, 2.0 * MK, 4).unwrap();
        let truth = [1e-3, 4e-3, 3e-3, 1e-3];
        let lines = synthetic_lines(&bins, &truth);
        let posterior = DemPosterior::new(&lines, &bins).unwrap();
        let config = quick_config();

        let start = vec![config.initial_dem; 4];
        let out = predict_dem(&lines, &bins, &config).unwrap();
        let last = out.samples();
        let best = (0..last.nrows())
            .map(|k| posterior.log_prob(&last.row(k).iter().copied().collect::<Vec<_>>()))
            .fold(f64::NEG_INFINITY, f64::max);
        assert!(best > posterior.log_prob(&start));
    }

    #[test]
    fn warmup_moves_towards_truth() {
        let bins = TempBins::linear(1.0 * MK, 2.0 * MK, 3).unwrap();
        let truth = [2e-3, 3e-3, 2e-3];
        let lines = synthetic_lines(&bins, &truth);
        let posterior = DemPosterior::new(&lines, &bins).unwrap();
        let config = quick_config();

        let start = vec![config.initial_dem; 3];
        let mut rng = StdRng::seed_from_u64(1);
        let warmed = vary_values_independently(&posterior, start.clone(), &config, &mut rng).unwrap();
        assert!(posterior.log_prob(&warmed) >= posterior.log_prob(&start));
    }

    #[test]
    fn same_seed_reproduces_output() {
        let bins = TempBins::linear(1.0 * MK, 2.0 * MK, 3).unwrap();
        let lines = synthetic_lines(&bins, &[2e-3, 3e-3, 2e-3]);
        let mut config = quick_config();
        config.nsteps = 50;
        config.warmup_steps = 20;

        let a = predict_dem(&lines, &bins, &config).unwrap();
        let b = predict_dem(&lines, &bins, &config).unwrap();
        assert_eq!(a.samples(), b.samples());
    }

    #[test]
    fn rejects_bad_config_and_unobserved_lines() {
        let bins = TempBins::linear(1.0 * MK, 2.0 * MK, 3).unwrap();
        let lines = synthetic_lines(&bins, &[2e-3, 3e-3, 2e-3]);

        let mut config = quick_config();
        config.nsteps = 0;
        assert_eq!(predict_dem(&lines, &bins, &config).unwrap_err().exit_code(), 2);

        let mut config = quick_config();
        config.nwalkers = Some(4);
        assert!(predict_dem(&lines, &bins, &config).is_err());

        let unobserved = LineCollection::new(vec![EmissionLine::new(Arc::new(
            ContFuncGaussian::new(1.5 * MK, 0.1 * MK).unwrap(),
        ))]);
        assert!(predict_dem(&unobserved, &bins, &quick_config()).is_err());
    }

    #[test]
    fn default_walker_count_scales_with_bins() {
        let config = InversionConfig::default();
        assert_eq!(resolve_nwalkers(&config, 15), 32);
    }
}
