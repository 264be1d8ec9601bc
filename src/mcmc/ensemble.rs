//! Affine-invariant ensemble sampler (Goodman & Weare 2010 stretch move).
//!
//! The ensemble is split into two halves by walker index parity. Each step
//! updates one half using the other as the complementary ensemble, then
//! swaps roles:
//!
//! ```text
//! z ~ g(z) ∝ 1/√z on [1/a, a]
//! y = x_j + z · (x_k - x_j)
//! accept with probability min(1, z^(ndim-1) · p(y) / p(x_k))
//! ```
//!
//! Random draws happen sequentially on one seeded RNG so a given seed
//! always reproduces the same chain. Log-probabilities of a half's proposals
//! are evaluated in parallel.

use log::{debug, info, warn};
use nalgebra::{DMatrix, DVector};
use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;

use crate::error::AppError;
use crate::mcmc::LogProb;

/// Default stretch-move scale parameter.
pub const DEFAULT_STRETCH_SCALE: f64 = 2.0;

#[derive(Debug, Clone)]
pub struct EnsembleSampler {
    nwalkers: usize,
    ndim: usize,
    a: f64,
    rng: StdRng,
    /// One `nwalkers × ndim` matrix per recorded step.
    chain: Vec<DMatrix<f64>>,
    /// One `nwalkers` vector per recorded step.
    log_probs: Vec<DVector<f64>>,
    accepted: Vec<usize>,
}

struct Proposal {
    walker: usize,
    position: Vec<f64>,
    z: f64,
}

impl EnsembleSampler {
    /// Create a sampler with `nwalkers` walkers in `ndim` dimensions.
    ///
    /// Requires `ndim >= 1` and `nwalkers >= max(2, 2 * ndim)`.
    pub fn new(nwalkers: usize, ndim: usize, seed: u64) -> Result<Self, AppError> {
        if ndim == 0 {
            return Err(AppError::invalid("Sampler needs at least one dimension."));
        }
        let min_walkers = (2 * ndim).max(2);
        if nwalkers < min_walkers {
            return Err(AppError::invalid(format!(
                "Need at least {min_walkers} walkers for {ndim} dimensions, got {nwalkers}."
            )));
        }
        Ok(Self {
            nwalkers,
            ndim,
            a: DEFAULT_STRETCH_SCALE,
            rng: StdRng::seed_from_u64(seed),
            chain: Vec::new(),
            log_probs: Vec::new(),
            accepted: vec![0; nwalkers],
        })
    }

    /// Override the stretch scale `a` (must be > 1).
    pub fn with_stretch_scale(mut self, a: f64) -> Result<Self, AppError> {
        if !(a.is_finite() && a > 1.0) {
            return Err(AppError::invalid(format!("Stretch scale must be > 1, got {a}.")));
        }
        self.a = a;
        Ok(self)
    }

    pub fn nwalkers(&self) -> usize {
        self.nwalkers
    }

    pub fn ndim(&self) -> usize {
        self.ndim
    }

    /// Number of steps recorded so far.
    pub fn iterations(&self) -> usize {
        self.chain.len()
    }

    /// Walker positions, one `nwalkers × ndim` matrix per step.
    pub fn chain(&self) -> &[DMatrix<f64>] {
        &self.chain
    }

    /// Log-probabilities, one vector over walkers per step.
    pub fn log_probs(&self) -> &[DVector<f64>] {
        &self.log_probs
    }

    pub fn last_positions(&self) -> Option<&DMatrix<f64>> {
        self.chain.last()
    }

    /// Fraction of proposals accepted, per walker.
    pub fn acceptance_fraction(&self) -> Vec<f64> {
        let n = self.iterations();
        self.accepted
            .iter()
            .map(|&acc| if n == 0 { 0.0 } else { acc as f64 / n as f64 })
            .collect()
    }

    /// Advance the ensemble `nsteps` times from `initial` (`nwalkers × ndim`),
    /// appending every step to the stored chain.
    pub fn run_mcmc<L: LogProb + ?Sized>(
        &mut self,
        initial: &DMatrix<f64>,
        nsteps: usize,
        log_prob: &L,
        progress: bool,
    ) -> Result<(), AppError> {
        if initial.nrows() != self.nwalkers || initial.ncols() != self.ndim {
            return Err(AppError::invalid(format!(
                "Initial state is {}×{}, expected {}×{} (walkers × dimensions).",
                initial.nrows(),
                initial.ncols(),
                self.nwalkers,
                self.ndim
            )));
        }
        if initial.iter().any(|v| !v.is_finite()) {
            return Err(AppError::invalid("Initial walker positions must be finite."));
        }

        let mut positions: Vec<Vec<f64>> = (0..self.nwalkers)
            .map(|k| initial.row(k).iter().copied().collect())
            .collect();
        let mut lp: Vec<f64> = positions
            .par_iter()
            .map(|x| sanitize(log_prob.log_prob(x)))
            .collect();

        if lp.iter().all(|v| *v == f64::NEG_INFINITY) {
            warn!("every walker starts with zero posterior probability");
        }

        let halves: [Vec<usize>; 2] = [
            (0..self.nwalkers).step_by(2).collect(),
            (1..self.nwalkers).step_by(2).collect(),
        ];
        let report_every = (nsteps / 10).max(1);

        for step in 0..nsteps {
            for (active, complement) in [(&halves[0], &halves[1]), (&halves[1], &halves[0])] {
                let proposals = self.propose(active, complement, &positions);

                let proposal_lp: Vec<f64> = proposals
                    .par_iter()
                    .map(|p| sanitize(log_prob.log_prob(&p.position)))
                    .collect();

                for (p, new_lp) in proposals.into_iter().zip(proposal_lp) {
                    let ln_q = (self.ndim as f64 - 1.0) * p.z.ln() + new_lp - lp[p.walker];
                    let u: f64 = self.rng.r#gen();
                    if ln_q > u.ln() {
                        positions[p.walker] = p.position;
                        lp[p.walker] = new_lp;
                        self.accepted[p.walker] += 1;
                    }
                }
            }

            self.chain.push(DMatrix::from_fn(self.nwalkers, self.ndim, |k, d| {
                positions[k][d]
            }));
            self.log_probs.push(DVector::from_vec(lp.clone()));

            if progress && ((step + 1) % report_every == 0 || step + 1 == nsteps) {
                let best = lp.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                info!(
                    "step {}/{}: best log-prob {:.4e}, mean acceptance {:.3}",
                    step + 1,
                    nsteps,
                    best,
                    mean_acceptance(&self.accepted, self.iterations())
                );
            }
        }

        debug!(
            "ensemble finished: {} walkers × {} dims, {} steps, mean acceptance {:.3}",
            self.nwalkers,
            self.ndim,
            self.iterations(),
            mean_acceptance(&self.accepted, self.iterations())
        );
        Ok(())
    }

    fn propose(&mut self, active: &[usize], complement: &[usize], positions: &[Vec<f64>]) -> Vec<Proposal> {
        active
            .iter()
            .map(|&k| {
                let j = complement[self.rng.gen_range(0..complement.len())];
                let u: f64 = self.rng.r#gen();
                let z = ((self.a - 1.0) * u + 1.0).powi(2) / self.a;
                let position = positions[j]
                    .iter()
                    .zip(positions[k].iter())
                    .map(|(&xj, &xk)| xj + z * (xk - xj))
                    .collect();
                Proposal {
                    walker: k,
                    position,
                    z,
                }
            })
            .collect()
    }
}

/// Non-finite log-probabilities (NaN or either infinity) count as `-inf`.
fn sanitize(lp: f64) -> f64 {
    if lp.is_finite() { lp } else { f64::NEG_INFINITY }
}

fn mean_acceptance(accepted: &[usize], iterations: usize) -> f64 {
    if iterations == 0 || accepted.is_empty() {
        return 0.0;
    }
    accepted.iter().sum::<usize>() as f64 / (accepted.len() * iterations) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{mean, percentile};

    fn spread_start(nwalkers: usize, ndim: usize, seed: u64) -> DMatrix<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        DMatrix::from_fn(nwalkers, ndim, |_, _| rng.gen_range(-1.0..1.0))
    }

    #[test]
    fn rejects_too_few_walkers() {
        assert!(EnsembleSampler::new(3, 2, 0).is_err());
        assert!(EnsembleSampler::new(1, 1, 0).is_err());
        assert!(EnsembleSampler::new(4, 0, 0).is_err());
        assert!(EnsembleSampler::new(3, 1, 0).is_ok());
    }

    #[test]
    fn rejects_mismatched_initial_state() {
        let mut sampler = EnsembleSampler::new(4, 2, 0).unwrap();
        let initial = DMatrix::zeros(4, 3);
        let err = sampler
            .run_mcmc(&initial, 1, &|_: &[f64]| 0.0, false)
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn records_chain_shapes() {
        let mut sampler = EnsembleSampler::new(6, 2, 1).unwrap();
        let initial = spread_start(6, 2, 2);
        let lp = |x: &[f64]| -0.5 * x.iter().map(|v| v * v).sum::<f64>();
        sampler.run_mcmc(&initial, 25, &lp, false).unwrap();

        assert_eq!(sampler.iterations(), 25);
        assert_eq!(sampler.chain().len(), 25);
        assert_eq!(sampler.log_probs().len(), 25);
        let last = sampler.last_positions().unwrap();
        assert_eq!((last.nrows(), last.ncols()), (6, 2));
        assert!(sampler.acceptance_fraction().iter().all(|f| (0.0..=1.0).contains(f)));
    }

    #[test]
    fn same_seed_same_chain() {
        let lp = |x: &[f64]| -0.5 * x[0] * x[0];
        let initial = spread_start(4, 1, 7);

        let mut a = EnsembleSampler::new(4, 1, 99).unwrap();
        let mut b = EnsembleSampler::new(4, 1, 99).unwrap();
        a.run_mcmc(&initial, 50, &lp, false).unwrap();
        b.run_mcmc(&initial, 50, &lp, false).unwrap();
        assert_eq!(a.last_positions(), b.last_positions());
    }

    #[test]
    fn never_accepts_zero_probability_region() {
        // Support is x >= 0; walkers start inside and must stay there.
        let lp = |x: &[f64]| if x[0] < 0.0 { f64::NEG_INFINITY } else { -x[0] };
        let initial = DMatrix::from_fn(8, 1, |k, _| 0.1 + k as f64 * 0.2);
        let mut sampler = EnsembleSampler::new(8, 1, 3).unwrap();
        sampler.run_mcmc(&initial, 200, &lp, false).unwrap();
        for step in sampler.chain() {
            assert!(step.iter().all(|&v| v >= 0.0));
        }
    }

    #[test]
    fn non_finite_log_probs_are_never_accepted() {
        assert_eq!(sanitize(f64::NAN), f64::NEG_INFINITY);
        assert_eq!(sanitize(f64::INFINITY), f64::NEG_INFINITY);
        assert_eq!(sanitize(-3.0), -3.0);

        let lp = |x: &[f64]| {
            if x[0] > 1.5 {
                f64::INFINITY
            } else if x[0] < -1.5 {
                f64::NAN
            } else {
                -0.5 * x[0] * x[0]
            }
        };
        let initial = spread_start(8, 1, 13);
        let mut sampler = EnsembleSampler::new(8, 1, 17).unwrap();
        sampler.run_mcmc(&initial, 300, &lp, false).unwrap();

        for (step, lps) in sampler.chain().iter().zip(sampler.log_probs()) {
            assert!(step.iter().all(|v| v.abs() <= 1.5));
            assert!(lps.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn samples_standard_normal() {
        let lp = |x: &[f64]| -0.5 * x[0] * x[0];
        let initial = spread_start(32, 1, 11);
        let mut sampler = EnsembleSampler::new(32, 1, 5).unwrap();
        sampler.run_mcmc(&initial, 2000, &lp, false).unwrap();

        let samples: Vec<f64> = sampler.chain()[500..]
            .iter()
            .flat_map(|m| m.iter().copied().collect::<Vec<_>>())
            .collect();
        let m = mean(&samples).unwrap();
        let q16 = percentile(&samples, 15.87).unwrap();
        let q84 = percentile(&samples, 84.13).unwrap();
        assert!(m.abs() < 0.15, "mean {m}");
        assert!((q84 - q16 - 2.0).abs() < 0.3, "width {}", q84 - q16);
    }
}
