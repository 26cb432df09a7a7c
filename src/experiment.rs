//! Experiment harness: lock-step comparison of environments against a known
//! ground truth.
//!
//! Runs several [`Environment`]s for a fixed number of cycles, feeding each
//! one synthetic observations drawn from a per-arm ground-truth distribution,
//! and records per-cycle regret against the best arm's true rate. This is a
//! simulation/testing tool: production runs have no ground truth to regret
//! against.

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use tracing::debug;

use crate::codec::tally;
use crate::environment::{CycleOptions, Environment};
use crate::Error;

/// Known per-arm reward distributions for synthetic data generation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GroundTruth {
    /// Bernoulli reward per trial with per-arm success rate.
    Binomial { ps: Vec<f64> },
    /// Gaussian reward per trial with per-arm mean and standard deviation.
    Normal { mus: Vec<f64>, sigmas: Vec<f64> },
}

impl GroundTruth {
    /// Number of arms this truth describes.
    pub fn arms(&self) -> usize {
        match self {
            Self::Binomial { ps } => ps.len(),
            Self::Normal { mus, .. } => mus.len(),
        }
    }

    /// The best arm's true reward rate (max `p` or max `mu`).
    pub fn optimal_rate(&self) -> f64 {
        let rates = match self {
            Self::Binomial { ps } => ps,
            Self::Normal { mus, .. } => mus,
        };
        rates.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    fn draw(&self, arm: usize, n: u64, rng: &mut StdRng) -> Result<Vec<f64>, Error> {
        match self {
            Self::Binomial { ps } => {
                let p = ps[arm];
                if !p.is_finite() || !(0.0..=1.0).contains(&p) {
                    return Err(Error::Sampling(format!("binomial rate {p} not in [0, 1]")));
                }
                Ok((0..n)
                    .map(|_| if rng.random::<f64>() < p { 1.0 } else { 0.0 })
                    .collect())
            }
            Self::Normal { mus, sigmas } => {
                let dist = Normal::new(mus[arm], sigmas[arm])
                    .map_err(|e| Error::Sampling(e.to_string()))?;
                Ok((0..n).map(|_| dist.sample(rng)).collect())
            }
        }
    }
}

/// Generate one cycle's worth of observations, dated `run_date`, with one
/// trial per unit of the current allocation counts.
pub fn synthetic_cycle_data(
    truth: &GroundTruth,
    run_date: NaiveDate,
    counts: &[u64],
    rng: &mut StdRng,
) -> Result<Vec<Vec<(NaiveDate, f64)>>, Error> {
    let mut out = Vec::with_capacity(counts.len());
    for (arm, &pulls) in counts.iter().enumerate() {
        let values = truth.draw(arm, pulls, rng)?;
        out.push(values.into_iter().map(|v| (run_date, v)).collect());
    }
    Ok(out)
}

/// One environment's cumulative regret standing after one cycle.
///
/// `regret = optimal` (best arm's rate times total pulls) `- reward`
/// (total realized reward). Records are append-only and consumed offline.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RegretRecord {
    pub cycle: usize,
    /// Environment index within the experiment.
    pub env: usize,
    pub label: String,
    /// Date the cycle's observations were collected.
    pub date: NaiveDate,
    /// Cumulative pulls across all arms.
    pub pulls: u64,
    /// Best achievable cumulative reward.
    pub optimal: f64,
    /// Realized cumulative reward.
    pub reward: f64,
    pub regret: f64,
}

/// Lock-step driver over several environments sharing one RNG.
#[derive(Debug)]
pub struct Experiment {
    envs: Vec<Environment>,
    truths: Vec<GroundTruth>,
    cycles: usize,
    rng: StdRng,
}

impl Experiment {
    /// Deterministic default seed (0).
    pub fn new(
        envs: Vec<Environment>,
        truths: Vec<GroundTruth>,
        cycles: usize,
    ) -> Result<Self, Error> {
        Self::with_seed(envs, truths, cycles, 0)
    }

    /// Fails when truths and environments disagree in count or arm arity.
    pub fn with_seed(
        envs: Vec<Environment>,
        truths: Vec<GroundTruth>,
        cycles: usize,
        seed: u64,
    ) -> Result<Self, Error> {
        if envs.len() != truths.len() {
            return Err(Error::ArmCountMismatch {
                expected: envs.len(),
                got: truths.len(),
            });
        }
        for (env, truth) in envs.iter().zip(&truths) {
            if env.k() != truth.arms() {
                return Err(Error::ArmCountMismatch {
                    expected: env.k(),
                    got: truth.arms(),
                });
            }
        }
        Ok(Self {
            envs,
            truths,
            cycles,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn environments(&self) -> &[Environment] {
        &self.envs
    }

    pub fn into_environments(self) -> Vec<Environment> {
        self.envs
    }

    /// Run every environment for the configured number of cycles and return
    /// the per-cycle regret log.
    ///
    /// Each cycle draws synthetic data from the ground truth under the
    /// environment's *current* allocation, ingests it via
    /// [`Environment::run_cycle`] with an incremental clock, and appends one
    /// [`RegretRecord`] per environment.
    pub fn run(&mut self) -> Result<Vec<RegretRecord>, Error> {
        let optimal: Vec<f64> = self.truths.iter().map(GroundTruth::optimal_rate).collect();
        let mut records = Vec::with_capacity(self.cycles * self.envs.len());

        for cycle in 0..self.cycles {
            for (i, env) in self.envs.iter_mut().enumerate() {
                let counts = tally(env.allocation(), env.k());
                let date = env.run_date();
                let data = synthetic_cycle_data(&self.truths[i], date, &counts, &mut self.rng)?;
                env.run_cycle(
                    &data,
                    CycleOptions {
                        incremental: true,
                        ..Default::default()
                    },
                )?;

                let pulls: u64 = env.data().iter().map(|s| s.len() as u64).sum();
                let reward: f64 = env
                    .data()
                    .iter()
                    .map(|s| s.values().iter().sum::<f64>())
                    .sum();
                let optimal_reward = optimal[i] * pulls as f64;
                records.push(RegretRecord {
                    cycle,
                    env: i,
                    label: env.label().to_string(),
                    date,
                    pulls,
                    optimal: optimal_reward,
                    reward,
                    regret: optimal_reward - reward,
                });
            }
            debug!(cycle, "experiment cycle complete");
        }
        Ok(records)
    }
}
