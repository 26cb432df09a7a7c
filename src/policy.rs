//! Allocation policies: turn per-arm history into a new batch assignment.
//!
//! A policy consumes the environment's per-arm observation series (and the
//! previous allocation) and produces an assignment vector of length `batch`,
//! one arm index per upcoming trial. Policies hold no arm data of their own;
//! everything they look at arrives through [`SelectContext`]. The only state
//! a policy carries is its seedable RNG, so selection is reproducible in
//! tests and deterministic by default (seed 0), matching the rest of the
//! crate's determinism discipline.
//!
//! Variants:
//!
//! - [`RandomPolicy`]: uniform assignment, mainly for baselines and testing.
//! - [`NaivePolicy`]: classic A/B test — hold the previous allocation until a
//!   day/pull threshold passes, then commit the whole batch to the best arm.
//! - [`EpsilonGreedyPolicy`]: explore with probability epsilon, otherwise
//!   exploit the best windowed mean.
//! - [`BayesianPolicy`]: Thompson sampling through the environment's
//!   [`ArmModel`] posterior.

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::arm::{Arm, ArmModel};
use crate::series::Series;
use crate::Error;

/// Everything a policy may consult for one selection.
///
/// `data` carries full (unfiltered) per-arm history; policies that honor the
/// sliding window apply [`filter_window`] themselves, since the naive policy
/// ignores the window entirely.
#[derive(Debug)]
pub struct SelectContext<'a> {
    /// Number of arms in play (callers guarantee `k >= 1`).
    pub k: usize,
    /// Arm model used for posterior sampling (Bayesian policy).
    pub model: &'a ArmModel,
    /// Per-arm full observation history, `k` entries.
    pub data: &'a [&'a Series],
    /// Previous assignment vector of length `batch`.
    pub previous: &'a [usize],
    /// Date the experiment started.
    pub start_date: NaiveDate,
    /// The environment's logical "now".
    pub run_date: NaiveDate,
    /// Sliding window in days; `None` uses full history.
    pub sliding_window: Option<u32>,
    /// Number of trials to assign.
    pub batch: usize,
}

/// An allocation policy.
pub trait Policy {
    /// Produce a new assignment vector of length `ctx.batch` with entries in
    /// `[0, ctx.k)`.
    fn select_arm(&mut self, ctx: &SelectContext<'_>) -> Result<Vec<usize>, Error>;
}

/// Per-arm reward values restricted to the sliding window.
///
/// Observations dated on or after `run_date - sliding_window` days are
/// retained (inclusive); `None` disables filtering.
pub fn filter_window(
    data: &[&Series],
    run_date: NaiveDate,
    sliding_window: Option<u32>,
) -> Vec<Vec<f64>> {
    data.iter()
        .map(|s| match sliding_window {
            Some(days) => s.window_values(run_date, days),
            None => s.values().to_vec(),
        })
        .collect()
}

fn mean_of(values: &[f64]) -> f64 {
    if values.is_empty() {
        f64::NAN
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Index and value of the maximum mean; NaN means (empty arms) never win, so
/// an all-NaN input falls back to arm 0.
fn best_by_mean(means: &[f64]) -> (usize, f64) {
    let mut best = 0usize;
    let mut best_mean = f64::NEG_INFINITY;
    for (i, &m) in means.iter().enumerate() {
        if m > best_mean {
            best_mean = m;
            best = i;
        }
    }
    (best, best_mean)
}

/// Uniform-random assignment. Mainly a baseline for experiments.
#[derive(Debug, Clone)]
pub struct RandomPolicy {
    rng: StdRng,
}

impl RandomPolicy {
    /// Deterministic default seed (0).
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl Policy for RandomPolicy {
    fn select_arm(&mut self, ctx: &SelectContext<'_>) -> Result<Vec<usize>, Error> {
        Ok((0..ctx.batch)
            .map(|_| self.rng.random_range(0..ctx.k))
            .collect())
    }
}

/// Commit-after-threshold policy: the A/B test.
///
/// Follows the previous allocation until the configured stopping point, then
/// assigns the whole batch to the arm with the best full-history mean from
/// there on out. The sliding window is ignored, and an exact tie goes to the
/// lowest-indexed arm.
#[derive(Debug, Clone)]
pub struct NaivePolicy {
    n_days: Option<i64>,
    n_pulls: Option<u64>,
    both: bool,
}

impl NaivePolicy {
    /// Configure the stopping point: more than `n_days` elapsed days, or more
    /// than `n_pulls` total pulls across all arms, or (with `both`) both.
    ///
    /// Fails when neither threshold is set, or when `both` is requested with
    /// a missing side.
    pub fn new(n_days: Option<i64>, n_pulls: Option<u64>, both: bool) -> Result<Self, Error> {
        if n_days.is_none() && n_pulls.is_none() {
            return Err(Error::NaiveNoThreshold);
        }
        if both && (n_days.is_none() || n_pulls.is_none()) {
            return Err(Error::NaiveBothIncomplete);
        }
        Ok(Self {
            n_days,
            n_pulls,
            both,
        })
    }
}

impl Policy for NaivePolicy {
    fn select_arm(&mut self, ctx: &SelectContext<'_>) -> Result<Vec<usize>, Error> {
        let elapsed = ctx
            .run_date
            .signed_duration_since(ctx.start_date)
            .num_days();
        let pulls: u64 = ctx.data.iter().map(|s| s.len() as u64).sum();

        let days_done = self.n_days.map(|d| elapsed > d);
        let pulls_done = self.n_pulls.map(|p| pulls > p);
        let done = if self.both {
            days_done.unwrap_or(false) && pulls_done.unwrap_or(false)
        } else {
            days_done.unwrap_or(false) || pulls_done.unwrap_or(false)
        };

        if !done {
            return Ok(ctx.previous.to_vec());
        }

        let means: Vec<f64> = ctx.data.iter().map(|s| mean_of(s.values())).collect();
        let (best, _) = best_by_mean(&means);
        Ok(vec![best; ctx.batch])
    }
}

/// Epsilon-greedy: explore uniformly with probability `epsilon`, otherwise
/// take the arm with the best windowed mean.
///
/// When several arms tie exactly for the best mean, each greedy position
/// independently samples uniformly among the tied arms. If no arm has a
/// finite mean yet, every position falls back to a uniform draw.
#[derive(Debug, Clone)]
pub struct EpsilonGreedyPolicy {
    epsilon: f64,
    rng: StdRng,
}

impl EpsilonGreedyPolicy {
    /// Deterministic default seed (0).
    pub fn new(epsilon: f64) -> Self {
        Self::with_seed(epsilon, 0)
    }

    pub fn with_seed(epsilon: f64, seed: u64) -> Self {
        Self {
            epsilon,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Policy for EpsilonGreedyPolicy {
    fn select_arm(&mut self, ctx: &SelectContext<'_>) -> Result<Vec<usize>, Error> {
        let filtered = filter_window(ctx.data, ctx.run_date, ctx.sliding_window);
        let means: Vec<f64> = filtered.iter().map(|v| mean_of(v)).collect();
        let (best, best_mean) = best_by_mean(&means);

        let tied: Vec<usize> = if best_mean.is_finite() {
            means
                .iter()
                .enumerate()
                .filter(|(_, m)| **m == best_mean)
                .map(|(i, _)| i)
                .collect()
        } else {
            Vec::new()
        };

        let mut out = Vec::with_capacity(ctx.batch);
        for _ in 0..ctx.batch {
            let explore = self.rng.random::<f64>() < self.epsilon;
            let arm = if explore || tied.is_empty() {
                self.rng.random_range(0..ctx.k)
            } else if tied.len() > 1 {
                tied[self.rng.random_range(0..tied.len())]
            } else {
                best
            };
            out.push(arm);
        }
        Ok(out)
    }
}

/// Thompson sampling through the environment's arm model.
///
/// For each arm, `batch` independent posterior samples are drawn over the
/// windowed data; batch position `j` goes to the arm whose `j`-th sample is
/// largest. Ties are resolved "first-max": the strict `>` scan keeps the
/// lowest-indexed arm on an exact tie.
#[derive(Debug, Clone)]
pub struct BayesianPolicy {
    rng: StdRng,
}

impl BayesianPolicy {
    /// Deterministic default seed (0).
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for BayesianPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl Policy for BayesianPolicy {
    fn select_arm(&mut self, ctx: &SelectContext<'_>) -> Result<Vec<usize>, Error> {
        let filtered = filter_window(ctx.data, ctx.run_date, ctx.sliding_window);

        let mut samples: Vec<Vec<f64>> = Vec::with_capacity(ctx.k);
        for arm_data in &filtered {
            samples.push(ctx.model.sample(arm_data, ctx.batch, &mut self.rng)?);
        }

        let mut out = Vec::with_capacity(ctx.batch);
        for j in 0..ctx.batch {
            let mut best = 0usize;
            let mut best_sample = f64::NEG_INFINITY;
            for (i, s) in samples.iter().enumerate() {
                if s[j] > best_sample {
                    best_sample = s[j];
                    best = i;
                }
            }
            out.push(best);
        }
        Ok(out)
    }
}

/// Serializable policy configuration: registry name plus hyperparameters
/// plus RNG seed.
///
/// This is what snapshots persist. [`PolicySpec::build`] turns it into a
/// live [`PolicyKind`]; the live RNG is (re)seeded from the spec, so restore
/// rebuilds the policy from configuration rather than carrying RNG state —
/// selection after restore is reproducible but not a bit-for-bit
/// continuation of the pre-snapshot stream.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "policy", rename_all = "lowercase"))]
pub enum PolicySpec {
    Random {
        seed: u64,
    },
    Naive {
        n_days: Option<i64>,
        n_pulls: Option<u64>,
        both: bool,
    },
    Epsilon {
        epsilon: f64,
        seed: u64,
    },
    Bayesian {
        seed: u64,
    },
}

/// Default exploration probability for [`PolicySpec::from_name`].
pub const DEFAULT_EPSILON: f64 = 0.05;

impl PolicySpec {
    /// Resolve a policy by registry name with default parameters.
    ///
    /// Known names: `"random"`, `"naive"`, `"epsilon"`, `"bayesian"`. The
    /// naive spec resolves with no thresholds set; configure them before
    /// [`PolicySpec::build`], which enforces the construction rules.
    pub fn from_name(name: &str) -> Result<Self, Error> {
        match name {
            "random" => Ok(Self::Random { seed: 0 }),
            "naive" => Ok(Self::Naive {
                n_days: None,
                n_pulls: None,
                both: false,
            }),
            "epsilon" => Ok(Self::Epsilon {
                epsilon: DEFAULT_EPSILON,
                seed: 0,
            }),
            "bayesian" => Ok(Self::Bayesian { seed: 0 }),
            other => Err(Error::UnknownPolicy(other.to_string())),
        }
    }

    /// The registry name of this policy.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Random { .. } => "random",
            Self::Naive { .. } => "naive",
            Self::Epsilon { .. } => "epsilon",
            Self::Bayesian { .. } => "bayesian",
        }
    }

    /// Replace the RNG seed where the variant has one.
    pub fn with_seed(self, new_seed: u64) -> Self {
        match self {
            Self::Random { .. } => Self::Random { seed: new_seed },
            Self::Epsilon { epsilon, .. } => Self::Epsilon {
                epsilon,
                seed: new_seed,
            },
            Self::Bayesian { .. } => Self::Bayesian { seed: new_seed },
            naive @ Self::Naive { .. } => naive,
        }
    }

    /// Construct the live policy. Configuration errors (naive thresholds)
    /// surface here, before any cycle runs.
    pub fn build(&self) -> Result<PolicyKind, Error> {
        Ok(match *self {
            Self::Random { seed } => PolicyKind::Random(RandomPolicy::with_seed(seed)),
            Self::Naive {
                n_days,
                n_pulls,
                both,
            } => PolicyKind::Naive(NaivePolicy::new(n_days, n_pulls, both)?),
            Self::Epsilon { epsilon, seed } => {
                PolicyKind::Epsilon(EpsilonGreedyPolicy::with_seed(epsilon, seed))
            }
            Self::Bayesian { seed } => PolicyKind::Bayesian(BayesianPolicy::with_seed(seed)),
        })
    }
}

/// A live policy instance, one variant per [`PolicySpec`].
#[derive(Debug, Clone)]
pub enum PolicyKind {
    Random(RandomPolicy),
    Naive(NaivePolicy),
    Epsilon(EpsilonGreedyPolicy),
    Bayesian(BayesianPolicy),
}

impl Policy for PolicyKind {
    fn select_arm(&mut self, ctx: &SelectContext<'_>) -> Result<Vec<usize>, Error> {
        match self {
            Self::Random(p) => p.select_arm(ctx),
            Self::Naive(p) => p.select_arm(ctx),
            Self::Epsilon(p) => p.select_arm(ctx),
            Self::Bayesian(p) => p.select_arm(ctx),
        }
    }
}
