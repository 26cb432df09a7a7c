//! Stateful bandit environment: the front door for most deployments.
//!
//! An [`Environment`] owns everything mutable — the arm names, one
//! append-only [`Series`] per arm, the active allocation, and the logical
//! clock — and drives the cycle loop:
//!
//! ```text
//! let counts = env.run_cycle(&new_data, CycleOptions::default())?;
//! publish(env.get_allocation(true, true));   // your code
//! ```
//!
//! Policies and models stay pure over passed-in data; the environment is the
//! single writer. It starts *empty* (initial equal or caller-supplied split)
//! and turns *active* the first time a cycle ingests any observation, after
//! which allocations are policy-driven.
//!
//! State is persistable: [`Environment::snapshot`] captures every field into
//! a versioned, serializable [`EnvironmentSnapshot`], and
//! [`Environment::from_snapshot`] restores it.

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::arm::ArmModel;
use crate::codec::{assignments_from_counts, equal_allocation, parse_allocation_counts, tally};
use crate::policy::{Policy, PolicyKind, PolicySpec, SelectContext};
use crate::report::{AllocationRow, DataRow, PerformanceRow};
use crate::series::{stats, Series};
use crate::{Error, DEFAULT_BATCH};

/// Initial allocation input, discriminated explicitly rather than by length.
///
/// `Weights` must have one entry per arm and is parsed via largest-remainder
/// apportionment; `Assignments` must have one arm index per batch position.
#[derive(Debug, Clone)]
pub enum AllocationInput {
    Weights(Vec<f64>),
    Assignments(Vec<usize>),
}

/// Configuration for [`Environment::new`].
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    /// Ordered arm names; length fixes `k`.
    pub arm_names: Vec<String>,
    /// Allocation policy configuration.
    pub policy: PolicySpec,
    /// Arm reward model (shared by all arms).
    pub model: ArmModel,
    /// Date the experiment started.
    pub start_date: NaiveDate,
    /// Initial logical "now"; defaults to `start_date`.
    pub run_date: Option<NaiveDate>,
    /// Sliding window in days for window-honoring policies.
    pub sliding_window: Option<u32>,
    /// Trials per cycle.
    pub batch: usize,
    /// Initial allocation; defaults to an equal split.
    pub allocation: Option<AllocationInput>,
    /// Pre-existing per-arm history (backfill), one series per arm.
    pub data: Option<Vec<Series>>,
    /// Human-readable label used in reports and logs.
    pub label: String,
}

impl EnvironmentConfig {
    pub fn new(
        arm_names: Vec<String>,
        policy: PolicySpec,
        model: ArmModel,
        start_date: NaiveDate,
    ) -> Self {
        Self {
            arm_names,
            policy,
            model,
            start_date,
            run_date: None,
            sliding_window: None,
            batch: DEFAULT_BATCH,
            allocation: None,
            data: None,
            label: "multi-armed bandit".to_string(),
        }
    }

    pub fn with_batch(mut self, batch: usize) -> Self {
        self.batch = batch;
        self
    }

    pub fn with_sliding_window(mut self, days: u32) -> Self {
        self.sliding_window = Some(days);
        self
    }

    pub fn with_run_date(mut self, run_date: NaiveDate) -> Self {
        self.run_date = Some(run_date);
        self
    }

    pub fn with_allocation(mut self, allocation: AllocationInput) -> Self {
        self.allocation = Some(allocation);
        self
    }

    pub fn with_data(mut self, data: Vec<Series>) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// Per-cycle options for [`Environment::run_cycle`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleOptions {
    /// Explicit new run date; overrides the advance rules.
    pub run_date: Option<NaiveDate>,
    /// Advance the clock by exactly one day (simulation mode).
    pub incremental: bool,
    /// Exclude arms with fewer observations from this cycle's selection.
    pub min_size: Option<usize>,
}

/// A single multi-armed bandit experiment over `k` arms.
#[derive(Debug, Clone)]
pub struct Environment {
    arm_names: Vec<String>,
    data: Vec<Series>,
    allocation: Vec<usize>,
    start_date: NaiveDate,
    run_date: NaiveDate,
    sliding_window: Option<u32>,
    batch: usize,
    policy_spec: PolicySpec,
    policy: PolicyKind,
    model: ArmModel,
    label: String,
}

impl Environment {
    /// Validate `cfg` and construct the environment.
    ///
    /// Configuration errors (no arms, mismatched backfill data, bad
    /// allocation input, naive-policy thresholds) surface here, never during
    /// a cycle.
    pub fn new(cfg: EnvironmentConfig) -> Result<Self, Error> {
        let k = cfg.arm_names.len();
        if k == 0 {
            return Err(Error::NoArms);
        }
        let batch = cfg.batch;

        let data = match cfg.data {
            Some(d) => {
                if d.len() != k {
                    return Err(Error::ArmCountMismatch {
                        expected: k,
                        got: d.len(),
                    });
                }
                d
            }
            None => vec![Series::new(); k],
        };

        let allocation = match cfg.allocation {
            None => assignments_from_counts(&equal_allocation(k, batch as u64)),
            Some(AllocationInput::Weights(w)) => {
                if w.len() != k {
                    return Err(Error::BadAllocationInput {
                        k,
                        batch,
                        got: w.len(),
                    });
                }
                assignments_from_counts(&parse_allocation_counts(&w, batch as u64)?)
            }
            Some(AllocationInput::Assignments(a)) => {
                if a.len() != batch || a.iter().any(|&i| i >= k) {
                    return Err(Error::BadAllocationInput {
                        k,
                        batch,
                        got: a.len(),
                    });
                }
                a
            }
        };

        let policy = cfg.policy.build()?;
        info!(
            label = %cfg.label,
            k,
            batch,
            policy = cfg.policy.name(),
            model = cfg.model.name(),
            "created bandit environment"
        );

        Ok(Self {
            arm_names: cfg.arm_names,
            data,
            allocation,
            start_date: cfg.start_date,
            run_date: cfg.run_date.unwrap_or(cfg.start_date),
            sliding_window: cfg.sliding_window,
            batch,
            policy_spec: cfg.policy,
            policy,
            model: cfg.model,
            label: cfg.label,
        })
    }

    /// Number of arms.
    pub fn k(&self) -> usize {
        self.arm_names.len()
    }

    pub fn arm_names(&self) -> &[String] {
        &self.arm_names
    }

    /// Per-arm observation history.
    pub fn data(&self) -> &[Series] {
        &self.data
    }

    /// The active assignment vector (arm index per batch position).
    pub fn allocation(&self) -> &[usize] {
        &self.allocation
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    /// The environment's logical "now".
    pub fn run_date(&self) -> NaiveDate {
        self.run_date
    }

    pub fn sliding_window(&self) -> Option<u32> {
        self.sliding_window
    }

    pub fn batch(&self) -> usize {
        self.batch
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// True while no arm has any observation.
    pub fn data_empty(&self) -> bool {
        self.data.iter().all(|s| s.is_empty())
    }

    /// Grow the experiment by one arm.
    ///
    /// Existing history and the active allocation are untouched; the new arm
    /// receives no traffic until the next cycle's selection considers it.
    pub fn add_arm(&mut self, name: impl Into<String>, data: Option<Series>) {
        let name = name.into();
        info!(label = %self.label, arm = %name, "adding arm");
        self.arm_names.push(name);
        self.data.push(data.unwrap_or_default());
    }

    /// Run one cycle: ingest `new_data`, recompute the allocation, advance
    /// the clock, and return the new per-arm counts.
    ///
    /// `new_data` must have one entry per arm (an empty vector means no new
    /// observations for that arm this cycle). While the environment has no
    /// data at all, the existing allocation is retained instead of calling
    /// the policy.
    ///
    /// The clock advances to `opts.run_date` when given; otherwise by one
    /// day when `opts.incremental`; otherwise to one day past the latest
    /// observed date across all arms.
    pub fn run_cycle(
        &mut self,
        new_data: &[Vec<(NaiveDate, f64)>],
        opts: CycleOptions,
    ) -> Result<Vec<u64>, Error> {
        if new_data.len() != self.k() {
            return Err(Error::ArmCountMismatch {
                expected: self.k(),
                got: new_data.len(),
            });
        }

        let appended: usize = new_data.iter().map(Vec::len).sum();
        for (series, batch) in self.data.iter_mut().zip(new_data) {
            series.extend(batch.iter().copied());
        }

        if !self.data_empty() {
            self.allocation = self.calculate_allocation(opts.min_size)?;
        }
        self.update_run_date(opts.run_date, opts.incremental);

        let counts = tally(&self.allocation, self.k());
        debug!(
            label = %self.label,
            run_date = %self.run_date,
            appended,
            "cycle complete"
        );
        Ok(counts)
    }

    /// Recompute the allocation from the current data without ingesting or
    /// advancing the clock.
    ///
    /// With `min_size`, arms below the observation threshold are excluded:
    /// survivors are remapped to a contiguous index range for the policy and
    /// the chosen indices are mapped back afterward. Positions of the
    /// previous allocation that point at excluded arms are reassigned
    /// round-robin across survivors for the policy call. If no arm survives,
    /// the current allocation is kept.
    pub fn calculate_allocation(&mut self, min_size: Option<usize>) -> Result<Vec<usize>, Error> {
        match min_size {
            None => {
                let refs: Vec<&Series> = self.data.iter().collect();
                let ctx = SelectContext {
                    k: self.arm_names.len(),
                    model: &self.model,
                    data: &refs,
                    previous: &self.allocation,
                    start_date: self.start_date,
                    run_date: self.run_date,
                    sliding_window: self.sliding_window,
                    batch: self.batch,
                };
                self.policy.select_arm(&ctx)
            }
            Some(min) => {
                let surviving: Vec<usize> = (0..self.arm_names.len())
                    .filter(|&i| self.data[i].len() >= min)
                    .collect();
                if surviving.is_empty() {
                    return Ok(self.allocation.clone());
                }

                let filtered: Vec<&Series> = surviving.iter().map(|&i| &self.data[i]).collect();
                let mut to_filtered = vec![usize::MAX; self.arm_names.len()];
                for (fi, &oi) in surviving.iter().enumerate() {
                    to_filtered[oi] = fi;
                }
                let mut rr = 0usize;
                let previous: Vec<usize> = self
                    .allocation
                    .iter()
                    .map(|&oi| {
                        if to_filtered[oi] != usize::MAX {
                            to_filtered[oi]
                        } else {
                            rr += 1;
                            (rr - 1) % surviving.len()
                        }
                    })
                    .collect();

                let ctx = SelectContext {
                    k: surviving.len(),
                    model: &self.model,
                    data: &filtered,
                    previous: &previous,
                    start_date: self.start_date,
                    run_date: self.run_date,
                    sliding_window: self.sliding_window,
                    batch: self.batch,
                };
                let chosen = self.policy.select_arm(&ctx)?;
                Ok(chosen.into_iter().map(|fi| surviving[fi]).collect())
            }
        }
    }

    /// Advance the logical clock.
    ///
    /// Explicit date wins; `incremental` adds one day; otherwise the clock
    /// moves to one day past the latest observation (or one day forward when
    /// there is none).
    pub fn update_run_date(&mut self, run_date: Option<NaiveDate>, incremental: bool) {
        if let Some(d) = run_date {
            self.run_date = d;
            return;
        }
        if incremental {
            self.run_date = next_day(self.run_date);
            return;
        }
        self.run_date = match self.data.iter().filter_map(Series::max_date).max() {
            Some(max_date) => next_day(max_date),
            None => next_day(self.run_date),
        };
    }

    /// Per-arm counts of the current allocation, optionally sorted by count
    /// descending and optionally carrying arm names.
    pub fn get_allocation(&self, sort: bool, names: bool) -> Vec<AllocationRow> {
        let counts = tally(&self.allocation, self.k());
        let mut rows: Vec<AllocationRow> = counts
            .iter()
            .enumerate()
            .map(|(i, &count)| AllocationRow {
                run_date: self.run_date,
                arm: i,
                name: names.then(|| self.arm_names[i].clone()),
                count,
            })
            .collect();
        if sort {
            rows.sort_by(|a, b| b.count.cmp(&a.count));
        }
        rows
    }

    /// Per-arm observed performance (count / mean / std / standard error).
    ///
    /// With `sliding_window = true` and a configured window, statistics are
    /// restricted to the window; full history otherwise. `min_size` drops
    /// arms below the count threshold. `sort` orders by count, then mean,
    /// descending.
    pub fn get_performance(
        &self,
        sliding_window: bool,
        min_size: Option<usize>,
        sort: bool,
    ) -> Vec<PerformanceRow> {
        let mut rows = Vec::with_capacity(self.k());
        for (i, s) in self.data.iter().enumerate() {
            let st = match (sliding_window, self.sliding_window) {
                (true, Some(days)) => stats(&s.window_values(self.run_date, days)),
                _ => s.stats(),
            };
            if min_size.is_some_and(|m| st.count < m) {
                continue;
            }
            rows.push(PerformanceRow {
                run_date: self.run_date,
                arm: i,
                name: self.arm_names[i].clone(),
                count: st.count,
                mean: st.mean,
                std: st.std,
                sem: st.sem,
            });
        }
        if sort {
            rows.sort_by(|a, b| {
                b.count
                    .cmp(&a.count)
                    .then_with(|| b.mean.total_cmp(&a.mean))
            });
        }
        rows
    }

    /// Flatten the full history into export rows.
    pub fn rows(&self) -> Vec<DataRow> {
        let mut out = Vec::new();
        for (i, s) in self.data.iter().enumerate() {
            for (date, value) in s.iter() {
                out.push(DataRow {
                    arm: i,
                    name: self.arm_names[i].clone(),
                    date,
                    value,
                });
            }
        }
        out
    }
}

fn next_day(d: NaiveDate) -> NaiveDate {
    d.succ_opt().unwrap_or(d)
}

// ============================================================================
// Snapshot / persistence
// ============================================================================

/// Current snapshot schema version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// A serializable snapshot of [`Environment`] state.
///
/// The snapshot lists every persistent field explicitly (no opaque blobs), so
/// it can be diffed and migrated across schema versions. Policy and model are
/// stored as their specs — registry name plus hyperparameters plus seed —
/// and rebuilt on restore; live RNG state is not carried.
///
/// # Persistence pattern
///
/// ```rust
/// # #[cfg(feature = "serde")]
/// # {
/// use armsplit::{ArmModel, Environment, EnvironmentConfig, PolicySpec};
/// use chrono::NaiveDate;
///
/// let cfg = EnvironmentConfig::new(
///     vec!["a".into(), "b".into()],
///     PolicySpec::Bayesian { seed: 0 },
///     ArmModel::from_name("binomial").unwrap(),
///     NaiveDate::from_ymd_opt(2017, 4, 1).unwrap(),
/// );
/// let env = Environment::new(cfg).unwrap();
///
/// // Save:
/// let json = serde_json::to_string(&env.snapshot()).unwrap();
///
/// // Restore:
/// let snap: armsplit::EnvironmentSnapshot = serde_json::from_str(&json).unwrap();
/// let env2 = Environment::from_snapshot(snap).unwrap();
/// assert_eq!(env2.k(), 2);
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnvironmentSnapshot {
    pub version: u32,
    pub label: String,
    pub arm_names: Vec<String>,
    pub data: Vec<Series>,
    pub allocation: Vec<usize>,
    pub start_date: NaiveDate,
    pub run_date: NaiveDate,
    pub sliding_window: Option<u32>,
    pub batch: usize,
    pub policy: PolicySpec,
    pub model: ArmModel,
}

impl Environment {
    /// Capture a snapshot of the current state.
    pub fn snapshot(&self) -> EnvironmentSnapshot {
        EnvironmentSnapshot {
            version: SNAPSHOT_VERSION,
            label: self.label.clone(),
            arm_names: self.arm_names.clone(),
            data: self.data.clone(),
            allocation: self.allocation.clone(),
            start_date: self.start_date,
            run_date: self.run_date,
            sliding_window: self.sliding_window,
            batch: self.batch,
            policy: self.policy_spec.clone(),
            model: self.model,
        }
    }

    /// Restore an [`Environment`] from a snapshot.
    ///
    /// Shape and version are validated up front; corrupt or incompatible
    /// snapshots fail with [`Error::Snapshot`] and nothing is partially
    /// restored.
    pub fn from_snapshot(snap: EnvironmentSnapshot) -> Result<Self, Error> {
        if snap.version != SNAPSHOT_VERSION {
            return Err(Error::Snapshot(format!(
                "unsupported snapshot version {} (expected {})",
                snap.version, SNAPSHOT_VERSION
            )));
        }
        let k = snap.arm_names.len();
        if k == 0 {
            return Err(Error::Snapshot("snapshot has no arms".to_string()));
        }
        if snap.data.len() != k {
            return Err(Error::Snapshot(format!(
                "{} data series for {} arms",
                snap.data.len(),
                k
            )));
        }
        if snap.allocation.len() != snap.batch || snap.allocation.iter().any(|&i| i >= k) {
            return Err(Error::Snapshot(
                "allocation does not match batch size / arm count".to_string(),
            ));
        }
        let policy = snap
            .policy
            .build()
            .map_err(|e| Error::Snapshot(e.to_string()))?;

        info!(label = %snap.label, k, "restored bandit environment from snapshot");
        Ok(Self {
            arm_names: snap.arm_names,
            data: snap.data,
            allocation: snap.allocation,
            start_date: snap.start_date,
            run_date: snap.run_date,
            sliding_window: snap.sliding_window,
            batch: snap.batch,
            policy_spec: snap.policy,
            policy,
            model: snap.model,
            label: snap.label,
        })
    }
}
