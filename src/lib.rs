//! `armsplit`: batch-allocation multi-armed bandit primitives.
//!
//! Designed for the recurring split decision: you have a small set of arms
//! (publishers, creatives, variants — anything you route trials to in
//! batches) and noisy, time-stamped reward observations arriving after the
//! fact. Each cycle, `armsplit` turns the accumulated history into a new
//! allocation of the next batch across arms, balancing reward against
//! learning which arm is best.
//!
//! **Goals:**
//! - **Reproducible by default**: every stochastic component is seedable and
//!   constructs with a fixed seed, so the same history + config → the same
//!   allocation.
//! - **Non-stationarity friendly**: optional sliding-window filtering keeps
//!   decisions anchored to recent observations, not lifetime averages.
//! - **Single writer**: [`Environment`] owns all mutable state; arm models
//!   and policies are pure over passed-in data.
//! - **Small K**: designed for a handful of arms and daily-ish cycles, not
//!   K in the hundreds or per-request routing.
//!
//! **Arm models** ([`ArmModel`], all conjugate):
//! - [`BinomialArm`]: beta-binomial for 0/1 rewards (conversion, retention).
//! - [`NormalArm`]: normal-inverse-gamma for real-valued rewards.
//! - [`LogNormalArm`]: normal-inverse-gamma on log rewards (revenue-like).
//!
//! **Policies** ([`PolicySpec`] / [`PolicyKind`]):
//! - [`BayesianPolicy`]: Thompson sampling through the arm model.
//! - [`EpsilonGreedyPolicy`]: explore with probability epsilon.
//! - [`NaivePolicy`]: A/B test — hold, then commit to the winner.
//! - [`RandomPolicy`]: uniform baseline.
//!
//! **Harness**: [`Experiment`] runs environments in lock-step against a
//! known [`GroundTruth`] and logs per-cycle [`RegretRecord`]s (simulation
//! only).
//!
//! # Example
//!
//! ```rust
//! use armsplit::{ArmModel, CycleOptions, Environment, EnvironmentConfig, PolicySpec};
//! use chrono::NaiveDate;
//!
//! let start = NaiveDate::from_ymd_opt(2017, 4, 1).unwrap();
//! let cfg = EnvironmentConfig::new(
//!     vec!["pub_a".into(), "pub_b".into()],
//!     PolicySpec::from_name("bayesian").unwrap(),
//!     ArmModel::from_name("binomial").unwrap(),
//!     start,
//! )
//! .with_batch(100);
//! let mut env = Environment::new(cfg).unwrap();
//!
//! // One cycle of observed outcomes per arm: (date, reward) pairs.
//! let day1 = start.succ_opt().unwrap();
//! let new_data = vec![
//!     vec![(day1, 1.0), (day1, 0.0), (day1, 1.0)],
//!     vec![(day1, 0.0)],
//! ];
//! let counts = env.run_cycle(&new_data, CycleOptions::default()).unwrap();
//! assert_eq!(counts.iter().sum::<u64>(), 100);
//! ```
//!
//! **Non-goals:** no data-warehouse querying, no scheduling, no distributed
//! execution — this is a single-process decision computation over an
//! in-memory history snapshot. Persistence is a serializable
//! [`EnvironmentSnapshot`]; moving bytes is the caller's business.

#![forbid(unsafe_code)]

mod arm;
pub use arm::*;

mod codec;
pub use codec::*;

mod environment;
pub use environment::*;

mod error;
pub use error::*;

mod experiment;
pub use experiment::*;

mod policy;
pub use policy::*;

mod posterior;
pub use posterior::*;

mod report;
pub use report::*;

mod series;
pub use series::*;

/// Default batch size when none is configured.
pub const DEFAULT_BATCH: usize = 1000;

pub const ARMSPLIT_VERSION: &str = env!("CARGO_PKG_VERSION");
