//! Crate-wide error type.
//!
//! Configuration errors surface at construction time; sampling errors are
//! fail-fast and surface from the underlying distribution primitives during
//! a cycle (malformed hyperparameters, never malformed data).

use thiserror::Error;

/// Errors produced by environment construction, policy configuration,
/// allocation parsing, sampling, and snapshot restore.
#[derive(Debug, Error)]
pub enum Error {
    /// Environment configured with an empty arm list.
    #[error("environment requires at least one arm")]
    NoArms,

    /// Naive policy constructed with neither `n_days` nor `n_pulls`.
    #[error("naive policy requires at least one of n_days / n_pulls")]
    NaiveNoThreshold,

    /// Naive policy asked to require both thresholds while one is unset.
    #[error("naive policy `both` requires n_days and n_pulls to both be set")]
    NaiveBothIncomplete,

    /// Allocation input whose length matches neither `k` (weights) nor
    /// `batch` (explicit assignment), or whose assignment entries fall
    /// outside `[0, k)`.
    #[error(
        "allocation input of length {got} is neither k={k} weights nor a valid batch={batch} assignment"
    )]
    BadAllocationInput { k: usize, batch: usize, got: usize },

    /// Weight vector with a non-positive (or non-finite) total.
    #[error("allocation weights must have a positive finite sum")]
    ZeroWeights,

    /// Per-arm collection whose length disagrees with the arm count.
    #[error("expected {expected} per-arm entries, got {got}")]
    ArmCountMismatch { expected: usize, got: usize },

    /// Registry lookup for an unknown policy name.
    #[error("unknown policy name: {0:?}")]
    UnknownPolicy(String),

    /// Registry lookup for an unknown arm-model name.
    #[error("unknown arm model name: {0:?}")]
    UnknownModel(String),

    /// A sampling primitive rejected its parameters (e.g. non-positive
    /// Beta/Gamma shape). Propagated as-is; the core does not clamp.
    #[error("sampling: {0}")]
    Sampling(String),

    /// Snapshot restore failed (version or shape mismatch). No partial
    /// recovery is attempted.
    #[error("snapshot: {0}")]
    Snapshot(String),
}
