//! Log-ready report rows produced at the core's boundary.
//!
//! These are the shapes external reporters persist; column layout beyond the
//! fields here is the reporter's business.

use chrono::NaiveDate;

/// One arm's share of the current allocation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AllocationRow {
    pub run_date: NaiveDate,
    /// Arm index.
    pub arm: usize,
    /// Arm name, when requested.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub name: Option<String>,
    /// Trials assigned to this arm in the next batch.
    pub count: u64,
}

/// One arm's observed performance.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PerformanceRow {
    pub run_date: NaiveDate,
    pub arm: usize,
    pub name: String,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    /// Standard error of the mean.
    pub sem: f64,
}

/// One flattened observation, for exporting raw history.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DataRow {
    pub arm: usize,
    pub name: String,
    pub date: NaiveDate,
    pub value: f64,
}
