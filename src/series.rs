//! Append-only, date-indexed observation series.
//!
//! One [`Series`] holds the full reward history for one arm: entries are
//! only ever appended, never removed or reordered. The environment owns its
//! series exclusively; policies see either the full value history or a
//! sliding-window view of it.

use chrono::{Days, NaiveDate};

/// A time-indexed ordered sequence of observed rewards.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Series {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl Series {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a series from (date, reward) pairs, preserving order.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        let mut s = Self::new();
        s.extend(pairs);
        s
    }

    /// Append one observation.
    pub fn push(&mut self, date: NaiveDate, value: f64) {
        self.dates.push(date);
        self.values.push(value);
    }

    /// Append a batch of observations, preserving order.
    pub fn extend<I>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        for (date, value) in pairs {
            self.push(date, value);
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Iterate (date, reward) pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.dates.iter().copied().zip(self.values.iter().copied())
    }

    /// Latest observation date, if any.
    pub fn max_date(&self) -> Option<NaiveDate> {
        self.dates.iter().max().copied()
    }

    /// Rewards observed on or after `run_date - window_days`.
    pub fn window_values(&self, run_date: NaiveDate, window_days: u32) -> Vec<f64> {
        let Some(cutoff) = run_date.checked_sub_days(Days::new(u64::from(window_days))) else {
            return self.values.clone();
        };
        self.iter()
            .filter(|(d, _)| *d >= cutoff)
            .map(|(_, v)| v)
            .collect()
    }

    /// Summary statistics over the full history.
    pub fn stats(&self) -> SeriesStats {
        stats(&self.values)
    }
}

/// Count / mean / sample standard deviation / standard error for one arm.
///
/// `mean` is NaN for an empty slice; `std` and `sem` are NaN below two
/// observations.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SeriesStats {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub sem: f64,
}

/// Compute [`SeriesStats`] over a reward slice.
pub fn stats(values: &[f64]) -> SeriesStats {
    let count = values.len();
    if count == 0 {
        return SeriesStats {
            count,
            mean: f64::NAN,
            std: f64::NAN,
            sem: f64::NAN,
        };
    }
    let n = count as f64;
    let mean = values.iter().sum::<f64>() / n;
    if count < 2 {
        return SeriesStats {
            count,
            mean,
            std: f64::NAN,
            sem: f64::NAN,
        };
    }
    let ssd = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
    let std = (ssd / (n - 1.0)).sqrt();
    SeriesStats {
        count,
        mean,
        std,
        sem: std / n.sqrt(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2017, 4, day).unwrap()
    }

    #[test]
    fn push_preserves_order_and_counts() {
        let mut s = Series::new();
        s.push(d(1), 1.0);
        s.push(d(3), 2.0);
        s.push(d(2), 3.0);
        assert_eq!(s.len(), 3);
        assert_eq!(s.values(), &[1.0, 2.0, 3.0]);
        assert_eq!(s.max_date(), Some(d(3)));
    }

    #[test]
    fn window_filter_is_inclusive_of_cutoff() {
        let s = Series::from_pairs([(d(1), 1.0), (d(5), 2.0), (d(10), 3.0)]);
        // run_date = 12, window = 7 → cutoff = day 5 inclusive.
        assert_eq!(s.window_values(d(12), 7), vec![2.0, 3.0]);
        // A 10-day-old point falls out of a 7-day window.
        assert_eq!(s.window_values(d(11), 7), vec![2.0, 3.0]);
        assert_eq!(s.window_values(d(20), 7), vec![] as Vec<f64>);
    }

    #[test]
    fn stats_match_hand_computed_values() {
        let st = stats(&[2.0, 4.0, 6.0]);
        assert_eq!(st.count, 3);
        assert_eq!(st.mean, 4.0);
        assert!((st.std - 2.0).abs() < 1e-12);
        assert!((st.sem - 2.0 / 3f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn stats_degenerate_cases_are_nan() {
        assert!(stats(&[]).mean.is_nan());
        let one = stats(&[5.0]);
        assert_eq!(one.mean, 5.0);
        assert!(one.std.is_nan());
        assert!(one.sem.is_nan());
    }
}
