//! Allocation codec: deterministic conversions between weight vectors,
//! per-arm counts, and batch assignment vectors.
//!
//! These are pure functions with stable tie-breaks, so the same inputs always
//! produce the same split.

use crate::Error;

/// Split `batch` trials equally across `k` arms.
///
/// Every arm gets `batch / k`; the first `batch % k` arms (by index) get one
/// extra unit. The result sums to `batch` with `max - min <= 1`.
pub fn equal_allocation(k: usize, batch: u64) -> Vec<u64> {
    if k == 0 {
        return Vec::new();
    }
    let base = batch / k as u64;
    let rem = (batch % k as u64) as usize;
    (0..k)
        .map(|i| base + u64::from(i < rem))
        .collect()
}

/// Apportion `units` across arms proportionally to `weights` using the
/// largest-remainder (Hamilton) method.
///
/// Each arm gets the floor of its exact proportional share; the shortfall is
/// handed out one unit at a time to the arms with the largest fractional
/// remainders, ties broken by original index order.
///
/// Fails with [`Error::ZeroWeights`] when the weight sum is not positive and
/// finite.
pub fn parse_allocation_counts(weights: &[f64], units: u64) -> Result<Vec<u64>, Error> {
    let total: f64 = weights.iter().sum();
    if !total.is_finite() || total <= 0.0 {
        return Err(Error::ZeroWeights);
    }

    let exact: Vec<f64> = weights.iter().map(|w| w / total * units as f64).collect();
    let mut counts: Vec<u64> = exact.iter().map(|x| x.floor() as u64).collect();
    let assigned: u64 = counts.iter().sum();

    let mut order: Vec<usize> = (0..weights.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = exact[a] - exact[a].floor();
        let rb = exact[b] - exact[b].floor();
        rb.total_cmp(&ra)
    });

    let shortfall = units.saturating_sub(assigned) as usize;
    for &i in order.iter().cycle().take(shortfall) {
        counts[i] += 1;
    }
    Ok(counts)
}

/// Parse relative weights (or percentages) into an allocation of size
/// `batch`, optionally keeping `precision` decimal places.
///
/// With `precision = 0` the result is a vector of whole counts; with
/// `precision > 0` the apportionment runs at `batch * 10^precision`
/// resolution and the result is scaled back to fractional allocations.
///
/// # Example
///
/// ```rust
/// use armsplit::parse_allocation;
///
/// let a = parse_allocation(&[0.3, 0.53, 0.17], 100, 0).unwrap();
/// assert_eq!(a.iter().sum::<f64>(), 100.0);
/// assert_eq!(a, vec![30.0, 53.0, 17.0]);
/// ```
pub fn parse_allocation(weights: &[f64], batch: u64, precision: u32) -> Result<Vec<f64>, Error> {
    let scale = 10u64.pow(precision);
    let counts = parse_allocation_counts(weights, batch * scale)?;
    if precision == 0 {
        Ok(counts.into_iter().map(|c| c as f64).collect())
    } else {
        let s = scale as f64;
        Ok(counts.into_iter().map(|c| c as f64 / s).collect())
    }
}

/// Expand per-arm counts into a batch assignment vector (arm index per
/// trial), in arm-index order: `[3, 2]` becomes `[0, 0, 0, 1, 1]`.
pub fn assignments_from_counts(counts: &[u64]) -> Vec<usize> {
    let mut out = Vec::with_capacity(counts.iter().sum::<u64>() as usize);
    for (i, &c) in counts.iter().enumerate() {
        out.extend(std::iter::repeat(i).take(c as usize));
    }
    out
}

/// Tally a batch assignment vector into per-arm counts of length `k`.
pub fn tally(assignments: &[usize], k: usize) -> Vec<u64> {
    let mut counts = vec![0u64; k];
    for &i in assignments {
        if let Some(c) = counts.get_mut(i) {
            *c += 1;
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_allocation_distributes_remainder_by_index() {
        assert_eq!(equal_allocation(3, 10), vec![4, 3, 3]);
        assert_eq!(equal_allocation(4, 8), vec![2, 2, 2, 2]);
        assert_eq!(equal_allocation(5, 3), vec![1, 1, 1, 0, 0]);
        assert!(equal_allocation(0, 10).is_empty());
    }

    #[test]
    fn parse_allocation_matches_hand_computed_split() {
        // Shares: 1.25, 1.25, 2.5 → floors 1,1,2, leftover unit to the
        // largest remainder.
        let a = parse_allocation(&[1.0, 1.0, 2.0], 5, 0).unwrap();
        assert_eq!(a, vec![1.0, 1.0, 3.0]);
    }

    #[test]
    fn parse_allocation_breaks_remainder_ties_by_index() {
        // Shares 1.5 / 1.5: the lower index wins the leftover unit.
        let a = parse_allocation(&[1.0, 1.0], 3, 0).unwrap();
        assert_eq!(a, vec![2.0, 1.0]);
    }

    #[test]
    fn parse_allocation_precision_scales_back() {
        // 10000 hundredth-units over 3 arms: 3334, 3333, 3333.
        let a = parse_allocation(&[1.0, 1.0, 1.0], 100, 2).unwrap();
        assert_eq!(a, vec![33.34, 33.33, 33.33]);
        assert!((a.iter().sum::<f64>() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn parse_allocation_rejects_zero_weights() {
        assert!(matches!(
            parse_allocation(&[0.0, 0.0], 100, 0),
            Err(Error::ZeroWeights)
        ));
        assert!(matches!(
            parse_allocation(&[], 100, 0),
            Err(Error::ZeroWeights)
        ));
    }

    #[test]
    fn assignments_and_tally_round_trip() {
        let counts = vec![3, 0, 2];
        let assignments = assignments_from_counts(&counts);
        assert_eq!(assignments, vec![0, 0, 0, 2, 2]);
        assert_eq!(tally(&assignments, 3), counts);
    }
}
