//! Scalar reductions over pixel samples.

/// Percentile `p` (0-100) of `values`, interpolating linearly between the
/// closest ranks. Returns `None` for an empty sample.
///
/// NaN samples sort last under `total_cmp`; callers pass only valid
/// (unmasked) values.
pub fn percentile(values: &[f32], p: f64) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable_by(|a, b| a.total_cmp(b));
    Some(percentile_of_sorted(&sorted, p))
}

/// Percentile of an already sorted, non-empty sample.
pub(crate) fn percentile_of_sorted(sorted: &[f32], p: f64) -> f32 {
    let last = sorted.len() - 1;
    let rank = (p.clamp(0.0, 100.0) / 100.0) * last as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let frac = rank - lo as f64;
    let (a, b) = (sorted[lo] as f64, sorted[hi] as f64);
    (a + (b - a) * frac) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::assert_approx_eq;

    #[test]
    fn test_percentile_interpolates() {
        let values = [4.0, 1.0, 3.0, 2.0, 5.0];
        assert_eq!(percentile(&values, 0.0), Some(1.0));
        assert_eq!(percentile(&values, 50.0), Some(3.0));
        assert_eq!(percentile(&values, 100.0), Some(5.0));
        // rank 0.1 between 1 and 2
        assert_approx_eq!(percentile(&values, 2.5).unwrap(), 1.1, 1e-6);
        // rank 2.8 between 3 and 4
        assert_approx_eq!(percentile(&values, 70.0).unwrap(), 3.8, 1e-6);
    }

    #[test]
    fn test_percentile_single_and_empty() {
        assert_eq!(percentile(&[0.97], 2.5), Some(0.97));
        assert_eq!(percentile(&[], 2.5), None);
    }
}
