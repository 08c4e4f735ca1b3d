//! Percentile rank and quantile over a population.
//!
//! Percentile rank of a value is its 1-based average rank divided by the
//! population size. Tied values share the mean of the ranks they occupy,
//! so three values tied for ranks 2, 3 and 4 each get rank 3. The largest
//! value always has percentile rank 1.0; a single-element population ranks
//! 1.0.
//!
//! Quantiles interpolate linearly between the two nearest order statistics
//! at position `q * (n - 1)`.

/// Percentile rank of every value, in input order.
pub fn percentile_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut ranks = vec![0.0; n];
    if n == 0 {
        return ranks;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut start = 0;
    while start < n {
        let mut end = start + 1;
        while end < n && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // Positions start..end hold ranks start+1 ..= end
        let average_rank = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = average_rank / n as f64;
        }
        start = end;
    }
    ranks
}

/// Value at quantile `q` (0.0 - 1.0) with linear interpolation.
///
/// Returns `None` for an empty population.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-12, "{:?} != {:?}", actual, expected);
        }
    }

    #[test]
    fn test_distinct_values() {
        assert_close(&percentile_ranks(&[30.0, 10.0, 20.0, 40.0]), &[0.75, 0.25, 0.5, 1.0]);
    }

    #[test]
    fn test_average_rank_ties() {
        // Ranks 1 | 2,3,4 tied -> 3 | 5
        assert_close(
            &percentile_ranks(&[1.0, 5.0, 5.0, 5.0, 9.0]),
            &[0.2, 0.6, 0.6, 0.6, 1.0],
        );
        // Two-way tie at the top shares ranks 3 and 4
        assert_close(&percentile_ranks(&[0.0, 1.0, 2.0, 2.0]), &[0.25, 0.5, 0.875, 0.875]);
    }

    #[test]
    fn test_all_equal() {
        // Everyone shares ranks 1..=4 -> 2.5 / 4
        assert_close(&percentile_ranks(&[0.0; 4]), &[0.625; 4]);
    }

    #[test]
    fn test_single_and_empty() {
        assert_close(&percentile_ranks(&[3.7]), &[1.0]);
        assert!(percentile_ranks(&[]).is_empty());
    }

    #[test]
    fn test_quantile_interpolation() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(quantile(&values, 0.5), Some(3.0));
        // position 0.8 * 4 = 3.2 -> 4 + 0.2 * (5 - 4)
        assert!((quantile(&values, 0.8).unwrap() - 4.2).abs() < 1e-12);
        assert_eq!(quantile(&values, 0.0), Some(1.0));
        assert_eq!(quantile(&values, 1.0), Some(5.0));

        // Unsorted input
        assert!((quantile(&[4.0, 1.0, 3.0, 2.0], 0.8).unwrap() - 3.4).abs() < 1e-12);
    }

    #[test]
    fn test_quantile_edge_cases() {
        assert_eq!(quantile(&[], 0.8), None);
        assert_eq!(quantile(&[2.5], 0.8), Some(2.5));
        assert_eq!(quantile(&[7.0, 7.0, 7.0], 0.8), Some(7.0));
    }
}
