//! Sample indices at a fixed spacing along a track.

/// Indices of the first samples at or beyond 0, `interval_m`, 2·`interval_m`, ...
///
/// `distance_m` is cumulative distance in meters. Targets run up to the
/// total plus one metre. Each target maps to the first index whose distance
/// is not below it, clamped into range. The result is sorted and unique.
/// A track with no positive length yields `[0]`. Positive intervals below
/// one metre are raised to one metre.
///
/// # Example
/// ```
/// use climb_detector::sampling::sample_indices_along_distance;
///
/// let distance_m = [0.0, 300.0, 600.0, 900.0, 1200.0];
/// assert_eq!(sample_indices_along_distance(&distance_m, 500.0), vec![0, 2, 4]);
/// ```
pub fn sample_indices_along_distance(distance_m: &[f64], interval_m: f64) -> Vec<usize> {
    let total = distance_m.last().copied().unwrap_or(0.0);
    if distance_m.is_empty() || total <= 0.0 || !(interval_m > 0.0) {
        return vec![0];
    }

    let interval_m = interval_m.max(1.0);
    let last = distance_m.len() - 1;
    let limit = total + 1.0;
    let mut indices = Vec::new();
    let mut step = 0usize;
    loop {
        let target = step as f64 * interval_m;
        if target > limit {
            break;
        }
        let idx = distance_m.partition_point(|&d| d < target).min(last);
        indices.push(idx);
        step += 1;
    }

    indices.sort_unstable();
    indices.dedup();
    indices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_length_track() {
        assert_eq!(sample_indices_along_distance(&[0.0, 0.0, 0.0], 500.0), vec![0]);
        assert_eq!(sample_indices_along_distance(&[], 500.0), vec![0]);
    }

    #[test]
    fn test_targets_clamp_to_last_index() {
        // 1001 m total: targets 0, 500, 1000
        let distance_m = [0.0, 400.0, 800.0, 1001.0];
        assert_eq!(sample_indices_along_distance(&distance_m, 500.0), vec![0, 2, 3]);

        // Targets beyond the last sample clamp to it
        let distance_m = [0.0, 100.0, 999.5];
        assert_eq!(sample_indices_along_distance(&distance_m, 500.0), vec![0, 2]);
    }

    #[test]
    fn test_dense_interval_deduplicates() {
        let distance_m = [0.0, 1000.0, 2000.0];
        let indices = sample_indices_along_distance(&distance_m, 100.0);
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_tiny_interval_is_bounded() {
        let distance_m = [0.0, 2.0, 4.0];
        assert_eq!(sample_indices_along_distance(&distance_m, 1e-9), vec![0, 1, 2]);
    }

    #[test]
    fn test_non_positive_interval() {
        assert_eq!(sample_indices_along_distance(&[0.0, 10.0], 0.0), vec![0]);
    }
}
