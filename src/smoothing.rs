//! Moving-average elevation smoothing.
//!
//! The scanner decides climb boundaries on a smoothed copy of the elevation
//! series so that single-sample GPS/barometer noise does not flip the
//! gradient sign. Reported climb values still come from the raw series.
//!
//! The filter is a centered moving average that keeps the output
//! index-aligned with the input. Windows are truncated at either end and
//! divided by the number of samples they actually cover, so a constant
//! series stays constant.

/// Largest window the smoother will ever use.
pub const MAX_WINDOW: usize = 5;

/// Window size for a series of `len` samples: `min(5, len / 10)`.
#[inline]
pub fn window_size(len: usize) -> usize {
    MAX_WINDOW.min(len / 10)
}

/// Smooth an elevation series with the window chosen by [`window_size`].
///
/// Windows of 0 or 1 leave the series untouched.
///
/// # Example
/// ```
/// use climb_detector::smoothing::smooth_elevation;
///
/// // Too short to smooth (window = 0)
/// let raw = vec![100.0, 130.0, 170.0];
/// assert_eq!(smooth_elevation(&raw), raw);
/// ```
pub fn smooth_elevation(elevation_m: &[f64]) -> Vec<f64> {
    let window = window_size(elevation_m.len());
    if window <= 1 {
        return elevation_m.to_vec();
    }
    centered_moving_average(elevation_m, window)
}

/// Centered moving average with truncated edge windows.
///
/// Output `i` averages the input over
/// `[i + (w-1)/2 + 1 - w, i + (w-1)/2]` clipped to the series. For even
/// windows the extra sample falls on the left.
pub fn centered_moving_average(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    if window == 0 || n == 0 {
        return values.to_vec();
    }

    let right = (window - 1) / 2;
    let left = window - 1 - right;

    // Direct windowed sum (window <= MAX_WINDOW); no running sums
    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(left);
            let hi = (i + right).min(n - 1);
            let covered = &values[lo..=hi];
            covered.iter().sum::<f64>() / covered.len() as f64
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn assert_series(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
            assert!(approx_eq(*a, *e), "index {}: got {}, expected {}", i, a, e);
        }
    }

    #[test]
    fn test_window_size() {
        assert_eq!(window_size(0), 0);
        assert_eq!(window_size(9), 0);
        assert_eq!(window_size(19), 1);
        assert_eq!(window_size(20), 2);
        assert_eq!(window_size(45), 4);
        assert_eq!(window_size(50), 5);
        assert_eq!(window_size(10_000), 5);
    }

    #[test]
    fn test_short_series_unchanged() {
        let raw: Vec<f64> = (0..19).map(|i| 100.0 + i as f64 * 3.0).collect();
        assert_eq!(smooth_elevation(&raw), raw);
    }

    #[test]
    fn test_window_two_golden() {
        // 20 samples: window 2 averages [i-1, i]; the first output sees one sample
        let raw: Vec<f64> = (0..20).map(|i| 50.0 + (i * 10) as f64).collect();
        let smoothed = smooth_elevation(&raw);
        let mut expected = vec![50.0];
        expected.extend((1..20).map(|i| 50.0 + (((i - 1) * 10 + i * 10) as f64) / 2.0));
        assert_series(&smoothed, &expected);
    }

    #[test]
    fn test_window_five_golden_edges() {
        // 50-sample ramp: edge windows average only the samples they cover
        let raw: Vec<f64> = (0..50).map(|i| (i * 10) as f64).collect();
        let smoothed = smooth_elevation(&raw);
        assert_eq!(smoothed.len(), 50);
        assert!(approx_eq(smoothed[0], 10.0));
        assert!(approx_eq(smoothed[1], 15.0));
        assert!(approx_eq(smoothed[2], 20.0));
        assert!(approx_eq(smoothed[25], 250.0));
        assert!(approx_eq(smoothed[47], 470.0));
        assert!(approx_eq(smoothed[48], 475.0));
        assert!(approx_eq(smoothed[49], 480.0));
    }

    #[test]
    fn test_constant_series_stays_constant() {
        for len in [20, 35, 50, 400] {
            let raw = vec![2000.0; len];
            let smoothed = smooth_elevation(&raw);
            assert_series(&smoothed, &raw);
        }
    }

    #[test]
    fn test_window_four_is_left_biased() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let out = centered_moving_average(&values, 4);
        // Window covers [i-2, i+1]
        assert_series(
            &out,
            &[
                (1.0 + 2.0) / 2.0,
                (1.0 + 2.0 + 3.0) / 3.0,
                (1.0 + 2.0 + 3.0 + 4.0) / 4.0,
                (2.0 + 3.0 + 4.0 + 5.0) / 4.0,
                (3.0 + 4.0 + 5.0 + 6.0) / 4.0,
                (4.0 + 5.0 + 6.0) / 3.0,
            ],
        );
    }

    #[test]
    fn test_window_three_symmetric() {
        let values = [3.0, 6.0, 9.0, 12.0];
        let out = centered_moving_average(&values, 3);
        assert_series(&out, &[4.5, 6.0, 9.0, 10.5]);
    }

    #[test]
    fn test_preserves_length_and_purity() {
        let raw: Vec<f64> = (0..137).map(|i| ((i as f64) * 0.37).sin() * 40.0 + 300.0).collect();
        let a = smooth_elevation(&raw);
        let b = smooth_elevation(&raw);
        assert_eq!(a.len(), raw.len());
        assert_eq!(a, b);
    }
}
