//! Whole-route aggregates over the raw series.

use serde::{Deserialize, Serialize};

/// Totals for a route, independent of detected climbs.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct RouteSummary {
    /// Last cumulative distance value
    pub total_distance_km: f64,
    /// Sum of positive raw elevation steps
    pub elevation_gain_m: f64,
    pub max_elevation_m: f64,
    pub min_elevation_m: f64,
}

/// Summarise a route. Empty input yields an all-zero summary.
pub fn summarize_route(distance_km: &[f64], elevation_m: &[f64]) -> RouteSummary {
    let total_distance_km = distance_km.last().copied().unwrap_or(0.0);

    if elevation_m.is_empty() {
        return RouteSummary {
            total_distance_km,
            ..RouteSummary::default()
        };
    }

    let elevation_gain_m = elevation_m
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|diff| *diff > 0.0)
        .sum();

    let (min_elevation_m, max_elevation_m) = elevation_m
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &e| {
            (lo.min(e), hi.max(e))
        });

    RouteSummary {
        total_distance_km,
        elevation_gain_m,
        max_elevation_m,
        min_elevation_m,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_route() {
        assert_eq!(summarize_route(&[], &[]), RouteSummary::default());
    }

    #[test]
    fn test_gain_counts_only_rises() {
        let summary = summarize_route(
            &[0.0, 1.0, 2.0, 3.0, 4.0],
            &[100.0, 130.0, 170.0, 220.0, 215.0],
        );
        assert_eq!(summary.total_distance_km, 4.0);
        assert!((summary.elevation_gain_m - 120.0).abs() < 1e-9);
        assert_eq!(summary.max_elevation_m, 220.0);
        assert_eq!(summary.min_elevation_m, 100.0);
    }

    #[test]
    fn test_rolling_route() {
        let summary = summarize_route(&[0.0, 1.0, 2.0, 3.0], &[50.0, 40.0, 60.0, 55.0]);
        assert!((summary.elevation_gain_m - 20.0).abs() < 1e-9);
        assert_eq!(summary.min_elevation_m, 40.0);
        assert_eq!(summary.max_elevation_m, 60.0);
    }

    #[test]
    fn test_single_sample() {
        let summary = summarize_route(&[0.0], &[321.0]);
        assert_eq!(summary.elevation_gain_m, 0.0);
        assert_eq!(summary.max_elevation_m, 321.0);
        assert_eq!(summary.min_elevation_m, 321.0);
    }
}
