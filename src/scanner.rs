//! Single-pass climb scanner.
//!
//! Walks consecutive sample pairs of the smoothed elevation series with a
//! two-state machine ([`ScanState`]). A climb opens on the first step whose
//! gradient is strictly above `min_gradient_pct` and closes on the first
//! strictly negative gradient after it. The opening index is the *later*
//! sample of the opening step, so a climb starts one sample after the rise
//! begins.
//!
//! Spans only carry indices and the smoothed gain; the detector turns them
//! into [`Climb`](crate::Climb) records against the raw series.

use crate::detector::DetectionConfig;
use crate::smoothing::smooth_elevation;

/// Scanner state between two steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScanState {
    Flat,
    Climbing {
        start_index: usize,
        /// Smoothed elevation at `start_index`
        start_elevation: f64,
    },
}

/// A climb that has just been closed but not yet qualified.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosedClimb {
    pub start_index: usize,
    pub start_elevation: f64,
    pub end_index: usize,
}

impl ScanState {
    /// Advance by one step ending at sample `index`.
    ///
    /// `elevation` is the smoothed elevation at `index`. Returns the next
    /// state and, when the step closes a climb, the closed span.
    pub fn step(
        self,
        index: usize,
        gradient_pct: f64,
        elevation: f64,
        min_gradient_pct: f64,
    ) -> (ScanState, Option<ClosedClimb>) {
        match self {
            ScanState::Flat if gradient_pct > min_gradient_pct => (
                ScanState::Climbing {
                    start_index: index,
                    start_elevation: elevation,
                },
                None,
            ),
            ScanState::Climbing {
                start_index,
                start_elevation,
            } if gradient_pct < 0.0 => (
                ScanState::Flat,
                Some(ClosedClimb {
                    start_index,
                    start_elevation,
                    end_index: index - 1,
                }),
            ),
            state => (state, None),
        }
    }

    /// Close a climb still open when the route ends at `last_index`.
    pub fn finish(self, last_index: usize) -> Option<ClosedClimb> {
        match self {
            ScanState::Flat => None,
            ScanState::Climbing {
                start_index,
                start_elevation,
            } => Some(ClosedClimb {
                start_index,
                start_elevation,
                end_index: last_index,
            }),
        }
    }
}

/// A qualified climb span over the input series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimbSpan {
    pub start_index: usize,
    pub end_index: usize,
    /// Gain measured on the smoothed series
    pub elevation_gain_m: f64,
}

/// Gradient in percent for one step. Callers guarantee `distance_diff_km > 0`.
#[inline]
pub fn step_gradient_pct(elevation_diff_m: f64, distance_diff_km: f64) -> f64 {
    elevation_diff_m / (distance_diff_km * 1000.0) * 100.0
}

/// Scan an index-aligned track for climb spans.
///
/// Inputs are assumed validated (equal lengths, at least 2 samples); shorter
/// or mismatched input is scanned over the common prefix.
pub fn scan_climbs(
    distance_km: &[f64],
    elevation_m: &[f64],
    config: &DetectionConfig,
) -> Vec<ClimbSpan> {
    let n = distance_km.len().min(elevation_m.len());
    if n < 2 {
        return Vec::new();
    }

    let smoothed = smooth_elevation(&elevation_m[..n]);
    let mut spans = Vec::new();
    let mut state = ScanState::Flat;

    for i in 1..n {
        let distance_diff = distance_km[i] - distance_km[i - 1];
        if distance_diff <= 0.0 {
            continue;
        }
        let gradient = step_gradient_pct(smoothed[i] - smoothed[i - 1], distance_diff);

        let (next, closed) = state.step(i, gradient, smoothed[i], config.min_gradient_pct);
        state = next;
        if let Some(closed) = closed {
            if let Some(span) = qualify(closed, distance_km, &smoothed, config) {
                spans.push(span);
            }
        }
    }

    if let Some(closed) = state.finish(n - 1) {
        if let Some(span) = qualify(closed, distance_km, &smoothed, config) {
            spans.push(span);
        }
    }

    spans
}

/// Apply the gain and distance thresholds to a closed climb.
fn qualify(
    closed: ClosedClimb,
    distance_km: &[f64],
    smoothed: &[f64],
    config: &DetectionConfig,
) -> Option<ClimbSpan> {
    // Zero-width spans can only pass with non-positive thresholds
    if closed.end_index <= closed.start_index {
        return None;
    }
    let gain = smoothed[closed.end_index] - closed.start_elevation;
    let distance = distance_km[closed.end_index] - distance_km[closed.start_index];

    if gain >= config.min_elevation_gain_m && distance >= config.min_distance_km {
        Some(ClimbSpan {
            start_index: closed.start_index,
            end_index: closed.end_index,
            elevation_gain_m: gain,
        })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_opens_only_above_threshold() {
        let (state, closed) = ScanState::Flat.step(3, 3.0, 120.0, 3.0);
        assert_eq!(state, ScanState::Flat);
        assert!(closed.is_none());

        let (state, closed) = ScanState::Flat.step(3, 3.0001, 120.0, 3.0);
        assert_eq!(
            state,
            ScanState::Climbing {
                start_index: 3,
                start_elevation: 120.0
            }
        );
        assert!(closed.is_none());
    }

    #[test]
    fn test_flat_ignores_descent() {
        let (state, closed) = ScanState::Flat.step(5, -8.0, 90.0, 3.0);
        assert_eq!(state, ScanState::Flat);
        assert!(closed.is_none());
    }

    #[test]
    fn test_climbing_survives_zero_and_shallow_steps() {
        let climbing = ScanState::Climbing {
            start_index: 2,
            start_elevation: 150.0,
        };
        let (state, closed) = climbing.step(4, 0.0, 160.0, 3.0);
        assert_eq!(state, climbing);
        assert!(closed.is_none());

        let (state, _) = climbing.step(5, 1.0, 161.0, 3.0);
        assert_eq!(state, climbing);
    }

    #[test]
    fn test_climbing_closes_on_negative_step() {
        let climbing = ScanState::Climbing {
            start_index: 2,
            start_elevation: 150.0,
        };
        let (state, closed) = climbing.step(6, -0.5, 170.0, 3.0);
        assert_eq!(state, ScanState::Flat);
        assert_eq!(
            closed,
            Some(ClosedClimb {
                start_index: 2,
                start_elevation: 150.0,
                end_index: 5
            })
        );
    }

    #[test]
    fn test_finish() {
        assert!(ScanState::Flat.finish(9).is_none());
        let closed = ScanState::Climbing {
            start_index: 1,
            start_elevation: 10.0,
        }
        .finish(9)
        .unwrap();
        assert_eq!(closed.end_index, 9);
    }

    #[test]
    fn test_scan_with_start_lag() {
        // First rise happens 0->1, but the span opens at index 1
        let distance = [0.0, 1.0, 2.0, 3.0, 4.0];
        let elevation = [100.0, 150.0, 200.0, 250.0, 240.0];
        let spans = scan_climbs(&distance, &elevation, &DetectionConfig::default());
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].start_index, 1);
        assert_eq!(spans[0].end_index, 3);
        assert!((spans[0].elevation_gain_m - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_scan_skips_non_increasing_distance() {
        // Duplicate distance sample at index 2 must not affect state
        let distance = [0.0, 1.0, 1.0, 2.0, 3.0];
        let elevation = [100.0, 150.0, 0.0, 250.0, 300.0];
        let spans = scan_climbs(&distance, &elevation, &DetectionConfig::default());
        // Step 2->3 rises again from the duplicate sample, climb stays open to the end
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].start_index, 1);
        assert_eq!(spans[0].end_index, 4);
    }

    #[test]
    fn test_scan_discards_small_climbs() {
        let distance = [0.0, 0.1, 0.2, 0.3, 0.4];
        let elevation = [100.0, 105.0, 110.0, 115.0, 110.0];
        let spans = scan_climbs(&distance, &elevation, &DetectionConfig::default());
        assert!(spans.is_empty());
    }

    #[test]
    fn test_scan_short_input() {
        assert!(scan_climbs(&[0.0], &[100.0], &DetectionConfig::default()).is_empty());
        assert!(scan_climbs(&[], &[], &DetectionConfig::default()).is_empty());
    }

    #[test]
    fn test_zero_width_span_is_dropped() {
        let config = DetectionConfig {
            min_gradient_pct: 3.0,
            min_elevation_gain_m: 0.0,
            min_distance_km: 0.0,
        };
        // Opens at 2 and the very next step descends: end == start
        let distance = [0.0, 1.0, 2.0, 3.0];
        let elevation = [100.0, 100.0, 200.0, 150.0];
        assert!(scan_climbs(&distance, &elevation, &config).is_empty());
    }
}
