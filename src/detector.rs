//! Climb detection entry points.
//!
//! [`detect_climbs`] validates the input, scans the smoothed series for climb
//! spans and classifies each qualifying span. Boundary values in the
//! returned [`Climb`] records come from the raw series; the elevation gain
//! comes from the smoothed series.

use log::debug;
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::category::{classify_climb, Category};
use crate::error::{ClimbError, OptionExt, Result};
use crate::scanner::{scan_climbs, ClimbSpan};
use crate::Track;

/// Minimum samples needed for a scan.
pub const MIN_TRACK_POINTS: usize = 2;

/// Thresholds for climb detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct DetectionConfig {
    /// Gradient (%) a step must exceed to open a climb.
    /// Default: 3.0
    pub min_gradient_pct: f64,

    /// Smoothed elevation gain (m) a climb needs to be kept.
    /// Default: 20.0
    pub min_elevation_gain_m: f64,

    /// Length (km) a climb needs to be kept.
    /// Default: 0.3
    pub min_distance_km: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_gradient_pct: 3.0,
            min_elevation_gain_m: 20.0,
            min_distance_km: 0.3,
        }
    }
}

impl DetectionConfig {
    /// Config with the given gradient and gain thresholds and the default minimum distance.
    pub fn new(min_gradient_pct: f64, min_elevation_gain_m: f64) -> Self {
        Self {
            min_gradient_pct,
            min_elevation_gain_m,
            ..Self::default()
        }
    }

    pub fn with_min_distance_km(mut self, min_distance_km: f64) -> Self {
        self.min_distance_km = min_distance_km;
        self
    }

    /// Reject thresholds that would make every comparison false.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("min_gradient_pct", self.min_gradient_pct),
            ("min_elevation_gain_m", self.min_elevation_gain_m),
            ("min_distance_km", self.min_distance_km),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(ClimbError::InvalidConfig {
                    message: format!("{} must be finite, got {}", name, value),
                });
            }
        }
        Ok(())
    }
}

/// A detected, categorised climb.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Climb {
    pub start_index: usize,
    pub end_index: usize,
    pub start_distance_km: f64,
    pub end_distance_km: f64,
    pub start_elevation_m: f64,
    pub end_elevation_m: f64,
    /// Gain on the smoothed series between the climb boundaries
    pub elevation_gain_m: f64,
    pub distance_km: f64,
    pub avg_gradient_pct: f64,
    pub category: Category,
}

impl Climb {
    /// Build the record for a qualified span against the raw series.
    pub fn from_span(
        span: &ClimbSpan,
        distance_km: &[f64],
        elevation_m: &[f64],
        min_elevation_gain_m: f64,
    ) -> Self {
        let start_distance_km = distance_km[span.start_index];
        let end_distance_km = distance_km[span.end_index];
        let climb_distance = end_distance_km - start_distance_km;
        let avg_gradient_pct = if climb_distance > 0.0 {
            span.elevation_gain_m / (climb_distance * 1000.0) * 100.0
        } else {
            0.0
        };

        Self {
            start_index: span.start_index,
            end_index: span.end_index,
            start_distance_km,
            end_distance_km,
            start_elevation_m: elevation_m[span.start_index],
            end_elevation_m: elevation_m[span.end_index],
            elevation_gain_m: span.elevation_gain_m,
            distance_km: climb_distance,
            avg_gradient_pct,
            category: classify_climb(
                span.elevation_gain_m,
                avg_gradient_pct,
                min_elevation_gain_m,
            ),
        }
    }

    /// Difficulty score used for categorisation.
    pub fn score(&self) -> f64 {
        self.elevation_gain_m * self.avg_gradient_pct
    }
}

/// Check the track preconditions: equal lengths and at least two samples.
pub fn validate_track(distance_km: &[f64], elevation_m: &[f64]) -> Result<()> {
    if distance_km.len() != elevation_m.len() {
        return Err(ClimbError::LengthMismatch {
            distance_len: distance_km.len(),
            elevation_len: elevation_m.len(),
        });
    }
    distance_km
        .get(MIN_TRACK_POINTS - 1)
        .ok_or_insufficient_points(distance_km.len(), MIN_TRACK_POINTS)?;
    Ok(())
}

/// Detect and categorise climbs in one track.
///
/// Climbs come back ordered by end index and never overlap.
///
/// # Example
/// ```
/// use climb_detector::{detect_climbs, Category, DetectionConfig};
///
/// let distance_km: Vec<f64> = (0..=10).map(|i| i as f64 * 0.2).collect();
/// let elevation_m: Vec<f64> = (0..=10).map(|i| i as f64 * 10.0).collect();
///
/// let climbs = detect_climbs(&distance_km, &elevation_m, &DetectionConfig::default()).unwrap();
/// assert_eq!(climbs.len(), 1);
/// assert_eq!(climbs[0].category, Category::Cat4);
/// ```
pub fn detect_climbs(
    distance_km: &[f64],
    elevation_m: &[f64],
    config: &DetectionConfig,
) -> Result<Vec<Climb>> {
    validate_track(distance_km, elevation_m)?;
    config.validate()?;

    let spans = scan_climbs(distance_km, elevation_m, config);
    let climbs: Vec<Climb> = spans
        .iter()
        .map(|span| Climb::from_span(span, distance_km, elevation_m, config.min_elevation_gain_m))
        .collect();

    debug!(
        "Detected {} climbs in {} samples (gradient > {}%, gain >= {} m, distance >= {} km)",
        climbs.len(),
        distance_km.len(),
        config.min_gradient_pct,
        config.min_elevation_gain_m,
        config.min_distance_km
    );

    Ok(climbs)
}

/// Detect climbs in many tracks. Results are index-aligned with `tracks`.
pub fn detect_climbs_batch(tracks: &[Track], config: &DetectionConfig) -> Vec<Result<Vec<Climb>>> {
    #[cfg(feature = "parallel")]
    let results: Vec<Result<Vec<Climb>>> = tracks
        .par_iter()
        .map(|track| track.detect_climbs(config))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let results: Vec<Result<Vec<Climb>>> = tracks
        .iter()
        .map(|track| track.detect_climbs(config))
        .collect();

    debug!("Batch detection finished for {} tracks", tracks.len());
    results
}
