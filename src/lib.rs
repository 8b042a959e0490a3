//! # Climb Detector
//!
//! Climb detection and categorisation for GPS tracks.
//!
//! This library provides:
//! - Climb detection over a smoothed elevation series (gradient state machine)
//! - Tour-style climb categories (HC, 1-4) from gain and average gradient
//! - GPX parsing, route summaries and climb tables
//! - Third-party segment matching with a SQLite cache and a rate-limited client
//!
//! ## Features
//!
//! - **`parallel`** - Batch detection and segment matching with rayon
//! - **`persistence`** - SQLite segment cache
//! - **`http`** - Remote segment client (implies `persistence`)
//! - **`render`** - SVG/PNG elevation profiles
//! - **`ffi`** - FFI bindings for mobile platforms (iOS/Android)
//! - **`cli`** - The `climbs` command line tool
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use climb_detector::{detect_climbs, summarize_route, DetectionConfig};
//!
//! let distance_km = vec![0.0, 0.5, 1.0, 1.5, 2.0, 2.5];
//! let elevation_m = vec![100.0, 120.0, 150.0, 185.0, 220.0, 210.0];
//!
//! let climbs = detect_climbs(&distance_km, &elevation_m, &DetectionConfig::default()).unwrap();
//! for climb in &climbs {
//!     println!(
//!         "Cat {}: {:.0} m over {:.2} km ({:.1}%)",
//!         climb.category, climb.elevation_gain_m, climb.distance_km, climb.avg_gradient_pct
//!     );
//! }
//!
//! let summary = summarize_route(&distance_km, &elevation_m);
//! assert_eq!(summary.max_elevation_m, 220.0);
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{ClimbError, OptionExt, Result};

// Core detection pipeline: smoother -> scanner -> classifier
pub mod smoothing;
pub mod scanner;
pub use scanner::{ClimbSpan, ScanState};

pub mod category;
pub use category::{classify_climb, Category, CATEGORY_RULES};

pub mod detector;
pub use detector::{detect_climbs, detect_climbs_batch, Climb, DetectionConfig};

pub mod summary;
pub use summary::{summarize_route, RouteSummary};

// Geographic utilities (distance, bounds, metre/degree conversions)
pub mod geo_utils;

// Track parsing
pub mod gpx;
pub use crate::gpx::{parse_gpx, parse_gpx_file, ParsedRoute};

pub mod sampling;

// Third-party segment geometry and overlap matching
pub mod segments;
pub use segments::{match_segments, MatchConfig, Segment, SegmentMatch};
#[cfg(feature = "persistence")]
pub use segments::cache::SegmentCache;

// Environment settings
pub mod config;
pub use config::Settings;

// Tables and JSON reports
pub mod report;
pub use report::{climb_table, format_climb_table, ClimbTableRow, RouteReport};

// Elevation profile rendering
#[cfg(feature = "render")]
pub mod profile;

// HTTP client for segment discovery
#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "http")]
pub use http::{SegmentClient, TokenResponse};

// FFI bindings for mobile platforms (iOS/Android)
#[cfg(feature = "ffi")]
pub mod ffi;

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
pub(crate) fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("ClimbDetectorRust"),
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
pub(crate) fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use climb_detector::GpsPoint;
/// let point = GpsPoint::new(45.0917, 6.0711); // Alpe d'Huez
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// A GPS fix with elevation, as read from a track file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct RoutePoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Elevation in meters; 0 when the fix had none
    pub elevation_m: f64,
    /// Whether the fix carried an elevation
    pub has_elevation: bool,
}

impl RoutePoint {
    pub fn new(latitude: f64, longitude: f64, elevation_m: f64) -> Self {
        Self {
            latitude,
            longitude,
            elevation_m,
            has_elevation: true,
        }
    }

    pub fn to_gps_point(&self) -> GpsPoint {
        GpsPoint::new(self.latitude, self.longitude)
    }
}

/// Bounding box for a route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from GPS points.
    pub fn from_points(points: &[GpsPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        Some(geo_utils::compute_bounds(points))
    }

    /// Get the center point of the bounds.
    pub fn center(&self) -> GpsPoint {
        GpsPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }
}

/// Index-aligned cumulative distance (km) and elevation (m) series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub distance_km: Vec<f64>,
    pub elevation_m: Vec<f64>,
}

impl Track {
    /// Create a track, checking that both series have the same length of at least 2.
    ///
    /// # Example
    /// ```
    /// use climb_detector::Track;
    ///
    /// assert!(Track::new(vec![0.0, 1.0], vec![100.0, 110.0]).is_ok());
    /// assert!(Track::new(vec![0.0], vec![100.0]).is_err());
    /// ```
    pub fn new(distance_km: Vec<f64>, elevation_m: Vec<f64>) -> Result<Self> {
        detector::validate_track(&distance_km, &elevation_m)?;
        Ok(Self {
            distance_km,
            elevation_m,
        })
    }

    pub fn len(&self) -> usize {
        self.distance_km.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distance_km.is_empty()
    }

    pub fn detect_climbs(&self, config: &DetectionConfig) -> Result<Vec<Climb>> {
        detect_climbs(&self.distance_km, &self.elevation_m, config)
    }

    pub fn summary(&self) -> RouteSummary {
        summarize_route(&self.distance_km, &self.elevation_m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gps_point_validation() {
        assert!(GpsPoint::new(45.0917, 6.0711).is_valid());
        assert!(!GpsPoint::new(91.0, 0.0).is_valid());
        assert!(!GpsPoint::new(0.0, 181.0).is_valid());
        assert!(!GpsPoint::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_bounds_center() {
        let points = vec![GpsPoint::new(45.0, 6.0), GpsPoint::new(46.0, 7.0)];
        let bounds = Bounds::from_points(&points).unwrap();
        assert_eq!(bounds.center(), GpsPoint::new(45.5, 6.5));
        assert!(Bounds::from_points(&[]).is_none());
    }

    #[test]
    fn test_track_validation() {
        assert!(matches!(
            Track::new(vec![0.0, 1.0], vec![1.0]),
            Err(ClimbError::LengthMismatch { .. })
        ));
        assert!(matches!(
            Track::new(vec![], vec![]),
            Err(ClimbError::InsufficientPoints { .. })
        ));
    }

    #[test]
    fn test_track_detect_and_summary() {
        let track = Track::new(
            (0..=10).map(|i| i as f64 * 0.2).collect(),
            (0..=10).map(|i| i as f64 * 10.0).collect(),
        )
        .unwrap();
        assert_eq!(track.len(), 11);
        let climbs = track.detect_climbs(&DetectionConfig::default()).unwrap();
        assert_eq!(climbs.len(), 1);
        assert!((track.summary().elevation_gain_m - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_route_point() {
        let p = RoutePoint::new(45.0, 6.0, 1200.0);
        assert!(p.has_elevation);
        assert_eq!(p.to_gps_point(), GpsPoint::new(45.0, 6.0));
    }
}
