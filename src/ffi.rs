//! FFI bindings for mobile platforms (iOS/Android).
//!
//! UniFFI exports for Kotlin and Swift. Functions never fail across the
//! boundary: invalid input is logged and yields an empty result. Indices
//! are exported as `u32`.

use log::{info, warn};

use crate::{
    classify_climb, detect_climbs, init_logging, parse_gpx, summarize_route, Category, Climb,
    DetectionConfig, RouteSummary, Track,
};

// ============================================================================
// Records
// ============================================================================

/// A detected climb with FFI-friendly indices.
#[derive(Debug, Clone, PartialEq, uniffi::Record)]
pub struct FfiClimb {
    pub start_index: u32,
    pub end_index: u32,
    pub start_distance_km: f64,
    pub end_distance_km: f64,
    pub start_elevation_m: f64,
    pub end_elevation_m: f64,
    pub elevation_gain_m: f64,
    pub distance_km: f64,
    pub avg_gradient_pct: f64,
    pub category: Category,
}

impl From<&Climb> for FfiClimb {
    fn from(climb: &Climb) -> Self {
        Self {
            start_index: climb.start_index as u32,
            end_index: climb.end_index as u32,
            start_distance_km: climb.start_distance_km,
            end_distance_km: climb.end_distance_km,
            start_elevation_m: climb.start_elevation_m,
            end_elevation_m: climb.end_elevation_m,
            elevation_gain_m: climb.elevation_gain_m,
            distance_km: climb.distance_km,
            avg_gradient_pct: climb.avg_gradient_pct,
            category: climb.category,
        }
    }
}

/// Parsed route with its climbs, for rendering on the device.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiRouteAnalysis {
    /// Flat array of coordinates: [lat1, lng1, lat2, lng2, ...]
    pub coords: Vec<f64>,
    pub distance_km: Vec<f64>,
    pub elevation_m: Vec<f64>,
    pub summary: RouteSummary,
    pub climbs: Vec<FfiClimb>,
}

/// Input for batch detection from flat buffers.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FlatElevationTrack {
    pub track_id: String,
    pub distance_km: Vec<f64>,
    pub elevation_m: Vec<f64>,
}

/// Climbs detected for one track of a batch.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiTrackClimbs {
    pub track_id: String,
    pub climbs: Vec<FfiClimb>,
    pub error: Option<String>,
}

fn to_ffi(climbs: &[Climb]) -> Vec<FfiClimb> {
    climbs.iter().map(FfiClimb::from).collect()
}

// ============================================================================
// Detection
// ============================================================================

/// Default detection thresholds.
#[uniffi::export]
pub fn default_detection_config() -> DetectionConfig {
    init_logging();
    DetectionConfig::default()
}

/// Detect climbs in a distance/elevation series.
#[uniffi::export]
pub fn ffi_detect_climbs(
    distance_km: Vec<f64>,
    elevation_m: Vec<f64>,
    config: DetectionConfig,
) -> Vec<FfiClimb> {
    init_logging();
    info!(
        "[ClimbDetectorRust] detect_climbs called with {} samples",
        distance_km.len()
    );

    match detect_climbs(&distance_km, &elevation_m, &config) {
        Ok(climbs) => {
            info!("[ClimbDetectorRust] Found {} climbs", climbs.len());
            to_ffi(&climbs)
        }
        Err(e) => {
            warn!("[ClimbDetectorRust] detect_climbs failed: {}", e);
            Vec::new()
        }
    }
}

/// Detect climbs for many tracks at once. Results keep the input order.
#[uniffi::export]
pub fn ffi_detect_climbs_batch(
    tracks: Vec<FlatElevationTrack>,
    config: DetectionConfig,
) -> Vec<FfiTrackClimbs> {
    init_logging();
    info!(
        "[ClimbDetectorRust] detect_climbs_batch called with {} tracks",
        tracks.len()
    );

    let start = std::time::Instant::now();

    let detect = |track: &FlatElevationTrack| {
        let result = Track::new(track.distance_km.clone(), track.elevation_m.clone())
            .and_then(|t| t.detect_climbs(&config));
        match result {
            Ok(climbs) => FfiTrackClimbs {
                track_id: track.track_id.clone(),
                climbs: to_ffi(&climbs),
                error: None,
            },
            Err(e) => FfiTrackClimbs {
                track_id: track.track_id.clone(),
                climbs: Vec::new(),
                error: Some(e.to_string()),
            },
        }
    };

    #[cfg(feature = "parallel")]
    let results: Vec<FfiTrackClimbs> = {
        use rayon::prelude::*;
        tracks.par_iter().map(detect).collect()
    };

    #[cfg(not(feature = "parallel"))]
    let results: Vec<FfiTrackClimbs> = tracks.iter().map(detect).collect();

    info!(
        "[ClimbDetectorRust] Batch detection for {} tracks in {:?}",
        results.len(),
        start.elapsed()
    );
    results
}

/// Category for a climb's gain and average gradient.
#[uniffi::export]
pub fn ffi_classify_climb(
    elevation_gain_m: f64,
    avg_gradient_pct: f64,
    min_elevation_gain_m: f64,
) -> Category {
    classify_climb(elevation_gain_m, avg_gradient_pct, min_elevation_gain_m)
}

/// Route totals for a distance/elevation series.
#[uniffi::export]
pub fn ffi_summarize_route(distance_km: Vec<f64>, elevation_m: Vec<f64>) -> RouteSummary {
    init_logging();
    summarize_route(&distance_km, &elevation_m)
}

// ============================================================================
// GPX
// ============================================================================

/// Parse GPX bytes and detect climbs. Returns `None` for unreadable input.
#[uniffi::export]
pub fn ffi_parse_gpx_and_detect(
    gpx_bytes: Vec<u8>,
    config: DetectionConfig,
) -> Option<FfiRouteAnalysis> {
    init_logging();
    info!(
        "[ClimbDetectorRust] parse_gpx_and_detect called with {} bytes",
        gpx_bytes.len()
    );

    let route = match parse_gpx(&gpx_bytes) {
        Ok(route) => route,
        Err(e) => {
            warn!("[ClimbDetectorRust] GPX rejected: {}", e);
            return None;
        }
    };

    let climbs = match detect_climbs(&route.distance_km, &route.elevation_m, &config) {
        Ok(climbs) => climbs,
        Err(e) => {
            warn!("[ClimbDetectorRust] Detection failed: {}", e);
            return None;
        }
    };

    info!(
        "[ClimbDetectorRust] Parsed {} points, {} climbs",
        route.len(),
        climbs.len()
    );

    let coords = route
        .points
        .iter()
        .flat_map(|p| [p.latitude, p.longitude])
        .collect();

    Some(FfiRouteAnalysis {
        coords,
        summary: route.summary(),
        climbs: to_ffi(&climbs),
        distance_km: route.distance_km,
        elevation_m: route.elevation_m,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_exports_u32_indices() {
        let distance: Vec<f64> = (0..=10).map(|i| i as f64 * 0.2).collect();
        let elevation: Vec<f64> = (0..=10).map(|i| i as f64 * 10.0).collect();

        let climbs = ffi_detect_climbs(distance, elevation, default_detection_config());
        assert_eq!(climbs.len(), 1);
        assert_eq!(climbs[0].start_index, 1);
        assert_eq!(climbs[0].end_index, 10);
        assert_eq!(climbs[0].category, Category::Cat4);
    }

    #[test]
    fn test_invalid_input_yields_empty() {
        let climbs = ffi_detect_climbs(vec![0.0], vec![1.0], DetectionConfig::default());
        assert!(climbs.is_empty());
        assert!(ffi_parse_gpx_and_detect(b"not xml".to_vec(), DetectionConfig::default()).is_none());
    }

    #[test]
    fn test_batch_keeps_order_and_errors() {
        let tracks = vec![
            FlatElevationTrack {
                track_id: "flat".to_string(),
                distance_km: vec![0.0, 1.0, 2.0],
                elevation_m: vec![100.0, 100.0, 100.0],
            },
            FlatElevationTrack {
                track_id: "short".to_string(),
                distance_km: vec![0.0],
                elevation_m: vec![100.0],
            },
        ];
        let results = ffi_detect_climbs_batch(tracks, DetectionConfig::default());
        assert_eq!(results[0].track_id, "flat");
        assert!(results[0].climbs.is_empty());
        assert!(results[0].error.is_none());
        assert_eq!(results[1].track_id, "short");
        assert!(results[1].error.is_some());
    }

    #[test]
    fn test_classify_and_summary() {
        assert_eq!(ffi_classify_climb(1300.0, 1.0, 20.0), Category::Hc);
        let summary = ffi_summarize_route(vec![0.0, 1.0, 2.0], vec![10.0, 30.0, 20.0]);
        assert_eq!(summary.total_distance_km, 2.0);
        assert_eq!(summary.elevation_gain_m, 20.0);
    }

    #[test]
    fn test_parse_gpx_and_detect() {
        let mut gpx = String::from(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
<trk><trkseg>"#,
        );
        for i in 0..=20 {
            gpx.push_str(&format!(
                r#"<trkpt lat="{:.6}" lon="6.0"><ele>{:.1}</ele></trkpt>"#,
                45.0 + i as f64 * 0.001,
                100.0 + i as f64 * 8.0
            ));
        }
        gpx.push_str("</trkseg></trk></gpx>");

        let analysis =
            ffi_parse_gpx_and_detect(gpx.into_bytes(), DetectionConfig::default()).unwrap();
        assert_eq!(analysis.coords.len(), 42);
        assert_eq!(analysis.distance_km.len(), 21);
        assert_eq!(analysis.climbs.len(), 1);
        assert_eq!(analysis.summary.max_elevation_m, 260.0);
    }
}
