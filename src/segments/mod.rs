//! Third-party segment geometry and overlap matching.
//!
//! A [`Segment`] is a named stretch of road published by a segment service.
//! Its geometry comes from an encoded polyline (precision 5), or from its
//! start/end coordinates when no polyline is present. Matching measures how
//! much of a segment's length runs within a tolerance of the uploaded track.
//! This is a heuristic: it ignores direction and does not check that the
//! track covers the segment in one pass.

pub mod rtree;

#[cfg(feature = "persistence")]
pub mod cache;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::{ClimbError, Result};
use crate::geo_utils::{haversine_distance, meters_to_deg_lat, polyline_length};
use crate::GpsPoint;
use rtree::TrackIndex;

/// Encoded geometry attached to a segment.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentMap {
    pub polyline: Option<String>,
    pub summary_polyline: Option<String>,
}

/// A segment record as returned by the segment service. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Segment {
    pub id: u64,
    pub name: String,
    /// Length in meters
    pub distance: f64,
    #[serde(alias = "avg_grade")]
    pub average_grade: Option<f64>,
    pub maximum_grade: Option<f64>,
    pub elevation_high: Option<f64>,
    pub elevation_low: Option<f64>,
    pub climb_category: Option<i32>,
    /// `[lat, lng]`
    pub start_latlng: Option<Vec<f64>>,
    pub end_latlng: Option<Vec<f64>>,
    pub map: Option<SegmentMap>,
    pub summary_polyline: Option<String>,
    /// Encoded polyline used by explore results
    pub points: Option<String>,
}

fn latlng_point(latlng: &Option<Vec<f64>>) -> Option<GpsPoint> {
    match latlng.as_deref() {
        Some([lat, lng, ..]) => Some(GpsPoint::new(*lat, *lng)),
        _ => None,
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Decode a Google encoded polyline (precision 5).
pub fn decode_polyline(encoded: &str) -> Result<Vec<GpsPoint>> {
    let line = polyline::decode_polyline(encoded, 5).map_err(|e| ClimbError::Polyline {
        message: e.to_string(),
    })?;
    Ok(line.coords().map(|c| GpsPoint::new(c.y, c.x)).collect())
}

/// Encode points as a Google polyline (precision 5).
pub fn encode_polyline(points: &[GpsPoint]) -> Result<String> {
    let line: geo::LineString<f64> = points.iter().map(|p| (p.longitude, p.latitude)).collect();
    polyline::encode_coordinates(line, 5).map_err(|e| ClimbError::Polyline {
        message: e.to_string(),
    })
}

impl Segment {
    /// The first present encoded polyline, in priority order.
    pub fn encoded_polyline(&self) -> Option<&str> {
        let map = self.map.as_ref();
        map.and_then(|m| non_empty(&m.polyline))
            .or_else(|| map.and_then(|m| non_empty(&m.summary_polyline)))
            .or_else(|| non_empty(&self.summary_polyline))
            .or_else(|| non_empty(&self.points))
    }

    pub fn start_point(&self) -> Option<GpsPoint> {
        latlng_point(&self.start_latlng)
    }

    pub fn end_point(&self) -> Option<GpsPoint> {
        latlng_point(&self.end_latlng)
    }

    /// Segment geometry: decoded polyline, else start→end line, else empty.
    pub fn geometry(&self) -> Result<Vec<GpsPoint>> {
        if let Some(encoded) = self.encoded_polyline() {
            return decode_polyline(encoded);
        }
        match (self.start_point(), self.end_point()) {
            (Some(start), Some(end)) => Ok(vec![start, end]),
            _ => Ok(Vec::new()),
        }
    }
}

/// Configuration for segment matching.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct MatchConfig {
    /// Distance from the track (m) that still counts as on-route.
    /// Default: 30.0
    pub tolerance_m: f64,

    /// Fraction of segment length that must be on-route.
    /// Default: 0.6
    pub overlap_threshold: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            tolerance_m: 30.0,
            overlap_threshold: 0.6,
        }
    }
}

/// A segment found along the track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentMatch {
    pub segment_id: u64,
    pub name: String,
    pub climb_category: Option<i32>,
    /// Fraction of segment length within tolerance of the track (0..=1)
    pub overlap_fraction: f64,
    /// Track index nearest to the segment start
    pub start_index: usize,
    /// Track index nearest to the segment end
    pub end_index: usize,
}

/// Fraction of the segment's length lying within `tolerance_m` of the track.
///
/// The segment is walked in sub-steps no longer than a quarter of the
/// tolerance; each sub-step counts as covered when its midpoint is within
/// `meters_to_deg_lat(tolerance_m)` degrees of the nearest track edge.
///
/// # Example
/// ```
/// use climb_detector::GpsPoint;
/// use climb_detector::segments::overlap_fraction;
///
/// let track = vec![GpsPoint::new(45.0, 6.0), GpsPoint::new(45.0, 6.02)];
/// let segment = vec![GpsPoint::new(45.0, 6.005), GpsPoint::new(45.0, 6.015)];
/// assert!(overlap_fraction(&segment, &track, 30.0) > 0.99);
/// ```
pub fn overlap_fraction(segment: &[GpsPoint], track: &[GpsPoint], tolerance_m: f64) -> f64 {
    if segment.len() < 2 || track.is_empty() {
        return 0.0;
    }
    overlap_with_index(segment, &TrackIndex::new(track), tolerance_m)
}

fn overlap_with_index(segment: &[GpsPoint], index: &TrackIndex, tolerance_m: f64) -> f64 {
    if segment.len() < 2 || index.is_empty() {
        return 0.0;
    }
    let total = polyline_length(segment);
    if total <= 0.0 {
        return 0.0;
    }

    let tolerance_deg = meters_to_deg_lat(tolerance_m);
    let max_step = (tolerance_m / 4.0).max(1.0);
    let mut covered = 0.0;

    for w in segment.windows(2) {
        let (a, b) = (&w[0], &w[1]);
        let length = haversine_distance(a, b);
        if length <= 0.0 {
            continue;
        }
        let steps = (length / max_step).ceil().max(1.0) as usize;
        let piece = length / steps as f64;
        for k in 0..steps {
            let t = (k as f64 + 0.5) / steps as f64;
            let mid = GpsPoint::new(
                a.latitude + (b.latitude - a.latitude) * t,
                a.longitude + (b.longitude - a.longitude) * t,
            );
            if index
                .distance_to_track(&mid)
                .is_some_and(|d| d <= tolerance_deg)
            {
                covered += piece;
            }
        }
    }

    (covered / total).clamp(0.0, 1.0)
}

fn match_one(segment: &Segment, index: &TrackIndex, config: &MatchConfig) -> Option<SegmentMatch> {
    let geometry = match segment.geometry() {
        Ok(points) => points,
        Err(e) => {
            warn!("[SegmentMatch] Skipping segment {}: {}", segment.id, e);
            return None;
        }
    };
    let fraction = overlap_with_index(&geometry, index, config.tolerance_m);
    if fraction < config.overlap_threshold {
        return None;
    }

    let start_index = index.nearest_index(geometry.first()?)?;
    let end_index = index.nearest_index(geometry.last()?)?;
    Some(SegmentMatch {
        segment_id: segment.id,
        name: segment.name.clone(),
        climb_category: segment.climb_category,
        overlap_fraction: fraction,
        start_index,
        end_index,
    })
}

/// Segments whose overlap with the track reaches `config.overlap_threshold`.
///
/// Matches are sorted by their start index along the track, then by id.
/// Segments with undecodable geometry are logged and skipped.
pub fn match_segments(
    segments: &[Segment],
    track: &[GpsPoint],
    config: &MatchConfig,
) -> Vec<SegmentMatch> {
    if track.is_empty() || segments.is_empty() {
        return Vec::new();
    }
    let index = TrackIndex::new(track);

    #[cfg(feature = "parallel")]
    let mut matches: Vec<SegmentMatch> = segments
        .par_iter()
        .filter_map(|s| match_one(s, &index, config))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let mut matches: Vec<SegmentMatch> = segments
        .iter()
        .filter_map(|s| match_one(s, &index, config))
        .collect();

    matches.sort_by(|a, b| {
        a.start_index
            .cmp(&b.start_index)
            .then(a.segment_id.cmp(&b.segment_id))
    });

    debug!(
        "[SegmentMatch] {} of {} segments overlap the track (threshold {:.2})",
        matches.len(),
        segments.len(),
        config.overlap_threshold
    );
    matches
}
