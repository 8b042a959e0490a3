//! GPX track parsing.
//!
//! Reads every track segment in document order into [`RoutePoint`]s and
//! builds the cumulative distance series the detector consumes. Documents
//! without track points fall back to their waypoints.

use std::io::Cursor;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{ClimbError, OptionExt, Result};
use crate::geo_utils::haversine_distance;
use crate::summary::{summarize_route, RouteSummary};
use crate::{GpsPoint, RoutePoint, Track};

/// A parsed route: points plus index-aligned distance (km) and elevation (m).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedRoute {
    pub points: Vec<RoutePoint>,
    pub distance_km: Vec<f64>,
    pub elevation_m: Vec<f64>,
}

impl ParsedRoute {
    /// Build from points, computing cumulative distance.
    ///
    /// Steps between two points that both carry elevation use the 3-D
    /// distance; other steps use ground distance only. Points outside the
    /// valid latitude/longitude range are rejected.
    pub fn from_points(points: Vec<RoutePoint>) -> Result<Self> {
        points.get(1).ok_or_insufficient_points(points.len(), 2)?;
        if let Some(index) = points.iter().position(|p| !p.to_gps_point().is_valid()) {
            return Err(ClimbError::GpxParse {
                message: format!(
                    "point {} has invalid coordinates ({}, {})",
                    index, points[index].latitude, points[index].longitude
                ),
            });
        }

        let mut distance_km = Vec::with_capacity(points.len());
        let mut total_m = 0.0;
        for (i, point) in points.iter().enumerate() {
            if i > 0 {
                total_m += step_distance_m(&points[i - 1], point);
            }
            distance_km.push(total_m / 1000.0);
        }
        let elevation_m = points.iter().map(|p| p.elevation_m).collect();

        Ok(Self {
            points,
            distance_km,
            elevation_m,
        })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn latitudes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.latitude).collect()
    }

    pub fn longitudes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.longitude).collect()
    }

    /// Cumulative distance in meters.
    pub fn distance_m(&self) -> Vec<f64> {
        self.distance_km.iter().map(|d| d * 1000.0).collect()
    }

    pub fn gps_points(&self) -> Vec<GpsPoint> {
        self.points.iter().map(RoutePoint::to_gps_point).collect()
    }

    pub fn summary(&self) -> RouteSummary {
        summarize_route(&self.distance_km, &self.elevation_m)
    }

    /// Distance/elevation track for detection.
    pub fn track(&self) -> Track {
        Track {
            distance_km: self.distance_km.clone(),
            elevation_m: self.elevation_m.clone(),
        }
    }
}

fn step_distance_m(a: &RoutePoint, b: &RoutePoint) -> f64 {
    let ground = haversine_distance(&a.to_gps_point(), &b.to_gps_point());
    if a.has_elevation && b.has_elevation {
        let rise = b.elevation_m - a.elevation_m;
        (ground * ground + rise * rise).sqrt()
    } else {
        ground
    }
}

fn to_route_point(waypoint: &::gpx::Waypoint) -> RoutePoint {
    let point = waypoint.point();
    RoutePoint {
        latitude: point.y(),
        longitude: point.x(),
        elevation_m: waypoint.elevation.unwrap_or(0.0),
        has_elevation: waypoint.elevation.is_some(),
    }
}

/// Parse a GPX document.
pub fn parse_gpx(bytes: &[u8]) -> Result<ParsedRoute> {
    let mut cursor = Cursor::new(bytes);
    let document = ::gpx::read(&mut cursor).map_err(|e| ClimbError::GpxParse {
        message: e.to_string(),
    })?;

    let mut points: Vec<RoutePoint> = document
        .tracks
        .iter()
        .flat_map(|track| track.segments.iter())
        .flat_map(|segment| segment.points.iter())
        .map(to_route_point)
        .collect();

    if points.is_empty() {
        points = document.waypoints.iter().map(to_route_point).collect();
        debug!("GPX has no track points, using {} waypoints", points.len());
    }

    let route = ParsedRoute::from_points(points)?;
    debug!(
        "Parsed GPX: {} points, {:.2} km",
        route.len(),
        route.distance_km.last().copied().unwrap_or(0.0)
    );
    Ok(route)
}

/// Read and parse a GPX file from disk.
pub fn parse_gpx_file(path: impl AsRef<std::path::Path>) -> Result<ParsedRoute> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| ClimbError::GpxParse {
        message: format!("{}: {}", path.display(), e),
    })?;
    parse_gpx(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gpx_doc(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
{}
</gpx>"#,
            body
        )
    }

    #[test]
    fn test_parse_track_points() {
        let doc = gpx_doc(
            r#"<trk><trkseg>
<trkpt lat="45.000" lon="6.000"><ele>100</ele></trkpt>
<trkpt lat="45.001" lon="6.000"><ele>110</ele></trkpt>
</trkseg><trkseg>
<trkpt lat="45.002" lon="6.000"><ele>120</ele></trkpt>
</trkseg></trk>"#,
        );
        let route = parse_gpx(doc.as_bytes()).unwrap();
        assert_eq!(route.len(), 3);
        assert_eq!(route.elevation_m, vec![100.0, 110.0, 120.0]);
        assert_eq!(route.distance_km[0], 0.0);

        // 3-D step: sqrt(111.2^2 + 10^2) m
        let step_m = route.distance_km[1] * 1000.0;
        assert!((step_m - (111.195f64.powi(2) + 100.0).sqrt()).abs() < 0.5);
        assert_eq!(route.latitudes()[2], 45.002);
        assert_eq!(route.longitudes()[0], 6.0);
    }

    #[test]
    fn test_from_points_rejects_invalid_coordinates() {
        let point = |latitude: f64, longitude: f64| RoutePoint {
            latitude,
            longitude,
            elevation_m: 100.0,
            has_elevation: true,
        };
        let err = ParsedRoute::from_points(vec![point(45.0, 6.0), point(f64::NAN, 6.0)])
            .unwrap_err();
        assert!(matches!(err, ClimbError::GpxParse { .. }));
        assert!(ParsedRoute::from_points(vec![point(45.0, 6.0), point(45.0, 200.0)]).is_err());

        let err = ParsedRoute::from_points(vec![point(45.0, 6.0)]).unwrap_err();
        assert_eq!(
            err,
            ClimbError::InsufficientPoints {
                point_count: 1,
                minimum_required: 2
            }
        );
        assert!(ParsedRoute::from_points(vec![point(45.0, 6.0), point(45.001, 6.0)]).is_ok());
    }

    #[test]
    fn test_missing_elevation_defaults_to_zero() {
        let doc = gpx_doc(
            r#"<trk><trkseg>
<trkpt lat="45.000" lon="6.000"></trkpt>
<trkpt lat="45.001" lon="6.000"><ele>50</ele></trkpt>
</trkseg></trk>"#,
        );
        let route = parse_gpx(doc.as_bytes()).unwrap();
        assert_eq!(route.elevation_m, vec![0.0, 50.0]);
        // Ground distance only: no 50 m rise added
        assert!((route.distance_m()[1] - 111.195).abs() < 0.5);
    }

    #[test]
    fn test_waypoint_fallback() {
        let doc = gpx_doc(
            r#"<wpt lat="45.000" lon="6.000"><ele>10</ele></wpt>
<wpt lat="45.010" lon="6.000"><ele>20</ele></wpt>"#,
        );
        let route = parse_gpx(doc.as_bytes()).unwrap();
        assert_eq!(route.len(), 2);
        assert_eq!(route.track().elevation_m, vec![10.0, 20.0]);
    }

    #[test]
    fn test_single_point_is_rejected() {
        let doc = gpx_doc(
            r#"<trk><trkseg><trkpt lat="45.0" lon="6.0"><ele>1</ele></trkpt></trkseg></trk>"#,
        );
        assert!(matches!(
            parse_gpx(doc.as_bytes()),
            Err(ClimbError::InsufficientPoints { point_count: 1, .. })
        ));
    }

    #[test]
    fn test_invalid_document() {
        assert!(matches!(
            parse_gpx(b"not xml at all"),
            Err(ClimbError::GpxParse { .. })
        ));
    }

    #[test]
    fn test_summary_from_route() {
        let doc = gpx_doc(
            r#"<trk><trkseg>
<trkpt lat="45.000" lon="6.000"><ele>100</ele></trkpt>
<trkpt lat="45.001" lon="6.000"><ele>90</ele></trkpt>
<trkpt lat="45.002" lon="6.000"><ele>130</ele></trkpt>
</trkseg></trk>"#,
        );
        let summary = parse_gpx(doc.as_bytes()).unwrap().summary();
        assert_eq!(summary.elevation_gain_m, 40.0);
        assert_eq!(summary.min_elevation_m, 90.0);
        assert_eq!(summary.max_elevation_m, 130.0);
    }
}
