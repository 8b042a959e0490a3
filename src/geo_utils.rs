//! # Geographic Utilities
//!
//! Distance, bounds and metre/degree conversions for GPS tracks.
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two GPS points |
//! | [`polyline_length`] | Total length of a GPS track in meters |
//! | [`compute_bounds`] | Bounding box of a GPS track |
//! | [`meters_to_deg_lat`] / [`meters_to_deg_lon`] | Flat-earth metre to degree conversion |
//! | [`explore_bounds`] | Square search box around a point |
//!
//! All coordinates are WGS84 degrees.

use geo::{Distance, Haversine, Point};
use serde::{Deserialize, Serialize};

use crate::{Bounds, GpsPoint};

/// Metres per degree of latitude used by the flat-earth conversions.
pub const METERS_PER_DEG_LAT: f64 = 111_111.0;

/// Great-circle distance in meters.
///
/// # Example
///
/// ```rust
/// use climb_detector::{GpsPoint, geo_utils};
///
/// let london = GpsPoint::new(51.5074, -0.1278);
/// let paris = GpsPoint::new(48.8566, 2.3522);
///
/// let distance = geo_utils::haversine_distance(&london, &paris);
/// assert!((distance - 343_560.0).abs() < 1000.0);
/// ```
#[inline]
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    let point1 = Point::new(p1.longitude, p1.latitude);
    let point2 = Point::new(p2.longitude, p2.latitude);
    Haversine::distance(point1, point2)
}

/// Total length of a polyline in meters. Fewer than two points gives 0.
pub fn polyline_length(points: &[GpsPoint]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

/// Bounding box of a track. Empty input yields inverted MAX/MIN bounds.
pub fn compute_bounds(points: &[GpsPoint]) -> Bounds {
    let mut min_lat = f64::MAX;
    let mut max_lat = f64::MIN;
    let mut min_lng = f64::MAX;
    let mut max_lng = f64::MIN;

    for p in points {
        min_lat = min_lat.min(p.latitude);
        max_lat = max_lat.max(p.latitude);
        min_lng = min_lng.min(p.longitude);
        max_lng = max_lng.max(p.longitude);
    }

    Bounds {
        min_lat,
        max_lat,
        min_lng,
        max_lng,
    }
}

/// Metres to degrees of latitude.
#[inline]
pub fn meters_to_deg_lat(meters: f64) -> f64 {
    meters / METERS_PER_DEG_LAT
}

/// Metres to degrees of longitude at `latitude`.
#[inline]
pub fn meters_to_deg_lon(meters: f64, latitude: f64) -> f64 {
    meters / (METERS_PER_DEG_LAT * latitude.to_radians().cos() + 1e-12)
}

/// Search box as sent to segment explore endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExploreBounds {
    /// South-west corner
    pub lat1: f64,
    pub lon1: f64,
    /// North-east corner
    pub lat2: f64,
    pub lon2: f64,
}

impl ExploreBounds {
    /// `lat1,lon1,lat2,lon2` query value.
    pub fn to_query_value(&self) -> String {
        format!("{},{},{},{}", self.lat1, self.lon1, self.lat2, self.lon2)
    }
}

/// Square box of half-size `radius_m` around a point.
pub fn explore_bounds(latitude: f64, longitude: f64, radius_m: f64) -> ExploreBounds {
    let dlat = meters_to_deg_lat(radius_m);
    let dlon = meters_to_deg_lon(radius_m, latitude);
    ExploreBounds {
        lat1: latitude - dlat,
        lon1: longitude - dlon,
        lat2: latitude + dlat,
        lon2: longitude + dlon,
    }
}
