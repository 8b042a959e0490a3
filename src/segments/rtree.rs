//! R-tree indexed track points and edges for segment matching.
//!
//! Coordinates are stored as `[lat, lng]` degrees; distances are planar in
//! degree space.

use crate::GpsPoint;
use rstar::{PointDistance, RTree, RTreeObject, AABB};

/// A GPS point with its index for R-tree queries
#[derive(Debug, Clone, Copy)]
pub struct IndexedPoint {
    pub idx: usize,
    pub lat: f64,
    pub lng: f64,
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.lat, self.lng])
    }
}

impl PointDistance for IndexedPoint {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dlat = self.lat - point[0];
        let dlng = self.lng - point[1];
        dlat * dlat + dlng * dlng
    }
}

/// One edge of a track polyline, `idx` is the index of its first point
#[derive(Debug, Clone, Copy)]
pub struct IndexedEdge {
    pub idx: usize,
    pub start: [f64; 2],
    pub end: [f64; 2],
}

impl RTreeObject for IndexedEdge {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.start, self.end)
    }
}

impl PointDistance for IndexedEdge {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.end[0] - self.start[0];
        let dy = self.end[1] - self.start[1];
        let len_2 = dx * dx + dy * dy;
        let t = if len_2 > 0.0 {
            (((point[0] - self.start[0]) * dx + (point[1] - self.start[1]) * dy) / len_2)
                .clamp(0.0, 1.0)
        } else {
            0.0
        };
        let px = self.start[0] + t * dx - point[0];
        let py = self.start[1] + t * dy - point[1];
        px * px + py * py
    }
}

/// Build R-tree from GPS points for efficient spatial queries
pub fn build_rtree(points: &[GpsPoint]) -> RTree<IndexedPoint> {
    let indexed: Vec<IndexedPoint> = points
        .iter()
        .enumerate()
        .map(|(i, p)| IndexedPoint {
            idx: i,
            lat: p.latitude,
            lng: p.longitude,
        })
        .collect();
    RTree::bulk_load(indexed)
}

/// Build R-tree of polyline edges. A single point becomes one zero-length edge.
pub fn build_edge_rtree(points: &[GpsPoint]) -> RTree<IndexedEdge> {
    let edges: Vec<IndexedEdge> = match points {
        [] => Vec::new(),
        [only] => vec![IndexedEdge {
            idx: 0,
            start: [only.latitude, only.longitude],
            end: [only.latitude, only.longitude],
        }],
        _ => points
            .windows(2)
            .enumerate()
            .map(|(i, w)| IndexedEdge {
                idx: i,
                start: [w[0].latitude, w[0].longitude],
                end: [w[1].latitude, w[1].longitude],
            })
            .collect(),
    };
    RTree::bulk_load(edges)
}

/// Point and edge indexes over one track, built once per matching run.
pub struct TrackIndex {
    points: RTree<IndexedPoint>,
    edges: RTree<IndexedEdge>,
}

impl TrackIndex {
    pub fn new(track: &[GpsPoint]) -> Self {
        Self {
            points: build_rtree(track),
            edges: build_edge_rtree(track),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.size() == 0
    }

    /// Planar distance (degrees) from a point to the nearest track edge.
    pub fn distance_to_track(&self, point: &GpsPoint) -> Option<f64> {
        let query = [point.latitude, point.longitude];
        self.edges
            .nearest_neighbor(&query)
            .map(|edge| edge.distance_2(&query).sqrt())
    }

    /// Index of the track point nearest to `point`.
    pub fn nearest_index(&self, point: &GpsPoint) -> Option<usize> {
        self.points
            .nearest_neighbor(&[point.latitude, point.longitude])
            .map(|p| p.idx)
    }
}
