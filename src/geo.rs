// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Causal Kernel - Distance, Boundary Classification, Density

use crate::types::{Boundary, Coordinate, Node};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Neighbor count that maps to a density of 1.0.
pub const DENSITY_NORMALIZATION: f64 = 10.0;

// ---------------------------------------------------------------------------
// DistanceMetric
// ---------------------------------------------------------------------------

/// Haversine great-circle distance in meters.
///
/// Symmetric and zero for identical points. NaN components propagate NaN;
/// rejecting them is the validators' job.
pub fn haversine_distance(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    // Rounding can push h a hair past 1.0 for antipodal points. `min` would
    // swallow NaN, so only clamp finite overshoot.
    let root = h.sqrt();
    let root = if root > 1.0 { 1.0 } else { root };
    let c = 2.0 * root.asin();
    EARTH_RADIUS_M * c
}

// ---------------------------------------------------------------------------
// BoundaryClassifier
// ---------------------------------------------------------------------------

/// Ray-casting point-in-polygon test, treating `lng` as x and `lat` as y.
///
/// Polygons with fewer than three vertices enclose nothing and always return
/// `false`. A trailing vertex equal to the first is harmless: the closing edge
/// it produces is degenerate and never counts as a crossing.
pub fn point_in_polygon(point: &Coordinate, polygon: &[Coordinate]) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let (x, y) = (point.lng, point.lat);
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (xi, yi) = (polygon[i].lng, polygon[i].lat);
        let (xj, yj) = (polygon[j].lng, polygon[j].lat);
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Boundaries with exactly one of `from` / `to` inside.
///
/// This is an endpoint XOR, not a segment intersection: a path that clips a
/// polygon without either endpoint landing inside is not reported.
pub fn crossed_boundaries<'a>(
    from: &Coordinate,
    to: &Coordinate,
    boundaries: &'a [Boundary],
) -> Vec<&'a Boundary> {
    boundaries
        .iter()
        .filter(|b| point_in_polygon(from, &b.polygon) != point_in_polygon(to, &b.polygon))
        .collect()
}

// ---------------------------------------------------------------------------
// DensityEstimator
// ---------------------------------------------------------------------------

/// Count of nodes within `radius_m` of `point`, over [`DENSITY_NORMALIZATION`].
///
/// Nodes at `point` itself are counted. A negative or NaN radius is treated
/// as zero.
pub fn density(point: &Coordinate, nodes: &[Node], radius_m: f64) -> f64 {
    let radius = if radius_m.is_nan() { 0.0 } else { radius_m.max(0.0) };
    let count = nodes
        .iter()
        .filter(|n| haversine_distance(point, &n.coordinate) <= radius)
        .count();
    count as f64 / DENSITY_NORMALIZATION
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
