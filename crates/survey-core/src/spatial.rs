//! Coarse planar geometry for survey rings.
//!
//! Distances treat a degree of longitude and of latitude as the same fixed
//! number of meters. Good enough to order missions by size and derive an
//! ETA; not a geodesic measurement.

use crate::error::ValidationError;

/// Fixed degrees-to-meters scale.
pub const METERS_PER_DEGREE: f64 = 111_000.0;

const POINT_TOLERANCE_DEG: f64 = 1e-9;

/// Sum of segment lengths along a `[lon, lat]` path, in meters.
pub fn path_length_m(path: &[[f64; 2]]) -> f64 {
    path.windows(2)
        .map(|pair| {
            let [lon1, lat1] = pair[0];
            let [lon2, lat2] = pair[1];
            ((lon2 - lon1).powi(2) + (lat2 - lat1).powi(2)).sqrt() * METERS_PER_DEGREE
        })
        .sum()
}

/// Area of the ring's bounding box, in square meters.
pub fn bounding_box_area_m2(ring: &[[f64; 2]]) -> f64 {
    if ring.is_empty() {
        return 0.0;
    }
    let (mut min_lon, mut max_lon) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut min_lat, mut max_lat) = (f64::INFINITY, f64::NEG_INFINITY);
    for [lon, lat] in ring {
        min_lon = min_lon.min(*lon);
        max_lon = max_lon.max(*lon);
        min_lat = min_lat.min(*lat);
        max_lat = max_lat.max(*lat);
    }
    (max_lon - min_lon) * (max_lat - min_lat) * METERS_PER_DEGREE * METERS_PER_DEGREE
}

/// Minutes needed to fly `path` at `speed_mps`.
pub fn estimate_eta_minutes(path: &[[f64; 2]], speed_mps: f64) -> f64 {
    if speed_mps <= 0.0 {
        return 0.0;
    }
    path_length_m(path) / speed_mps / 60.0
}

/// Check a `[lon, lat]` point is finite and within range.
pub fn validate_point(point: [f64; 2], field: &'static str) -> Result<(), ValidationError> {
    let [lon, lat] = point;
    if !lon.is_finite() || !lat.is_finite() {
        return Err(ValidationError::invalid(field, "coordinates must be finite"));
    }
    if !(-180.0..=180.0).contains(&lon) {
        return Err(ValidationError::invalid(field, "longitude out of range"));
    }
    if !(-90.0..=90.0).contains(&lat) {
        return Err(ValidationError::invalid(field, "latitude out of range"));
    }
    Ok(())
}

/// Validate a survey ring.
///
/// Unclosed rings are rejected, never auto-closed. At least three distinct
/// vertices must precede the closing point.
pub fn validate_ring(ring: &[[f64; 2]]) -> Result<(), ValidationError> {
    const FIELD: &str = "surveyArea.coordinates";

    if ring.len() < 4 {
        return Err(ValidationError::invalid(
            FIELD,
            "ring needs at least 4 points (first = last)",
        ));
    }
    for point in ring {
        validate_point(*point, FIELD)?;
    }

    let first = ring[0];
    let last = ring[ring.len() - 1];
    if !same_point(first, last) {
        return Err(ValidationError::invalid(
            FIELD,
            "ring must be closed (first point must equal last)",
        ));
    }

    let mut distinct: Vec<[f64; 2]> = Vec::new();
    for point in &ring[..ring.len() - 1] {
        if !distinct.iter().any(|seen| same_point(*seen, *point)) {
            distinct.push(*point);
        }
    }
    if distinct.len() < 3 {
        return Err(ValidationError::invalid(
            FIELD,
            "ring needs at least 3 distinct vertices",
        ));
    }
    Ok(())
}

fn same_point(a: [f64; 2], b: [f64; 2]) -> bool {
    (a[0] - b[0]).abs() <= POINT_TOLERANCE_DEG && (a[1] - b[1]).abs() <= POINT_TOLERANCE_DEG
}
