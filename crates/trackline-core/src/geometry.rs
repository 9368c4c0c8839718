//! Point-in-region tests used by the spatial filter stage.
//!
//! Circles use great-circle (haversine) distance on a spherical Earth.
//! Polygons use an even-odd ray cast in raw `(lon, lat)` degrees, which is
//! exact for simple polygons that do not straddle the antimeridian.
//! Self-intersecting rings give an unspecified answer.

use trackline_schema::{LatLon, Region};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Slack applied to circle boundaries so that a zero-radius circle still
/// matches its own center after floating point round trips.
pub const DISTANCE_TOLERANCE_M: f64 = 1e-6;

/// Haversine distance between two coordinates in meters.
pub fn distance_m(a: LatLon, b: LatLon) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// `None` means no spatial filter: every point is inside.
pub fn point_in_region(point: LatLon, region: Option<&Region>) -> bool {
    match region {
        None => true,
        Some(Region::Circle { center, radius_m }) => {
            point_in_circle(point, *center, *radius_m)
        }
        Some(Region::Polygon { vertices }) => point_in_polygon(point, vertices),
    }
}

/// Boundary points are inside.
pub fn point_in_circle(point: LatLon, center: LatLon, radius_m: f64) -> bool {
    distance_m(center, point) <= radius_m + DISTANCE_TOLERANCE_M
}

/// Even-odd ray cast over the closed ring `vertices`.
///
/// Fewer than three vertices cannot enclose anything; such a ring is read as
/// "no region" and every point passes.
pub fn point_in_polygon(point: LatLon, vertices: &[LatLon]) -> bool {
    if vertices.len() < 3 {
        return true;
    }

    let (x, y) = (point.lon, point.lat);
    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let (xi, yi) = (vertices[i].lon, vertices[i].lat);
        let (xj, yj) = (vertices[j].lon, vertices[j].lat);
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}
