//! Great-circle distance helpers backing the arena (geofence) checks.

use serde::{Deserialize, Serialize};

/// Mean earth radius in metres (WGS-84 mean radius).
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in decimal degrees, positive north.
    pub latitude: f64,
    /// Longitude in decimal degrees, positive east.
    pub longitude: f64,
}

impl GeoPoint {
    /// Build a point from its latitude and longitude.
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Raw haversine distance between two points, in metres.
pub fn haversine_meters(from: GeoPoint, to: GeoPoint) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let d_lat = (to.latitude - from.latitude).to_radians();
    let d_lon = (to.longitude - from.longitude).to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Distance between two points with the GPS tolerance already subtracted.
///
/// The result may be negative for points closer than the tolerance; callers treat
/// any value `<= radius` as inside the arena.
pub fn distance_meters(from: GeoPoint, to: GeoPoint, tolerance_meters: f64) -> f64 {
    haversine_meters(from, to) - tolerance_meters
}

/// Whether `point` lies outside the disk of `radius_meters` around `centre`.
pub fn is_outside(
    point: GeoPoint,
    centre: GeoPoint,
    radius_meters: f64,
    tolerance_meters: f64,
) -> bool {
    distance_meters(point, centre, tolerance_meters) > radius_meters
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 5.0;

    #[test]
    fn zurich_to_bern_is_roughly_95_km() {
        let zurich = GeoPoint::new(47.3769, 8.5417);
        let bern = GeoPoint::new(46.9480, 7.4474);

        let distance = distance_meters(zurich, bern, TOLERANCE);

        assert!(
            distance > 95_000.0 - TOLERANCE && distance < 96_000.0 - TOLERANCE,
            "unexpected distance {distance}"
        );
    }

    #[test]
    fn same_point_is_negative_tolerance() {
        let point = GeoPoint::new(47.0, 8.0);
        assert_eq!(distance_meters(point, point, TOLERANCE), -TOLERANCE);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = GeoPoint::new(47.0, 8.0);
        let b = GeoPoint::new(47.002, 8.002);
        let ab = distance_meters(a, b, TOLERANCE);
        let ba = distance_meters(b, a, TOLERANCE);
        assert!((ab - ba).abs() < 1e-9);
    }

    #[test]
    fn hundred_metre_boundary() {
        let centre = GeoPoint::new(47.0, 8.0);

        // ~100 m north, minus tolerance
        let near = GeoPoint::new(47.0009, 8.0);
        assert!(!is_outside(near, centre, 100.0, TOLERANCE));

        // ~1.1 km north
        let far = GeoPoint::new(47.01, 8.0);
        assert!(is_outside(far, centre, 100.0, TOLERANCE));
    }
}
