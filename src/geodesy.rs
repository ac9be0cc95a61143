use geo::{HaversineDistance, Point};

use crate::types::Coordinate;

/// Great-circle distance in meters.
pub fn distance_m(a: &Coordinate, b: &Coordinate) -> f64 {
    let pa = Point::new(a.longitude, a.latitude);
    let pb = Point::new(b.longitude, b.latitude);
    pa.haversine_distance(&pb)
}

/// Offset a coordinate by local east/north meters (flat-earth, fine for test tracks).
pub fn offset_m(origin: &Coordinate, east_m: f64, north_m: f64) -> Coordinate {
    const R: f64 = 6_371_008.8;
    let d_lat = north_m / R;
    let d_lon = east_m / (R * origin.latitude.to_radians().cos());
    Coordinate::new(
        origin.latitude + d_lat.to_degrees(),
        origin.longitude + d_lon.to_degrees(),
    )
}
