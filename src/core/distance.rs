use geo::{HaversineDistance, Point};

use crate::models::Coordinate;

/// Great-circle distance between two coordinates in kilometers
///
/// Used to annotate Nearby results the backend returned without a distance.
#[inline]
pub fn distance_km(from: Coordinate, to: Coordinate) -> f64 {
    let a = Point::new(from.longitude, from.latitude);
    let b = Point::new(to.longitude, to.latitude);

    a.haversine_distance(&b) / 1000.0
}
