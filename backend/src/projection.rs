use crate::models::Coordinate;

pub const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

/// Project a point `distance_m` metres from `origin` along `bearing_deg`.
///
/// Local equirectangular approximation: latitude degrees are a fixed
/// 111,320 m, longitude degrees shrink with `cos(origin.lat)`. Good enough
/// for the few-kilometre offsets used by candidate generation; accuracy
/// drops near the poles.
pub fn project(origin: Coordinate, distance_m: f64, bearing_deg: f64) -> Coordinate {
    let bearing = bearing_deg.to_radians();
    let d_lat = distance_m * bearing.cos() / METERS_PER_DEGREE_LAT;
    let d_lng =
        distance_m * bearing.sin() / (METERS_PER_DEGREE_LAT * origin.lat.to_radians().cos());

    Coordinate {
        lat: origin.lat + d_lat,
        lng: origin.lng + d_lng,
    }
}

/// Wrap any finite bearing into `[0, 360)`.
pub fn normalize_bearing(bearing_deg: f64) -> f64 {
    let value = bearing_deg % 360.0;
    if value < 0.0 { value + 360.0 } else { value }
}
