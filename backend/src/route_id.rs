use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::models::CandidateParameters;

/// Bumped whenever the canonical record changes shape.
pub const ROUTE_ID_SCHEMA_VERSION: u32 = 4;

/// Five decimal places, roughly 1.1 m.
const COORDINATE_SCALE: f64 = 100_000.0;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CanonicalRoute {
    v: u32,
    minutes: f64,
    deg: f64,
    wp2_side_deg: f64,
    one_way_m: f64,
    wp2_m: f64,
    coords: Vec<[f64; 2]>,
}

/// Content-derived identifier for a generated route.
///
/// Hashes the generation parameters together with the provider's raw
/// (not downsampled) geometry. Coordinate order is preserved since a loop
/// walked the other way round is a different route.
pub fn compute_route_id(
    minutes: f64,
    params: &CandidateParameters,
    raw_coords: &[[f64; 2]],
) -> String {
    let record = CanonicalRoute {
        v: ROUTE_ID_SCHEMA_VERSION,
        minutes,
        deg: params.primary_bearing_deg,
        wp2_side_deg: params.second_waypoint_side_deg,
        one_way_m: params.one_way_distance_m.round(),
        wp2_m: params.second_waypoint_distance_m.round(),
        coords: raw_coords
            .iter()
            .map(|&[lng, lat]| [round_coordinate(lng), round_coordinate(lat)])
            .collect(),
    };

    // Plain struct of numbers; serialization cannot fail.
    let payload = serde_json::to_vec(&record).unwrap_or_default();
    format!("{:x}", Sha256::digest(&payload))
}

fn round_coordinate(value: f64) -> f64 {
    (value * COORDINATE_SCALE).round() / COORDINATE_SCALE
}
