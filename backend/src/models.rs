pub use shared::{
    ApiError, CandidateParameters, Coordinate, LineString, RecommendRequest, RecommendResponse,
    RecommendationRecord, RouteTraits,
};

/// First path alternative returned by the routing provider.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRoute {
    pub distance_m: f64,
    /// Reported by the provider; never used for scoring.
    pub provider_duration_sec: Option<f64>,
    /// Ordered `[lng, lat]` positions.
    pub coordinates: Vec<[f64; 2]>,
}

/// A fetched route that passed duplicate and ban filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateResult {
    pub route_id: String,
    pub parameters: CandidateParameters,
    pub score: f64,
    pub duration_sec: f64,
    pub distance_m: f64,
    pub geometry: Vec<[f64; 2]>,
    pub traits: RouteTraits,
}
