//! Candidate search for closed-loop walks of a target duration.
//!
//! # Candidate construction
//!
//! Every candidate is the loop `start → wp1 → wp2 → start`:
//! - `wp1` sits `one_way_m` out along a primary bearing
//! - `wp2` sits on the return side, at `bearing + 180 ± offset`, so the way
//!   home is pushed off the outbound line by at least [`LATERAL_OFFSETS_DEG`]'s
//!   smallest magnitude
//!
//! # Search passes
//!
//! Passes run coarse → medium → fine (60°, 30°, 20° bearing steps). Bearings
//! already requested in an earlier pass are skipped. All fetches of a pass run
//! concurrently and the pass waits for every one of them. The search stops as
//! soon as [`has_enough_acceptable`] holds for the accumulated pool.
//!
//! # Selection
//!
//! Candidates whose pace-based duration falls in the acceptance window are
//! ranked by score. If no pass produced enough of them, the best-scoring
//! candidates of the whole pool are returned instead.

use std::{
    cmp::Ordering,
    collections::{BTreeSet, HashSet},
    sync::Arc,
};

use futures::future::join_all;

use crate::{
    analysis::analyze_route,
    downsample::{downsample, MAX_GEOMETRY_POINTS},
    error::RecommendError,
    models::{
        CandidateParameters, CandidateResult, Coordinate, LineString, RawRoute, RecommendRequest,
        RecommendationRecord,
    },
    projection::{normalize_bearing, project},
    provider::RouteProvider,
    route_id::compute_route_id,
};

/// Fixed walking pace, 1 km every 20 minutes.
pub const PACE_M_PER_MIN: f64 = 50.0;
pub const MAX_RECOMMENDATIONS: usize = 3;
pub const DEFAULT_USER_ID: &str = "anon";

const MIN_ONE_WAY_M: f64 = 250.0;
const MAX_ONE_WAY_M: f64 = 1_300.0;
const MIN_SECOND_WAYPOINT_M: f64 = 180.0;

pub const LATERAL_OFFSETS_DEG: [f64; 6] = [35.0, -35.0, 55.0, -55.0, 75.0, -75.0];
pub const SECOND_WAYPOINT_RATIOS: [f64; 3] = [0.28, 0.35, 0.42];

const ACCEPT_MIN_FACTOR: f64 = 0.7;
const ACCEPT_MAX_FACTOR: f64 = 1.35;
const TIME_WEIGHT: f64 = 1.2;
const DISTANCE_WEIGHT: f64 = 0.08;

/// Pace-based walking time for a distance.
pub fn pace_duration_sec(distance_m: f64) -> f64 {
    distance_m / PACE_M_PER_MIN * 60.0
}

/// Duration, distance and leg lengths derived from the requested minutes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalkTarget {
    pub minutes: f64,
    pub duration_sec: f64,
    pub distance_m: f64,
    pub one_way_m: f64,
}

impl WalkTarget {
    pub fn from_minutes(minutes: f64) -> Self {
        let distance_m = minutes * PACE_M_PER_MIN;
        Self {
            minutes,
            duration_sec: minutes * 60.0,
            distance_m,
            one_way_m: (distance_m / 2.0).clamp(MIN_ONE_WAY_M, MAX_ONE_WAY_M),
        }
    }

    pub fn accepts(&self, duration_sec: f64) -> bool {
        duration_sec >= self.duration_sec * ACCEPT_MIN_FACTOR
            && duration_sec <= self.duration_sec * ACCEPT_MAX_FACTOR
    }

    /// Lower is better. Time mismatch dominates; distance breaks ties.
    pub fn score(&self, duration_sec: f64, distance_m: f64) -> f64 {
        (duration_sec - self.duration_sec).abs() * TIME_WEIGHT
            + (distance_m - self.distance_m).abs() * DISTANCE_WEIGHT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPass {
    Coarse,
    Medium,
    Fine,
}

impl SearchPass {
    pub fn step_deg(self) -> u32 {
        match self {
            Self::Coarse => 60,
            Self::Medium => 30,
            Self::Fine => 20,
        }
    }

    pub fn next(self) -> Option<Self> {
        match self {
            Self::Coarse => Some(Self::Medium),
            Self::Medium => Some(Self::Fine),
            Self::Fine => None,
        }
    }
}

/// Bearings on a `step_deg` grid that no earlier pass has requested.
pub fn untried_bearings(step_deg: u32, tried: &BTreeSet<u32>) -> Vec<u32> {
    (0..360)
        .step_by(step_deg as usize)
        .filter(|deg| !tried.contains(deg))
        .collect()
}

/// Cross product of bearings, lateral offsets and return-leg ratios.
pub fn candidate_batch(target: &WalkTarget, bearings: &[u32]) -> Vec<CandidateParameters> {
    let per_bearing = LATERAL_OFFSETS_DEG.len() * SECOND_WAYPOINT_RATIOS.len();
    let mut batch = Vec::with_capacity(bearings.len() * per_bearing);

    for &deg in bearings {
        let deg = f64::from(deg);
        for offset in LATERAL_OFFSETS_DEG {
            for ratio in SECOND_WAYPOINT_RATIOS {
                batch.push(CandidateParameters {
                    primary_bearing_deg: deg,
                    second_waypoint_side_deg: normalize_bearing(deg + 180.0 + offset),
                    one_way_distance_m: target.one_way_m,
                    second_waypoint_distance_m: (target.one_way_m * ratio)
                        .max(MIN_SECOND_WAYPOINT_M),
                });
            }
        }
    }

    batch
}

/// Ordered waypoints `start → wp1 → wp2 → start` for one candidate.
pub fn loop_waypoints(start: Coordinate, params: &CandidateParameters) -> [Coordinate; 4] {
    let first = project(start, params.one_way_distance_m, params.primary_bearing_deg);
    let second = project(
        start,
        params.second_waypoint_distance_m,
        params.second_waypoint_side_deg,
    );
    [start, first, second, start]
}

/// Provider result paired with the parameters that produced it.
#[derive(Debug, Clone)]
pub struct FetchedCandidate {
    pub parameters: CandidateParameters,
    pub route: RawRoute,
}

/// Outcome of one pass's filtering step.
#[derive(Debug, Clone, Default)]
pub struct Admission {
    pub admitted: Vec<CandidateResult>,
    pub rejected: usize,
}

/// Score, identify and filter a batch of fetched routes against the pool.
///
/// Routes whose id is banned, already in `pool`, or repeated earlier in the
/// same batch are rejected. Survivors get traits and transport geometry.
pub fn admit_candidates(
    target: &WalkTarget,
    pool: &[CandidateResult],
    fetched: Vec<FetchedCandidate>,
    banned: &HashSet<String>,
) -> Admission {
    let mut seen: HashSet<String> = pool.iter().map(|c| c.route_id.clone()).collect();
    let mut admission = Admission::default();

    for FetchedCandidate { parameters, route } in fetched {
        let route_id = compute_route_id(target.minutes, &parameters, &route.coordinates);
        if banned.contains(&route_id) {
            tracing::debug!(
                %route_id,
                bearing = parameters.primary_bearing_deg,
                "rejected: banned"
            );
            admission.rejected += 1;
            continue;
        }
        if !seen.insert(route_id.clone()) {
            tracing::debug!(
                %route_id,
                bearing = parameters.primary_bearing_deg,
                "rejected: duplicate"
            );
            admission.rejected += 1;
            continue;
        }

        let distance_m = route.distance_m;
        let duration_sec = pace_duration_sec(distance_m);
        admission.admitted.push(CandidateResult {
            route_id,
            parameters,
            score: target.score(duration_sec, distance_m),
            duration_sec,
            distance_m,
            geometry: downsample(&route.coordinates, MAX_GEOMETRY_POINTS),
            traits: analyze_route(&route),
        });
    }

    admission
}

fn by_score(a: &&CandidateResult, b: &&CandidateResult) -> Ordering {
    a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal)
}

/// Pool entries inside the acceptance window, best score first.
pub fn acceptable_candidates<'a>(
    pool: &'a [CandidateResult],
    target: &WalkTarget,
) -> Vec<&'a CandidateResult> {
    let mut acceptable: Vec<_> = pool
        .iter()
        .filter(|c| target.accepts(c.duration_sec))
        .collect();
    acceptable.sort_by(by_score);
    acceptable
}

pub fn has_enough_acceptable(pool: &[CandidateResult], target: &WalkTarget) -> bool {
    pool.iter().filter(|c| target.accepts(c.duration_sec)).count() >= MAX_RECOMMENDATIONS
}

/// Fallback ranking over the whole pool, ignoring the acceptance window.
pub fn best_candidates(pool: &[CandidateResult]) -> Vec<&CandidateResult> {
    let mut ranked: Vec<_> = pool.iter().collect();
    ranked.sort_by(by_score);
    ranked.truncate(MAX_RECOMMENDATIONS);
    ranked
}

pub fn to_record(
    candidate: &CandidateResult,
    rank: usize,
    minutes: f64,
    user_id: &str,
) -> RecommendationRecord {
    let parameters = CandidateParameters {
        one_way_distance_m: candidate.parameters.one_way_distance_m.round(),
        second_waypoint_distance_m: candidate.parameters.second_waypoint_distance_m.round(),
        ..candidate.parameters
    };

    RecommendationRecord {
        route_id: candidate.route_id.clone(),
        user_id: user_id.to_string(),
        minutes,
        parameters,
        title: format!("{minutes}-minute walk recommendation {rank}"),
        duration_sec: candidate.duration_sec.round() as u64,
        distance_m: candidate.distance_m.round() as u64,
        geometry: LineString::new(candidate.geometry.clone()),
        traits: candidate.traits.clone(),
        explanation: candidate.traits.explanation.clone(),
    }
}

pub struct Recommender {
    provider: Arc<dyn RouteProvider>,
}

impl Recommender {
    pub fn new(provider: Arc<dyn RouteProvider>) -> Self {
        Self { provider }
    }

    /// Recommend up to [`MAX_RECOMMENDATIONS`] loops from `req.start`.
    ///
    /// # Errors
    /// [`RecommendError::NoRoutesFound`] when no candidate survives any pass,
    /// whether the provider failed or every route was banned.
    pub async fn recommend(
        &self,
        req: &RecommendRequest,
    ) -> Result<Vec<RecommendationRecord>, RecommendError> {
        let target = WalkTarget::from_minutes(req.minutes);
        let user_id = req.user_id.as_deref().unwrap_or(DEFAULT_USER_ID);
        let banned: HashSet<String> = req.banned_route_ids.iter().cloned().collect();

        tracing::info!(
            "Recommending {} min walk from ({:.5}, {:.5}): target {:.0}m, one-way {:.0}m, {} banned",
            req.minutes,
            req.start.lat,
            req.start.lng,
            target.distance_m,
            target.one_way_m,
            banned.len()
        );

        let mut pool: Vec<CandidateResult> = Vec::new();
        let mut tried: BTreeSet<u32> = BTreeSet::new();
        let mut attempted = 0;
        let mut failed = 0;
        let mut rejected = 0;

        let mut pass = Some(SearchPass::Coarse);
        while let Some(current) = pass {
            let bearings = untried_bearings(current.step_deg(), &tried);
            tried.extend(bearings.iter().copied());

            let batch = candidate_batch(&target, &bearings);
            let batch_len = batch.len();
            attempted += batch_len;
            let fetched = self.fetch_batch(req.start, batch).await;
            failed += batch_len - fetched.len();

            let admission = admit_candidates(&target, &pool, fetched, &banned);
            rejected += admission.rejected;
            pool.extend(admission.admitted);

            let acceptable = acceptable_candidates(&pool, &target);
            tracing::info!(
                "{:?} pass ({}° step, {} bearings): pool {}, acceptable {}",
                current,
                current.step_deg(),
                bearings.len(),
                pool.len(),
                acceptable.len()
            );

            if has_enough_acceptable(&pool, &target) {
                return Ok(acceptable
                    .into_iter()
                    .take(MAX_RECOMMENDATIONS)
                    .enumerate()
                    .map(|(idx, c)| to_record(c, idx + 1, req.minutes, user_id))
                    .collect());
            }

            pass = current.next();
        }

        if pool.is_empty() {
            tracing::warn!(
                "No routes: {} candidates tried, {} failed, {} rejected",
                attempted,
                failed,
                rejected
            );
            return Err(RecommendError::NoRoutesFound {
                attempted,
                failed,
                rejected,
            });
        }

        tracing::info!(
            "Too few candidates in the acceptance window, falling back to best of {}",
            pool.len()
        );
        Ok(best_candidates(&pool)
            .into_iter()
            .enumerate()
            .map(|(idx, c)| to_record(c, idx + 1, req.minutes, user_id))
            .collect())
    }

    /// Fetch every candidate concurrently; failures are logged and dropped.
    /// Results keep batch order regardless of completion order.
    async fn fetch_batch(
        &self,
        start: Coordinate,
        batch: Vec<CandidateParameters>,
    ) -> Vec<FetchedCandidate> {
        let fetches = batch.into_iter().map(|parameters| async move {
            let waypoints = loop_waypoints(start, &parameters);
            match self.provider.fetch_closed_route(&waypoints).await {
                Ok(route) => Some(FetchedCandidate { parameters, route }),
                Err(err) => {
                    tracing::debug!(
                        bearing = parameters.primary_bearing_deg,
                        side = parameters.second_waypoint_side_deg,
                        "dropped candidate: {err}"
                    );
                    None
                }
            }
        });

        join_all(fetches).await.into_iter().flatten().collect()
    }
}
