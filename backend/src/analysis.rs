//! Qualitative descriptors derived from raw route geometry.
//!
//! Two measurements drive everything:
//! - turn density, from forward-azimuth bearings sampled every
//!   [`BEARING_STRIDE`] positions
//! - self-overlap, from how often the path revisits the same
//!   [`GRID_CELL_M`] grid cell
//!
//! Both are guarded against empty paths and zero distances, so analysis
//! never fails.

use std::collections::HashSet;

use crate::models::{RawRoute, RouteTraits};
use crate::projection::METERS_PER_DEGREE_LAT;

const BEARING_STRIDE: usize = 6;
const TURN_THRESHOLD_DEG: f64 = 25.0;
const SHARP_TURN_THRESHOLD_DEG: f64 = 60.0;
const GRID_CELL_M: f64 = 25.0;
const MIN_DISTANCE_KM: f64 = 0.001;

const ALLEY_TURNS_PER_KM: f64 = 12.0;
const AVENUE_TURNS_PER_KM: f64 = 6.0;
const SINGLE_LOOP_MAX_REPEAT: f64 = 0.15;
const SINGLE_LOOP_MAX_HALF_OVERLAP: f64 = 0.35;
const THERE_AND_BACK_MIN_REPEAT: f64 = 0.35;
const THERE_AND_BACK_MIN_HALF_OVERLAP: f64 = 0.6;
const HIGH_DIRECTION_CHANGE_RATIO: f64 = 0.25;

const OPENING_SENTENCE: &str = "This route brings you back to where you started.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreetCharacter {
    AlleyHeavy,
    AvenueHeavy,
    Mixed,
}

impl StreetCharacter {
    fn from_turns_per_km(turns_per_km: f64) -> Self {
        if turns_per_km > ALLEY_TURNS_PER_KM {
            Self::AlleyHeavy
        } else if turns_per_km < AVENUE_TURNS_PER_KM {
            Self::AvenueHeavy
        } else {
            Self::Mixed
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::AlleyHeavy => "alley-heavy",
            Self::AvenueHeavy => "avenue-heavy",
            Self::Mixed => "mixed",
        }
    }

    fn sentence(self) -> &'static str {
        match self {
            Self::AlleyHeavy => "Frequent turns give it the feel of winding back alleys.",
            Self::AvenueHeavy => "Long stretches along main roads keep the pace steady.",
            Self::Mixed => "Main roads and side streets alternate, so it never gets dull.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopCharacter {
    SingleLoop,
    ThereAndBack,
    Mixed,
}

impl LoopCharacter {
    fn from_overlap(repeat_ratio: f64, half_overlap_ratio: f64) -> Self {
        if repeat_ratio < SINGLE_LOOP_MAX_REPEAT
            && half_overlap_ratio < SINGLE_LOOP_MAX_HALF_OVERLAP
        {
            Self::SingleLoop
        } else if repeat_ratio > THERE_AND_BACK_MIN_REPEAT
            || half_overlap_ratio > THERE_AND_BACK_MIN_HALF_OVERLAP
        {
            Self::ThereAndBack
        } else {
            Self::Mixed
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::SingleLoop => "single-loop",
            Self::ThereAndBack => "there-and-back",
            Self::Mixed => "mixed",
        }
    }

    fn sentence(self) -> &'static str {
        match self {
            Self::SingleLoop => {
                "The way out and the way back barely overlap, so it feels like one full lap."
            }
            Self::ThereAndBack => {
                "Much of the return retraces the way out, like an out-and-back walk."
            }
            Self::Mixed => "Some stretches repeat while others are new.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionChange {
    High,
    Simple,
}

impl DirectionChange {
    fn from_sharp_turn_ratio(ratio: f64) -> Self {
        if ratio > HIGH_DIRECTION_CHANGE_RATIO {
            Self::High
        } else {
            Self::Simple
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::High => "high direction change",
            Self::Simple => "simple path",
        }
    }

    fn sentence(self) -> &'static str {
        match self {
            Self::High => "Expect plenty of sharp changes of direction.",
            Self::Simple => "The path itself is easy to follow.",
        }
    }
}

/// Raw geometry measurements behind the classification.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PathMetrics {
    pub turn_count: usize,
    pub sharp_turn_count: usize,
    pub turns_per_km: f64,
    pub sharp_turn_ratio: f64,
    pub repeat_ratio: f64,
    pub half_overlap_ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub street: StreetCharacter,
    pub loop_shape: LoopCharacter,
    pub direction: DirectionChange,
}

impl Classification {
    pub fn from_metrics(metrics: &PathMetrics) -> Self {
        Self {
            street: StreetCharacter::from_turns_per_km(metrics.turns_per_km),
            loop_shape: LoopCharacter::from_overlap(
                metrics.repeat_ratio,
                metrics.half_overlap_ratio,
            ),
            direction: DirectionChange::from_sharp_turn_ratio(metrics.sharp_turn_ratio),
        }
    }

    pub fn into_traits(self) -> RouteTraits {
        let tags = vec![
            self.street.label().to_string(),
            self.loop_shape.label().to_string(),
            self.direction.label().to_string(),
        ];
        let explanation = [
            OPENING_SENTENCE,
            self.street.sentence(),
            self.loop_shape.sentence(),
            self.direction.sentence(),
        ]
        .join(" ");

        RouteTraits { tags, explanation }
    }
}

pub fn analyze_route(route: &RawRoute) -> RouteTraits {
    let metrics = measure(route);
    tracing::trace!(?metrics, "measured route geometry");
    Classification::from_metrics(&metrics).into_traits()
}

pub fn measure(route: &RawRoute) -> PathMetrics {
    let distance_km = (route.distance_m / 1000.0).max(MIN_DISTANCE_KM);
    let coords = &route.coordinates;

    let mut turn_count = 0;
    let mut sharp_turn_count = 0;
    let mut prev_bearing: Option<f64> = None;

    let mut i = 0;
    while i + BEARING_STRIDE < coords.len() {
        let bearing = bearing_deg(coords[i], coords[i + BEARING_STRIDE]);
        if let Some(prev) = prev_bearing {
            let diff = wrap_angle_diff(prev, bearing);
            if diff >= TURN_THRESHOLD_DEG {
                turn_count += 1;
            }
            if diff >= SHARP_TURN_THRESHOLD_DEG {
                sharp_turn_count += 1;
            }
        }
        prev_bearing = Some(bearing);
        i += BEARING_STRIDE;
    }

    let sharp_turn_ratio = if turn_count > 0 {
        sharp_turn_count as f64 / turn_count as f64
    } else {
        0.0
    };

    let (repeat_ratio, half_overlap_ratio) = overlap_ratios(coords);

    PathMetrics {
        turn_count,
        sharp_turn_count,
        turns_per_km: turn_count as f64 / distance_km,
        sharp_turn_ratio,
        repeat_ratio,
        half_overlap_ratio,
    }
}

/// Forward azimuth from `a` to `b`, both `[lng, lat]`, in `[0, 360)`.
fn bearing_deg(a: [f64; 2], b: [f64; 2]) -> f64 {
    let [lng1, lat1] = a;
    let [lng2, lat2] = b;
    let (lat1, lat2) = (lat1.to_radians(), lat2.to_radians());
    let d_lng = (lng2 - lng1).to_radians();

    let y = d_lng.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lng.cos();
    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

/// Smallest angle between two bearings, in `[0, 180]`.
fn wrap_angle_diff(before: f64, after: f64) -> f64 {
    (((after - before + 540.0) % 360.0) - 180.0).abs()
}

fn grid_key([lng, lat]: [f64; 2]) -> (i64, i64) {
    let x = lng * METERS_PER_DEGREE_LAT * lat.to_radians().cos() / GRID_CELL_M;
    let y = lat * METERS_PER_DEGREE_LAT / GRID_CELL_M;
    (x.round() as i64, y.round() as i64)
}

/// `(repeat_ratio, half_overlap_ratio)` over the grid cells the path visits.
fn overlap_ratios(coords: &[[f64; 2]]) -> (f64, f64) {
    let keys: Vec<(i64, i64)> = coords.iter().copied().map(grid_key).collect();
    let n = keys.len();
    if n == 0 {
        return (0.0, 0.0);
    }

    let unique: HashSet<&(i64, i64)> = keys.iter().collect();
    let repeat_ratio = 1.0 - unique.len() as f64 / n as f64;

    let half = n / 2;
    let first_half: HashSet<&(i64, i64)> = keys[..half].iter().collect();
    let second_half = &keys[half..];
    let overlap = second_half
        .iter()
        .filter(|key| first_half.contains(key))
        .count();
    let half_overlap_ratio = overlap as f64 / second_half.len() as f64;

    (repeat_ratio, half_overlap_ratio)
}
