#![allow(dead_code)]

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use walk_recommender::{
    error::ProviderError,
    models::{Coordinate, RawRoute},
    projection::METERS_PER_DEGREE_LAT,
    provider::RouteProvider,
    recommend::Recommender,
};

pub const START: Coordinate = Coordinate {
    lat: 37.50,
    lng: 127.03,
};

fn closed_geometry(waypoints: &[Coordinate]) -> Vec<[f64; 2]> {
    waypoints.iter().map(|c| c.to_position()).collect()
}

/// Returns the waypoints themselves as geometry with a fixed distance.
pub struct FixedDistanceProvider {
    pub distance_m: f64,
    pub duration_sec: Option<f64>,
    pub calls: AtomicUsize,
}

impl FixedDistanceProvider {
    pub fn new(distance_m: f64) -> Self {
        Self {
            distance_m,
            duration_sec: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_duration(distance_m: f64, duration_sec: f64) -> Self {
        Self {
            duration_sec: Some(duration_sec),
            ..Self::new(distance_m)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RouteProvider for FixedDistanceProvider {
    async fn fetch_closed_route(
        &self,
        waypoints: &[Coordinate],
    ) -> Result<RawRoute, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(RawRoute {
            distance_m: self.distance_m,
            provider_duration_sec: self.duration_sec,
            coordinates: closed_geometry(waypoints),
        })
    }
}

/// Distance is the waypoint polygon's perimeter scaled by `detour`, so every
/// candidate gets a different, reproducible score.
pub struct PerimeterProvider {
    pub detour: f64,
}

#[async_trait]
impl RouteProvider for PerimeterProvider {
    async fn fetch_closed_route(
        &self,
        waypoints: &[Coordinate],
    ) -> Result<RawRoute, ProviderError> {
        let lng_scale = METERS_PER_DEGREE_LAT * START.lat.to_radians().cos();
        let perimeter: f64 = waypoints
            .windows(2)
            .map(|w| {
                let dx = (w[1].lng - w[0].lng) * lng_scale;
                let dy = (w[1].lat - w[0].lat) * METERS_PER_DEGREE_LAT;
                (dx * dx + dy * dy).sqrt()
            })
            .sum();

        Ok(RawRoute {
            distance_m: perimeter * self.detour,
            provider_duration_sec: Some(1.0),
            coordinates: closed_geometry(waypoints),
        })
    }
}

/// Fails every request.
#[derive(Default)]
pub struct FailingProvider {
    pub calls: AtomicUsize,
}

impl FailingProvider {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RouteProvider for FailingProvider {
    async fn fetch_closed_route(
        &self,
        _waypoints: &[Coordinate],
    ) -> Result<RawRoute, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ProviderError::Unavailable("connection refused".to_string()))
    }
}

/// Bearing from `origin` to `point` in whole degrees, on the same flat-earth
/// scale the waypoint projection uses.
fn bearing_to(origin: Coordinate, point: Coordinate) -> u32 {
    let dx = (point.lng - origin.lng) * METERS_PER_DEGREE_LAT * origin.lat.to_radians().cos();
    let dy = (point.lat - origin.lat) * METERS_PER_DEGREE_LAT;
    let deg = dx.atan2(dy).to_degrees().rem_euclid(360.0).round();
    (deg as u32) % 360
}

/// Succeeds only when the primary waypoint lies on a bearing that the coarse
/// 60 degree grid skips but the 30 degree grid reaches (30, 90, ... 330).
pub struct MediumGridProvider {
    pub distance_m: f64,
    pub calls: AtomicUsize,
}

impl MediumGridProvider {
    pub fn new(distance_m: f64) -> Self {
        Self {
            distance_m,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RouteProvider for MediumGridProvider {
    async fn fetch_closed_route(
        &self,
        waypoints: &[Coordinate],
    ) -> Result<RawRoute, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if bearing_to(waypoints[0], waypoints[1]) % 60 != 30 {
            return Err(ProviderError::Unavailable("no route".to_string()));
        }
        Ok(RawRoute {
            distance_m: self.distance_m,
            provider_duration_sec: None,
            coordinates: closed_geometry(waypoints),
        })
    }
}

pub fn recommender(provider: Arc<dyn RouteProvider>) -> Recommender {
    Recommender::new(provider)
}
