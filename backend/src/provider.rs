use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::{
    error::ProviderError,
    models::{Coordinate, RawRoute},
};

pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_millis(7_000);

/// Source of real-world walking paths through an ordered list of points.
///
/// Implementations report every failure (network, status, empty result,
/// timeout) as a [`ProviderError`]; callers decide whether to drop or retry.
#[async_trait]
pub trait RouteProvider: Send + Sync {
    /// Fetch a path visiting `waypoints` in order. For a loop the first and
    /// last waypoint are the same start point.
    async fn fetch_closed_route(&self, waypoints: &[Coordinate]) -> Result<RawRoute, ProviderError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Outbound HTTP capability injected into [`OsrmProvider`].
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse, ProviderError>;
}

pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("walk-recommender/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, ProviderError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| ProviderError::Unavailable(err.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|err| ProviderError::Unavailable(err.to_string()))?;

        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub base_url: String,
    pub profile: String,
    pub timeout: Duration,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            profile: "foot".to_string(),
            timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    #[serde(default)]
    distance: f64,
    duration: Option<f64>,
    geometry: OsrmGeometry,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    coordinates: Vec<[f64; 2]>,
}

/// OSRM `route` service adapter.
pub struct OsrmProvider<T> {
    transport: T,
    settings: ProviderSettings,
}

impl<T: HttpTransport> OsrmProvider<T> {
    pub fn new(transport: T, settings: ProviderSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    pub fn route_url(&self, waypoints: &[Coordinate]) -> String {
        let coords = waypoints
            .iter()
            .map(|c| format!("{},{}", c.lng, c.lat))
            .collect::<Vec<_>>()
            .join(";");

        format!(
            "{}/route/v1/{}/{}?overview=full&geometries=geojson&steps=false",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.profile,
            coords
        )
    }

    async fn request(&self, url: &str) -> Result<RawRoute, ProviderError> {
        let response = self.transport.get(url).await?;
        if !response.is_success() {
            return Err(ProviderError::Unavailable(format!(
                "OSRM returned status {}",
                response.status
            )));
        }

        let parsed: OsrmResponse = serde_json::from_slice(&response.body)
            .map_err(|err| ProviderError::Unavailable(format!("malformed OSRM response: {err}")))?;
        let route = parsed
            .routes
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Unavailable("OSRM returned no route".to_string()))?;
        if route.geometry.coordinates.is_empty() {
            return Err(ProviderError::Unavailable(
                "OSRM returned an empty geometry".to_string(),
            ));
        }

        Ok(RawRoute {
            distance_m: route.distance,
            provider_duration_sec: route.duration,
            coordinates: route.geometry.coordinates,
        })
    }
}

#[async_trait]
impl<T: HttpTransport> RouteProvider for OsrmProvider<T> {
    async fn fetch_closed_route(
        &self,
        waypoints: &[Coordinate],
    ) -> Result<RawRoute, ProviderError> {
        let url = self.route_url(waypoints);
        // Dropping the request future on timeout aborts the connection.
        match tokio::time::timeout(self.settings.timeout, self.request(&url)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(self.settings.timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct CannedTransport {
        status: u16,
        body: String,
        requested: Mutex<Vec<String>>,
    }

    impl CannedTransport {
        fn new(status: u16, body: &str) -> Self {
            Self {
                status,
                body: body.to_string(),
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl HttpTransport for CannedTransport {
        async fn get(&self, url: &str) -> Result<HttpResponse, ProviderError> {
            self.requested.lock().unwrap().push(url.to_string());
            Ok(HttpResponse {
                status: self.status,
                body: self.body.clone().into_bytes(),
            })
        }
    }

    struct HangingTransport;

    #[async_trait]
    impl HttpTransport for HangingTransport {
        async fn get(&self, _url: &str) -> Result<HttpResponse, ProviderError> {
            std::future::pending().await
        }
    }

    fn loop_waypoints() -> Vec<Coordinate> {
        let start = Coordinate::new(37.5, 127.03);
        vec![
            start,
            Coordinate::new(37.505, 127.035),
            Coordinate::new(37.498, 127.031),
            start,
        ]
    }

    const OK_BODY: &str = r#"{
        "code": "Ok",
        "routes": [
            {"distance": 1523.4, "duration": 1100.0,
             "geometry": {"type": "LineString", "coordinates": [[127.03, 37.5], [127.035, 37.505], [127.03, 37.5]]}},
            {"distance": 9999.0, "geometry": {"type": "LineString", "coordinates": [[0.0, 0.0]]}}
        ]
    }"#;

    #[test]
    fn test_route_url_encodes_lng_lat_pairs() {
        let provider = OsrmProvider::new(
            CannedTransport::new(200, OK_BODY),
            ProviderSettings {
                base_url: "http://osrm.local:5000/".to_string(),
                ..ProviderSettings::default()
            },
        );
        assert_eq!(
            provider.route_url(&loop_waypoints()),
            "http://osrm.local:5000/route/v1/foot/127.03,37.5;127.035,37.505;127.031,37.498;127.03,37.5\
             ?overview=full&geometries=geojson&steps=false"
        );
    }

    #[tokio::test]
    async fn test_fetch_uses_first_route() {
        let provider = OsrmProvider::new(
            CannedTransport::new(200, OK_BODY),
            ProviderSettings::default(),
        );
        let route = provider.fetch_closed_route(&loop_waypoints()).await.unwrap();

        assert_eq!(route.distance_m, 1523.4);
        assert_eq!(route.provider_duration_sec, Some(1100.0));
        assert_eq!(route.coordinates.len(), 3);
        assert_eq!(provider.transport.requested.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_distance_reads_as_zero() {
        let body = r#"{"routes":[{"geometry":{"coordinates":[[127.0,37.5],[127.0,37.5]]}}]}"#;
        let provider =
            OsrmProvider::new(CannedTransport::new(200, body), ProviderSettings::default());
        let route = provider.fetch_closed_route(&loop_waypoints()).await.unwrap();
        assert_eq!(route.distance_m, 0.0);
        assert_eq!(route.provider_duration_sec, None);
    }

    #[tokio::test]
    async fn test_error_status_is_unavailable() {
        let provider = OsrmProvider::new(
            CannedTransport::new(400, r#"{"code":"InvalidQuery"}"#),
            ProviderSettings::default(),
        );
        let err = provider.fetch_closed_route(&loop_waypoints()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable(msg) if msg.contains("400")));
    }

    #[tokio::test]
    async fn test_empty_or_malformed_response_is_unavailable() {
        let bodies = [
            r#"{"code":"NoRoute","routes":[]}"#,
            r#"{"code":"Ok"}"#,
            "not json",
            r#"{"routes":[{"distance":5.0,"geometry":{"coordinates":[]}}]}"#,
        ];
        for body in bodies {
            let provider =
                OsrmProvider::new(CannedTransport::new(200, body), ProviderSettings::default());
            let err = provider.fetch_closed_route(&loop_waypoints()).await.unwrap_err();
            assert!(matches!(err, ProviderError::Unavailable(_)), "{body}: {err:?}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_provider_times_out() {
        let provider = OsrmProvider::new(HangingTransport, ProviderSettings::default());
        let err = provider.fetch_closed_route(&loop_waypoints()).await.unwrap_err();
        assert_eq!(err, ProviderError::Timeout(DEFAULT_PROVIDER_TIMEOUT));
    }
}
