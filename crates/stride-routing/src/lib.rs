//! Walking/running routes between two points from an OSRM server.

use model::RouteData;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    #[error("no route between the given points")]
    NoRoute,
    #[error("routing request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("bad routing response: {0}")]
    Parse(#[from] serde_json::Error),
}

/// `(latitude, longitude)` in degrees.
pub type LatLng = (f64, f64);

#[async_trait::async_trait]
pub trait RoutingService: Send + Sync {
    async fn route(&self, from: LatLng, to: LatLng) -> Result<RouteData, RoutingError>;
}

#[derive(Clone, Debug)]
pub struct OsrmConfig {
    pub base_url: String,
    pub profile: String,
    pub timeout: Duration,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://router.project-osrm.org".into(),
            profile: "foot".into(),
            timeout: Duration::from_secs(15),
        }
    }
}

pub struct OsrmClient {
    cfg: OsrmConfig,
    client: reqwest::Client,
}

impl OsrmClient {
    pub fn new(cfg: OsrmConfig) -> Result<Self, RoutingError> {
        let client = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .user_agent(concat!("stride/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { cfg, client })
    }

    pub fn url(&self, from: LatLng, to: LatLng) -> String {
        build_url(&self.cfg, from, to)
    }
}

#[async_trait::async_trait]
impl RoutingService for OsrmClient {
    async fn route(&self, from: LatLng, to: LatLng) -> Result<RouteData, RoutingError> {
        let url = self.url(from, to);
        log::debug!("GET {url}");
        let body = self.client.get(&url).send().await?.error_for_status()?.text().await?;
        parse_response(&body)
    }
}

/// OSRM wants `lng,lat` pairs.
pub fn build_url(cfg: &OsrmConfig, from: LatLng, to: LatLng) -> String {
    format!(
        "{}/route/v1/{}/{},{};{},{}?overview=full&geometries=geojson",
        cfg.base_url.trim_end_matches('/'),
        cfg.profile,
        from.1,
        from.0,
        to.1,
        to.0
    )
}

#[derive(Deserialize)]
struct OsrmResponse {
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Deserialize)]
struct OsrmRoute {
    distance: f64,
    duration: f64,
    geometry: Geometry,
}

#[derive(Deserialize)]
struct Geometry {
    #[serde(default)]
    coordinates: Vec<[f64; 2]>,
}

/// First route of an OSRM response. Distance is rounded to 10 m, duration
/// to whole minutes; geometry stays `[lng, lat]`.
pub fn parse_response(body: &str) -> Result<RouteData, RoutingError> {
    let resp: OsrmResponse = serde_json::from_str(body)?;
    let route = resp.routes.into_iter().next().ok_or(RoutingError::NoRoute)?;
    Ok(RouteData {
        distance_km: (route.distance / 1000.0 * 100.0).round() / 100.0,
        duration_min: (route.duration / 60.0).round(),
        geometry: route.geometry.coordinates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_url_is_lng_lat() {
        let url = build_url(&OsrmConfig::default(), (40.4168, -3.7038), (40.4200, -3.6900));
        assert_eq!(
            url,
            "https://router.project-osrm.org/route/v1/foot/-3.7038,40.4168;-3.69,40.42?overview=full&geometries=geojson"
        );
        let cfg = OsrmConfig { base_url: "http://localhost:5000/".into(), profile: "bike".into(), ..Default::default() };
        assert!(build_url(&cfg, (1.0, 2.0), (3.0, 4.0)).starts_with("http://localhost:5000/route/v1/bike/2,1;4,3?"));
    }

    #[test]
    fn test_parse_first_route() {
        let body = r#"{
            "code": "Ok",
            "routes": [
                {"distance": 2345.6, "duration": 1689.0,
                 "geometry": {"type": "LineString", "coordinates": [[-3.7038, 40.4168], [-3.69, 40.42]]}},
                {"distance": 9999.0, "duration": 1.0, "geometry": {"coordinates": []}}
            ]
        }"#;
        let r = parse_response(body).unwrap();
        assert_relative_eq!(r.distance_km, 2.35);
        assert_relative_eq!(r.duration_min, 28.0);
        assert_eq!(r.geometry, vec![[-3.7038, 40.4168], [-3.69, 40.42]]);
    }

    #[test]
    fn test_no_route_and_garbage() {
        assert!(matches!(parse_response(r#"{"code":"NoRoute","routes":[]}"#), Err(RoutingError::NoRoute)));
        assert!(matches!(parse_response(r#"{"code":"NoRoute"}"#), Err(RoutingError::NoRoute)));
        assert!(matches!(parse_response("<html>"), Err(RoutingError::Parse(_))));
    }
}
