//! Driving routes from the store to a destination.
//!
//! A route only refines a quote (distance override and ETA fallback), so
//! providers are optional and their failures are logged and ignored by the
//! session.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use storefront_core::fields;
use storefront_core::shipping::{LatLng, Route};
use url::Url;

use crate::envelope;
use crate::error::{Error, Result};
use crate::transport::Transport;

/// Computes driving routes.
#[async_trait]
pub trait RouteProvider: Send + Sync {
    /// Route from `from` to `to`.
    async fn route(&self, from: LatLng, to: LatLng) -> Result<Route>;
}

/// OSRM `route/v1/driving` over a [`Transport`].
#[derive(Clone)]
pub struct OsrmRouteProvider {
    transport: Arc<dyn Transport>,
    base: String,
    timeout: Duration,
}

impl std::fmt::Debug for OsrmRouteProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OsrmRouteProvider")
            .field("base", &self.base)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl OsrmRouteProvider {
    /// Creates a provider for an OSRM server root such as
    /// `https://router.project-osrm.org`.
    pub fn new(transport: Arc<dyn Transport>, base: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            transport,
            base: base.into().trim().trim_end_matches('/').to_string(),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// Request URL for a route.
    pub fn route_url(&self, from: LatLng, to: LatLng) -> Result<Url> {
        let raw = format!(
            "{}/route/v1/driving/{},{};{},{}",
            self.base, from.lng, from.lat, to.lng, to.lat
        );
        let mut url = Url::parse(&raw).map_err(|e| Error::transport(&raw, e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("overview", "full")
            .append_pair("geometries", "geojson");
        Ok(url)
    }
}

/// Reads the first route of an OSRM answer.
pub fn parse_osrm(value: &Value) -> Option<Route> {
    let first = value.get("routes")?.as_array()?.first()?;
    let meters = first.get("distance").map(fields::as_f64)?;
    if !meters.is_finite() {
        return None;
    }
    let eta_min = first
        .get("duration")
        .map(fields::as_f64)
        .filter(|s| s.is_finite())
        .map(|s| (s / 60.0).round() as i64);
    Some(Route {
        distance_km: meters / 1000.0,
        eta_min,
        geometry: first.get("geometry").cloned(),
    })
}

#[async_trait]
impl RouteProvider for OsrmRouteProvider {
    async fn route(&self, from: LatLng, to: LatLng) -> Result<Route> {
        let url = self.route_url(from, to)?;
        let response = tokio::time::timeout(self.timeout, self.transport.get(url.as_str()))
            .await
            .map_err(|_| Error::Timeout {
                ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            })??;
        if !response.is_success() {
            return Err(Error::transport(url.as_str(), format!("status {}", response.status)));
        }
        let value = envelope::parse_body(response.status, &response.body);
        parse_osrm(&value).ok_or_else(|| Error::invalid_response("route", "no routes"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::transport::mock::{MockReply, MockTransport};
    use serde_json::json;

    #[test]
    fn test_route_url() {
        let p = OsrmRouteProvider::new(Arc::new(MockTransport::default()), "https://osrm.test/", 1000);
        let url = p
            .route_url(LatLng::new(3.5, 98.7), LatLng::new(3.6, 98.8))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://osrm.test/route/v1/driving/98.7,3.5;98.8,3.6?overview=full&geometries=geojson"
        );
    }

    #[test]
    fn test_parse_osrm() {
        let route = parse_osrm(&json!({"routes": [{"distance": 3210.0, "duration": 545.0}]})).unwrap();
        assert!((route.distance_km - 3.21).abs() < 1e-9);
        assert_eq!(route.eta_min, Some(9));
        assert!(parse_osrm(&json!({"routes": []})).is_none());
    }

    #[tokio::test]
    async fn test_route_over_transport() {
        let mock = Arc::new(MockTransport::default());
        mock.push(MockReply::json(200, json!({"routes": [{"distance": 1500, "duration": 300}]})));
        mock.push(MockReply::text(502, "bad gateway"));
        let p = OsrmRouteProvider::new(mock.clone(), "https://osrm.test", 1000);
        let a = LatLng::new(3.5, 98.7);

        let route = p.route(a, a).await.unwrap();
        assert_eq!(route.eta_min, Some(5));
        assert!(p.route(a, a).await.is_err());
        assert_eq!(mock.requests()[0].method, "GET");
    }
}
