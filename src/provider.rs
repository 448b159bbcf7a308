//! Routing provider boundary.
//!
//! The optimizer never computes paths itself. It asks a [`RoutingProvider`]
//! for a handful of alternative polylines per leg. [`OrsClient`] is the
//! OpenRouteService implementation used in production.

use std::future::Future;

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::model::{GeoPoint, RouteSegment, RouteSummary};

pub trait RoutingProvider: Send + Sync {
    /// Alternative paths from `origin` to `destination`, best first.
    fn alternatives(
        &self,
        origin: &GeoPoint,
        destination: &GeoPoint,
    ) -> impl Future<Output = Result<Vec<RouteSegment>>> + Send;
}

pub struct OrsClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    alternative_count: usize,
}

impl OrsClient {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
        alternative_count: usize,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            alternative_count,
        }
    }

    fn directions_url(&self) -> String {
        format!("{}/v2/directions/driving-car/geojson", self.base_url)
    }

    fn request_body(&self, origin: &GeoPoint, destination: &GeoPoint) -> serde_json::Value {
        json!({
            "coordinates": [origin.lon_lat(), destination.lon_lat()],
            "alternative_routes": { "target_count": self.alternative_count },
        })
    }
}

impl RoutingProvider for OrsClient {
    async fn alternatives(
        &self,
        origin: &GeoPoint,
        destination: &GeoPoint,
    ) -> Result<Vec<RouteSegment>> {
        let body = self.request_body(origin, destination);
        debug!("Segment coordinates: {}", body["coordinates"]);

        let mut req = self.client.post(self.directions_url()).json(&body);
        if let Some(key) = &self.api_key {
            req = req.header(reqwest::header::AUTHORIZATION, key);
        }
        let resp = req.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!("Routing provider returned {}: {}", status, text);
            return Err(Error::RoutingProvider {
                status: Some(status.as_u16()),
                message: text,
            });
        }

        let collection: OrsFeatureCollection =
            resp.json().await.map_err(|e| Error::RoutingProvider {
                status: Some(status.as_u16()),
                message: format!("unreadable response: {e}"),
            })?;
        debug!("Routing provider returned {} alternatives", collection.features.len());
        Ok(collection.into_segments())
    }
}

// --- ORS GeoJSON response ---

#[derive(Debug, Deserialize)]
struct OrsFeatureCollection {
    #[serde(default)]
    features: Vec<OrsFeature>,
}

#[derive(Debug, Deserialize)]
struct OrsFeature {
    geometry: OrsLineString,
    #[serde(default)]
    properties: OrsProperties,
}

#[derive(Debug, Deserialize)]
struct OrsLineString {
    coordinates: Vec<Vec<f64>>,
}

#[derive(Debug, Default, Deserialize)]
struct OrsProperties {
    #[serde(default)]
    summary: OrsSummary,
}

#[derive(Debug, Default, Deserialize)]
struct OrsSummary {
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    duration: f64,
}

impl OrsFeatureCollection {
    fn into_segments(self) -> Vec<RouteSegment> {
        self.features
            .into_iter()
            .map(|f| RouteSegment {
                // ORS may append elevation; only lon/lat matter here
                coordinates: f
                    .geometry
                    .coordinates
                    .iter()
                    .filter_map(|c| match c.as_slice() {
                        [lon, lat, ..] => Some([*lon, *lat]),
                        _ => None,
                    })
                    .collect(),
                summary: RouteSummary {
                    distance_meters: f.properties.summary.distance,
                    duration_seconds: f.properties.summary.duration,
                },
            })
            .collect()
    }
}
