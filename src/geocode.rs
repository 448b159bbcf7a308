//! Geocoding passthrough (Nominatim).

use std::future::Future;

use reqwest::Client;
use serde_json::Value;
use tracing::warn;

use crate::error::{Error, Result};
use crate::model::GeoPoint;

const USER_AGENT: &str = "floodroute/0.1";

pub trait GeocodingProvider: Send + Sync {
    /// Forward search. The provider's JSON is returned as-is.
    fn search(&self, query: &str) -> impl Future<Output = Result<Value>> + Send;

    fn reverse(&self, point: &GeoPoint) -> impl Future<Output = Result<Value>> + Send;
}

pub struct NominatimClient {
    client: Client,
    base_url: String,
    viewbox: String,
}

impl NominatimClient {
    pub fn new(client: Client, base_url: impl Into<String>, viewbox: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            viewbox: viewbox.into(),
        }
    }

    fn search_params<'a>(&'a self, query: &'a str) -> [(&'static str, &'a str); 6] {
        [
            ("format", "json"),
            ("q", query),
            ("limit", "5"),
            ("addressdetails", "1"),
            ("viewbox", self.viewbox.as_str()),
            ("bounded", "1"),
        ]
    }

    async fn get<Q: serde::Serialize + ?Sized>(&self, endpoint: &str, params: &Q) -> Result<Value> {
        let resp = self
            .client
            .get(format!("{}/{}", self.base_url, endpoint))
            .query(params)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .map_err(|e| Error::Geocoding(e.to_string()))?;

        if !resp.status().is_success() {
            warn!("Geocoder {} returned {}", endpoint, resp.status());
            return Ok(Value::Array(vec![]));
        }
        resp.json().await.map_err(|e| Error::Geocoding(e.to_string()))
    }
}

impl GeocodingProvider for NominatimClient {
    async fn search(&self, query: &str) -> Result<Value> {
        self.get("search", &self.search_params(query)).await
    }

    async fn reverse(&self, point: &GeoPoint) -> Result<Value> {
        let lat = point.lat().to_string();
        let lon = point.lon().to_string();
        let params = [
            ("format", "json"),
            ("lat", lat.as_str()),
            ("lon", lon.as_str()),
            ("addressdetails", "1"),
        ];
        self.get("reverse", &params).await
    }
}
