use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use crate::error::{Error, Result};
use crate::geocode::GeocodingProvider;
use crate::model::{GeoPoint, ScoredRoute};
use crate::optimizer::Optimizer;
use crate::provider::RoutingProvider;

// Shared state for concurrency
pub struct AppState<P, G> {
    pub optimizer: Optimizer<P>,
    pub geocoder: G,
    latest_route: RwLock<Option<RouteFeatureCollection>>,
}

impl<P, G> AppState<P, G> {
    pub fn new(optimizer: Optimizer<P>, geocoder: G) -> Self {
        Self {
            optimizer,
            geocoder,
            latest_route: RwLock::new(None),
        }
    }
}

pub fn router<P, G>(state: Arc<AppState<P, G>>) -> Router
where
    P: RoutingProvider + 'static,
    G: GeocodingProvider + 'static,
{
    // Allows the front end to talk to this API from another origin
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/search/:keyword", get(search::<P, G>))
        .route("/api/reverse-search/:lon/:lat", get(reverse_search::<P, G>))
        .route("/api/optimize", post(optimize::<P, G>))
        .route("/api/results", get(results::<P, G>))
        .layer(cors)
        .with_state(state)
}

// --- API DTOs ---

#[derive(Deserialize)]
pub struct OptimizeRequest {
    source: Option<GeoPoint>,
    destinations: Option<Vec<GeoPoint>>,
}

#[derive(Clone, Debug, Serialize)]
pub struct RouteFeatureCollection {
    r#type: String,
    features: Vec<RouteFeature>,
}

#[derive(Clone, Debug, Serialize)]
struct RouteFeature {
    r#type: String,
    geometry: GeoJsonLineString,
    properties: RouteProperties,
}

#[derive(Clone, Debug, Serialize)]
struct GeoJsonLineString {
    r#type: String,
    coordinates: Vec<[f64; 2]>, // [lon, lat] standard for GeoJSON
}

#[derive(Clone, Debug, Serialize)]
struct RouteProperties {
    distance: f64,
    duration: f64,
    cost: f64,
}

impl From<ScoredRoute> for RouteFeatureCollection {
    fn from(scored: ScoredRoute) -> Self {
        let summary = scored.route.summary;
        Self {
            r#type: "FeatureCollection".to_string(),
            features: vec![RouteFeature {
                r#type: "Feature".to_string(),
                geometry: GeoJsonLineString {
                    r#type: "LineString".to_string(),
                    coordinates: scored.route.coordinates,
                },
                properties: RouteProperties {
                    distance: summary.distance_meters,
                    duration: summary.duration_seconds,
                    cost: scored.cost,
                },
            }],
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::TooManyCandidates { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::RoutingProvider { .. } | Error::Geocoding(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("{}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

// --- Handlers ---

async fn search<P, G: GeocodingProvider>(
    State(state): State<Arc<AppState<P, G>>>,
    Path(keyword): Path<String>,
) -> Result<Json<Value>> {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return Ok(Json(json!([])));
    }
    state.geocoder.search(keyword).await.map(Json)
}

async fn reverse_search<P, G: GeocodingProvider>(
    State(state): State<Arc<AppState<P, G>>>,
    Path((lon, lat)): Path<(String, String)>,
) -> Result<Json<Value>> {
    let (Ok(lon), Ok(lat)) = (lon.trim().parse::<f64>(), lat.trim().parse::<f64>()) else {
        return Ok(Json(json!([])));
    };
    let point = GeoPoint::new(lat, lon);
    if point.validate().is_err() {
        return Ok(Json(json!([])));
    }
    state.geocoder.reverse(&point).await.map(Json)
}

async fn optimize<P: RoutingProvider, G>(
    State(state): State<Arc<AppState<P, G>>>,
    payload: std::result::Result<Json<OptimizeRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(payload) = payload.map_err(|rejection| Error::InvalidInput(rejection.body_text()))?;
    let (source, destinations) = match (payload.source, payload.destinations) {
        (Some(source), Some(destinations)) if !destinations.is_empty() => (source, destinations),
        _ => {
            return Err(Error::InvalidInput(
                "Source and destinations are required".into(),
            ));
        }
    };
    source.validate()?;
    for destination in &destinations {
        destination.validate()?;
    }

    info!("Optimizing route through {} destinations", destinations.len());
    let Some(best) = state
        .optimizer
        .optimize_scored(&source, &destinations)
        .await?
    else {
        warn!("No candidate route found");
        return Ok((StatusCode::NOT_FOUND, Json(json!({ "error": "No route found" }))).into_response());
    };

    let route = RouteFeatureCollection::from(best);
    *state.latest_route.write().await = Some(route.clone());
    Ok(Json(route).into_response())
}

async fn results<P, G>(State(state): State<Arc<AppState<P, G>>>) -> Response {
    match state.latest_route.read().await.as_ref() {
        Some(route) => Json(route.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, "No route data found").into_response(),
    }
}
