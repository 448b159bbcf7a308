use std::sync::Arc;

use reqwest::Client;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use floodroute::api::{self, AppState};
use floodroute::config::AppConfig;
use floodroute::cost::CostEvaluator;
use floodroute::flood::{FloodWeightEvaluator, DEFAULT_FLOOD_WEIGHTS};
use floodroute::geocode::NominatimClient;
use floodroute::hazard::HazardIndex;
use floodroute::provider::OrsClient;
use floodroute::Optimizer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = AppConfig::from_env()?;

    // 1. Flood layers. Nothing is served with a partial index.
    let index = HazardIndex::build(&cfg.flood_layers, &cfg.severity_field, cfg.overlap_policy)?;
    let flood = Arc::new(FloodWeightEvaluator::new(index, DEFAULT_FLOOD_WEIGHTS.clone())?);

    // 2. External providers
    if cfg.ors_api_key.is_none() {
        warn!("ORS_API_KEY is not set, routing requests will be rejected by the provider");
    }
    let client = Client::builder().timeout(cfg.request_timeout).build()?;
    let provider = OrsClient::new(
        client.clone(),
        cfg.ors_base_url.clone(),
        cfg.ors_api_key.clone(),
        cfg.limits.max_alternatives_per_leg,
    );
    let geocoder = NominatimClient::new(client, cfg.nominatim_url.clone(), cfg.geocode_viewbox.clone());

    // 3. Router
    let optimizer = Optimizer::new(provider, CostEvaluator::new(flood), cfg.limits);
    let app = api::router(Arc::new(AppState::new(optimizer, geocoder)));

    info!("API server running on http://{}", cfg.bind);
    let listener = tokio::net::TcpListener::bind(&cfg.bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
