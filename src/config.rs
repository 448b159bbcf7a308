use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::assembler::CandidateLimits;
use crate::error::{Error, Result};
use crate::hazard::{OverlapPolicy, ReturnPeriod};

/// Return periods shipped with the application and their file names.
const FLOOD_LAYER_FILES: [(ReturnPeriod, &str); 3] = [
    (5, "y5_floods.geojson"),
    (25, "y25_floods.geojson"),
    (100, "y100_floods.geojson"),
];

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind: String,
    pub ors_api_key: Option<String>,
    pub ors_base_url: String,
    pub nominatim_url: String,
    /// `left,top,right,bottom`, the area forward searches are bounded to.
    pub geocode_viewbox: String,
    pub flood_layers: Vec<(ReturnPeriod, PathBuf)>,
    pub severity_field: String,
    pub overlap_policy: OverlapPolicy,
    pub limits: CandidateLimits,
    pub request_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".into(),
            ors_api_key: None,
            ors_base_url: "https://api.openrouteservice.org".into(),
            nominatim_url: "https://nominatim.openstreetmap.org".into(),
            geocode_viewbox: "120.84,14.85,121.15,14.53".into(),
            flood_layers: flood_layers_in("static/data/flooding_data"),
            severity_field: "Var".into(),
            overlap_policy: OverlapPolicy::default(),
            limits: CandidateLimits::default(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl AppConfig {
    /// Defaults overridden by whatever is set in the environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = var("BIND_ADDR") {
            cfg.bind = v;
        }
        cfg.ors_api_key = var("ORS_API_KEY");
        if let Some(v) = var("ORS_BASE_URL") {
            cfg.ors_base_url = v;
        }
        if let Some(v) = var("NOMINATIM_URL") {
            cfg.nominatim_url = v;
        }
        if let Some(v) = var("GEOCODE_VIEWBOX") {
            cfg.geocode_viewbox = v;
        }
        if let Some(v) = var("FLOOD_DATA_DIR") {
            cfg.flood_layers = flood_layers_in(v);
        }
        if let Some(v) = var("FLOOD_SEVERITY_FIELD") {
            cfg.severity_field = v;
        }
        if let Some(v) = var("FLOOD_OVERLAP_POLICY") {
            cfg.overlap_policy = v.parse()?;
        }
        if let Some(v) = var("ROUTE_ALTERNATIVES") {
            cfg.limits.max_alternatives_per_leg = parse("ROUTE_ALTERNATIVES", &v)?;
        }
        if let Some(v) = var("MAX_CANDIDATES") {
            cfg.limits.max_candidates = parse("MAX_CANDIDATES", &v)?;
        }
        if let Some(v) = var("ROUTING_TIMEOUT_SECS") {
            cfg.request_timeout = Duration::from_secs(parse("ROUTING_TIMEOUT_SECS", &v)?);
        }

        if cfg.limits.max_alternatives_per_leg == 0 {
            return Err(Error::Configuration("ROUTE_ALTERNATIVES must be at least 1".into()));
        }
        Ok(cfg)
    }
}

fn flood_layers_in<P: AsRef<Path>>(dir: P) -> Vec<(ReturnPeriod, PathBuf)> {
    FLOOD_LAYER_FILES
        .iter()
        .map(|(rp, file)| (*rp, dir.as_ref().join(file)))
        .collect()
}

fn parse<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Configuration(format!("{name}: cannot parse '{value}'")))
}
