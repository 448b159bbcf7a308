/// Possible errors

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    IO(#[from] std::io::Error),

    #[error(transparent)]
    GeoJson(#[from] geojson::Error),

    /// Hazard layers or weight table could not be loaded. Fatal at startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The routing provider answered with a non-2xx status or could not be
    /// reached at all (`status` is `None` for transport failures).
    #[error("routing provider error ({}): {message}", status_label(.status))]
    RoutingProvider { status: Option<u16>, message: String },

    #[error("geocoding error: {0}")]
    Geocoding(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{count} route candidates exceed the limit of {limit}")]
    TooManyCandidates { count: usize, limit: usize },
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::RoutingProvider {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

fn status_label(status: &Option<u16>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "transport".to_string(),
    }
}

pub type Result<T> = core::result::Result<T, Error>;
