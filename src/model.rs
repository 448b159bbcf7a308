use geo::Point;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A geographic location, optionally carrying the label the geocoder gave it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    lat: f64,
    lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    address: Option<String>,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon, name: None, address: None }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// `geo` works in (x, y) = (lon, lat).
    pub fn to_point(&self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }

    /// `[lon, lat]`, the order routing providers and GeoJSON expect.
    pub fn lon_lat(&self) -> [f64; 2] {
        [self.lon, self.lat]
    }

    pub fn validate(&self) -> Result<()> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(Error::InvalidInput(format!("latitude out of range: {}", self.lat)));
        }
        if !self.lon.is_finite() || !(-180.0..=180.0).contains(&self.lon) {
            return Err(Error::InvalidInput(format!("longitude out of range: {}", self.lon)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteSummary {
    pub distance_meters: f64,
    pub duration_seconds: f64,
}

impl std::ops::AddAssign for RouteSummary {
    fn add_assign(&mut self, rhs: Self) {
        self.distance_meters += rhs.distance_meters;
        self.duration_seconds += rhs.duration_seconds;
    }
}

/// One alternative path for a single leg, as returned by the routing provider.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteSegment {
    pub coordinates: Vec<[f64; 2]>, // [lon, lat]
    pub summary: RouteSummary,
}

/// A complete itinerary: one chosen alternative per leg, stitched together.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteCandidate {
    pub coordinates: Vec<[f64; 2]>, // [lon, lat]
    pub summary: RouteSummary,
}

impl RouteCandidate {
    /// Stitch legs in order. A leg starting on the vertex the previous leg
    /// ended on does not repeat it.
    pub fn from_segments<'a, I>(segments: I) -> Self
    where
        I: IntoIterator<Item = &'a RouteSegment>,
    {
        let mut coordinates: Vec<[f64; 2]> = Vec::new();
        let mut summary = RouteSummary::default();

        for segment in segments {
            let mut coords = segment.coordinates.as_slice();
            if let (Some(last), Some(first)) = (coordinates.last(), coords.first()) {
                if last == first {
                    coords = &coords[1..];
                }
            }
            coordinates.extend_from_slice(coords);
            summary += segment.summary;
        }

        Self { coordinates, summary }
    }
}

impl From<RouteSegment> for RouteCandidate {
    fn from(segment: RouteSegment) -> Self {
        Self { coordinates: segment.coordinates, summary: segment.summary }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRoute {
    pub route: RouteCandidate,
    pub cost: f64,
}
