use itertools::Itertools;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::model::{GeoPoint, RouteCandidate, RouteSegment};
use crate::provider::RoutingProvider;

/// Bounds on the exhaustive search over per-leg alternatives.
///
/// At most `max_alternatives_per_leg ^ legs` candidates can be produced; any
/// itinerary whose actual product exceeds `max_candidates` is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateLimits {
    pub max_alternatives_per_leg: usize,
    pub max_candidates: usize,
}

impl Default for CandidateLimits {
    fn default() -> Self {
        Self {
            max_alternatives_per_leg: 3,
            max_candidates: 81,
        }
    }
}

/// Alternatives for one leg, capped at `max_alternatives_per_leg`.
pub async fn fetch_leg<P: RoutingProvider>(
    provider: &P,
    origin: &GeoPoint,
    destination: &GeoPoint,
    limits: &CandidateLimits,
) -> Result<Vec<RouteSegment>> {
    let mut alternatives = provider.alternatives(origin, destination).await?;
    if alternatives.len() > limits.max_alternatives_per_leg {
        warn!(
            "Provider returned {} alternatives, keeping the first {}",
            alternatives.len(),
            limits.max_alternatives_per_leg
        );
        alternatives.truncate(limits.max_alternatives_per_leg);
    }
    Ok(alternatives)
}

/// Every full-route candidate for `source -> d1 -> d2 -> ...`.
///
/// Legs are fetched one after the other, then each combination of one
/// alternative per leg is stitched into a candidate. The first leg varies
/// slowest.
pub async fn assemble<P: RoutingProvider>(
    provider: &P,
    source: &GeoPoint,
    ordered_destinations: &[GeoPoint],
    limits: &CandidateLimits,
) -> Result<Vec<RouteCandidate>> {
    let stops: Vec<&GeoPoint> = std::iter::once(source).chain(ordered_destinations).collect();

    let mut legs: Vec<Vec<RouteSegment>> = Vec::with_capacity(ordered_destinations.len());
    for pair in stops.windows(2) {
        legs.push(fetch_leg(provider, pair[0], pair[1], limits).await?);
    }

    let count = legs
        .iter()
        .try_fold(1usize, |acc, alts| acc.checked_mul(alts.len()))
        .unwrap_or(usize::MAX);
    debug!(
        "Alternatives per leg: {:?} -> {} candidates",
        legs.iter().map(Vec::len).collect::<Vec<_>>(),
        count
    );

    if legs.is_empty() || count == 0 {
        return Ok(Vec::new());
    }
    if count > limits.max_candidates {
        return Err(Error::TooManyCandidates {
            count,
            limit: limits.max_candidates,
        });
    }

    let candidates = legs
        .iter()
        .map(|alts| alts.iter())
        .multi_cartesian_product()
        .map(RouteCandidate::from_segments)
        .collect();
    Ok(candidates)
}
