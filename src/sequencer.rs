use geo::prelude::*;
use tracing::trace;

use crate::model::GeoPoint;

/// Greedy nearest-neighbour visit order.
///
/// Starting at `source`, repeatedly hop to the closest destination not yet
/// visited (great-circle distance). Equally distant destinations are taken in
/// input order. This is a heuristic: the tour is not guaranteed shortest.
pub fn order(source: &GeoPoint, destinations: &[GeoPoint]) -> Vec<GeoPoint> {
    let mut remaining = destinations.to_vec();
    let mut ordered = Vec::with_capacity(remaining.len());
    let mut current = source.to_point();

    while !remaining.is_empty() {
        let nearest = remaining
            .iter()
            .enumerate()
            .map(|(i, d)| (i, current.haversine_distance(&d.to_point())))
            .min_by(|(_, da), (_, db)| da.partial_cmp(db).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, _)| i);
        let Some(i) = nearest else { break };

        // `remove` keeps the input order of the rest for tie-breaking
        let next = remaining.remove(i);
        trace!("Next stop: ({}, {})", next.lat(), next.lon());
        current = next.to_point();
        ordered.push(next);
    }

    ordered
}
