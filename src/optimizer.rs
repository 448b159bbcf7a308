use tracing::{debug, info};

use crate::assembler::{self, CandidateLimits};
use crate::cost::CostEvaluator;
use crate::error::Result;
use crate::model::{GeoPoint, RouteCandidate, ScoredRoute};
use crate::provider::RoutingProvider;
use crate::sequencer;

/// Least-risk route selection.
///
/// One destination: the provider's own alternatives are the candidates.
/// Several: destinations are put in nearest-neighbour order and every
/// combination of per-leg alternatives becomes a candidate. The cheapest
/// candidate wins.
pub struct Optimizer<P> {
    provider: P,
    cost: CostEvaluator,
    limits: CandidateLimits,
}

impl<P: RoutingProvider> Optimizer<P> {
    pub fn new(provider: P, cost: CostEvaluator, limits: CandidateLimits) -> Self {
        Self {
            provider,
            cost,
            limits,
        }
    }

    /// `Ok(None)` when there is nothing to route to or no candidate at all.
    pub async fn optimize(
        &self,
        source: &GeoPoint,
        destinations: &[GeoPoint],
    ) -> Result<Option<RouteCandidate>> {
        Ok(self
            .optimize_scored(source, destinations)
            .await?
            .map(|scored| scored.route))
    }

    pub async fn optimize_scored(
        &self,
        source: &GeoPoint,
        destinations: &[GeoPoint],
    ) -> Result<Option<ScoredRoute>> {
        let candidates: Vec<RouteCandidate> = match destinations {
            [] => return Ok(None),
            [destination] => {
                assembler::fetch_leg(&self.provider, source, destination, &self.limits)
                    .await?
                    .into_iter()
                    .map(RouteCandidate::from)
                    .collect()
            }
            _ => {
                let ordered = sequencer::order(source, destinations);
                assembler::assemble(&self.provider, source, &ordered, &self.limits).await?
            }
        };

        info!(
            "Scoring {} candidates for {} destinations",
            candidates.len(),
            destinations.len()
        );
        let best = self.select(candidates);
        if let Some(best) = &best {
            debug!(
                "Best route: cost {:.3}, {:.0} m, {:.0} s",
                best.cost, best.route.summary.distance_meters, best.route.summary.duration_seconds
            );
        }
        Ok(best)
    }

    /// Strict minimum; the first of equally cheap candidates is kept.
    pub fn select(&self, candidates: Vec<RouteCandidate>) -> Option<ScoredRoute> {
        let mut best: Option<ScoredRoute> = None;
        let mut best_cost = f64::INFINITY;

        for candidate in candidates {
            let scored = self.cost.score(candidate);
            if scored.cost < best_cost {
                best_cost = scored.cost;
                best = Some(scored);
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::Error;
    use crate::flood::sample::{dry_evaluator, nested_evaluator};
    use crate::provider::fake::{straight, FakeProvider};

    fn p(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon)
    }

    fn optimizer(provider: FakeProvider) -> Optimizer<FakeProvider> {
        Optimizer::new(
            provider,
            CostEvaluator::new(Arc::new(dry_evaluator())),
            CandidateLimits::default(),
        )
    }

    #[tokio::test]
    async fn single_destination_picks_cheapest_alternative() {
        let (s, d) = (p(14.60, 121.00), p(14.65, 121.05));
        let provider = FakeProvider::default().with_leg(
            &s,
            &d,
            vec![
                straight(&s, &d, 1000.0, 100.0),
                straight(&s, &d, 500.0, 200.0),
                straight(&s, &d, 2000.0, 150.0),
            ],
        );
        let optimizer = optimizer(provider);

        let best = optimizer.optimize_scored(&s, &[d.clone()]).await.unwrap().unwrap();
        assert_eq!(best.route.summary.duration_seconds, 100.0);
        assert_eq!(best.cost, 101.0);

        let route = optimizer.optimize(&s, &[d]).await.unwrap().unwrap();
        assert_eq!(route.summary.distance_meters, 1000.0);
    }

    #[tokio::test]
    async fn no_destinations() {
        let provider = FakeProvider::default();
        let optimizer = optimizer(provider);
        assert!(optimizer.optimize(&p(0.0, 0.0), &[]).await.unwrap().is_none());
        assert_eq!(optimizer.provider.call_count(), 0);
    }

    #[tokio::test]
    async fn provider_without_alternatives() {
        let optimizer = optimizer(FakeProvider::default());
        let s = p(0.0, 0.0);
        assert!(optimizer.optimize(&s, &[p(0.0, 0.1)]).await.unwrap().is_none());
        assert!(
            optimizer
                .optimize(&s, &[p(0.0, 0.1), p(0.0, 0.2)])
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn multi_destination_avoids_flooded_leg() {
        // Nearest-neighbour order is s -> a -> b. The a -> b leg has a fast
        // alternative straight through the flood extents around (0, 0) and a
        // slower dry one.
        let s = p(0.0, -0.1);
        let a = p(0.0, -0.04);
        let b = p(0.0, 0.04);
        let provider = FakeProvider::default()
            .with_leg(&s, &a, vec![straight(&s, &a, 6700.0, 400.0)])
            .with_leg(
                &a,
                &b,
                vec![
                    straight(&a, &b, 8900.0, 500.0),
                    crate::model::RouteSegment {
                        coordinates: vec![a.lon_lat(), [-0.04, 0.05], [0.04, 0.05], b.lon_lat()],
                        summary: crate::model::RouteSummary {
                            distance_meters: 20000.0,
                            duration_seconds: 1500.0,
                        },
                    },
                ],
            );
        let optimizer = Optimizer::new(
            provider,
            CostEvaluator::new(Arc::new(nested_evaluator())),
            CandidateLimits::default(),
        );

        let best = optimizer
            .optimize_scored(&s, &[b.clone(), a.clone()])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(best.route.summary.duration_seconds, 1900.0);
        assert_eq!(best.route.summary.distance_meters, 26700.0);
        assert_eq!(best.route.coordinates.first(), Some(&s.lon_lat()));
        assert_eq!(best.route.coordinates.last(), Some(&b.lon_lat()));
        assert!((best.cost - 1926.7).abs() < 1e-9);
    }

    #[tokio::test]
    async fn ties_keep_first_candidate() {
        let (s, d) = (p(0.0, 0.0), p(0.0, 0.1));
        let mut first = straight(&s, &d, 1000.0, 100.0);
        first.coordinates.insert(1, [0.05, 0.01]);
        let second = straight(&s, &d, 1000.0, 100.0);
        let provider = FakeProvider::default().with_leg(&s, &d, vec![first.clone(), second]);

        let route = optimizer(provider).optimize(&s, &[d]).await.unwrap().unwrap();
        assert_eq!(route.coordinates, first.coordinates);
    }

    #[tokio::test]
    async fn provider_error_is_surfaced() {
        let optimizer = optimizer(FakeProvider::failing());
        let result = optimizer.optimize(&p(0.0, 0.0), &[p(0.0, 0.1)]).await;
        assert!(matches!(result, Err(Error::RoutingProvider { .. })));
    }
}
