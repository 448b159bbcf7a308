//! Cost function

use std::sync::Arc;

use geo::{HaversineDistance, HaversineIntermediate, Point};

use crate::flood::FloodWeightEvaluator;
use crate::model::{RouteCandidate, ScoredRoute};

/// Coefficients of the time and distance terms.
///
/// With the defaults one second of driving and one dry kilometre each cost
/// one unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostWeights {
    pub per_second: f64,
    pub per_meter: f64,
}

impl Default for CostWeights {
    fn default() -> Self {
        Self {
            per_second: 1.0,
            per_meter: 0.001,
        }
    }
}

/// Scores full-route candidates.
///
/// `cost = duration * per_second + distance * per_meter + flood penalty`,
/// where the flood penalty adds, for every consecutive vertex pair, the
/// great-circle length of the pair times the flood weight at its midpoint.
#[derive(Clone)]
pub struct CostEvaluator {
    flood: Arc<FloodWeightEvaluator>,
    weights: CostWeights,
}

impl CostEvaluator {
    pub fn new(flood: Arc<FloodWeightEvaluator>) -> Self {
        Self::with_weights(flood, CostWeights::default())
    }

    pub fn with_weights(flood: Arc<FloodWeightEvaluator>, weights: CostWeights) -> Self {
        Self { flood, weights }
    }

    pub fn cost(&self, candidate: &RouteCandidate) -> f64 {
        let summary = &candidate.summary;
        summary.duration_seconds * self.weights.per_second
            + summary.distance_meters * self.weights.per_meter
            + self.flood_penalty(&candidate.coordinates)
    }

    pub fn score(&self, candidate: RouteCandidate) -> ScoredRoute {
        let cost = self.cost(&candidate);
        ScoredRoute { route: candidate, cost }
    }

    /// Sum of `segment length * flood weight` over `[lon, lat]` vertex pairs.
    pub fn flood_penalty(&self, coordinates: &[[f64; 2]]) -> f64 {
        coordinates
            .windows(2)
            .map(|pair| {
                let a = Point::new(pair[0][0], pair[0][1]);
                let b = Point::new(pair[1][0], pair[1][1]);
                if a == b {
                    return 0.0;
                }
                let weight = self.flood.weight(a.haversine_intermediate(&b, 0.5));
                if weight > 0.0 {
                    a.haversine_distance(&b) * weight
                } else {
                    0.0
                }
            })
            .sum()
    }
}
