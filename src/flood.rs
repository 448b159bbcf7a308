use std::collections::BTreeMap;

use geo::Point;
use lazy_static::lazy_static;

use crate::error::{Error, Result};
use crate::hazard::{HazardIndex, ReturnPeriod, Severity};

lazy_static! {
    /// Rarer floods weigh slightly less per severity class, but every flooded
    /// metre still costs about ten metres of dry road.
    pub static ref DEFAULT_FLOOD_WEIGHTS: FloodWeightTable = FloodWeightTable::from_rows(&[
        (5, [(1, 10.0), (2, 12.0), (3, 13.0)]),
        (25, [(1, 9.7), (2, 11.5), (3, 12.5)]),
        (100, [(1, 9.5), (2, 11.0), (3, 12.0)]),
    ]);
}

/// `(return_period, severity) -> weight`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FloodWeightTable {
    weights: BTreeMap<ReturnPeriod, BTreeMap<Severity, f64>>,
}

impl FloodWeightTable {
    pub fn from_rows<R: AsRef<[(Severity, f64)]>>(rows: &[(ReturnPeriod, R)]) -> Self {
        let weights = rows
            .iter()
            .map(|(rp, row)| (*rp, row.as_ref().iter().copied().collect()))
            .collect();
        Self { weights }
    }

    pub fn get(&self, return_period: ReturnPeriod, severity: Severity) -> Option<f64> {
        self.weights.get(&return_period)?.get(&severity).copied()
    }
}

/// Scalar flood risk at a point: the weights of every return period whose
/// extent covers it, summed.
pub struct FloodWeightEvaluator {
    index: HazardIndex,
    table: FloodWeightTable,
}

impl FloodWeightEvaluator {
    /// Fails when the index holds a `(return_period, severity)` the table has
    /// no weight for, or when a weight is negative.
    pub fn new(index: HazardIndex, table: FloodWeightTable) -> Result<Self> {
        let mut weights = table.weights.values().flat_map(|row| row.values());
        if let Some(w) = weights.find(|w| w.is_nan() || **w < 0.0) {
            return Err(Error::Configuration(format!("invalid flood weight {w}")));
        }
        for layer in index.layers() {
            let rp = layer.return_period();
            if let Some(severity) = layer.severities().find(|s| table.get(rp, *s).is_none()) {
                return Err(Error::Configuration(format!(
                    "no flood weight for {rp}-year severity {severity}"
                )));
            }
        }
        Ok(Self { index, table })
    }

    pub fn weight(&self, point: Point<f64>) -> f64 {
        self.index
            .query(point)
            .filter_map(|(rp, severity)| self.table.get(rp, severity))
            .sum()
    }
}
