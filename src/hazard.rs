//! Flood extent layers and their spatial index.
//!
//! Every return period is its own layer: a list of polygons tagged with a
//! severity class, plus an R-tree over the polygons' bounding boxes. A point
//! query walks the R-tree shortlist and runs exact containment on it.

use std::path::Path;
use std::str::FromStr;

use geo::{BoundingRect, Contains, Coord, LineString, MultiPolygon, Point, Polygon};
use geojson::{GeoJson, Value};
use rstar::{RTree, RTreeObject, AABB};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Statistical recurrence interval of a flood, in years.
pub type ReturnPeriod = u32;
/// Ordinal hazard intensity, 1 = low.
pub type Severity = u8;

/// What to report when several polygons of the same layer contain a point.
///
/// The default takes the most severe polygon, so it can differ from a plain
/// first-match lookup. `FLOOD_OVERLAP_POLICY=first` selects first-match
/// semantics: the polygon listed first in the layer file wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverlapPolicy {
    /// The most severe of the containing polygons.
    #[default]
    HighestSeverity,
    /// The containing polygon that comes first in the layer file.
    First,
}

impl FromStr for OverlapPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "highest" | "highest_severity" | "max" => Ok(OverlapPolicy::HighestSeverity),
            "first" => Ok(OverlapPolicy::First),
            other => Err(Error::Configuration(format!("unknown overlap policy '{other}'"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FloodZone {
    pub polygon: MultiPolygon<f64>,
    pub severity: Severity,
}

impl FloodZone {
    pub fn new(polygon: impl Into<MultiPolygon<f64>>, severity: Severity) -> Self {
        Self { polygon: polygon.into(), severity }
    }
}

/// R-tree entry: position of the zone in the layer plus its bbox (lon, lat).
#[derive(Debug, Clone, Copy)]
struct ZoneEnvelope {
    id: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for ZoneEnvelope {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

pub struct FloodLayer {
    return_period: ReturnPeriod,
    zones: Vec<FloodZone>,
    tree: RTree<ZoneEnvelope>,
}

impl FloodLayer {
    pub fn new(return_period: ReturnPeriod, zones: Vec<FloodZone>) -> Self {
        let items = zones
            .iter()
            .enumerate()
            .filter_map(|(id, zone)| {
                let rect = zone.polygon.bounding_rect()?;
                Some(ZoneEnvelope {
                    id,
                    aabb: AABB::from_corners(
                        [rect.min().x, rect.min().y],
                        [rect.max().x, rect.max().y],
                    ),
                })
            })
            .collect();
        let tree = RTree::bulk_load(items);
        Self { return_period, zones, tree }
    }

    /// Parse a GeoJSON FeatureCollection whose features carry the severity
    /// class in the `severity_field` property.
    pub fn from_geojson_str(
        return_period: ReturnPeriod,
        text: &str,
        severity_field: &str,
    ) -> Result<Self> {
        let gj: GeoJson = text.parse()?;
        let fc = match gj {
            GeoJson::FeatureCollection(fc) => fc,
            _ => {
                return Err(Error::Configuration(
                    "flood layer must be a FeatureCollection".into(),
                ));
            }
        };

        let mut zones = Vec::with_capacity(fc.features.len());
        for (idx, feat) in fc.features.iter().enumerate() {
            let Some(geometry) = &feat.geometry else {
                debug!("Feature {} has no geometry, skipping", idx);
                continue;
            };
            let polygon = multi_polygon_from_value(&geometry.value)
                .map_err(|e| Error::Configuration(format!("feature {idx}: {e}")))?;
            let severity = feat
                .property(severity_field)
                .and_then(parse_severity)
                .ok_or_else(|| {
                    Error::Configuration(format!(
                        "feature {idx}: missing or invalid severity '{severity_field}'"
                    ))
                })?;
            zones.push(FloodZone { polygon, severity });
        }

        Ok(Self::new(return_period, zones))
    }

    pub fn from_path<P: AsRef<Path>>(
        return_period: ReturnPeriod,
        path: P,
        severity_field: &str,
    ) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading {}-year flood layer: {}", return_period, path.display());
        std::fs::read_to_string(path)
            .map_err(Error::from)
            .and_then(|text| Self::from_geojson_str(return_period, &text, severity_field))
            .map_err(|e| Error::Configuration(format!("{}: {}", path.display(), e)))
    }

    pub fn return_period(&self) -> ReturnPeriod {
        self.return_period
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn severities(&self) -> impl Iterator<Item = Severity> + '_ {
        self.zones.iter().map(|z| z.severity)
    }

    fn severity_at(&self, point: Point<f64>, policy: OverlapPolicy) -> Option<Severity> {
        let hits = self
            .tree
            .locate_in_envelope_intersecting(&AABB::from_point([point.x(), point.y()]))
            .filter(|e| self.zones[e.id].polygon.contains(&point));

        match policy {
            OverlapPolicy::HighestSeverity => hits.map(|e| self.zones[e.id].severity).max(),
            // R-tree order is not file order
            OverlapPolicy::First => hits
                .min_by_key(|e| e.id)
                .map(|e| self.zones[e.id].severity),
        }
    }
}

pub struct HazardIndex {
    layers: Vec<FloodLayer>,
    policy: OverlapPolicy,
}

impl HazardIndex {
    /// Load one layer per return period. Any failure aborts the whole build.
    pub fn build<P: AsRef<Path>>(
        layer_paths: &[(ReturnPeriod, P)],
        severity_field: &str,
        policy: OverlapPolicy,
    ) -> Result<Self> {
        let layers = layer_paths
            .iter()
            .map(|(rp, path)| FloodLayer::from_path(*rp, path, severity_field))
            .collect::<Result<Vec<_>>>()?;
        let index = Self::from_layers(layers, policy)?;
        info!(
            "Hazard index ready: {} layers, {} polygons",
            index.layers.len(),
            index.layers.iter().map(FloodLayer::len).sum::<usize>()
        );
        Ok(index)
    }

    pub fn from_layers(layers: Vec<FloodLayer>, policy: OverlapPolicy) -> Result<Self> {
        for (i, layer) in layers.iter().enumerate() {
            if layers[..i].iter().any(|l| l.return_period == layer.return_period) {
                return Err(Error::Configuration(format!(
                    "duplicate {}-year flood layer",
                    layer.return_period
                )));
            }
        }
        Ok(Self { layers, policy })
    }

    pub fn layers(&self) -> &[FloodLayer] {
        &self.layers
    }

    /// At most one `(return_period, severity)` per layer containing `point`.
    pub fn query(&self, point: Point<f64>) -> impl Iterator<Item = (ReturnPeriod, Severity)> + '_ {
        self.layers.iter().filter_map(move |layer| {
            layer
                .severity_at(point, self.policy)
                .map(|severity| (layer.return_period, severity))
        })
    }
}

fn parse_severity(value: &serde_json::Value) -> Option<Severity> {
    match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64))
            .and_then(|v| Severity::try_from(v).ok()),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn multi_polygon_from_value(value: &Value) -> Result<MultiPolygon<f64>> {
    match value {
        Value::Polygon(rings) => Ok(MultiPolygon::new(vec![polygon_from_rings(rings)?])),
        Value::MultiPolygon(polygons) => polygons
            .iter()
            .map(|rings| polygon_from_rings(rings))
            .collect::<Result<Vec<_>>>()
            .map(MultiPolygon::new),
        _ => Err(Error::Configuration(
            "unsupported geometry, expected Polygon or MultiPolygon".into(),
        )),
    }
}

fn polygon_from_rings(rings: &[Vec<Vec<f64>>]) -> Result<Polygon<f64>> {
    let (exterior, interiors) = rings
        .split_first()
        .ok_or_else(|| Error::Configuration("polygon without rings".into()))?;
    let interiors = interiors
        .iter()
        .map(|ring| line_string(ring))
        .collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(line_string(exterior)?, interiors))
}

fn line_string(ring: &[Vec<f64>]) -> Result<LineString<f64>> {
    ring.iter()
        .map(|position| match position.as_slice() {
            [x, y, ..] => Ok(Coord { x: *x, y: *y }),
            _ => Err(Error::Configuration("position with fewer than two values".into())),
        })
        .collect::<Result<Vec<_>>>()
        .map(LineString::new)
}


#[cfg(test)]
mod tests {
    use super::sample::*;
    use super::*;
    use std::io::Write;
    use test_case::test_case;

    const LAYER_JSON: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"Var": 2},
             "geometry": {"type": "Polygon", "coordinates": [[[0,0],[2,0],[2,2],[0,2],[0,0]],
                                                            [[0.5,0.5],[1.5,0.5],[1.5,1.5],[0.5,1.5],[0.5,0.5]]]}},
            {"type": "Feature", "properties": {"Var": "3"},
             "geometry": {"type": "MultiPolygon", "coordinates": [[[[10,10],[11,10],[11,11],[10,11],[10,10]]],
                                                                 [[[20,20],[21,20],[21,21],[20,21],[20,20]]]]}},
            {"type": "Feature", "properties": {"Var": 1.0}, "geometry": null}
        ]
    }"#;

    fn hits(index: &HazardIndex, lon: f64, lat: f64) -> Vec<(ReturnPeriod, Severity)> {
        index.query(Point::new(lon, lat)).collect()
    }

    #[test]
    fn parse_geojson_layer() {
        let layer = FloodLayer::from_geojson_str(5, LAYER_JSON, "Var").unwrap();
        assert_eq!(layer.return_period(), 5);
        assert_eq!(layer.len(), 2);
        assert_eq!(layer.severities().collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test_case(0.25, 0.25, Some(2); "inside the ring")]
    #[test_case(1.0, 1.0, None; "inside the hole")]
    #[test_case(10.5, 10.5, Some(3); "first part of multipolygon")]
    #[test_case(20.5, 20.5, Some(3); "second part of multipolygon")]
    #[test_case(5.0, 5.0, None; "between polygons")]
    fn geojson_containment(lon: f64, lat: f64, expected: Option<Severity>) {
        let layer = FloodLayer::from_geojson_str(5, LAYER_JSON, "Var").unwrap();
        let index = HazardIndex::from_layers(vec![layer], OverlapPolicy::First).unwrap();
        let found = hits(&index, lon, lat).first().map(|(_, s)| *s);
        assert_eq!(found, expected);
    }

    #[test]
    fn missing_severity_is_rejected() {
        let result = FloodLayer::from_geojson_str(5, LAYER_JSON, "Severity");
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn non_polygon_geometry_is_rejected() {
        let json = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"Var": 1},
             "geometry": {"type": "Point", "coordinates": [0, 0]}}]}"#;
        assert!(FloodLayer::from_geojson_str(5, json, "Var").is_err());
    }

    #[test]
    fn not_a_feature_collection() {
        let json = r#"{"type": "Point", "coordinates": [0, 0]}"#;
        assert!(matches!(
            FloodLayer::from_geojson_str(5, json, "Var"),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn build_from_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("y5_floods.geojson");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(LAYER_JSON.as_bytes())
            .unwrap();

        let index = HazardIndex::build(&[(5, &path)], "Var", OverlapPolicy::default()).unwrap();
        assert_eq!(index.layers().len(), 1);
        assert_eq!(hits(&index, 0.25, 0.25), vec![(5, 2)]);
    }

    #[test]
    fn build_fails_on_any_missing_layer() {
        let dir = tempfile::TempDir::new().unwrap();
        let good = dir.path().join("y5_floods.geojson");
        std::fs::write(&good, LAYER_JSON).unwrap();
        let missing = dir.path().join("y25_floods.geojson");

        let result = HazardIndex::build(
            &[(5, good), (25, missing)],
            "Var",
            OverlapPolicy::default(),
        );
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn build_fails_on_corrupt_layer() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broken.geojson");
        std::fs::write(&path, "{ not json").unwrap();
        let result = HazardIndex::build(&[(5, path)], "Var", OverlapPolicy::default());
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn duplicate_return_period_is_rejected() {
        let layers = vec![layer(5, &[]), layer(5, &[])];
        assert!(HazardIndex::from_layers(layers, OverlapPolicy::default()).is_err());
    }

    #[test]
    fn query_one_pair_per_layer() {
        let index = nested_index();
        assert_eq!(hits(&index, 0.0, 0.0), vec![(5, 3), (25, 2), (100, 1)]);
        assert_eq!(hits(&index, 0.015, 0.0), vec![(25, 2), (100, 1)]);
        assert_eq!(hits(&index, 0.025, 0.0), vec![(100, 1)]);
        assert!(hits(&index, 0.5, 0.5).is_empty());
    }

    #[test_case(OverlapPolicy::HighestSeverity, 3; "highest severity")]
    #[test_case(OverlapPolicy::First, 1; "first in file")]
    fn same_layer_overlap(policy: OverlapPolicy, expected: Severity) {
        let overlapping = layer(
            25,
            &[
                (square((0.0, 0.0), (2.0, 2.0)), 1),
                (square((1.0, 1.0), (3.0, 3.0)), 3),
                (square((0.5, 0.5), (2.5, 2.5)), 2),
            ],
        );
        let index = HazardIndex::from_layers(vec![overlapping], policy).unwrap();
        assert_eq!(hits(&index, 1.5, 1.5), vec![(25, expected)]);
    }

    #[test_case("highest", OverlapPolicy::HighestSeverity)]
    #[test_case("First", OverlapPolicy::First)]
    fn overlap_policy_from_str(s: &str, expected: OverlapPolicy) {
        assert_eq!(s.parse::<OverlapPolicy>().unwrap(), expected);
    }

    #[test]
    fn overlap_policy_unknown() {
        assert!("sum".parse::<OverlapPolicy>().is_err());
    }
}
