/// Reusable GeoJSON template and per-request value injection.
///
/// The template is the serialization skeleton of the whole cell universe:
/// geometry and cell id, no metric. It is built once, after the catalog, and
/// every filter/refresh request merges its aggregate values into it instead
/// of recomputing geometry. Rendered features share the template's geometry
/// through `Arc`; only the small per-feature value is request-specific.
use std::sync::Arc;

use geojson::Geometry;
use h3o::CellIndex;
use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::aggregate::AggregateMap;
use crate::cell_catalog::CellCatalog;
use crate::cell_geometry::CellPolygon;

/// Immutable feature collection skeleton, one feature per catalog cell.
#[derive(Debug)]
pub struct MapTemplate {
    features: Vec<TemplateFeature>,
}

/// One template entry: cell id plus shared geometry, no value.
#[derive(Debug, Clone)]
pub struct TemplateFeature {
    cell: CellIndex,
    geometry: Arc<Geometry>,
}

impl TemplateFeature {
    pub fn cell(&self) -> CellIndex {
        self.cell
    }

    pub fn geometry(&self) -> &Arc<Geometry> {
        &self.geometry
    }
}

impl MapTemplate {
    /// Serialize the catalog into the base feature collection.
    ///
    /// Features are ordered by cell id so every derived output is
    /// reproducible without per-request sorting.
    pub fn build(catalog: &CellCatalog) -> Self {
        let mut entries: Vec<(CellIndex, &CellPolygon)> = catalog.iter().collect();
        entries.sort_unstable_by_key(|(cell, _)| *cell);
        let features = entries
            .into_iter()
            .map(|(cell, polygon)| TemplateFeature {
                cell,
                geometry: Arc::new(polygon.to_geometry()),
            })
            .collect();
        Self { features }
    }

    pub fn features(&self) -> &[TemplateFeature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Merge aggregated values into the template.
    ///
    /// Read-only traversal in feature order: cells whose value is absent or
    /// not strictly positive are left out, so the payload scales with the
    /// number of cells carrying signal rather than with the cell universe.
    /// Each emitted feature is newly allocated but references the template's
    /// geometry; the template itself is never touched.
    pub fn inject(&self, values: &AggregateMap) -> RenderedFeatureCollection {
        let mut features = Vec::new();
        for feature in &self.features {
            let value = values.get(&u64::from(feature.cell)).copied().unwrap_or(0.0);
            if value > 0.0 {
                features.push(RenderedFeature {
                    cell: feature.cell,
                    geometry: Arc::clone(&feature.geometry),
                    value,
                });
            }
        }
        RenderedFeatureCollection { features }
    }
}

/// One rendered choropleth feature: shared geometry plus the injected value.
#[derive(Debug, Clone)]
pub struct RenderedFeature {
    cell: CellIndex,
    geometry: Arc<Geometry>,
    value: f64,
}

impl RenderedFeature {
    pub fn cell(&self) -> CellIndex {
        self.cell
    }

    pub fn geometry(&self) -> &Arc<Geometry> {
        &self.geometry
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

/// Per-request output collection, ready for the choropleth renderer.
#[derive(Debug, Clone)]
pub struct RenderedFeatureCollection {
    features: Vec<RenderedFeature>,
}

impl RenderedFeatureCollection {
    pub fn features(&self) -> &[RenderedFeature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// The GeoJSON `type` tag and the Arc-shared geometry need explicit
// treatment, so the feature types serialize by hand. Property keys are
// stable across requests: `cell_id` always, `value` only on rendered
// features.

impl Serialize for TemplateFeature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(serde::Serialize)]
        struct Properties {
            cell_id: String,
        }
        let mut state = serializer.serialize_struct("Feature", 3)?;
        state.serialize_field("type", "Feature")?;
        state.serialize_field("geometry", self.geometry.as_ref())?;
        state.serialize_field(
            "properties",
            &Properties {
                cell_id: self.cell.to_string(),
            },
        )?;
        state.end()
    }
}

impl Serialize for MapTemplate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("FeatureCollection", 2)?;
        state.serialize_field("type", "FeatureCollection")?;
        state.serialize_field("features", &self.features)?;
        state.end()
    }
}

impl Serialize for RenderedFeature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(serde::Serialize)]
        struct Properties {
            cell_id: String,
            value: f64,
        }
        let mut state = serializer.serialize_struct("Feature", 3)?;
        state.serialize_field("type", "Feature")?;
        state.serialize_field("geometry", self.geometry.as_ref())?;
        state.serialize_field(
            "properties",
            &Properties {
                cell_id: self.cell.to_string(),
                value: self.value,
            },
        )?;
        state.end()
    }
}

impl Serialize for RenderedFeatureCollection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("FeatureCollection", 2)?;
        state.serialize_field("type", "FeatureCollection")?;
        state.serialize_field("features", &self.features)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::AggregateMap;
    use crate::cell_geometry::cell_from_hex;
    use approx::assert_abs_diff_eq;
    use h3o::CellIndex;

    const CELL_A: u64 = 0x8866124823fffff;
    const CELL_B: u64 = 0x8866124825fffff;

    fn neighbor_cells(count: usize) -> Vec<u64> {
        let anchor = cell_from_hex("8866124823fffff").unwrap();
        let disk: Vec<CellIndex> = anchor.grid_disk(2);
        disk.into_iter().take(count).map(u64::from).collect()
    }

    fn build_template(cells: &[u64]) -> MapTemplate {
        let catalog = CellCatalog::build(cells.iter().copied()).unwrap();
        MapTemplate::build(&catalog)
    }

    #[test]
    fn test_template_has_one_feature_per_cell_and_no_value() {
        let template = build_template(&neighbor_cells(3));
        assert_eq!(template.len(), 3);

        let json = serde_json::to_value(&template).unwrap();
        assert_eq!(json["type"], "FeatureCollection");
        let features = json["features"].as_array().unwrap();
        assert_eq!(features.len(), 3);
        for feature in features {
            assert_eq!(feature["type"], "Feature");
            assert_eq!(feature["geometry"]["type"], "Polygon");
            assert!(feature["properties"]["cell_id"].is_string());
            assert!(feature["properties"].get("value").is_none());
        }
    }

    #[test]
    fn test_inject_keeps_only_strictly_positive_cells() {
        let cells = neighbor_cells(3);
        let template = build_template(&cells);

        // Two rows for the first cell summed upstream, a zero for the
        // second, nothing for the third.
        let mut values = AggregateMap::new();
        values.insert(cells[0], 8.0);
        values.insert(cells[1], 0.0);

        let rendered = template.inject(&values);
        assert_eq!(rendered.len(), 1);
        let feature = &rendered.features()[0];
        assert_eq!(u64::from(feature.cell()), cells[0]);
        assert_abs_diff_eq!(feature.value(), 8.0);
    }

    #[test]
    fn test_inject_drops_negative_and_nan_values() {
        let cells = neighbor_cells(3);
        let template = build_template(&cells);

        let mut values = AggregateMap::new();
        values.insert(cells[0], -4.0);
        values.insert(cells[1], f64::NAN);
        values.insert(cells[2], 1.5);

        let rendered = template.inject(&values);
        assert_eq!(rendered.len(), 1);
        assert_eq!(u64::from(rendered.features()[0].cell()), cells[2]);
    }

    #[test]
    fn test_empty_aggregate_renders_empty_collection() {
        let template = build_template(&[CELL_A, CELL_B]);
        let rendered = template.inject(&AggregateMap::new());
        assert!(rendered.is_empty());
        let json = rendered.to_json_string().unwrap();
        assert_eq!(json, r#"{"type":"FeatureCollection","features":[]}"#);
    }

    #[test]
    fn test_rendered_cells_are_subset_of_template() {
        let cells = neighbor_cells(7);
        let template = build_template(&cells);

        let mut values = AggregateMap::new();
        for (i, &cell) in cells.iter().enumerate() {
            values.insert(cell, i as f64); // first one gets 0.0 and drops out
        }
        // A cell the template has never seen.
        values.insert(CELL_B, 42.0);

        let rendered = template.inject(&values);
        assert!(rendered.len() < template.len());
        for feature in rendered.features() {
            assert!(template.features().iter().any(|t| t.cell() == feature.cell()));
        }
    }

    #[test]
    fn test_rendered_geometry_is_shared_not_copied() {
        let cells = neighbor_cells(2);
        let template = build_template(&cells);

        let mut values = AggregateMap::new();
        values.insert(cells[0], 3.0);
        values.insert(cells[1], 4.0);

        let rendered = template.inject(&values);
        for feature in rendered.features() {
            let original = template
                .features()
                .iter()
                .find(|t| t.cell() == feature.cell())
                .unwrap();
            assert!(Arc::ptr_eq(original.geometry(), feature.geometry()));
        }
    }

    #[test]
    fn test_inject_never_mutates_the_template() {
        let cells = neighbor_cells(4);
        let template = build_template(&cells);
        let before = serde_json::to_string(&template).unwrap();

        let mut values = AggregateMap::new();
        values.insert(cells[0], 7.0);
        values.insert(999, 1.0);
        template.inject(&values);
        template.inject(&AggregateMap::new());

        let after = serde_json::to_string(&template).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_features_are_ordered_by_cell_id() {
        let template = build_template(&neighbor_cells(7));
        let ids: Vec<u64> = template.features().iter().map(|f| u64::from(f.cell())).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
    }
}
