/// Process-wide map pipeline state.
///
/// The catalog and template are built once, single-threaded, before any
/// request is served; after that every request reads the same frozen
/// `MapState` without locks. Aggregate maps and rendered collections are
/// request-local and never reachable from another request.
use std::time::Instant;

use log::{info, warn};
use once_cell::sync::OnceCell;

use crate::aggregate::{self, MetricRow};
use crate::cell_catalog::CellCatalog;
use crate::dataset::Dataset;
use crate::error::MapError;
use crate::map_template::{MapTemplate, RenderedFeatureCollection};

static MAP_STATE: OnceCell<MapState> = OnceCell::new();

/// Frozen startup output: cell catalog plus the GeoJSON template.
#[derive(Debug)]
pub struct MapState {
    catalog: CellCatalog,
    template: MapTemplate,
}

impl MapState {
    /// Startup barrier: resolve every distinct cell once and freeze the
    /// template. Fails on a corrupt spatial key, since the catalog could
    /// not be trusted afterwards.
    pub fn build(dataset: &Dataset) -> Result<Self, MapError> {
        let started = Instant::now();
        let catalog = CellCatalog::build(dataset.distinct_cell_ids())?;
        let template = MapTemplate::build(&catalog);
        info!(
            "map template ready: {} cells from {} records in {:.2?}",
            template.len(),
            dataset.len(),
            started.elapsed()
        );
        Ok(Self { catalog, template })
    }

    pub fn catalog(&self) -> &CellCatalog {
        &self.catalog
    }

    pub fn template(&self) -> &MapTemplate {
        &self.template
    }

    /// Aggregate the filtered rows and merge them into the template.
    ///
    /// Cell ids unknown to the catalog aggregate fine but never render;
    /// they mean the dataset grew since startup, which calls for a catalog
    /// rebuild, so leave a trace instead of failing the request.
    pub fn render(&self, rows: &[MetricRow]) -> RenderedFeatureCollection {
        let values = aggregate::sum_by_cell(rows);
        let stale = values
            .keys()
            .filter(|&&cell_id| !self.catalog.contains_raw(cell_id))
            .count();
        if stale > 0 {
            warn!(
                "{stale} aggregated cell id(s) missing from the startup catalog; \
                 dropping them from the map"
            );
        }
        self.template.inject(&values)
    }
}

/// Install the startup-built state as the process-wide instance.
///
/// Write-once: a second install is rejected and hands the state back.
pub fn install(state: MapState) -> Result<(), MapState> {
    MAP_STATE.set(state)
}

/// The process-wide state, if `install` has run.
pub fn global() -> Option<&'static MapState> {
    MAP_STATE.get()
}
