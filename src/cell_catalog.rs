/// One-shot resolution of the dataset's cell universe.
use std::collections::{HashMap, HashSet};

use h3o::CellIndex;

use crate::cell_geometry::{cell_from_u64, cell_polygon, CellPolygon};
use crate::error::MapError;

/// Mapping of every cell observed in the dataset to its boundary polygon.
///
/// Built once at startup and read-only afterwards: the cell universe does not
/// grow, so any cell id appearing in a later filtered row-set is either
/// already a key here or gets dropped at injection time.
#[derive(Debug)]
pub struct CellCatalog {
    polygons: HashMap<CellIndex, CellPolygon>,
}

impl CellCatalog {
    /// Resolve each distinct cell id to its polygon, exactly once per cell.
    ///
    /// Fails on the first id the grid scheme cannot decode: a corrupt
    /// spatial key at startup means the dataset cannot be trusted.
    pub fn build<I>(cell_ids: I) -> Result<Self, MapError>
    where
        I: IntoIterator<Item = u64>,
    {
        let distinct: HashSet<u64> = cell_ids.into_iter().collect();
        let mut polygons = HashMap::with_capacity(distinct.len());
        for raw in distinct {
            let cell = cell_from_u64(raw)?;
            polygons.insert(cell, cell_polygon(cell));
        }
        Ok(Self { polygons })
    }

    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    pub fn contains(&self, cell: CellIndex) -> bool {
        self.polygons.contains_key(&cell)
    }

    /// Whether a raw id decodes to a cell present in the catalog.
    pub fn contains_raw(&self, raw: u64) -> bool {
        CellIndex::try_from(raw).is_ok_and(|cell| self.polygons.contains_key(&cell))
    }

    pub fn polygon(&self, cell: CellIndex) -> Option<&CellPolygon> {
        self.polygons.get(&cell)
    }

    pub fn iter(&self) -> impl Iterator<Item = (CellIndex, &CellPolygon)> {
        self.polygons.iter().map(|(cell, polygon)| (*cell, polygon))
    }
}
