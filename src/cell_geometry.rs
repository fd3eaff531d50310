/// H3 cell id decoding and boundary-polygon conversion.
///
/// This is the expensive step of the map pipeline: the catalog builder calls
/// `cell_polygon` exactly once per distinct cell at startup, and nothing
/// downstream ever recomputes geometry.
use geojson::{Geometry, Value};
use h3o::CellIndex;

use crate::error::MapError;

/// Closed ring of (longitude, latitude) vertices bounding one H3 cell.
///
/// The first vertex is repeated at the end so the ring is explicitly closed,
/// as GeoJSON polygons require.
#[derive(Debug, Clone, PartialEq)]
pub struct CellPolygon {
    ring: Vec<(f64, f64)>,
}

impl CellPolygon {
    /// Boundary vertices in (longitude, latitude) order.
    pub fn ring(&self) -> &[(f64, f64)] {
        &self.ring
    }

    /// GeoJSON geometry with a single exterior ring.
    pub fn to_geometry(&self) -> Geometry {
        let ring: Vec<Vec<f64>> = self.ring.iter().map(|&(lng, lat)| vec![lng, lat]).collect();
        Geometry::new(Value::Polygon(vec![ring]))
    }
}

/// Decode a raw 64-bit cell id.
pub fn cell_from_u64(raw: u64) -> Result<CellIndex, MapError> {
    CellIndex::try_from(raw).map_err(|_| MapError::InvalidCellId(raw))
}

/// Decode the canonical hex-string encoding of a cell id.
///
/// `cell_from_hex("8866124823fffff")` and
/// `cell_from_u64(0x8866124823fffff)` resolve to the same cell.
pub fn cell_from_hex(hex: &str) -> Result<CellIndex, MapError> {
    let raw = u64::from_str_radix(hex, 16)
        .map_err(|_| MapError::InvalidCellIdHex(hex.to_string()))?;
    CellIndex::try_from(raw).map_err(|_| MapError::InvalidCellIdHex(hex.to_string()))
}

/// Compute the boundary polygon of a cell.
///
/// h3o reports boundary vertices latitude-first; rendering and GeoJSON both
/// want longitude-first, so the pair is swapped here and nowhere else.
pub fn cell_polygon(cell: CellIndex) -> CellPolygon {
    let boundary = cell.boundary();
    let mut ring: Vec<(f64, f64)> = boundary
        .iter()
        .map(|vertex| {
            (
                vertex.lng_radians().to_degrees(),
                vertex.lat_radians().to_degrees(),
            )
        })
        .collect();
    if let Some(&first) = ring.first() {
        ring.push(first);
    }
    CellPolygon { ring }
}
