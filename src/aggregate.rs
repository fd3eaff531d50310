/// Per-request aggregation of filtered emission rows.
///
/// Every function here is a pure, in-memory pass over the rows it is given;
/// the results are owned by the request that asked for them.
use std::collections::{BTreeMap, HashMap};

use crate::dataset::EmissionRecord;

/// One filtered row ready for spatial aggregation.
///
/// The cell id stays raw: filtered rows may carry keys the catalog has never
/// seen, or values that do not even decode as H3 indexes, and aggregation
/// must tolerate both. Decoding happens at catalog build and nowhere else.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricRow {
    pub cell_id: u64,
    pub metric: f64,
}

/// Cell id to summed metric, produced fresh for each request.
pub type AggregateMap = HashMap<u64, f64>;

/// Sum the metric per cell.
///
/// Rows are folded left to right, so repeated runs over the same input
/// produce bit-identical totals. Zero rows yield an empty map.
pub fn sum_by_cell(rows: &[MetricRow]) -> AggregateMap {
    let mut totals = AggregateMap::new();
    for row in rows {
        *totals.entry(row.cell_id).or_insert(0.0) += row.metric;
    }
    totals
}

/// Monthly emission totals keyed by `YYYYMM`, for the trend chart.
pub fn sum_by_year_month(records: &[&EmissionRecord]) -> BTreeMap<u32, f64> {
    let mut totals = BTreeMap::new();
    for record in records {
        *totals.entry(record.year_month()).or_insert(0.0) += record.co2_equivalent_t;
    }
    totals
}

/// Totals per (vessel type, `YYYYMM`), for the per-type trend chart.
pub fn sum_by_vessel_year_month(records: &[&EmissionRecord]) -> BTreeMap<(String, u32), f64> {
    let mut totals = BTreeMap::new();
    for record in records {
        *totals
            .entry((record.vessel_type.clone(), record.year_month()))
            .or_insert(0.0) += record.co2_equivalent_t;
    }
    totals
}

/// Grand total over the filtered rows, for the KPI banner.
pub fn total_emissions(records: &[&EmissionRecord]) -> f64 {
    records.iter().map(|record| record.co2_equivalent_t).sum()
}
