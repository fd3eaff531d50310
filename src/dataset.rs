/// In-memory emissions dataset and the per-request filter selection.
///
/// The dataset arrives once at startup from the external object-storage
/// loader; everything here is a read-only view over it. Filtering mirrors
/// the dashboard controls: a vessel-type checklist and an inclusive
/// month-range slider.
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::aggregate::MetricRow;
use crate::error::MapError;

/// One emissions record: where, who, when, how much.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmissionRecord {
    pub cell_id: u64,
    pub vessel_type: String,
    pub year: u16,
    pub month: u8,
    pub co2_equivalent_t: f64,
}

impl EmissionRecord {
    /// Composite `YYYYMM` period used by the date-range slider.
    pub fn year_month(&self) -> u32 {
        u32::from(self.year) * 100 + u32::from(self.month)
    }

    pub fn metric_row(&self) -> MetricRow {
        MetricRow {
            cell_id: self.cell_id,
            metric: self.co2_equivalent_t,
        }
    }
}

/// The full tabular dataset, loaded once at process start.
#[derive(Debug)]
pub struct Dataset {
    records: Vec<EmissionRecord>,
}

impl Dataset {
    pub fn new(records: Vec<EmissionRecord>) -> Self {
        Self { records }
    }

    /// Parse a JSON array of records, e.g. the payload handed over by the
    /// object-storage read path.
    pub fn from_json_str(json: &str) -> Result<Self, MapError> {
        let records: Vec<EmissionRecord> = serde_json::from_str(json)?;
        Ok(Self { records })
    }

    pub fn records(&self) -> &[EmissionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct cell universe, in a single pass over the full dataset.
    pub fn distinct_cell_ids(&self) -> HashSet<u64> {
        self.records.iter().map(|record| record.cell_id).collect()
    }

    /// Sorted, de-duplicated master list for the vessel-type checklist.
    pub fn vessel_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self
            .records
            .iter()
            .map(|record| record.vessel_type.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        types.sort_unstable();
        types
    }

    pub fn period_index(&self) -> PeriodIndex {
        PeriodIndex::build(&self.records)
    }

    /// Records matching the selection, in dataset order.
    pub fn filter(&self, selection: &FilterSelection) -> Vec<&EmissionRecord> {
        self.records
            .iter()
            .filter(|record| selection.matches(record))
            .collect()
    }
}

/// Rows ready for spatial aggregation, in the same order as the input.
pub fn metric_rows(records: &[&EmissionRecord]) -> Vec<MetricRow> {
    records.iter().map(|record| record.metric_row()).collect()
}

/// Sorted unique `YYYYMM` periods with slider-index lookups both ways.
#[derive(Debug)]
pub struct PeriodIndex {
    periods: Vec<u32>,
    index_by_period: HashMap<u32, usize>,
}

impl PeriodIndex {
    fn build(records: &[EmissionRecord]) -> Self {
        let mut periods: Vec<u32> = records
            .iter()
            .map(EmissionRecord::year_month)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        periods.sort_unstable();
        let index_by_period = periods
            .iter()
            .enumerate()
            .map(|(index, &period)| (period, index))
            .collect();
        Self {
            periods,
            index_by_period,
        }
    }

    pub fn periods(&self) -> &[u32] {
        &self.periods
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    /// Slider index of a `YYYYMM` period.
    pub fn index_of(&self, year_month: u32) -> Option<usize> {
        self.index_by_period.get(&year_month).copied()
    }

    /// `YYYYMM` period at a slider index.
    pub fn period_at(&self, index: usize) -> Option<u32> {
        self.periods.get(index).copied()
    }
}

/// The user's current filter: vessel types plus an inclusive period range.
#[derive(Debug, Clone)]
pub struct FilterSelection {
    pub vessel_types: HashSet<String>,
    pub start_year_month: u32,
    pub end_year_month: u32,
}

impl FilterSelection {
    pub fn matches(&self, record: &EmissionRecord) -> bool {
        let period = record.year_month();
        period >= self.start_year_month
            && period <= self.end_year_month
            && self.vessel_types.contains(&record.vessel_type)
    }
}
