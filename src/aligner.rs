use crate::market_data::IndexSeries;
use crate::signals::IndicatorColumn;
use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use log::{debug, warn};
use std::collections::{BTreeMap, HashMap};

/// Date-keyed table anchored at the benchmark's trading dates.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeTable {
    dates: Vec<NaiveDate>,
    columns: BTreeMap<String, Vec<Option<f64>>>,
}

impl CompositeTable {
    /// Start a table from the benchmark, publishing its values as `benchmark_column`.
    pub fn from_benchmark(index: &IndexSeries, benchmark_column: &str) -> Self {
        let mut columns = BTreeMap::new();
        columns.insert(benchmark_column.to_string(), index.values());
        Self {
            dates: index.dates(),
            columns,
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn require(&self, name: &str) -> Result<&[Option<f64>]> {
        self.column(name)
            .ok_or_else(|| anyhow!("Column {} is not present in the table", name))
    }

    /// Add or replace a column that is already aligned to this table's dates.
    pub fn with_column(mut self, name: impl Into<String>, values: Vec<Option<f64>>) -> Result<Self> {
        let name = name.into();
        if values.len() != self.dates.len() {
            return Err(anyhow!(
                "Column {} has {} values for {} table rows",
                name,
                values.len(),
                self.dates.len()
            ));
        }
        self.columns.insert(name, values);
        Ok(self)
    }

    /// Keep only rows dated on or after `cutoff`.
    pub fn since(self, cutoff: NaiveDate) -> Self {
        let first = self.dates.partition_point(|date| *date < cutoff);
        Self {
            dates: self.dates[first..].to_vec(),
            columns: self
                .columns
                .into_iter()
                .map(|(name, values)| (name, values[first..].to_vec()))
                .collect(),
        }
    }
}

/// Left join `column` onto `table` by trading date. Every table row is kept;
/// dates the column lacks become `None`; column dates outside the table drop.
pub fn left_join(table: CompositeTable, column: &IndicatorColumn) -> Result<CompositeTable> {
    let lookup: HashMap<NaiveDate, Option<f64>> = column.iter().collect();

    let mut unmatched = 0usize;
    let values: Vec<Option<f64>> = table
        .dates()
        .iter()
        .map(|date| match lookup.get(date) {
            Some(value) => *value,
            None => {
                unmatched += 1;
                None
            }
        })
        .collect();

    if unmatched > 0 {
        debug!(
            "Column {}: {} of {} benchmark dates have no matching row",
            column.name(),
            unmatched,
            table.len()
        );
    }
    if unmatched == table.len() && !table.is_empty() {
        warn!("Column {} shares no trading dates with the benchmark", column.name());
    }

    table.with_column(column.name(), values)
}

/// Join every column onto the benchmark table in order.
pub fn align(index: &IndexSeries, benchmark_column: &str, columns: &[IndicatorColumn]) -> Result<CompositeTable> {
    columns
        .iter()
        .try_fold(CompositeTable::from_benchmark(index, benchmark_column), left_join)
}
