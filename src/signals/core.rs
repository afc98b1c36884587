//! Core indicator trait and the named column type every stage exchanges.

use anyhow::{Result, anyhow};
use chrono::NaiveDate;

/// A named series aligned to trading dates. `None` marks a date for which the
/// indicator has no value yet (warm-up) or cannot be defined.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorColumn {
    name: String,
    dates: Vec<NaiveDate>,
    values: Vec<Option<f64>>,
}

impl IndicatorColumn {
    pub fn new(name: impl Into<String>, dates: Vec<NaiveDate>, values: Vec<Option<f64>>) -> Result<Self> {
        let name = name.into();
        if dates.len() != values.len() {
            return Err(anyhow!(
                "Column {} has {} dates but {} values",
                name,
                dates.len(),
                values.len()
            ));
        }
        Ok(Self { name, dates, values })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, Option<f64>)> + '_ {
        self.dates.iter().copied().zip(self.values.iter().copied())
    }

    /// Count of leading dates without a value.
    pub fn warmup_len(&self) -> usize {
        self.values.iter().take_while(|v| v.is_none()).count()
    }
}

/// Indicator computed from a single date-aligned input series.
pub trait Indicator {
    /// Column name the indicator is published under
    fn name(&self) -> &str;

    /// Number of leading observations that are always missing
    fn warmup(&self) -> usize;

    /// Transform the input series; output has the same length as the input
    fn compute(&self, values: &[Option<f64>]) -> Vec<Option<f64>>;

    /// Compute and wrap as a named column over `dates`
    fn compute_column(&self, dates: &[NaiveDate], values: &[Option<f64>]) -> Result<IndicatorColumn> {
        IndicatorColumn::new(self.name(), dates.to_vec(), self.compute(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_length_mismatch() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert!(IndicatorColumn::new("momentum", vec![date], vec![]).is_err());
    }

    #[test]
    fn test_warmup_len() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        let column =
            IndicatorColumn::new("x", vec![d(2), d(3), d(4)], vec![None, None, Some(1.0)]).unwrap();
        assert_eq!(column.warmup_len(), 2);
    }
}
