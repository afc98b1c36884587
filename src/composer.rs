use crate::aligner::CompositeTable;
use crate::stats::round_dp;
use anyhow::{Result, anyhow};
use chrono::{NaiveDate, NaiveDateTime};
use log::{debug, info};
use serde::{Deserialize, Serialize};

pub const SCORE_COLUMN: &str = "fear_greed_score";

/// How the composite mean treats a missing component on a given date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPolicy {
    /// Any missing component makes the score missing
    Propagate,
    /// Average whatever components are present; missing only if none are
    Skip,
}

impl MissingPolicy {
    pub fn mean(&self, components: &[Option<f64>]) -> Option<f64> {
        let present: Vec<f64> = components.iter().flatten().copied().collect();
        match self {
            MissingPolicy::Propagate if present.len() < components.len() => None,
            _ if present.is_empty() => None,
            _ => Some(present.iter().sum::<f64>() / present.len() as f64),
        }
    }
}

/// Final output: one row per trading date, ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct FearGreedReport {
    pub trading_dates: Vec<NaiveDate>,
    pub columns: Vec<(String, Vec<Option<f64>>)>,
    pub created_at: NaiveDateTime,
}

impl FearGreedReport {
    pub fn len(&self) -> usize {
        self.trading_dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trading_dates.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, values)| values.as_slice())
    }

    pub fn scores(&self) -> &[Option<f64>] {
        self.column(SCORE_COLUMN).unwrap_or(&[])
    }

    /// Most recent date that has a score
    pub fn latest_score(&self) -> Option<(NaiveDate, f64)> {
        self.trading_dates
            .iter()
            .zip(self.scores())
            .rev()
            .find_map(|(date, score)| score.map(|s| (*date, s)))
    }
}

#[derive(Debug, Clone)]
pub struct Composer {
    components: Vec<String>,
    policy: MissingPolicy,
    output_columns: Vec<String>,
    cutoff: Option<NaiveDate>,
}

impl Composer {
    pub fn new(
        components: Vec<String>,
        policy: MissingPolicy,
        output_columns: Vec<String>,
        cutoff: Option<NaiveDate>,
    ) -> Result<Self> {
        if components.is_empty() {
            return Err(anyhow!("At least one score component is required"));
        }
        Ok(Self {
            components,
            policy,
            output_columns,
            cutoff,
        })
    }

    /// Row-wise mean of the normalised components, rounded to two decimals.
    pub fn score(&self, table: &CompositeTable) -> Result<Vec<Option<f64>>> {
        let columns = self
            .components
            .iter()
            .map(|name| table.require(name))
            .collect::<Result<Vec<_>>>()?;

        Ok((0..table.len())
            .map(|row| {
                let row_values: Vec<Option<f64>> = columns.iter().map(|c| c[row]).collect();
                self.policy.mean(&row_values).map(|mean| round_dp(mean, 2))
            })
            .collect())
    }

    /// Score the table, apply the cutoff and select the output columns.
    ///
    /// # Arguments
    /// * `table` - Aligned table whose component columns are already normalised
    /// * `created_at` - Generation time stamped on every row
    pub fn compose(&self, table: CompositeTable, created_at: NaiveDateTime) -> Result<FearGreedReport> {
        let scores = self.score(&table)?;
        let mut table = table.with_column(SCORE_COLUMN, scores)?;

        if let Some(cutoff) = self.cutoff {
            let before = table.len();
            table = table.since(cutoff);
            debug!("Cutoff {} dropped {} rows", cutoff, before - table.len());
        }

        let columns = self
            .output_columns
            .iter()
            .map(|name| {
                let values = table
                    .column(name)
                    .ok_or_else(|| anyhow!("Unknown output column {}", name))?;
                Ok((name.clone(), values.to_vec()))
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            "Composed {} rows from {} components ({:?} missing policy)",
            table.len(),
            self.components.len(),
            self.policy
        );

        Ok(FearGreedReport {
            trading_dates: table.dates().to_vec(),
            columns,
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::IndexSeries;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 11, day).unwrap()
    }

    fn created() -> NaiveDateTime {
        d(30).and_hms_opt(18, 0, 0).unwrap()
    }

    fn table() -> CompositeTable {
        let index = IndexSeries::new("VNINDEX", vec![(d(1), 1000.0), (d(2), 1010.0), (d(3), 1020.0)]).unwrap();
        CompositeTable::from_benchmark(&index, "vnindex")
            .with_column("momentum", vec![Some(10.0), None, Some(33.0)])
            .unwrap()
            .with_column("vix", vec![Some(20.0), Some(40.0), Some(66.0)])
            .unwrap()
    }

    fn composer(policy: MissingPolicy, cutoff: Option<NaiveDate>) -> Composer {
        Composer::new(
            vec!["momentum".into(), "vix".into()],
            policy,
            vec![SCORE_COLUMN.into(), "vnindex".into()],
            cutoff,
        )
        .unwrap()
    }

    #[test]
    fn test_propagate_policy() {
        let scores = composer(MissingPolicy::Propagate, None).score(&table()).unwrap();
        assert_eq!(scores, vec![Some(15.0), None, Some(49.5)]);
    }

    #[test]
    fn test_skip_policy() {
        let scores = composer(MissingPolicy::Skip, None).score(&table()).unwrap();
        assert_eq!(scores, vec![Some(15.0), Some(40.0), Some(49.5)]);
    }

    #[test]
    fn test_skip_policy_all_missing() {
        assert_eq!(MissingPolicy::Skip.mean(&[None, None]), None);
    }

    #[test]
    fn test_score_rounded_to_two_decimals() {
        assert_eq!(
            MissingPolicy::Skip.mean(&[Some(1.0), Some(1.0), Some(2.0)]).map(|m| round_dp(m, 2)),
            Some(1.33)
        );
    }

    #[test]
    fn test_compose_cutoff_and_columns() {
        let report = composer(MissingPolicy::Skip, Some(d(2)))
            .compose(table(), created())
            .unwrap();

        assert_eq!(report.trading_dates, vec![d(2), d(3)]);
        assert_eq!(report.columns.len(), 2);
        assert_eq!(report.columns[0].0, SCORE_COLUMN);
        assert_eq!(report.column("vnindex").unwrap(), &[Some(1010.0), Some(1020.0)]);
        assert_eq!(report.created_at, created());
        assert_eq!(report.latest_score(), Some((d(3), 49.5)));
    }

    #[test]
    fn test_unknown_output_column() {
        let composer = Composer::new(
            vec!["momentum".into()],
            MissingPolicy::Skip,
            vec!["avg_price".into()],
            None,
        )
        .unwrap();
        assert!(composer.compose(table(), created()).is_err());
    }
}
