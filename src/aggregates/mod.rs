//! Cross-sectional aggregation over the constituent universe
//!
//! Every aggregate follows the same shape: label each (ticker, date) from that
//! ticker's own close history, then count labels per trading date. The output
//! has one row per distinct date in the universe; a date on which no ticker
//! carries a label counts zero rather than missing.

pub mod advance_decline;
pub mod average_price;
pub mod highs_lows;
pub mod uptrend;

pub use advance_decline::AdvanceDecline;
pub use average_price::AveragePrice;
pub use highs_lows::HighsLows;
pub use uptrend::Uptrend;

use crate::market_data::UniverseSeries;
use crate::signals::IndicatorColumn;
use anyhow::Result;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Per-ticker, per-date classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    Up,
    Down,
    Flat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LabelCounts {
    pub up: u32,
    pub down: u32,
    pub flat: u32,
}

impl LabelCounts {
    pub fn total(&self) -> u32 {
        self.up + self.down + self.flat
    }

    fn add(&mut self, label: Label) {
        match label {
            Label::Up => self.up += 1,
            Label::Down => self.down += 1,
            Label::Flat => self.flat += 1,
        }
    }
}

/// Aggregate computed from the whole universe.
pub trait Aggregate {
    fn columns(&self, universe: &UniverseSeries) -> Result<Vec<IndicatorColumn>>;
}

/// Label every ticker's history with `labeler` and count labels per date.
///
/// # Arguments
/// * `universe` - Per-ticker close histories
/// * `labeler` - Maps one ticker's closes to one optional label per close;
///   `None` excludes that (ticker, date) from every count
pub fn count_labels<F>(universe: &UniverseSeries, labeler: F) -> Vec<(NaiveDate, LabelCounts)>
where
    F: Fn(&[Option<f64>]) -> Vec<Option<Label>>,
{
    let mut per_date: BTreeMap<NaiveDate, LabelCounts> = universe
        .trading_dates()
        .into_iter()
        .map(|date| (date, LabelCounts::default()))
        .collect();

    for (_, history) in universe.histories() {
        let closes: Vec<Option<f64>> = history.iter().map(|r| Some(r.value)).collect();
        let labels = labeler(&closes);

        for (record, label) in history.iter().zip(labels) {
            if let (Some(label), Some(counts)) = (label, per_date.get_mut(&record.trading_date)) {
                counts.add(label);
            }
        }
    }

    per_date.into_iter().collect()
}

pub(crate) fn counts_column<F>(
    name: &str,
    rows: &[(NaiveDate, LabelCounts)],
    value: F,
) -> Result<IndicatorColumn>
where
    F: Fn(&LabelCounts) -> Option<f64>,
{
    let dates = rows.iter().map(|(date, _)| *date).collect();
    let values = rows.iter().map(|(_, counts)| value(counts)).collect();
    IndicatorColumn::new(name, dates, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::DailyRecord;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    #[test]
    fn test_every_universe_date_gets_a_row() {
        let universe = UniverseSeries::new(vec![
            DailyRecord::new("AAA", date(1), 10.0),
            DailyRecord::new("AAA", date(4), 11.0),
            DailyRecord::new("BBB", date(5), 20.0),
        ])
        .unwrap();

        // nothing is labelled
        let rows = count_labels(&universe, |closes| vec![None; closes.len()]);
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|(_, counts)| counts.total() == 0));
    }

    #[test]
    fn test_labels_counted_per_date() {
        let universe = UniverseSeries::new(vec![
            DailyRecord::new("AAA", date(1), 10.0),
            DailyRecord::new("BBB", date(1), 20.0),
            DailyRecord::new("CCC", date(1), 30.0),
        ])
        .unwrap();

        let rows = count_labels(&universe, |closes| {
            closes
                .iter()
                .map(|c| match c {
                    Some(v) if *v > 15.0 => Some(Label::Up),
                    Some(_) => Some(Label::Down),
                    None => None,
                })
                .collect()
        });

        assert_eq!(rows[0].1, LabelCounts { up: 2, down: 1, flat: 0 });
    }
}
