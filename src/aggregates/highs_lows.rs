use super::{Aggregate, Label, LabelCounts, count_labels, counts_column};
use crate::market_data::UniverseSeries;
use crate::signals::IndicatorColumn;
use crate::stats::{WindowClose, rolling_max, rolling_min, rolling_mean};
use anyhow::Result;
use chrono::NaiveDate;
use log::debug;

/// Net new-high/new-low spread (sps).
///
/// A close above the prior `lookback` closes' maximum is a new high, one below
/// their minimum is a new low. Today never takes part in its own window.
#[derive(Debug, Clone)]
pub struct HighsLows {
    pub lookback: usize,
    pub window: usize,
}

impl HighsLows {
    pub fn new(lookback: usize, window: usize) -> Self {
        Self { lookback, window }
    }

    /// Label one ticker's closes. Dates without a full trailing window are
    /// sideways, as are dates where a trailing extreme is exactly zero.
    pub fn label(&self, closes: &[Option<f64>]) -> Vec<Option<Label>> {
        let highs = rolling_max(closes, self.lookback, WindowClose::Left);
        let lows = rolling_min(closes, self.lookback, WindowClose::Left);

        closes
            .iter()
            .zip(highs.iter().zip(lows.iter()))
            .map(|(close, (high, low))| {
                let close = (*close)?;
                let (high_ratio, low_ratio) = match (*high, *low) {
                    (Some(h), Some(l)) if h == 0.0 || l == 0.0 => (0.0, 0.0),
                    (Some(h), Some(l)) => (close / h - 1.0, close / l - 1.0),
                    _ => (0.0, 0.0),
                };

                Some(if high_ratio > 0.0 {
                    Label::Up
                } else if low_ratio < 0.0 {
                    Label::Down
                } else {
                    Label::Flat
                })
            })
            .collect()
    }

    pub fn counts(&self, universe: &UniverseSeries) -> Vec<(NaiveDate, LabelCounts)> {
        count_labels(universe, |closes| self.label(closes))
    }
}

/// New highs minus new lows; with no new lows the high count stands as is.
pub fn net_new_highs(counts: &LabelCounts) -> f64 {
    match counts.down {
        0 => counts.up as f64,
        down => counts.up as f64 - down as f64,
    }
}

impl Aggregate for HighsLows {
    fn columns(&self, universe: &UniverseSeries) -> Result<Vec<IndicatorColumn>> {
        let rows = self.counts(universe);
        let dates: Vec<NaiveDate> = rows.iter().map(|(date, _)| *date).collect();

        let net: Vec<Option<f64>> = rows.iter().map(|(_, c)| Some(net_new_highs(c))).collect();
        let sps = rolling_mean(&net, self.window, WindowClose::Left);
        debug!(
            "52w spread: lookback {}, smoothing {}, {} dates",
            self.lookback,
            self.window,
            rows.len()
        );

        Ok(vec![
            counts_column("num_ticker_high", &rows, |c| Some(c.up as f64))?,
            counts_column("num_ticker_low", &rows, |c| Some(c.down as f64))?,
            counts_column("num_ticker_sideway", &rows, |c| Some(c.flat as f64))?,
            counts_column("num_ticker", &rows, |c| Some(c.total() as f64))?,
            IndicatorColumn::new("net_52w", dates.clone(), net)?,
            IndicatorColumn::new("sps", dates, sps)?,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::DailyRecord;

    fn some(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn test_label_excludes_current_day() {
        let labels = HighsLows::new(2, 1).label(&some(&[10.0, 12.0, 11.0, 13.0, 9.0, 9.0]));
        assert_eq!(
            labels,
            vec![
                Some(Label::Flat), // warm-up
                Some(Label::Flat), // warm-up
                Some(Label::Flat), // 11 inside [10, 12]
                Some(Label::Up),   // 13 > max(12, 11)
                Some(Label::Down), // 9 < min(11, 13)
                Some(Label::Flat), // 9 == min(13, 9)
            ]
        );
    }

    #[test]
    fn test_zero_extreme_forces_sideways() {
        let labels = HighsLows::new(2, 1).label(&some(&[0.0, 5.0, 10.0]));
        assert_eq!(labels[2], Some(Label::Flat));
    }

    #[test]
    fn test_net_equals_highs_when_no_lows() {
        let counts = LabelCounts { up: 7, down: 0, flat: 3 };
        assert_eq!(net_new_highs(&counts), 7.0);

        let counts = LabelCounts { up: 7, down: 2, flat: 3 };
        assert_eq!(net_new_highs(&counts), 5.0);
    }

    #[test]
    fn test_sps_is_lagged_mean_of_net() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 6, day).unwrap();
        let records = (1..=6)
            .flat_map(|day| {
                vec![
                    DailyRecord::new("AAA", d(day), 10.0 + day as f64),
                    DailyRecord::new("BBB", d(day), 50.0 - day as f64),
                    DailyRecord::new("CCC", d(day), 30.0 + day as f64),
                ]
            })
            .collect();
        let universe = UniverseSeries::new(records).unwrap();

        let columns = HighsLows::new(1, 2).columns(&universe).unwrap();
        let net = columns.iter().find(|c| c.name() == "net_52w").unwrap();
        let sps = columns.iter().find(|c| c.name() == "sps").unwrap();
        let num_ticker = columns.iter().find(|c| c.name() == "num_ticker").unwrap();

        // from day 2 on: two new highs and one new low every day
        assert_eq!(net.values()[0], Some(0.0));
        assert!(net.values()[1..].iter().all(|v| *v == Some(1.0)));
        assert!(sps.values()[..2].iter().all(Option::is_none));
        assert_eq!(sps.values()[2], Some(0.5));
        assert_eq!(sps.values()[3], Some(1.0));
        assert!(num_ticker.values().iter().all(|v| *v == Some(3.0)));
    }
}
