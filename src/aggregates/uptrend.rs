use super::{Aggregate, Label, count_labels, counts_column};
use crate::market_data::UniverseSeries;
use crate::signals::IndicatorColumn;
use crate::stats::{WindowClose, rolling_mean};
use anyhow::Result;
use chrono::NaiveDate;
use log::debug;

/// Share of tickers closing above their own trailing moving average.
///
/// The average covers the previous `window` closes. A ticker without that much
/// history is not in an uptrend but still counts toward the denominator.
#[derive(Debug, Clone)]
pub struct Uptrend {
    pub window: usize,
}

impl Uptrend {
    pub fn new(window: usize) -> Self {
        Self { window }
    }

    pub fn label(&self, closes: &[Option<f64>]) -> Vec<Option<Label>> {
        let averages = rolling_mean(closes, self.window, WindowClose::Left);
        closes
            .iter()
            .zip(averages)
            .map(|(close, average)| match (*close, average) {
                (Some(c), Some(ma)) if c > ma => Some(Label::Up),
                (Some(_), Some(_)) => Some(Label::Flat),
                _ => None,
            })
            .collect()
    }
}

impl Aggregate for Uptrend {
    fn columns(&self, universe: &UniverseSeries) -> Result<Vec<IndicatorColumn>> {
        let uptrend = count_labels(universe, |closes| self.label(closes));
        let present = count_labels(universe, |closes| {
            closes.iter().map(|c| c.map(|_| Label::Flat)).collect()
        });

        let dates: Vec<NaiveDate> = uptrend.iter().map(|(date, _)| *date).collect();
        let ratio = uptrend
            .iter()
            .zip(&present)
            .map(|((_, up), (_, all))| match all.total() {
                0 => None,
                total => Some(up.up as f64 / total as f64),
            })
            .collect();
        debug!("Uptrend ratio over {} dates, MA window {}", dates.len(), self.window);

        Ok(vec![
            counts_column("num_ticker_uptrend", &uptrend, |c| Some(c.up as f64))?,
            IndicatorColumn::new("ratio_ticker_uptrend", dates, ratio)?,
        ])
    }
}
