use super::{Aggregate, Label, LabelCounts, count_labels, counts_column};
use crate::market_data::UniverseSeries;
use crate::signals::IndicatorColumn;
use crate::stats::{WindowClose, diff, ewm_mean, rolling_mean};
use anyhow::Result;
use chrono::NaiveDate;
use log::debug;

/// Market breadth from daily advancers and decliners.
///
/// `up_down_vol = advanced - declined`, then the difference between a fast and
/// a slow unadjusted EWM of it, smoothed by a trailing mean.
#[derive(Debug, Clone)]
pub struct AdvanceDecline {
    pub fast_alpha: f64,
    pub slow_alpha: f64,
    pub window: usize,
}

impl AdvanceDecline {
    pub fn new(fast_alpha: f64, slow_alpha: f64, window: usize) -> Self {
        Self {
            fast_alpha,
            slow_alpha,
            window,
        }
    }

    /// Advanced (up), declined (down) and unchanged (flat) tickers per date.
    /// A ticker's first observation has no prior close and is not counted.
    pub fn counts(&self, universe: &UniverseSeries) -> Vec<(NaiveDate, LabelCounts)> {
        count_labels(universe, |closes| {
            diff(closes)
                .into_iter()
                .map(|change| {
                    change.map(|c| match c {
                        c if c > 0.0 => Label::Up,
                        c if c < 0.0 => Label::Down,
                        _ => Label::Flat,
                    })
                })
                .collect()
        })
    }

    pub fn breadth(&self, rows: &[(NaiveDate, LabelCounts)]) -> Vec<Option<f64>> {
        let up_down_vol: Vec<f64> = rows
            .iter()
            .map(|(_, c)| c.up as f64 - c.down as f64)
            .collect();

        let fast = ewm_mean(&up_down_vol, self.fast_alpha, false, 1);
        let slow = ewm_mean(&up_down_vol, self.slow_alpha, false, 1);
        let raw: Vec<Option<f64>> = fast
            .into_iter()
            .zip(slow)
            .map(|(f, s)| Some(f? - s?))
            .collect();

        rolling_mean(&raw, self.window, WindowClose::Right)
    }
}

impl Aggregate for AdvanceDecline {
    fn columns(&self, universe: &UniverseSeries) -> Result<Vec<IndicatorColumn>> {
        let rows = self.counts(universe);
        let dates: Vec<NaiveDate> = rows.iter().map(|(date, _)| *date).collect();
        let breadth = self.breadth(&rows);
        debug!("Advance/decline breadth over {} dates", rows.len());

        Ok(vec![
            counts_column("advanced", &rows, |c| Some(c.up as f64))?,
            counts_column("declined", &rows, |c| Some(c.down as f64))?,
            counts_column("sideways", &rows, |c| Some(c.flat as f64))?,
            IndicatorColumn::new("breadth", dates, breadth)?,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::DailyRecord;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    fn universe() -> UniverseSeries {
        UniverseSeries::new(vec![
            DailyRecord::new("AAA", date(1), 10.0),
            DailyRecord::new("AAA", date(2), 11.0),
            DailyRecord::new("AAA", date(3), 11.0),
            DailyRecord::new("BBB", date(1), 20.0),
            DailyRecord::new("BBB", date(2), 19.0),
            DailyRecord::new("BBB", date(3), 21.0),
            DailyRecord::new("CCC", date(2), 5.0),
            DailyRecord::new("CCC", date(3), 6.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_counts_exclude_first_observation() {
        let rows = AdvanceDecline::new(0.1, 0.05, 1).counts(&universe());

        assert_eq!(rows[0].1, LabelCounts::default());
        assert_eq!(rows[1].1, LabelCounts { up: 1, down: 1, flat: 0 });
        assert_eq!(rows[2].1, LabelCounts { up: 2, down: 0, flat: 1 });
    }

    #[test]
    fn test_breadth_is_fast_minus_slow() {
        let aggregate = AdvanceDecline::new(0.5, 0.25, 1);
        let rows = aggregate.counts(&universe());
        let breadth = aggregate.breadth(&rows);

        // up_down_vol = [0, 0, 2]
        let fast = 0.5 * 2.0;
        let slow = 0.25 * 2.0;
        assert_eq!(breadth, vec![Some(0.0), Some(0.0), Some(fast - slow)]);
    }

    #[test]
    fn test_breadth_smoothing_warmup() {
        let aggregate = AdvanceDecline::new(0.1, 0.05, 2);
        let columns = aggregate.columns(&universe()).unwrap();
        let breadth = columns.iter().find(|c| c.name() == "breadth").unwrap();
        assert_eq!(breadth.warmup_len(), 1);
    }
}
