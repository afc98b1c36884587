use super::Aggregate;
use crate::market_data::UniverseSeries;
use crate::signals::IndicatorColumn;
use anyhow::Result;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Cross-sectional mean close per trading date (`avg_price`).
#[derive(Debug, Clone, Default)]
pub struct AveragePrice;

impl Aggregate for AveragePrice {
    fn columns(&self, universe: &UniverseSeries) -> Result<Vec<IndicatorColumn>> {
        let mut sums: BTreeMap<NaiveDate, (f64, u32)> = BTreeMap::new();
        for (_, history) in universe.histories() {
            for record in history {
                let entry = sums.entry(record.trading_date).or_insert((0.0, 0));
                entry.0 += record.value;
                entry.1 += 1;
            }
        }

        let (dates, values): (Vec<NaiveDate>, Vec<Option<f64>>) = sums
            .into_iter()
            .map(|(date, (sum, count))| (date, Some(sum / count as f64)))
            .unzip();

        Ok(vec![IndicatorColumn::new("avg_price", dates, values)?])
    }
}
