use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

/// One observation of one entity (the benchmark index or a ticker).
#[derive(Debug, Clone, PartialEq)]
pub struct DailyRecord {
    pub entity_id: String,
    pub trading_date: NaiveDate,
    pub value: f64,
}

impl DailyRecord {
    pub fn new(entity_id: impl Into<String>, trading_date: NaiveDate, value: f64) -> Self {
        Self {
            entity_id: entity_id.into(),
            trading_date,
            value,
        }
    }
}

/// Benchmark index observations ordered by strictly increasing trading date.
#[derive(Debug, Clone)]
pub struct IndexSeries {
    entity_id: String,
    records: Vec<DailyRecord>,
}

impl IndexSeries {
    pub fn new(entity_id: impl Into<String>, points: Vec<(NaiveDate, f64)>) -> Result<Self> {
        let entity_id = entity_id.into();
        let records = points
            .into_iter()
            .map(|(date, value)| DailyRecord::new(entity_id.clone(), date, value))
            .collect();
        Self::from_records(entity_id, records)
    }

    pub fn from_records(entity_id: impl Into<String>, records: Vec<DailyRecord>) -> Result<Self> {
        let entity_id = entity_id.into();

        if let Some(other) = records.iter().find(|r| r.entity_id != entity_id) {
            return Err(anyhow!(
                "Index series {} contains a record for {}",
                entity_id,
                other.entity_id
            ));
        }
        ensure_strictly_increasing(&entity_id, &records)?;

        Ok(Self { entity_id, records })
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.records.iter().map(|r| r.trading_date).collect()
    }

    pub fn values(&self) -> Vec<Option<f64>> {
        self.records.iter().map(|r| Some(r.value)).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Per-ticker close price histories for the constituent universe.
#[derive(Debug, Clone, Default)]
pub struct UniverseSeries {
    tickers: BTreeMap<String, Vec<DailyRecord>>,
}

impl UniverseSeries {
    /// Group records by ticker. Each ticker's history must be strictly
    /// increasing in date once sorted by the source.
    pub fn new(records: Vec<DailyRecord>) -> Result<Self> {
        let mut tickers: BTreeMap<String, Vec<DailyRecord>> = BTreeMap::new();
        for record in records {
            tickers
                .entry(record.entity_id.clone())
                .or_default()
                .push(record);
        }

        for (ticker, history) in &tickers {
            ensure_strictly_increasing(ticker, history)?;
        }

        Ok(Self { tickers })
    }

    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.tickers.keys().map(String::as_str)
    }

    pub fn history(&self, ticker: &str) -> Option<&[DailyRecord]> {
        self.tickers.get(ticker).map(Vec::as_slice)
    }

    pub fn histories(&self) -> impl Iterator<Item = (&str, &[DailyRecord])> {
        self.tickers
            .iter()
            .map(|(ticker, history)| (ticker.as_str(), history.as_slice()))
    }

    /// Every distinct trading date present for any ticker, ascending.
    pub fn trading_dates(&self) -> Vec<NaiveDate> {
        self.tickers
            .values()
            .flatten()
            .map(|r| r.trading_date)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn ticker_count(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }
}

fn ensure_strictly_increasing(entity_id: &str, records: &[DailyRecord]) -> Result<()> {
    for pair in records.windows(2) {
        if pair[1].trading_date <= pair[0].trading_date {
            return Err(anyhow!(
                "Records for {} are not strictly increasing: {} followed by {}",
                entity_id,
                pair[0].trading_date,
                pair[1].trading_date
            ));
        }
    }
    Ok(())
}
