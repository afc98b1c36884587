use crate::market_data::{DailyRecord, IndexSeries, UniverseSeries};
use chrono::NaiveDate;
use log::{debug, info};
use polars::prelude::*;
use std::path::{Path, PathBuf};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Failures at the data-source boundary. Both are fatal to a run.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Source unavailable: {0}")]
    Unavailable(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),
}

/// Supplies already-ordered daily records for the benchmark and the universe.
#[cfg_attr(test, mockall::automock)]
pub trait TimeSeriesSource {
    /// Benchmark observations, one per date, ascending
    fn load_index(&self) -> Result<IndexSeries, SourceError>;

    /// Constituent closes grouped by ticker, each ascending
    fn load_universe(&self) -> Result<UniverseSeries, SourceError>;
}

/// Reads two CSV files:
///
/// * index: `index_code,trading_date,value`
/// * universe: `ticker,trading_date,close_price`
///
/// Dates are `YYYY-MM-DD`.
#[derive(Debug, Clone)]
pub struct CsvSource {
    index_path: PathBuf,
    universe_path: PathBuf,
    index_id: String,
    start_date: Option<NaiveDate>,
    ticker_code_length: Option<usize>,
}

impl CsvSource {
    pub fn new(index_path: impl Into<PathBuf>, universe_path: impl Into<PathBuf>, index_id: impl Into<String>) -> Self {
        Self {
            index_path: index_path.into(),
            universe_path: universe_path.into(),
            index_id: index_id.into(),
            start_date: None,
            ticker_code_length: None,
        }
    }

    /// Drop benchmark rows dated before `start_date`
    pub fn with_start_date(mut self, start_date: Option<NaiveDate>) -> Self {
        self.start_date = start_date;
        self
    }

    /// Keep only tickers whose code has this many characters
    pub fn with_ticker_code_length(mut self, length: Option<usize>) -> Self {
        self.ticker_code_length = length;
        self
    }

    fn read(path: &Path) -> Result<DataFrame, SourceError> {
        if !path.exists() {
            return Err(SourceError::Unavailable(format!("{} does not exist", path.display())));
        }

        LazyCsvReader::new(path)
            .with_has_header(true)
            .finish()
            .and_then(|frame| frame.collect())
            .map_err(|e| match e {
                PolarsError::IO { .. } => SourceError::Unavailable(format!("{}: {}", path.display(), e)),
                other => SourceError::SchemaMismatch(format!("{}: {}", path.display(), other)),
            })
    }
}

impl TimeSeriesSource for CsvSource {
    fn load_index(&self) -> Result<IndexSeries, SourceError> {
        let frame = Self::read(&self.index_path)?;
        let codes = string_column(&frame, "index_code")?;
        let dates = date_column(&frame, "trading_date")?;
        let values = float_column(&frame, "value")?;

        let mut points: Vec<(NaiveDate, f64)> = codes
            .into_iter()
            .zip(dates.into_iter().zip(values))
            .filter(|(code, (date, _))| {
                *code == self.index_id && self.start_date.is_none_or(|start| *date >= start)
            })
            .map(|(_, point)| point)
            .collect();
        points.sort_by_key(|(date, _)| *date);

        info!(
            "Loaded {} {} observations from {}",
            points.len(),
            self.index_id,
            self.index_path.display()
        );
        IndexSeries::new(self.index_id.clone(), points).map_err(|e| SourceError::SchemaMismatch(e.to_string()))
    }

    fn load_universe(&self) -> Result<UniverseSeries, SourceError> {
        let frame = Self::read(&self.universe_path)?;
        let tickers = string_column(&frame, "ticker")?;
        let dates = date_column(&frame, "trading_date")?;
        let closes = float_column(&frame, "close_price")?;

        let mut records: Vec<DailyRecord> = tickers
            .into_iter()
            .zip(dates.into_iter().zip(closes))
            .filter(|(ticker, _)| {
                self.ticker_code_length
                    .is_none_or(|length| ticker.chars().count() == length)
            })
            .map(|(ticker, (date, close))| DailyRecord::new(ticker, date, close))
            .collect();
        records.sort_by(|a, b| {
            a.entity_id
                .cmp(&b.entity_id)
                .then(a.trading_date.cmp(&b.trading_date))
        });

        let universe = UniverseSeries::new(records).map_err(|e| SourceError::SchemaMismatch(e.to_string()))?;

        info!(
            "Loaded {} tickers from {}",
            universe.ticker_count(),
            self.universe_path.display()
        );
        Ok(universe)
    }
}

fn column<'a>(frame: &'a DataFrame, name: &str) -> Result<&'a Column, SourceError> {
    frame
        .column(name)
        .map_err(|_| SourceError::SchemaMismatch(format!("missing column {}", name)))
}

fn string_column(frame: &DataFrame, name: &str) -> Result<Vec<String>, SourceError> {
    let cast = column(frame, name)?
        .cast(&DataType::String)
        .map_err(|e| SourceError::SchemaMismatch(format!("{}: {}", name, e)))?;
    let strings = cast
        .str()
        .map_err(|e| SourceError::SchemaMismatch(format!("{}: {}", name, e)))?;

    strings
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            value
                .map(str::to_string)
                .ok_or_else(|| SourceError::SchemaMismatch(format!("{} is empty on row {}", name, row)))
        })
        .collect()
}

fn date_column(frame: &DataFrame, name: &str) -> Result<Vec<NaiveDate>, SourceError> {
    string_column(frame, name)?
        .iter()
        .map(|raw| {
            NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
                .map_err(|e| SourceError::SchemaMismatch(format!("{} value {:?}: {}", name, raw, e)))
        })
        .collect()
}

fn float_column(frame: &DataFrame, name: &str) -> Result<Vec<f64>, SourceError> {
    let cast = column(frame, name)?
        .cast(&DataType::Float64)
        .map_err(|e| SourceError::SchemaMismatch(format!("{}: {}", name, e)))?;
    let floats = cast
        .f64()
        .map_err(|e| SourceError::SchemaMismatch(format!("{}: {}", name, e)))?;

    let values: Vec<f64> = floats
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            value.ok_or_else(|| SourceError::SchemaMismatch(format!("{} is not numeric on row {}", name, row)))
        })
        .collect::<Result<_, _>>()?;
    debug!("Parsed {} values from column {}", values.len(), name);
    Ok(values)
}

/// Series built in memory, for embedding and tests.
#[derive(Debug, Clone)]
pub struct InMemorySource {
    index: IndexSeries,
    universe: UniverseSeries,
}

impl InMemorySource {
    pub fn new(index: IndexSeries, universe: UniverseSeries) -> Self {
        Self { index, universe }
    }
}

impl TimeSeriesSource for InMemorySource {
    fn load_index(&self) -> Result<IndexSeries, SourceError> {
        Ok(self.index.clone())
    }

    fn load_universe(&self) -> Result<UniverseSeries, SourceError> {
        Ok(self.universe.clone())
    }
}
