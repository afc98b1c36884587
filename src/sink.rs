use crate::composer::FearGreedReport;
use anyhow::{Context, Result};
use log::info;
use polars::prelude::*;
use std::fs::File;
use std::path::PathBuf;

pub const DATE_COLUMN: &str = "trading_date";
pub const CREATED_COLUMN: &str = "createddatetime";
const CREATED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Destination for the finished report.
pub trait ResultSink {
    fn write(&self, report: &FearGreedReport) -> Result<()>;
}

/// Lay the report out as `trading_date`, the report's value columns in order,
/// then `createddatetime`.
pub fn report_frame(report: &FearGreedReport) -> Result<DataFrame> {
    let dates: Vec<String> = report.trading_dates.iter().map(|d| d.to_string()).collect();
    let created = report.created_at.format(CREATED_FORMAT).to_string();

    let mut columns = Vec::with_capacity(report.columns.len() + 2);
    columns.push(Column::from(Series::new(DATE_COLUMN.into(), dates)));
    for (name, values) in &report.columns {
        columns.push(Column::from(Series::new(name.as_str().into(), values.clone())));
    }
    columns.push(Column::from(Series::new(
        CREATED_COLUMN.into(),
        vec![created; report.len()],
    )));

    Ok(DataFrame::new(columns)?)
}

#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ResultSink for CsvSink {
    fn write(&self, report: &FearGreedReport) -> Result<()> {
        let mut frame = report_frame(report)?;
        let mut file =
            File::create(&self.path).with_context(|| format!("Unable to create {}", self.path.display()))?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(&mut frame)
            .with_context(|| format!("Failed to write report to {}", self.path.display()))?;

        info!("Wrote {} rows to {}", report.len(), self.path.display());
        Ok(())
    }
}
