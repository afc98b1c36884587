//! Fear & Greed pipeline
//!
//! Source → independent indicator branches (fan-out) → left join on the
//! benchmark dates → per-column percentile normalisation → composite score.
//!
//! Branches share no state, so `run_parallel` computes each on the blocking
//! pool and waits for all of them before aligning.

use crate::aggregates::{AdvanceDecline, Aggregate, AveragePrice, HighsLows, Uptrend};
use crate::aligner::{CompositeTable, align};
use crate::composer::{Composer, FearGreedReport};
use crate::config::{Variant, VariantConfig};
use crate::market_data::{IndexSeries, UniverseSeries};
use crate::normalizer::Normalizer;
use crate::signals::{Indicator, IndicatorColumn, Momentum, PriceBreadth, Rsi, VolatilityRegime};
use crate::source::TimeSeriesSource;
use anyhow::{Result, anyhow};
use chrono::NaiveDateTime;
use futures::future::try_join_all;
use log::{debug, info};
use std::sync::Arc;

/// One independent unit of indicator work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    /// momentum, vix and rsi on the benchmark
    IndexIndicators,
    AdvanceDecline,
    HighsLows,
    Uptrend,
    AveragePrice,
}

#[derive(Debug, Clone)]
pub struct FearGreedPipeline {
    config: VariantConfig,
}

impl FearGreedPipeline {
    pub fn new(config: VariantConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &VariantConfig {
        &self.config
    }

    pub fn branches(&self) -> Vec<Branch> {
        match self.config.variant {
            Variant::MomentumVolatility => vec![Branch::IndexIndicators],
            Variant::AveragePrice => vec![Branch::IndexIndicators, Branch::AveragePrice],
            Variant::Full => vec![
                Branch::IndexIndicators,
                Branch::AdvanceDecline,
                Branch::HighsLows,
                Branch::Uptrend,
            ],
        }
    }

    /// Raw (unnormalised) columns for one branch.
    pub fn compute_branch(
        &self,
        branch: Branch,
        index: &IndexSeries,
        universe: Option<&UniverseSeries>,
    ) -> Result<Vec<IndicatorColumn>> {
        let config = &self.config;
        let columns = match (branch, universe) {
            (Branch::IndexIndicators, _) => {
                let dates = index.dates();
                let values = index.values();
                let mut indicators: Vec<Box<dyn Indicator>> = vec![Box::new(Momentum::new(config.momentum_window))];
                if config.variant != Variant::AveragePrice {
                    indicators.push(Box::new(VolatilityRegime::new(
                        config.vix_std_window,
                        config.vix_smooth_window,
                    )));
                    indicators.push(Box::new(Rsi::new(config.rsi_span, config.rsi_min_periods)));
                }
                indicators
                    .iter()
                    .map(|indicator| {
                        debug!("{}: {} warm-up observations", indicator.name(), indicator.warmup());
                        indicator.compute_column(&dates, &values)
                    })
                    .collect::<Result<Vec<_>>>()?
            }
            (Branch::AdvanceDecline, Some(universe)) => AdvanceDecline::new(
                config.breadth_fast_alpha,
                config.breadth_slow_alpha,
                config.breadth_window,
            )
            .columns(universe)?,
            (Branch::HighsLows, Some(universe)) => {
                HighsLows::new(config.sps_lookback, config.sps_window).columns(universe)?
            }
            (Branch::Uptrend, Some(universe)) => Uptrend::new(config.uptrend_window).columns(universe)?,
            (Branch::AveragePrice, Some(universe)) => AveragePrice.columns(universe)?,
            (branch, None) => return Err(anyhow!("{:?} branch needs the constituent universe", branch)),
        };

        for column in &columns {
            debug!(
                "{:?}: {} has {} rows, {} warm-up",
                branch,
                column.name(),
                column.len(),
                column.warmup_len()
            );
        }
        Ok(columns)
    }

    /// Align all branch outputs on the benchmark dates. Price breadth is
    /// derived here because it needs `avg_price` already on benchmark dates.
    pub fn raw_table(&self, index: &IndexSeries, columns: &[IndicatorColumn]) -> Result<CompositeTable> {
        let table = align(index, &self.config.benchmark_column, columns)?;

        match self.config.variant {
            Variant::AveragePrice => {
                let indicator = PriceBreadth::new(self.config.price_breadth_window);
                let breadth = indicator.compute(table.require("avg_price")?);
                table.with_column(indicator.name(), breadth)
            }
            _ => Ok(table),
        }
    }

    /// Join, normalise and compose.
    pub fn assemble(
        &self,
        index: &IndexSeries,
        columns: &[IndicatorColumn],
        generated_at: NaiveDateTime,
    ) -> Result<FearGreedReport> {
        let table = self.raw_table(index, columns)?;
        let components = self.config.component_names();

        let normalizer = Normalizer::new(self.config.rank_window, self.config.rank_min_periods);
        let table = normalizer.normalize_columns(table, &components)?;

        let composer = Composer::new(
            components.iter().map(|name| name.to_string()).collect(),
            self.config.missing_policy,
            self.config.output_columns.clone(),
            self.config.cutoff,
        )?;
        composer.compose(table, generated_at)
    }

    /// Single-threaded run over already-loaded series.
    pub fn compute(
        &self,
        index: &IndexSeries,
        universe: Option<&UniverseSeries>,
        generated_at: NaiveDateTime,
    ) -> Result<FearGreedReport> {
        let mut columns = Vec::new();
        for branch in self.branches() {
            columns.extend(self.compute_branch(branch, index, universe)?);
        }
        self.assemble(index, &columns, generated_at)
    }

    /// Load from `source` and compute.
    pub fn run<S: TimeSeriesSource + ?Sized>(&self, source: &S, generated_at: NaiveDateTime) -> Result<FearGreedReport> {
        let (index, universe) = self.load(source)?;
        self.compute(&index, universe.as_ref(), generated_at)
    }

    /// Query the source for everything this variant reads.
    pub fn load<S: TimeSeriesSource + ?Sized>(&self, source: &S) -> Result<(IndexSeries, Option<UniverseSeries>)> {
        let index = source.load_index()?;
        if index.is_empty() {
            return Err(anyhow!("Benchmark {} has no observations", index.entity_id()));
        }

        let universe = match self.config.variant.needs_universe() {
            true => Some(source.load_universe()?),
            false => None,
        };
        info!(
            "{:?} variant: {} benchmark dates, {} tickers",
            self.config.variant,
            index.len(),
            universe.as_ref().map_or(0, UniverseSeries::ticker_count)
        );
        Ok((index, universe))
    }

    /// Compute every branch on the blocking pool, then join and compose.
    pub async fn run_parallel(
        &self,
        index: Arc<IndexSeries>,
        universe: Option<Arc<UniverseSeries>>,
        generated_at: NaiveDateTime,
    ) -> Result<FearGreedReport> {
        let pipeline = Arc::new(self.clone());

        let tasks = self.branches().into_iter().map(|branch| {
            let pipeline = Arc::clone(&pipeline);
            let index = Arc::clone(&index);
            let universe = universe.clone();
            tokio::task::spawn_blocking(move || pipeline.compute_branch(branch, &index, universe.as_deref()))
        });

        let mut columns = Vec::new();
        for branch_columns in try_join_all(tasks).await? {
            columns.extend(branch_columns?);
        }
        info!("Joined {} indicator columns from parallel branches", columns.len());

        self.assemble(&index, &columns, generated_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::DailyRecord;
    use crate::source::{MockTimeSeriesSource, SourceError};
    use chrono::{Duration, NaiveDate};

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, 1).unwrap()
    }

    fn generated_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn index(days: usize) -> IndexSeries {
        let points = (0..days)
            .map(|i| (start() + Duration::days(i as i64), 1000.0 + 20.0 * (i as f64 * 0.2).sin()))
            .collect();
        IndexSeries::new("VNINDEX", points).unwrap()
    }

    fn universe(days: usize) -> UniverseSeries {
        let records = ["AAA", "BBB", "CCC"]
            .iter()
            .enumerate()
            .flat_map(|(k, ticker)| {
                (0..days).map(move |i| {
                    let close = 50.0 + 10.0 * k as f64 + 3.0 * (i as f64 * 0.15 + k as f64).cos();
                    DailyRecord::new(*ticker, start() + Duration::days(i as i64), close)
                })
            })
            .collect();
        UniverseSeries::new(records).unwrap()
    }

    fn small(variant: Variant) -> VariantConfig {
        VariantConfig {
            momentum_window: 10,
            vix_std_window: 5,
            vix_smooth_window: 10,
            sps_lookback: 20,
            sps_window: 5,
            breadth_window: 5,
            rank_window: 30,
            rank_min_periods: 30,
            cutoff: None,
            ..VariantConfig::preset(variant)
        }
    }

    #[test]
    fn test_branches_per_variant() {
        let mv = FearGreedPipeline::new(small(Variant::MomentumVolatility)).unwrap();
        assert_eq!(mv.branches(), vec![Branch::IndexIndicators]);

        let full = FearGreedPipeline::new(small(Variant::Full)).unwrap();
        assert_eq!(full.branches().len(), 4);
    }

    #[test]
    fn test_universe_branch_without_universe_fails() {
        let pipeline = FearGreedPipeline::new(small(Variant::Full)).unwrap();
        assert!(pipeline.compute_branch(Branch::HighsLows, &index(50), None).is_err());
    }

    #[test]
    fn test_average_price_variant_derives_breadth() {
        let pipeline = FearGreedPipeline::new(small(Variant::AveragePrice)).unwrap();
        let report = pipeline.compute(&index(60), Some(&universe(60)), generated_at()).unwrap();

        assert_eq!(report.len(), 60);
        let names: Vec<&str> = report.columns.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["fear_greed_score", "vnindex", "avg_price", "breadth"]);
        // raw price breadth starts on row 9, its rank once 30 of those exist
        let breadth = report.column("breadth").unwrap();
        assert!(breadth[..38].iter().all(Option::is_none));
        assert!(breadth[38..].iter().all(Option::is_some));
    }

    #[test]
    fn test_scores_bounded() {
        let pipeline = FearGreedPipeline::new(small(Variant::Full)).unwrap();
        let report = pipeline.compute(&index(120), Some(&universe(120)), generated_at()).unwrap();
        for score in report.scores().iter().flatten() {
            assert!((0.0..=100.0).contains(score));
        }
        assert!(report.latest_score().is_some());
    }

    #[test]
    fn test_momentum_volatility_skips_universe() {
        let mut source = MockTimeSeriesSource::new();
        source.expect_load_index().times(1).returning(|| Ok(index(40)));
        source.expect_load_universe().times(0);

        let pipeline = FearGreedPipeline::new(small(Variant::MomentumVolatility)).unwrap();
        let report = pipeline.run(&source, generated_at()).unwrap();
        assert_eq!(report.len(), 40);
    }

    #[test]
    fn test_source_unavailable_propagates() {
        let mut source = MockTimeSeriesSource::new();
        source.expect_load_index().returning(|| Ok(index(40)));
        source
            .expect_load_universe()
            .returning(|| Err(SourceError::Unavailable("warehouse timed out".to_string())));

        let pipeline = FearGreedPipeline::new(small(Variant::Full)).unwrap();
        let err = pipeline.run(&source, generated_at()).unwrap_err();
        assert!(matches!(err.downcast_ref::<SourceError>(), Some(SourceError::Unavailable(_))));
    }

    #[test]
    fn test_schema_mismatch_propagates() {
        let mut source = MockTimeSeriesSource::new();
        source
            .expect_load_index()
            .returning(|| Err(SourceError::SchemaMismatch("missing column value".to_string())));

        let pipeline = FearGreedPipeline::new(small(Variant::MomentumVolatility)).unwrap();
        let err = pipeline.run(&source, generated_at()).unwrap_err();
        assert!(matches!(err.downcast_ref::<SourceError>(), Some(SourceError::SchemaMismatch(_))));
    }

    #[tokio::test]
    async fn test_parallel_matches_sequential() {
        let pipeline = FearGreedPipeline::new(small(Variant::Full)).unwrap();
        let index = index(150);
        let universe = universe(150);

        let sequential = pipeline.compute(&index, Some(&universe), generated_at()).unwrap();
        let parallel = pipeline
            .run_parallel(Arc::new(index), Some(Arc::new(universe)), generated_at())
            .await
            .unwrap();
        assert_eq!(sequential, parallel);
    }
}
