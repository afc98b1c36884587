use crate::aligner::CompositeTable;
use crate::stats::rolling_percentile_rank;
use anyhow::Result;
use log::debug;

/// Rolling percentile-rank normalisation onto a 0-100 scale.
#[derive(Debug, Clone)]
pub struct Normalizer {
    window: usize,
    min_periods: usize,
}

impl Normalizer {
    pub fn new(window: usize, min_periods: usize) -> Self {
        Self {
            window,
            min_periods,
        }
    }

    /// Rank each value among the trailing `window` values.
    ///
    /// The rank fraction is rounded to two decimals (halves to even) before
    /// scaling, so the result is a whole-number percentile. Missing inputs
    /// stay missing, and fewer than `min_periods` in-window values give `None`.
    pub fn normalize(&self, values: &[Option<f64>]) -> Vec<Option<f64>> {
        rolling_percentile_rank(values, self.window, self.min_periods)
            .into_iter()
            .map(|rank| rank.map(|fraction| (fraction * 100.0).round_ties_even()))
            .collect()
    }

    /// Normalise each named column independently, replacing its raw values.
    pub fn normalize_columns(&self, table: CompositeTable, names: &[&str]) -> Result<CompositeTable> {
        names.iter().try_fold(table, |table, name| {
            let normalized = self.normalize(table.require(name)?);
            debug!(
                "Normalised {} over a {}-day window ({} ranked dates)",
                name,
                self.window,
                normalized.iter().flatten().count()
            );
            table.with_column(*name, normalized)
        })
    }
}
