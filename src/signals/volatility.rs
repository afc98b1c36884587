//! Volatility Regime Indicator
//!
//! Rolling standard deviation of daily percent changes, expressed relative to
//! its own longer moving average: `raw_vol / rolling_mean(raw_vol, M) - 1`.

use crate::signals::core::Indicator;
use crate::stats::{WindowClose, pct_change, rolling_mean, rolling_std};
use log::debug;

#[derive(Debug, Clone)]
pub struct VolatilityRegime {
    std_window: usize,
    smooth_window: usize,
}

impl VolatilityRegime {
    pub fn new(std_window: usize, smooth_window: usize) -> Self {
        Self {
            std_window,
            smooth_window,
        }
    }

    /// Rolling sample standard deviation of percent changes
    pub fn raw_volatility(&self, values: &[Option<f64>]) -> Vec<Option<f64>> {
        rolling_std(&pct_change(values), self.std_window)
    }
}

impl Indicator for VolatilityRegime {
    fn name(&self) -> &str {
        "vix"
    }

    fn warmup(&self) -> usize {
        // one observation lost to pct_change, then both windows
        self.std_window + self.smooth_window.saturating_sub(1)
    }

    fn compute(&self, values: &[Option<f64>]) -> Vec<Option<f64>> {
        let raw = self.raw_volatility(values);
        let baseline = rolling_mean(&raw, self.smooth_window, WindowClose::Right);

        let mut degenerate = 0usize;
        let regime = raw
            .iter()
            .zip(baseline)
            .map(|(vol, base)| match (*vol, base) {
                // a zero baseline means every volatility in the window is zero
                (Some(_), Some(b)) if b == 0.0 => {
                    degenerate += 1;
                    Some(0.0)
                }
                (Some(v), Some(b)) => Some(v / b - 1.0),
                _ => None,
            })
            .collect();

        if degenerate > 0 {
            debug!("vix: {} dates with zero volatility baseline set to 0", degenerate);
        }
        regime
    }
}
