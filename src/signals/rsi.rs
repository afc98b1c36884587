//! Relative Strength Index
//!
//! Average gain and loss are bias-corrected exponentially weighted means of
//! the daily up and down moves (center of mass `span`, so `alpha = 1 / (1 + span)`).
//! RSI = 100 - 100 / (1 + gain / loss).
//! Edge cases: loss == 0 with gain > 0 → 100; no movement at all (0 / 0) → missing.

use crate::signals::core::Indicator;
use crate::stats::{alpha_from_com, diff, ewm_mean};

#[derive(Debug, Clone)]
pub struct Rsi {
    span: f64,
    min_periods: usize,
}

impl Rsi {
    pub fn new(span: f64, min_periods: usize) -> Self {
        Self { span, min_periods }
    }
}

impl Default for Rsi {
    fn default() -> Self {
        Self::new(13.0, 14)
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        "rsi"
    }

    fn warmup(&self) -> usize {
        self.min_periods.saturating_sub(1)
    }

    fn compute(&self, values: &[Option<f64>]) -> Vec<Option<f64>> {
        // an undefined difference contributes neither gain nor loss
        let changes = diff(values);
        let up: Vec<f64> = changes.iter().map(|d| d.filter(|&d| d > 0.0).unwrap_or(0.0)).collect();
        let down: Vec<f64> = changes.iter().map(|d| d.filter(|&d| d < 0.0).map_or(0.0, |d| -d)).collect();

        let alpha = alpha_from_com(self.span);
        let gains = ewm_mean(&up, alpha, true, self.min_periods);
        let losses = ewm_mean(&down, alpha, true, self.min_periods);

        gains
            .into_iter()
            .zip(losses)
            .map(|(gain, loss)| relative_strength_index(gain?, loss?))
            .collect()
    }
}

fn relative_strength_index(gain: f64, loss: f64) -> Option<f64> {
    match (gain, loss) {
        (g, l) if l == 0.0 && g == 0.0 => None,
        (_, l) if l == 0.0 => Some(100.0),
        (g, l) => Some(100.0 - 100.0 / (1.0 + g / l)),
    }
}
