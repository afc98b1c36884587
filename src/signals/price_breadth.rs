//! Price Breadth Indicator
//!
//! Direction of the cross-sectional average price: +1 on a day it rose,
//! -1 otherwise (including days without a comparable previous value),
//! smoothed by a trailing mean.

use crate::signals::core::Indicator;
use crate::stats::{WindowClose, diff, rolling_mean};

#[derive(Debug, Clone)]
pub struct PriceBreadth {
    window: usize,
}

impl PriceBreadth {
    pub fn new(window: usize) -> Self {
        Self { window }
    }
}

impl Indicator for PriceBreadth {
    fn name(&self) -> &str {
        "breadth"
    }

    fn warmup(&self) -> usize {
        self.window.saturating_sub(1)
    }

    fn compute(&self, values: &[Option<f64>]) -> Vec<Option<f64>> {
        let direction: Vec<Option<f64>> = diff(values)
            .into_iter()
            .map(|d| match d {
                Some(change) if change > 0.0 => Some(1.0),
                _ => Some(-1.0),
            })
            .collect();

        rolling_mean(&direction, self.window, WindowClose::Right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_breadth_counts_missing_as_down() {
        let values = vec![Some(10.0), Some(11.0), None, Some(12.0), Some(13.0)];
        let out = PriceBreadth::new(1).compute(&values);
        assert_eq!(
            out,
            vec![Some(-1.0), Some(1.0), Some(-1.0), Some(-1.0), Some(1.0)]
        );
    }

    #[test]
    fn test_price_breadth_smoothing() {
        let values = vec![Some(1.0), Some(2.0), Some(3.0), Some(2.0)];
        let out = PriceBreadth::new(2).compute(&values);
        assert_eq!(out, vec![None, Some(0.0), Some(1.0), Some(0.0)]);
    }
}
