//! Momentum Indicator
//!
//! Distance of the benchmark from its own trailing moving average:
//! `value / rolling_mean(value, N) - 1`.

use crate::signals::core::Indicator;
use crate::stats::{WindowClose, rolling_mean};
use log::debug;

#[derive(Debug, Clone)]
pub struct Momentum {
    window: usize,
}

impl Momentum {
    pub fn new(window: usize) -> Self {
        Self { window }
    }
}

impl Indicator for Momentum {
    fn name(&self) -> &str {
        "momentum"
    }

    fn warmup(&self) -> usize {
        self.window.saturating_sub(1)
    }

    fn compute(&self, values: &[Option<f64>]) -> Vec<Option<f64>> {
        let averages = rolling_mean(values, self.window, WindowClose::Right);

        let momentum: Vec<Option<f64>> = values
            .iter()
            .zip(averages)
            .map(|(value, average)| match (*value, average) {
                (Some(_), Some(avg)) if avg == 0.0 => None,
                (Some(v), Some(avg)) => Some(v / avg - 1.0),
                _ => None,
            })
            .collect();

        debug!(
            "Momentum({}) computed over {} observations",
            self.window,
            values.len()
        );
        momentum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_momentum_warmup_is_missing() {
        let values: Vec<Option<f64>> = (1..=10).map(|v| Some(v as f64)).collect();
        let out = Momentum::new(4).compute(&values);
        assert!(out[..3].iter().all(Option::is_none));
        assert!(out[3..].iter().all(Option::is_some));
    }

    #[test]
    fn test_momentum_exact_formula() {
        let values = vec![Some(10.0), Some(20.0), Some(30.0), Some(60.0)];
        let out = Momentum::new(3).compute(&values);
        // mean(20, 30, 60) = 110 / 3
        let expected = 60.0 / (110.0 / 3.0) - 1.0;
        assert!((out[3].unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_flat_series_has_zero_momentum() {
        let values = vec![Some(250.0); 50];
        let out = Momentum::new(20).compute(&values);
        for value in out.into_iter().skip(19) {
            assert!(value.unwrap().abs() < 1e-12);
        }
    }
}
