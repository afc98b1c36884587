use statrs::statistics::Statistics;

/// Trailing window placement relative to the current observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowClose {
    /// Window ends at the current observation (inclusive).
    Right,
    /// Window ends at the previous observation; today is excluded.
    Left,
}

/// Apply a statistic over a trailing window of `window` observations.
///
/// A window that is shorter than `window` or that contains a missing value
/// yields `None`, matching the usual rolling-window propagation rules.
///
/// # Arguments
/// * `values` - Input series, one entry per trading date
/// * `window` - Number of observations in each window
/// * `close` - Whether the window includes the current observation
/// * `stat` - Statistic computed on a complete window
pub fn rolling<F>(values: &[Option<f64>], window: usize, close: WindowClose, stat: F) -> Vec<Option<f64>>
where
    F: Fn(&[f64]) -> Option<f64>,
{
    let lag = match close {
        WindowClose::Right => 0,
        WindowClose::Left => 1,
    };
    let mut buffer = Vec::with_capacity(window);

    (0..values.len())
        .map(|i| {
            let end = (i + 1).checked_sub(lag)?;
            let start = end.checked_sub(window)?;
            if window == 0 {
                return None;
            }

            buffer.clear();
            for value in &values[start..end] {
                buffer.push((*value)?);
            }
            stat(&buffer)
        })
        .collect()
}

pub fn rolling_mean(values: &[Option<f64>], window: usize, close: WindowClose) -> Vec<Option<f64>> {
    rolling(values, window, close, |w| Some(w.mean()))
}

/// Sample standard deviation (n - 1 denominator) over a trailing window.
pub fn rolling_std(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, WindowClose::Right, |w| {
        if w.len() < 2 {
            None
        } else {
            Some(w.std_dev())
        }
    })
}

pub fn rolling_max(values: &[Option<f64>], window: usize, close: WindowClose) -> Vec<Option<f64>> {
    rolling(values, window, close, |w| {
        Some(w.iter().copied().fold(f64::NEG_INFINITY, f64::max))
    })
}

pub fn rolling_min(values: &[Option<f64>], window: usize, close: WindowClose) -> Vec<Option<f64>> {
    rolling(values, window, close, |w| {
        Some(w.iter().copied().fold(f64::INFINITY, f64::min))
    })
}

/// Period-over-period difference; the first entry is always missing.
pub fn diff(values: &[Option<f64>]) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            let previous = *values.get(i.checked_sub(1)?)?;
            Some(values[i]? - previous?)
        })
        .collect()
}

/// Period-over-period percent change as a fraction.
///
/// A zero prior value has no defined change and yields `None`.
pub fn pct_change(values: &[Option<f64>]) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            let previous = (*values.get(i.checked_sub(1)?)?)?;
            let current = values[i]?;
            match previous {
                p if p == 0.0 => None,
                p => Some(current / p - 1.0),
            }
        })
        .collect()
}

/// Exponentially weighted moving average.
///
/// With `adjust` the weights are normalised over all observations seen so far
/// (`sum(w_k * x_{t-k}) / sum(w_k)`, `w_k = (1 - alpha)^k`). Without it the
/// average is the plain recursion `y_t = alpha * x_t + (1 - alpha) * y_{t-1}`
/// seeded with the first observation.
///
/// # Arguments
/// * `values` - Complete input series
/// * `alpha` - Smoothing factor in (0, 1]
/// * `adjust` - Use bias-corrected weights
/// * `min_periods` - Observations required before a value is emitted
pub fn ewm_mean(values: &[f64], alpha: f64, adjust: bool, min_periods: usize) -> Vec<Option<f64>> {
    let decay = 1.0 - alpha;
    let mut numerator = 0.0;
    let mut denominator = 0.0;
    let mut previous: Option<f64> = None;

    values
        .iter()
        .enumerate()
        .map(|(i, &x)| {
            let average = if adjust {
                numerator = x + decay * numerator;
                denominator = 1.0 + decay * denominator;
                numerator / denominator
            } else {
                let next = match previous {
                    Some(prev) => alpha * x + decay * prev,
                    None => x,
                };
                previous = Some(next);
                next
            };

            if i + 1 >= min_periods { Some(average) } else { None }
        })
        .collect()
}

/// Smoothing factor for a given center of mass: `alpha = 1 / (1 + com)`.
pub fn alpha_from_com(center_of_mass: f64) -> f64 {
    1.0 / (1.0 + center_of_mass)
}

/// Percentile rank of `current` within `window` (which includes `current`).
///
/// Ties receive the average of the ranks they span, so a window of identical
/// values ranks each member at `(n + 1) / 2n`.
///
/// # Returns
/// * `f64` - Rank as a fraction in (0.0, 1.0]
pub fn percentile_rank(current: f64, window: &[f64]) -> f64 {
    if window.is_empty() {
        return 0.5;
    }

    let below = window.iter().filter(|&&v| v < current).count() as f64;
    let equal = window.iter().filter(|&&v| v == current).count() as f64;
    let average_rank = below + (equal + 1.0) / 2.0;

    average_rank / window.len() as f64
}

/// Rolling percentile rank with a "keep" missing-value policy.
///
/// Missing entries inside the window are ignored; a missing current value
/// stays missing; fewer than `min_periods` available values yields `None`.
pub fn rolling_percentile_rank(values: &[Option<f64>], window: usize, min_periods: usize) -> Vec<Option<f64>> {
    let mut available = Vec::with_capacity(window);

    (0..values.len())
        .map(|i| {
            let current = values[i]?;
            let start = (i + 1).saturating_sub(window);

            available.clear();
            available.extend(values[start..=i].iter().flatten().copied());
            if available.len() < min_periods.max(1) {
                return None;
            }
            Some(percentile_rank(current, &available))
        })
        .collect()
}

/// Round to `decimals` places, exact halves to even.
pub fn round_dp(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round_ties_even() / factor
}
