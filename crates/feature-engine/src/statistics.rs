//! Lag and Rolling Window Helpers

use crate::features::LAG_COUNT;

/// Last `LAG_COUNT` values, most recent first, zero padded on the older side
pub fn lag_values(history: &[f64]) -> [f64; LAG_COUNT] {
    let mut lags = [0.0; LAG_COUNT];
    for (slot, value) in lags.iter_mut().zip(history.iter().rev()) {
        *slot = *value;
    }
    lags
}

/// Mean of the last `window` values, or `None` when fewer are available
pub fn rolling_mean(history: &[f64], window: usize) -> Option<f64> {
    if window == 0 || history.len() < window {
        return None;
    }
    let tail = &history[history.len() - window..];
    Some(tail.iter().sum::<f64>() / window as f64)
}
