//! Moving average and relative strength overlays over a candle series.
//!
//! Both functions are pure. Point `i` only reads candles at or before `i`, so
//! extending a series never changes points that were already emitted.

use crate::config;
use crate::models::{Candle, IndicatorPoint, IndicatorSeries};

/// Simple moving average of the `period` closes strictly before each candle.
///
/// Emits one point per candle from index `period` on; output length is
/// `len - period` (empty when the series is too short or `period` is zero).
pub fn sma(series: &[Candle], period: usize) -> IndicatorSeries {
    if period == 0 || series.len() <= period {
        return Vec::new();
    }

    (period..series.len())
        .map(|i| {
            let window = &series[i - period..i];
            let sum: f64 = window.iter().map(|c| c.close).sum();
            IndicatorPoint {
                time: series[i].time,
                value: sum / period as f64,
            }
        })
        .collect()
}

/// Relative strength index from simple (not Wilder-smoothed) averages.
///
/// At candle `i >= period` the averages cover the `period` close-to-close
/// moves ending at `i`. A zero average loss is floored to 1.
pub fn rsi(series: &[Candle], period: usize) -> IndicatorSeries {
    if period == 0 || series.len() <= period {
        return Vec::new();
    }

    // deltas[k] is the move into candle k + 1
    let (gains, losses): (Vec<f64>, Vec<f64>) = series
        .windows(2)
        .map(|w| {
            let change = w[1].close - w[0].close;
            (change.max(0.0), (-change).max(0.0))
        })
        .unzip();

    (period..series.len())
        .map(|i| {
            let window = i - period..i;
            let avg_gain = gains[window.clone()].iter().sum::<f64>() / period as f64;
            let avg_loss = losses[window].iter().sum::<f64>() / period as f64;

            let rs = avg_gain / if avg_loss == 0.0 { 1.0 } else { avg_loss };
            let value = (100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0);

            IndicatorPoint {
                time: series[i].time,
                value,
            }
        })
        .collect()
}

/// Most recent RSI value, neutral when the series has not warmed up
pub fn latest_rsi(series: &[Candle], period: usize) -> f64 {
    rsi(series, period)
        .last()
        .map(|p| p.value)
        .unwrap_or(config::RSI_NEUTRAL)
}
