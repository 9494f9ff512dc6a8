//! Indicators over candle series.
//!
//! Indicators are pure functions: candle history in, numeric series out. The
//! first `lookback()` values are `f64::NAN` (warmup). No value at candle t may
//! depend on candle t+1 or later; every indicator passes the truncated-vs-full
//! series test in `tests/lookahead_test.rs`.

pub mod atr;

pub use atr::{latest_atr, true_range, wilder_smooth, Atr};

use crate::domain::Candle;

/// A single-series indicator.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "atr_14").
    fn name(&self) -> &str;

    /// Number of candles needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire series. Output length equals input length.
    fn compute(&self, candles: &[Candle]) -> Vec<f64>;
}

/// Synthetic hourly candles from close prices, for tests.
///
/// open = previous close (or close for the first candle),
/// high/low = max/min(open, close) ± `spread`.
#[cfg(test)]
pub fn make_candles(closes: &[f64], spread: f64) -> Vec<Candle> {
    use chrono::{Duration, TimeZone, Utc};
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Candle {
                time: base + Duration::hours(i as i64),
                open,
                high: open.max(close) + spread,
                low: open.min(close) - spread,
                close,
                volume: None,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
