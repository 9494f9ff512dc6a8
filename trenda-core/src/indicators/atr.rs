//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|).
//! ATR uses Wilder smoothing (alpha = 1/period), seeded with the mean of the
//! first `period` true ranges that have a previous close.

use super::Indicator;
use crate::domain::Candle;

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
}

impl Atr {
    /// A zero period is clamped to 1.
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            name: format!("atr_{period}"),
        }
    }
}

/// True Range per candle. TR[0] is NaN: it has no previous close.
pub fn true_range(candles: &[Candle]) -> Vec<f64> {
    let mut tr = vec![f64::NAN; candles.len()];
    for (i, pair) in candles.windows(2).enumerate() {
        let (prev, cur) = (pair[0], pair[1]);
        tr[i + 1] = (cur.high - cur.low)
            .max((cur.high - prev.close).abs())
            .max((cur.low - prev.close).abs());
    }
    tr
}

/// Wilder smoothing. Seeds at the first run of `period` consecutive finite
/// values; output is NaN before the seed and from the first later NaN onward.
pub fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period {
        return result;
    }

    let mut run = 0;
    let mut seed_end = None;
    for (i, v) in values.iter().enumerate() {
        run = if v.is_finite() { run + 1 } else { 0 };
        if run == period {
            seed_end = Some(i + 1);
            break;
        }
    }
    let Some(seed_end) = seed_end else {
        return result;
    };

    let mut prev = values[seed_end - period..seed_end].iter().sum::<f64>() / period as f64;
    result[seed_end - 1] = prev;

    let alpha = 1.0 / period as f64;
    for i in seed_end..n {
        if !values[i].is_finite() {
            break;
        }
        prev = alpha * values[i] + (1.0 - alpha) * prev;
        result[i] = prev;
    }
    result
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        wilder_smooth(&true_range(candles), self.period)
    }
}

/// ATR at the last candle, in price units. Returns 0.0 when the series is too
/// short to seed the average; callers treat a non-positive ATR as "unknown".
pub fn latest_atr(candles: &[Candle], period: usize) -> f64 {
    Atr::new(period)
        .compute(candles)
        .last()
        .copied()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_candles, DEFAULT_EPSILON};
    use chrono::{Duration, TimeZone, Utc};

    fn make_ohlc(data: &[(f64, f64, f64, f64)]) -> Vec<Candle> {
        let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        data.iter()
            .enumerate()
            .map(|(i, &(open, high, low, close))| Candle {
                time: base + Duration::hours(i as i64),
                open,
                high,
                low,
                close,
                volume: None,
            })
            .collect()
    }

    #[test]
    fn true_range_uses_previous_close() {
        let candles = make_ohlc(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 108.0, 100.0, 106.0), // max(8, 6, 2) = 8
            (106.0, 107.0, 98.0, 99.0),   // max(9, 1, 8) = 9
            (110.0, 115.0, 108.0, 112.0), // gap: max(7, 16, 9) = 16
        ]);
        let tr = true_range(&candles);
        assert!(tr[0].is_nan());
        assert_approx(tr[1], 8.0, DEFAULT_EPSILON);
        assert_approx(tr[2], 9.0, DEFAULT_EPSILON);
        assert_approx(tr[3], 16.0, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_period_3() {
        let candles = make_ohlc(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 108.0, 100.0, 106.0), // TR = 8
            (106.0, 107.0, 98.0, 99.0),   // TR = 9
            (99.0, 103.0, 97.0, 101.0),   // TR = 6
            (101.0, 106.0, 100.0, 105.0), // TR = 6
        ]);
        let result = Atr::new(3).compute(&candles);

        assert!(result[..3].iter().all(|v| v.is_nan()));
        // Seed: mean(8, 9, 6) = 23/3; next: 6/3 + (2/3)(23/3) = 64/9
        assert_approx(result[3], 23.0 / 3.0, DEFAULT_EPSILON);
        assert_approx(result[4], 64.0 / 9.0, DEFAULT_EPSILON);
        assert_approx(latest_atr(&candles, 3), 64.0 / 9.0, DEFAULT_EPSILON);
    }

    #[test]
    fn latest_atr_zero_when_short() {
        let candles = make_candles(&[1.10, 1.11, 1.12], 0.001);
        assert_eq!(latest_atr(&candles, 14), 0.0);
        assert_eq!(latest_atr(&[], 14), 0.0);
    }

    #[test]
    fn period_plus_one_candles_is_enough() {
        let closes: Vec<f64> = (0..15).map(|i| 1.1 + i as f64 * 0.001).collect();
        let candles = make_candles(&closes, 0.0005);
        assert!(latest_atr(&candles, 14) > 0.0);
    }

    #[test]
    fn wilder_stops_at_gap() {
        let values = [f64::NAN, 1.0, 2.0, 3.0, f64::NAN, 4.0];
        let out = wilder_smooth(&values, 2);
        assert_approx(out[2], 1.5, DEFAULT_EPSILON);
        assert_approx(out[3], 0.5 * 3.0 + 0.5 * 1.5, DEFAULT_EPSILON);
        assert!(out[4].is_nan());
        assert!(out[5].is_nan());
    }

    #[test]
    fn atr_lookback_and_name() {
        let atr = Atr::new(14);
        assert_eq!(atr.lookback(), 14);
        assert_eq!(atr.name(), "atr_14");
    }
}
