//! Retest-and-break pattern finder.
//!
//! Within the last `window` candles, a pattern is a retest candle that enters
//! the zone from the trend side followed, at least one candle later, by a
//! break candle that opens inside the zone and closes out of it in the trend
//! direction. The break is either the last candle, or the one before it when
//! the last candle sits entirely beyond the zone (the after-break candle).
//!
//! Everything here reads only the candles it is given, so evaluating a
//! prefix of a series never depends on candles after that prefix.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{AoiZone, Candle, TrendDirection};

/// A detected retest/break sequence. `candles[0]` is the retest candle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryPattern {
    pub direction: TrendDirection,
    pub zone: AoiZone,
    pub candles: Vec<Candle>,
    /// The break candle is the newest candle (no after-break candle yet).
    pub is_break_candle_last: bool,
}

impl EntryPattern {
    pub fn retest_index(&self) -> usize {
        0
    }

    pub fn break_index(&self) -> usize {
        if self.is_break_candle_last {
            self.candles.len() - 1
        } else {
            self.candles.len() - 2
        }
    }

    pub fn after_break_index(&self) -> Option<usize> {
        (!self.is_break_candle_last).then(|| self.candles.len() - 1)
    }

    pub fn retest(&self) -> &Candle {
        &self.candles[self.retest_index()]
    }

    pub fn break_candle(&self) -> &Candle {
        &self.candles[self.break_index()]
    }

    pub fn after_break(&self) -> Option<&Candle> {
        self.after_break_index().map(|i| &self.candles[i])
    }

    /// Entry is taken at the close of the newest candle.
    pub fn entry_price(&self) -> f64 {
        self.newest().close
    }

    pub fn signal_time(&self) -> DateTime<Utc> {
        self.newest().time
    }

    fn newest(&self) -> &Candle {
        // Construction guarantees at least a retest, one middle and a break candle.
        &self.candles[self.candles.len() - 1]
    }
}

fn opens_inside(candle: &Candle, zone: &AoiZone) -> bool {
    candle.open >= zone.lower && candle.open <= zone.upper
}

fn is_break(candle: &Candle, zone: &AoiZone, direction: TrendDirection) -> bool {
    opens_inside(candle, zone)
        && match direction {
            TrendDirection::Bullish => candle.close > zone.upper,
            TrendDirection::Bearish => candle.close < zone.lower,
            TrendDirection::Neutral => false,
        }
}

fn is_beyond(candle: &Candle, zone: &AoiZone, direction: TrendDirection) -> bool {
    match direction {
        TrendDirection::Bullish => candle.low > zone.upper,
        TrendDirection::Bearish => candle.high < zone.lower,
        TrendDirection::Neutral => false,
    }
}

fn is_retest(candle: &Candle, zone: &AoiZone, direction: TrendDirection) -> bool {
    match direction {
        TrendDirection::Bullish => candle.open > zone.upper && candle.close <= zone.upper,
        TrendDirection::Bearish => candle.open < zone.lower && candle.close >= zone.lower,
        TrendDirection::Neutral => false,
    }
}

/// A candle that opens inside the zone and closes through the far side
/// cancels any older retest.
fn invalidates(candle: &Candle, zone: &AoiZone, direction: TrendDirection) -> bool {
    opens_inside(candle, zone)
        && match direction {
            TrendDirection::Bullish => candle.close < zone.lower,
            TrendDirection::Bearish => candle.close > zone.upper,
            TrendDirection::Neutral => false,
        }
}

/// Find the pattern for one zone in the newest `window` candles.
pub fn find_pattern(
    candles: &[Candle],
    zone: &AoiZone,
    direction: TrendDirection,
    window: usize,
) -> Option<EntryPattern> {
    if !direction.is_directional() {
        return None;
    }
    let window = &candles[candles.len().saturating_sub(window)..];
    let n = window.len();
    if n < 3 {
        return None;
    }

    let (break_idx, is_break_candle_last) = if is_break(&window[n - 1], zone, direction) {
        (n - 1, true)
    } else if is_beyond(&window[n - 1], zone, direction) && is_break(&window[n - 2], zone, direction)
    {
        (n - 2, false)
    } else {
        return None;
    };

    for idx in (0..break_idx).rev() {
        let candle = &window[idx];
        if invalidates(candle, zone, direction) {
            return None;
        }
        if is_retest(candle, zone, direction) && n - 1 - idx > 1 {
            return Some(EntryPattern {
                direction,
                zone: zone.clone(),
                candles: window[idx..].to_vec(),
                is_break_candle_last,
            });
        }
    }
    None
}

/// Scan every tradable zone and keep the pattern with the most recent retest.
/// Ties keep the earlier zone.
pub fn detect_entry(
    candles: &[Candle],
    zones: &[AoiZone],
    direction: TrendDirection,
    window: usize,
) -> Option<EntryPattern> {
    let mut best: Option<EntryPattern> = None;
    for zone in zones.iter().filter(|z| z.is_tradable()) {
        let Some(pattern) = find_pattern(candles, zone, direction, window) else {
            continue;
        };
        let newer = best
            .as_ref()
            .map_or(true, |b| pattern.retest().time > b.retest().time);
        if newer {
            best = Some(pattern);
        }
    }
    best
}
