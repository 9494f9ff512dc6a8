//! Higher-timeframe context for an entry: where price sits inside the last
//! daily and weekly ranges, and how far the nearest HTF obstacle is.

use serde::{Deserialize, Serialize};

use crate::consensus::TrendSnapshot;
use crate::domain::{Candle, Timeframe, TrendDirection};
use crate::settings::RangeScoreLadder;

/// High/low of the last closed candle on a higher timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HtfLevel {
    pub timeframe: Timeframe,
    pub high: f64,
    pub low: f64,
}

impl HtfLevel {
    /// Level from a series of closed candles; `None` when empty.
    pub fn from_closed(timeframe: Timeframe, candles: &[Candle]) -> Option<Self> {
        candles.last().map(|c| Self {
            timeframe,
            high: c.high,
            low: c.low,
        })
    }
}

/// Position of `price` inside `[low, high]`, clamped to [0, 1].
pub fn range_position(price: f64, level: &HtfLevel) -> Option<f64> {
    let span = level.high - level.low;
    (span > 0.0).then(|| ((price - level.low) / span).clamp(0.0, 1.0))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HtfContext {
    pub daily_position: Option<f64>,
    pub weekly_position: Option<f64>,
    pub nearest_obstacle: Option<f64>,
    /// Distance to the nearest obstacle in ATR units. `None` when ATR is not positive.
    pub obstacle_distance_atr: Option<f64>,
    pub conflicted_timeframe: Option<Timeframe>,
}

impl HtfContext {
    /// Obstacles are HTF highs above entry for longs and lows below entry for
    /// shorts. With none in the way the distance is `no_obstacle_distance_atr`.
    pub fn compute(
        direction: TrendDirection,
        entry_price: f64,
        atr: f64,
        levels: &[HtfLevel],
        trends: &TrendSnapshot,
        alignment: &[Timeframe],
        no_obstacle_distance_atr: f64,
    ) -> Self {
        let position_on = |tf: Timeframe| {
            levels
                .iter()
                .find(|l| l.timeframe == tf)
                .and_then(|l| range_position(entry_price, l))
        };

        let nearest_obstacle = match direction {
            TrendDirection::Bullish => levels
                .iter()
                .map(|l| l.high)
                .filter(|h| *h > entry_price)
                .min_by(f64::total_cmp),
            TrendDirection::Bearish => levels
                .iter()
                .map(|l| l.low)
                .filter(|l| *l < entry_price)
                .max_by(f64::total_cmp),
            TrendDirection::Neutral => None,
        };

        let obstacle_distance_atr = (atr > 0.0).then(|| match nearest_obstacle {
            Some(level) => (level - entry_price).abs() / atr,
            None => no_obstacle_distance_atr,
        });

        Self {
            daily_position: position_on(Timeframe::D1),
            weekly_position: position_on(Timeframe::W1),
            nearest_obstacle,
            obstacle_distance_atr,
            conflicted_timeframe: trends.conflicted_timeframe(direction, alignment),
        }
    }

    /// Average of the daily and weekly ladder scores; a missing position scores 0.
    pub fn range_score(&self, direction: TrendDirection, ladder: &RangeScoreLadder) -> f64 {
        let score = |p: Option<f64>| p.map_or(0.0, |p| ladder_score(p, direction, ladder));
        (score(self.daily_position) + score(self.weekly_position)) / 2.0
    }
}

/// First rung the position satisfies, or 0.
pub fn ladder_score(position: f64, direction: TrendDirection, ladder: &RangeScoreLadder) -> f64 {
    let hit = match direction {
        TrendDirection::Bullish => ladder.bullish.iter().find(|(t, _)| position <= *t),
        TrendDirection::Bearish => ladder.bearish.iter().find(|(t, _)| position >= *t),
        TrendDirection::Neutral => None,
    };
    hit.map_or(0.0, |(_, s)| *s)
}
