//! Pattern quality: eight stage scores in [0, 1] combined into a confidence
//! score and a tier.
//!
//! Stages: penetration (S1), wick momentum (S2), breaking candle (S3),
//! impulse dominance (S4), after-break confirmation (S5, only when an
//! after-break candle exists), candle count (S6), retest entry (S7) and
//! opposing wick resistance (S8). Any ratio with a zero denominator is 0.

use serde::{Deserialize, Serialize};

use super::pattern::EntryPattern;
use crate::domain::{Candle, TrendDirection};

pub const PRIORITY_THRESHOLD: f64 = 0.72;
pub const NOTIFY_THRESHOLD: f64 = 0.60;
pub const WATCHLIST_THRESHOLD: f64 = 0.45;

const WEIGHTS_WITH_AFTER_BREAK: [f64; 8] = [0.18, 0.09, 0.17, 0.10, 0.25, 0.11, 0.03, 0.07];
const WEIGHTS_WITHOUT_AFTER_BREAK: [f64; 8] = [0.19, 0.10, 0.34, 0.12, 0.0, 0.13, 0.04, 0.08];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Unranked,
    Watchlist,
    Notify,
    Priority,
}

impl QualityTier {
    pub fn from_score(score: f64) -> Self {
        if score >= PRIORITY_THRESHOLD {
            Self::Priority
        } else if score >= NOTIFY_THRESHOLD {
            Self::Notify
        } else if score >= WATCHLIST_THRESHOLD {
            Self::Watchlist
        } else {
            Self::Unranked
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityStage {
    Penetration,
    WickMomentum,
    BreakingCandle,
    ImpulseDominance,
    AfterBreak,
    CandleCount,
    RetestEntry,
    OpposingWick,
}

impl QualityStage {
    pub const ALL: [QualityStage; 8] = [
        Self::Penetration,
        Self::WickMomentum,
        Self::BreakingCandle,
        Self::ImpulseDominance,
        Self::AfterBreak,
        Self::CandleCount,
        Self::RetestEntry,
        Self::OpposingWick,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Self::Penetration => "S1",
            Self::WickMomentum => "S2",
            Self::BreakingCandle => "S3",
            Self::ImpulseDominance => "S4",
            Self::AfterBreak => "S5",
            Self::CandleCount => "S6",
            Self::RetestEntry => "S7",
            Self::OpposingWick => "S8",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageScore {
    pub stage: QualityStage,
    pub raw: f64,
    pub weight: f64,
    pub weighted: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityResult {
    pub score: f64,
    pub tier: QualityTier,
    pub stages: Vec<StageScore>,
}

impl QualityResult {
    pub fn empty() -> Self {
        Self {
            score: 0.0,
            tier: QualityTier::Unranked,
            stages: Vec::new(),
        }
    }

    pub fn stage(&self, stage: QualityStage) -> Option<f64> {
        self.stages.iter().find(|s| s.stage == stage).map(|s| s.raw)
    }
}

fn clamp01(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

/// Zone bounds and trade direction shared by every stage.
#[derive(Debug, Clone, Copy)]
struct Frame {
    lower: f64,
    upper: f64,
    height: f64,
    direction: TrendDirection,
}

impl Frame {
    fn bullish(&self) -> bool {
        self.direction == TrendDirection::Bullish
    }

    fn intersects(&self, c: &Candle) -> bool {
        !(c.high < self.lower || c.low > self.upper)
    }

    /// Length of the trend-side wick lying inside the zone.
    fn wick_into_zone(&self, c: &Candle) -> f64 {
        let (start, end) = if self.bullish() {
            (c.low, c.open.min(c.close))
        } else {
            (c.open.max(c.close), c.high)
        };
        (end.min(self.upper) - start.max(self.lower)).max(0.0)
    }

    /// Overlap of the full candle range with the zone, in zone heights.
    fn penetration_depth(&self, c: &Candle) -> f64 {
        ratio((c.high.min(self.upper) - c.low.max(self.lower)).max(0.0), self.height)
    }

    fn trend_wick(&self, c: &Candle) -> f64 {
        if self.bullish() {
            c.lower_wick()
        } else {
            c.upper_wick()
        }
    }

    fn opposing_wick(&self, c: &Candle) -> f64 {
        if self.bullish() {
            c.upper_wick()
        } else {
            c.lower_wick()
        }
    }

    /// Signed distance of the close beyond the zone in the trend direction.
    fn close_beyond(&self, c: &Candle) -> f64 {
        if self.bullish() {
            c.close - self.upper
        } else {
            self.lower - c.close
        }
    }

    /// Close progress past the retest open in the trend direction.
    fn close_past(&self, c: &Candle, retest: &Candle) -> f64 {
        if self.bullish() {
            c.close - retest.open
        } else {
            retest.open - c.close
        }
    }

    fn with_trend(&self, c: &Candle) -> bool {
        c.is_bullish() == self.bullish()
    }
}

fn penetration(f: &Frame, candles: &[Candle]) -> f64 {
    let mut deepest = 0.0;
    for c in candles.iter().filter(|c| f.intersects(c)) {
        let (pen, wick_part) = if f.bullish() {
            ((f.upper - c.low).max(0.0) / f.height, ratio(c.lower_wick(), c.range()))
        } else {
            ((c.high - f.lower).max(0.0) / f.height, ratio(c.upper_wick(), c.range()))
        };
        if pen > deepest {
            deepest = pen;
            if wick_part > 0.5 {
                deepest += wick_part / 2.5;
            }
        }
    }
    clamp01(deepest)
}

fn wick_momentum(f: &Frame, pre_break: &Candle, brk: &Candle, after: Option<&Candle>) -> f64 {
    let score = |c: &Candle, cap: f64| (clamp01(f.wick_into_zone(c) / f.height) / cap).min(1.0);
    let break_score = score(brk, 0.6);
    let pre_score = score(pre_break, 0.4);
    clamp01(match after {
        Some(a) => 0.5 * break_score + 0.3 * pre_score + 0.2 * score(a, 0.4),
        None => 0.7 * break_score + 0.3 * pre_score,
    })
}

fn breaking_candle(f: &Frame, brk: &Candle) -> f64 {
    let wick = (ratio(f.trend_wick(brk), brk.range()) / 0.5).min(1.0);
    let dist = (clamp01(f.close_beyond(brk) / f.height) / 0.7).min(1.0);
    let dir = if f.with_trend(brk) {
        (clamp01(brk.body() / f.height) / 0.8).min(1.0)
    } else {
        0.0
    };
    clamp01(if wick >= 0.75 {
        0.4 * wick + 0.1 * dir + 0.5 * dist
    } else if dir >= 0.75 {
        0.1 * wick + 0.4 * dir + 0.5 * dist
    } else {
        0.25 * wick + 0.25 * dir + 0.5 * dist
    })
}

fn impulse_dominance(f: &Frame, retest: &Candle, brk: &Candle, after: Option<&Candle>) -> f64 {
    let dominance = |c: &Candle, cap: f64| {
        (ratio(f.close_past(c, retest), f.close_beyond(c)) / cap).min(1.0)
    };
    let mut bodies = ratio(brk.body(), retest.body());
    if bodies < 1.0 {
        bodies *= 0.7;
    }
    let bodies = bodies.min(1.0);
    clamp01(match after {
        Some(a) => 0.4 * dominance(brk, 0.6) + 0.2 * dominance(a, 0.85) + 0.4 * bodies,
        None => 0.5 * dominance(brk, 0.6) + 0.5 * bodies,
    })
}

fn after_break_confirmation(f: &Frame, brk: &Candle, after: &Candle) -> f64 {
    let wick = clamp01(f.wick_into_zone(after) / f.height);
    let body = clamp01(ratio(after.body(), brk.body()));
    let dist = (clamp01(f.close_beyond(after) / f.height) / 0.8).min(1.0);
    clamp01(if f.with_trend(after) {
        0.25 * wick + 0.25 * body + 0.5 * dist
    } else {
        0.1 * wick + 0.1 * body + 0.3 * dist
    })
}

/// Score by the number of candles strictly between retest and break.
pub fn candle_count_score(between: usize) -> f64 {
    match between {
        0 => 0.4,
        1..=3 => 1.0,
        4 => 0.8,
        5 => 0.5,
        6 => 0.3,
        _ => 0.25,
    }
}

fn retest_entry(f: &Frame, retest: &Candle) -> f64 {
    let body = clamp01(retest.body() / f.height);
    let wick = (f.wick_into_zone(retest) / f.height / 0.3).min(1.0);
    let pen = (f.penetration_depth(retest) / 0.7).min(1.0);
    clamp01(0.35 * body + 0.15 * wick + 0.5 * pen)
}

fn opposing_wick(f: &Frame, brk: &Candle, after: Option<&Candle>) -> f64 {
    let score = |c: &Candle| (ratio(f.opposing_wick(c), c.body()) / 0.5).min(1.0);
    clamp01(match after {
        Some(a) => 1.0 - (0.5 * score(brk) + 0.5 * score(a)),
        None => 1.0 - score(brk),
    })
}

/// Quality of a retest/break sequence given explicit indices into `candles`.
///
/// Returns an empty result when the zone has no height, the direction is
/// not directional, the indices are inconsistent, or no candle between
/// retest and break touches the zone.
pub fn evaluate(
    candles: &[Candle],
    lower: f64,
    upper: f64,
    direction: TrendDirection,
    retest_idx: usize,
    break_idx: usize,
    after_break_idx: Option<usize>,
) -> QualityResult {
    let height = upper - lower;
    let indices_ok = retest_idx < break_idx
        && break_idx < candles.len()
        && after_break_idx.map_or(true, |a| a < candles.len());
    if !direction.is_directional() || height <= 0.0 || !indices_ok {
        return QualityResult::empty();
    }
    let f = Frame {
        lower,
        upper,
        height,
        direction,
    };
    let span = &candles[retest_idx..=break_idx];
    if !span.iter().any(|c| f.intersects(c)) {
        return QualityResult::empty();
    }

    let retest = &candles[retest_idx];
    let brk = &candles[break_idx];
    let pre_break = &candles[break_idx - 1];
    let after = after_break_idx.map(|i| &candles[i]);

    let raw = [
        Some(penetration(&f, span)),
        Some(wick_momentum(&f, pre_break, brk, after)),
        Some(breaking_candle(&f, brk)),
        Some(impulse_dominance(&f, retest, brk, after)),
        after.map(|a| after_break_confirmation(&f, brk, a)),
        Some(candle_count_score(break_idx - retest_idx - 1)),
        Some(retest_entry(&f, retest)),
        Some(opposing_wick(&f, brk, after)),
    ];
    let weights = if after.is_some() {
        WEIGHTS_WITH_AFTER_BREAK
    } else {
        WEIGHTS_WITHOUT_AFTER_BREAK
    };

    let stages: Vec<StageScore> = QualityStage::ALL
        .iter()
        .zip(raw)
        .zip(weights)
        .filter_map(|((stage, raw), weight)| {
            raw.map(|raw| StageScore {
                stage: *stage,
                raw,
                weight,
                weighted: raw * weight,
            })
        })
        .collect();
    let score = clamp01(stages.iter().map(|s| s.weighted).sum());
    QualityResult {
        score,
        tier: QualityTier::from_score(score),
        stages,
    }
}

/// Quality of a detected pattern.
pub fn evaluate_pattern(pattern: &EntryPattern) -> QualityResult {
    evaluate(
        &pattern.candles,
        pattern.zone.lower,
        pattern.zone.upper,
        pattern.direction,
        pattern.retest_index(),
        pattern.break_index(),
        pattern.after_break_index(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::ohlc;
    use crate::indicators::assert_approx;

    fn bearish_candles() -> Vec<Candle> {
        vec![
            ohlc(0, 1.0980, 1.1012, 1.0978, 1.1005),
            ohlc(1, 1.1005, 1.1018, 1.0998, 1.1010),
            ohlc(2, 1.1010, 1.1015, 1.0975, 1.0980),
        ]
    }

    #[test]
    fn weight_sets_sum_to_one() {
        assert_approx(WEIGHTS_WITH_AFTER_BREAK.iter().sum(), 1.0, 1e-12);
        assert_approx(WEIGHTS_WITHOUT_AFTER_BREAK.iter().sum(), 1.0, 1e-12);
    }

    #[test]
    fn tiers() {
        assert_eq!(QualityTier::from_score(0.0), QualityTier::Unranked);
        assert_eq!(QualityTier::from_score(0.45), QualityTier::Watchlist);
        assert_eq!(QualityTier::from_score(0.60), QualityTier::Notify);
        assert_eq!(QualityTier::from_score(0.719), QualityTier::Notify);
        assert_eq!(QualityTier::from_score(0.72), QualityTier::Priority);
        assert!(QualityTier::Priority > QualityTier::Watchlist);
    }

    #[test]
    fn candle_count_ladder() {
        let scores: Vec<f64> = (0..9).map(candle_count_score).collect();
        assert_eq!(scores, vec![0.4, 1.0, 1.0, 1.0, 0.8, 0.5, 0.3, 0.25, 0.25]);
    }

    #[test]
    fn bearish_stage_values() {
        let q = evaluate(&bearish_candles(), 1.1000, 1.1020, TrendDirection::Bearish, 0, 2, None);
        assert_eq!(q.stages.len(), 7);
        assert!(q.stage(QualityStage::AfterBreak).is_none());
        // Deepest reach is candle 1: (1.1018 - 1.1000) / 0.0020, wick share below 0.5.
        assert_approx(q.stage(QualityStage::Penetration).unwrap(), 0.9, 1e-9);
        // One candle between retest and break.
        assert_approx(q.stage(QualityStage::CandleCount).unwrap(), 1.0, 1e-12);
        // Lower wick 0.0005 over body 0.0030, scaled by 0.5.
        assert_approx(q.stage(QualityStage::OpposingWick).unwrap(), 1.0 - 1.0 / 3.0, 1e-9);
        assert!((0.0..=1.0).contains(&q.score));
        assert_eq!(q.tier, QualityTier::from_score(q.score));
    }

    #[test]
    fn after_break_adds_confirmation_stage() {
        let mut candles = bearish_candles();
        candles.push(ohlc(3, 1.0980, 1.0990, 1.0960, 1.0965));
        let q = evaluate(&candles, 1.1000, 1.1020, TrendDirection::Bearish, 0, 2, Some(3));
        assert_eq!(q.stages.len(), 8);
        let s5 = q.stage(QualityStage::AfterBreak).unwrap();
        assert!((0.0..=1.0).contains(&s5));
        let total: f64 = q.stages.iter().map(|s| s.weighted).sum();
        assert_approx(q.score, total.clamp(0.0, 1.0), 1e-12);
    }

    #[test]
    fn degenerate_inputs_give_empty_result() {
        let candles = bearish_candles();
        assert_eq!(
            evaluate(&candles, 1.1020, 1.1020, TrendDirection::Bearish, 0, 2, None),
            QualityResult::empty()
        );
        assert_eq!(
            evaluate(&candles, 1.2000, 1.2020, TrendDirection::Bearish, 0, 2, None),
            QualityResult::empty()
        );
        assert_eq!(
            evaluate(&candles, 1.1000, 1.1020, TrendDirection::Neutral, 0, 2, None),
            QualityResult::empty()
        );
        assert_eq!(
            evaluate(&candles, 1.1000, 1.1020, TrendDirection::Bearish, 2, 2, None),
            QualityResult::empty()
        );
    }

    #[test]
    fn doji_candles_do_not_produce_nan() {
        let candles = vec![
            ohlc(0, 1.1010, 1.1010, 1.1010, 1.1010),
            ohlc(1, 1.1010, 1.1010, 1.1010, 1.1010),
            ohlc(2, 1.1010, 1.1010, 1.1010, 1.1010),
        ];
        let q = evaluate(&candles, 1.1000, 1.1020, TrendDirection::Bullish, 0, 2, None);
        assert!(q.score.is_finite());
        assert!(q.stages.iter().all(|s| s.raw.is_finite()));
    }
}
