//! Entry scoring and signal qualification.
//!
//! The obstacle component is a fixed score: clearance to the nearest HTF
//! obstacle is enforced by the obstacle gate before scoring runs, and is not
//! re-checked here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::htf::HtfContext;
use super::pattern::EntryPattern;
use super::quality::{evaluate_pattern, QualityResult};
use super::stop_loss::{AoiStopLoss, StopLossPlan};
use crate::consensus::TrendSnapshot;
use crate::domain::{AoiZone, SignalId, TrendDirection};
use crate::settings::EntryConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryScore {
    pub obstacle_score: f64,
    pub htf_range_score: f64,
    pub quality: QualityResult,
    pub total: f64,
    pub stop_loss: AoiStopLoss,
    pub plan: StopLossPlan,
}

impl EntryScore {
    pub fn qualifies(&self, threshold: f64) -> bool {
        self.total >= threshold
    }
}

/// Score a pattern at the given fast-timeframe ATR.
pub fn score_entry(
    pattern: &EntryPattern,
    atr: f64,
    htf: &HtfContext,
    config: &EntryConfig,
) -> EntryScore {
    let quality = evaluate_pattern(pattern);
    let htf_range_score = htf.range_score(pattern.direction, &config.range_score);
    let obstacle_score = config.fixed_obstacle_score;
    let total = obstacle_score + htf_range_score + config.quality_weight * quality.score;

    let stop_loss = AoiStopLoss::compute(
        pattern.direction,
        pattern.entry_price(),
        pattern.zone.lower,
        pattern.zone.upper,
        atr,
        config.sl_tolerance_atr,
    );
    let plan = StopLossPlan::compute(
        stop_loss.raw_distance,
        atr,
        config.min_sl_atr,
        config.tp_r_multiplier,
    );

    EntryScore {
        obstacle_score,
        htf_range_score,
        quality,
        total,
        stop_loss,
        plan,
    }
}

/// A scored pattern that met the threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntrySignal {
    pub id: SignalId,
    pub symbol: String,
    pub direction: TrendDirection,
    pub signal_time: DateTime<Utc>,
    pub entry_price: f64,
    pub zone: AoiZone,
    pub pattern: EntryPattern,
    pub score: EntryScore,
    pub htf: HtfContext,
    pub trends: TrendSnapshot,
}

/// Score the pattern and keep it only when the total reaches
/// `min_total_score`. A miss is `None`, not an error.
pub fn qualify(
    symbol: &str,
    pattern: EntryPattern,
    atr: f64,
    htf: HtfContext,
    trends: TrendSnapshot,
    config: &EntryConfig,
) -> Option<EntrySignal> {
    let score = score_entry(&pattern, atr, &htf, config);
    if !score.qualifies(config.min_total_score) {
        return None;
    }
    let signal_time = pattern.signal_time();
    Some(EntrySignal {
        id: SignalId::derive(symbol, signal_time, pattern.zone.lower, pattern.zone.upper),
        symbol: symbol.to_string(),
        direction: pattern.direction,
        signal_time,
        entry_price: pattern.entry_price(),
        zone: pattern.zone.clone(),
        pattern,
        score,
        htf,
        trends,
    })
}
