//! Stop-loss geometry anchored on the zone, and the SL/TP plan derived from it.

use serde::{Deserialize, Serialize};

use crate::domain::TrendDirection;

/// Stop-loss distances measured from entry to the far side of the zone.
///
/// ATR-normalized fields are 0 when ATR is not positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AoiStopLoss {
    pub raw_distance: f64,
    pub tolerance: f64,
    pub effective_distance: f64,
    pub raw_atr: f64,
    pub effective_atr: f64,
}

impl AoiStopLoss {
    /// Bullish stops sit below the zone's lower bound, bearish above its upper bound.
    pub fn compute(
        direction: TrendDirection,
        entry_price: f64,
        zone_lower: f64,
        zone_upper: f64,
        atr: f64,
        tolerance_atr: f64,
    ) -> Self {
        let raw_distance = match direction {
            TrendDirection::Bearish => zone_upper - entry_price,
            _ => entry_price - zone_lower,
        };
        let tolerance = atr * tolerance_atr;
        let effective_distance = raw_distance + tolerance;
        let (raw_atr, effective_atr) = if atr > 0.0 {
            (raw_distance / atr, effective_distance / atr)
        } else {
            (0.0, 0.0)
        };
        Self {
            raw_distance,
            tolerance,
            effective_distance,
            raw_atr,
            effective_atr,
        }
    }
}

/// Final stop and target, with the stop floored at `min_sl_atr`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StopLossPlan {
    pub structural_atr: f64,
    pub sl_atr: f64,
    pub sl_distance: f64,
    pub tp_atr: f64,
    pub tp_distance: f64,
}

impl StopLossPlan {
    pub fn compute(raw_distance: f64, atr: f64, min_sl_atr: f64, tp_multiple: f64) -> Self {
        let structural_atr = if atr > 0.0 { raw_distance / atr } else { 0.0 };
        let sl_atr = structural_atr.max(min_sl_atr);
        let sl_distance = sl_atr * atr;
        Self {
            structural_atr,
            sl_atr,
            sl_distance,
            tp_atr: sl_atr * tp_multiple,
            tp_distance: sl_distance * tp_multiple,
        }
    }

    /// Absolute stop and target prices for an entry.
    pub fn levels(&self, direction: TrendDirection, entry_price: f64) -> (f64, f64) {
        match direction {
            TrendDirection::Bearish => (entry_price + self.sl_distance, entry_price - self.tp_distance),
            _ => (entry_price - self.sl_distance, entry_price + self.tp_distance),
        }
    }
}
