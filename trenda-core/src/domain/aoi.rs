//! AOI zones: price bands where structural reversals repeatedly occurred.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Timeframe;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ZoneError {
    #[error("zone lower bound {lower} must be strictly below upper bound {upper}")]
    InvertedBounds { lower: f64, upper: f64 },

    #[error("zone bounds must be finite (lower {lower}, upper {upper})")]
    NonFinite { lower: f64, upper: f64 },
}

/// How a persisted zone relates to the overall trend.
///
/// `Tradable` zones sit on the trend side of price (demand below price in a
/// bullish trend, supply above price in a bearish trend) and are the only
/// zones entry detection looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AoiClassification {
    Tradable,
    Reference,
}

/// A scored, classified AOI zone for one symbol/timeframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AoiZone {
    pub lower: f64,
    pub upper: f64,
    pub timeframe: Timeframe,
    pub classification: AoiClassification,
    pub touches: u32,
    pub score: f64,
    /// Index of the most recent clustered swing in the analysed window.
    pub last_swing_index: usize,
    /// Bars between the most recent clustered swing and the last analysed bar.
    pub age_bars: usize,
}

impl AoiZone {
    /// A bare zone with the given bounds. Fails when `lower >= upper`.
    pub fn new(lower: f64, upper: f64, timeframe: Timeframe) -> Result<Self, ZoneError> {
        check_bounds(lower, upper)?;
        Ok(Self {
            lower,
            upper,
            timeframe,
            classification: AoiClassification::Tradable,
            touches: 0,
            score: 0.0,
            last_swing_index: 0,
            age_bars: 0,
        })
    }

    pub fn height(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn contains(&self, price: f64) -> bool {
        price >= self.lower && price <= self.upper
    }

    pub fn is_tradable(&self) -> bool {
        self.classification == AoiClassification::Tradable
    }
}

pub(crate) fn check_bounds(lower: f64, upper: f64) -> Result<(), ZoneError> {
    if !lower.is_finite() || !upper.is_finite() {
        return Err(ZoneError::NonFinite { lower, upper });
    }
    if lower >= upper {
        return Err(ZoneError::InvertedBounds { lower, upper });
    }
    Ok(())
}
