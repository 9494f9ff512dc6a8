//! Candle: the canonical market data unit at the core boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation failures for candles and candle series.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CandleError {
    #[error("candle at {time} has a non-finite price")]
    NonFinite { time: DateTime<Utc> },

    #[error("candle at {time} has high {high} below low {low}")]
    HighBelowLow {
        time: DateTime<Utc>,
        high: f64,
        low: f64,
    },

    #[error("candle at {time} opens or closes outside its high/low range")]
    OutsideRange { time: DateTime<Utc> },

    #[error("candle {index} is not strictly newer than its predecessor")]
    NotIncreasing { index: usize },
}

/// OHLC candle for a single symbol on a single timeframe.
///
/// `time` is the candle's open time in UTC. Adapters in the collaborator layer
/// normalize broker or tabular formats into this type once, before the core
/// ever sees them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: Option<f64>,
}

impl Candle {
    /// Build a validated candle.
    pub fn new(
        time: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    ) -> Result<Self, CandleError> {
        let candle = Self {
            time,
            open,
            high,
            low,
            close,
            volume: None,
        };
        candle.validate()?;
        Ok(candle)
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    /// OHLC sanity check: finite prices, high >= low, open/close inside the range.
    pub fn validate(&self) -> Result<(), CandleError> {
        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|p| !p.is_finite()) {
            return Err(CandleError::NonFinite { time: self.time });
        }
        if self.high < self.low {
            return Err(CandleError::HighBelowLow {
                time: self.time,
                high: self.high,
                low: self.low,
            });
        }
        let inside = |p: f64| p >= self.low && p <= self.high;
        if !inside(self.open) || !inside(self.close) {
            return Err(CandleError::OutsideRange { time: self.time });
        }
        Ok(())
    }

    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn upper_wick(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    pub fn lower_wick(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }
}

/// Validate every candle and the strictly-increasing time ordering of a series.
pub fn validate_series(candles: &[Candle]) -> Result<(), CandleError> {
    for (i, candle) in candles.iter().enumerate() {
        candle.validate()?;
        if i > 0 && candle.time <= candles[i - 1].time {
            return Err(CandleError::NotIncreasing { index: i });
        }
    }
    Ok(())
}
