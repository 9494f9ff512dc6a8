//! Trend direction.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Trend classification. `Neutral` means "no confirmed bias", not "flat price".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Bullish,
    Bearish,
    Neutral,
}

impl TrendDirection {
    pub fn is_directional(self) -> bool {
        !matches!(self, TrendDirection::Neutral)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TrendDirection::Bullish => "bullish",
            TrendDirection::Bearish => "bearish",
            TrendDirection::Neutral => "neutral",
        }
    }
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrendDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bullish" => Ok(TrendDirection::Bullish),
            "bearish" => Ok(TrendDirection::Bearish),
            "neutral" => Ok(TrendDirection::Neutral),
            other => Err(format!("unknown trend direction '{other}'")),
        }
    }
}
