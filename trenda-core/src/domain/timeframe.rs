//! Timeframe: closed enumeration of the analysed candle sizes.

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::settings::SettingsError;

/// Candle size. Ordering is lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1H")]
    H1,
    #[serde(rename = "4H")]
    H4,
    #[serde(rename = "1D")]
    D1,
    #[serde(rename = "1W")]
    W1,
}

impl Timeframe {
    pub const ALL: [Timeframe; 4] = [Timeframe::H1, Timeframe::H4, Timeframe::D1, Timeframe::W1];

    pub fn label(self) -> &'static str {
        match self {
            Timeframe::H1 => "1H",
            Timeframe::H4 => "4H",
            Timeframe::D1 => "1D",
            Timeframe::W1 => "1W",
        }
    }

    /// Candle size in hours.
    pub fn hours(self) -> u32 {
        match self {
            Timeframe::H1 => 1,
            Timeframe::H4 => 4,
            Timeframe::D1 => 24,
            Timeframe::W1 => 168,
        }
    }

    pub fn duration(self) -> Duration {
        Duration::hours(i64::from(self.hours()))
    }

    /// Open time of the candle that is still forming at `now`.
    ///
    /// Every candle opened strictly before this instant is closed. Weekly
    /// candles start Monday 00:00 UTC, daily candles at midnight, intraday
    /// candles on multiples of their hour size since the epoch.
    pub fn last_close(self, now: DateTime<Utc>) -> DateTime<Utc> {
        let midnight = Utc
            .with_ymd_and_hms(now.year(), now.month(), now.day(), 0, 0, 0)
            .single()
            .unwrap_or(now);
        match self {
            Timeframe::W1 => {
                midnight - Duration::days(i64::from(now.weekday().num_days_from_monday()))
            }
            Timeframe::D1 => midnight,
            Timeframe::H1 | Timeframe::H4 => {
                let step = i64::from(self.hours()) * 3600;
                let ts = now.timestamp();
                let floored = ts - ts.rem_euclid(step);
                Utc.timestamp_opt(floored, 0).single().unwrap_or(now)
            }
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Timeframe {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "1H" | "H1" => Ok(Timeframe::H1),
            "4H" | "H4" => Ok(Timeframe::H4),
            "1D" | "D1" => Ok(Timeframe::D1),
            "1W" | "W1" => Ok(Timeframe::W1),
            _ => Err(SettingsError::UnknownTimeframe(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_labels() {
        assert_eq!("4H".parse::<Timeframe>().unwrap(), Timeframe::H4);
        assert_eq!("1d".parse::<Timeframe>().unwrap(), Timeframe::D1);
        assert!("15M".parse::<Timeframe>().is_err());
    }

    #[test]
    fn ordering_is_lowest_first() {
        let mut tfs = vec![Timeframe::W1, Timeframe::H1, Timeframe::D1, Timeframe::H4];
        tfs.sort();
        assert_eq!(tfs, Timeframe::ALL.to_vec());
    }

    #[test]
    fn serde_uses_labels() {
        let json = serde_json::to_string(&Timeframe::D1).unwrap();
        assert_eq!(json, "\"1D\"");
        let back: Timeframe = serde_json::from_str("\"1W\"").unwrap();
        assert_eq!(back, Timeframe::W1);
    }

    #[test]
    fn last_close_intraday_floors() {
        let now = Utc.with_ymd_and_hms(2024, 3, 6, 10, 37, 12).unwrap();
        assert_eq!(
            Timeframe::H1.last_close(now),
            Utc.with_ymd_and_hms(2024, 3, 6, 10, 0, 0).unwrap()
        );
        assert_eq!(
            Timeframe::H4.last_close(now),
            Utc.with_ymd_and_hms(2024, 3, 6, 8, 0, 0).unwrap()
        );
    }

    #[test]
    fn last_close_daily_and_weekly() {
        // 2024-03-06 is a Wednesday.
        let now = Utc.with_ymd_and_hms(2024, 3, 6, 10, 37, 12).unwrap();
        assert_eq!(
            Timeframe::D1.last_close(now),
            Utc.with_ymd_and_hms(2024, 3, 6, 0, 0, 0).unwrap()
        );
        assert_eq!(
            Timeframe::W1.last_close(now),
            Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap()
        );
    }
}
