//! Entry detection on the fast timeframe and entry scoring.

pub mod htf;
pub mod pattern;
pub mod quality;
pub mod scoring;
pub mod stop_loss;

pub use htf::{ladder_score, range_position, HtfContext, HtfLevel};
pub use pattern::{detect_entry, find_pattern, EntryPattern};
pub use quality::{evaluate, evaluate_pattern, QualityResult, QualityStage, QualityTier, StageScore};
pub use scoring::{qualify, score_entry, EntryScore, EntrySignal};
pub use stop_loss::{AoiStopLoss, StopLossPlan};

/// Hourly candle at hour `i` of 2024-01-01, for tests.
#[cfg(test)]
pub(crate) fn ohlc(i: i64, open: f64, high: f64, low: f64, close: f64) -> crate::domain::Candle {
    use chrono::{Duration, TimeZone, Utc};
    crate::domain::Candle {
        time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::hours(i),
        open,
        high,
        low,
        close,
        volume: None,
    }
}
