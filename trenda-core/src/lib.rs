//! Trenda Core: deterministic market-structure analysis for forex pairs.
//!
//! This crate is the pure part of the system: candle windows and settings in,
//! trends, zones and entry signals out. No I/O, no clocks, no shared state.
//! - Domain types (candles, swings, zones, timeframes)
//! - Swing detection and structure analysis
//! - Multi-timeframe trend consensus
//! - Area-of-interest generation and scoring
//! - Entry pattern detection, quality and scoring

pub mod aoi;
pub mod consensus;
pub mod domain;
pub mod entry;
pub mod fingerprint;
pub mod indicators;
pub mod settings;
pub mod structure;
pub mod synthetic;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: all value types are Send + Sync, so the runner can
    /// fan symbols out across threads.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Candle>();
        require_sync::<domain::Candle>();
        require_send::<domain::SwingPoint>();
        require_sync::<domain::SwingPoint>();
        require_send::<domain::AoiZone>();
        require_sync::<domain::AoiZone>();
        require_send::<domain::Timeframe>();
        require_sync::<domain::Timeframe>();
        require_send::<domain::TrendDirection>();
        require_sync::<domain::TrendDirection>();
        require_send::<domain::SignalId>();
        require_sync::<domain::SignalId>();

        // Settings
        require_send::<settings::SettingsTable>();
        require_sync::<settings::SettingsTable>();
        require_send::<settings::EntryConfig>();
        require_sync::<settings::EntryConfig>();

        // Pipeline outputs
        require_send::<structure::StructureAnalysis>();
        require_sync::<structure::StructureAnalysis>();
        require_send::<consensus::TrendSnapshot>();
        require_sync::<consensus::TrendSnapshot>();
        require_send::<aoi::AoiContext>();
        require_sync::<aoi::AoiContext>();
        require_send::<aoi::AoiCandidate>();
        require_sync::<aoi::AoiCandidate>();
        require_send::<entry::EntryPattern>();
        require_sync::<entry::EntryPattern>();
        require_send::<entry::EntrySignal>();
        require_sync::<entry::EntrySignal>();
        require_send::<entry::QualityResult>();
        require_sync::<entry::QualityResult>();
    }

    /// Architecture contract: the indicator trait works on candle history only.
    #[test]
    fn indicator_trait_sees_only_candles() {
        fn _check_trait_object_builds(
            ind: &dyn indicators::Indicator,
            candles: &[domain::Candle],
        ) -> Vec<f64> {
            ind.compute(candles)
        }
    }
}
