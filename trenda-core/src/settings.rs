//! Per-timeframe analysis settings.
//!
//! Settings live in a `SettingsTable` keyed by the closed `Timeframe` enum and
//! are validated when the table is built, so a missing or malformed timeframe
//! fails at startup instead of deep inside an analysis cycle.
//!
//! TOML layout (arrays of tables, one entry per timeframe):
//!
//! ```toml
//! [[analysis]]
//! timeframe = "4H"
//! lookback = 100
//! aoi_lookback = 180
//! distance = 1
//! prominence = 0.0004
//!
//! [[aoi]]
//! timeframe = "4H"
//! min_touches = 3
//! # ...
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::domain::Timeframe;
use crate::structure::SwingParams;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettingsError {
    #[error("unknown timeframe '{0}' (expected one of 1H, 4H, 1D, 1W)")]
    UnknownTimeframe(String),

    #[error("timeframe {0} is configured more than once")]
    DuplicateTimeframe(Timeframe),

    #[error("no settings configured for timeframe {0}")]
    NotConfigured(Timeframe),

    #[error("timeframe {0} generates AOIs but has no aoi_lookback")]
    MissingAoiLookback(Timeframe),

    #[error("invalid settings for {timeframe}: {reason}")]
    Invalid { timeframe: Timeframe, reason: String },

    #[error("failed to parse settings: {0}")]
    Parse(String),
}

/// Candle window and swing-detection parameters for one timeframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisParams {
    pub timeframe: Timeframe,
    /// Candles fetched for trend analysis (and entry scans on the entry timeframe).
    pub lookback: usize,
    /// Candles fetched for AOI generation. Required on every AOI timeframe.
    #[serde(default)]
    pub aoi_lookback: Option<usize>,
    /// Minimum bar distance between swings.
    pub distance: usize,
    /// Minimum swing prominence in price units.
    pub prominence: f64,
}

impl AnalysisParams {
    pub fn aoi_window(&self) -> usize {
        self.aoi_lookback.unwrap_or(self.lookback)
    }

    pub fn swing_params(&self) -> SwingParams {
        SwingParams {
            distance: self.distance,
            prominence: self.prominence,
            lookback: None,
        }
    }

    fn validate(&self) -> Result<(), SettingsError> {
        let invalid = |reason: &str| SettingsError::Invalid {
            timeframe: self.timeframe,
            reason: reason.to_string(),
        };
        if self.lookback < 3 {
            return Err(invalid("lookback must be at least 3 candles"));
        }
        if self.aoi_lookback.is_some_and(|n| n < 3) {
            return Err(invalid("aoi_lookback must be at least 3 candles"));
        }
        if self.distance == 0 {
            return Err(invalid("distance must be >= 1"));
        }
        if !(self.prominence.is_finite() && self.prominence >= 0.0) {
            return Err(invalid("prominence must be a non-negative number"));
        }
        Ok(())
    }
}

/// AOI generation settings for one timeframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AoiSettings {
    pub timeframe: Timeframe,
    pub min_touches: usize,
    pub min_swing_gap_bars: usize,
    pub overlap_tolerance_pips: f64,
    pub max_age_days: u32,
    pub max_zones_per_symbol: usize,
    pub min_height_atr_multiplier: f64,
    pub min_height_pips_floor: f64,
    pub max_height_pips_floor: f64,
    pub max_height_atr_multiplier: f64,
    pub alignment_weight: f64,
    /// Timeframes whose trends decide the zone direction, lowest first.
    pub trend_alignment: Vec<Timeframe>,
}

impl AoiSettings {
    /// Age limit in bars of this timeframe.
    pub fn max_age_bars(&self) -> usize {
        (self.max_age_days as usize * 24) / self.timeframe.hours() as usize
    }

    fn validate(&self) -> Result<(), SettingsError> {
        let invalid = |reason: &str| SettingsError::Invalid {
            timeframe: self.timeframe,
            reason: reason.to_string(),
        };
        if self.min_touches < 2 {
            return Err(invalid("min_touches must be >= 2"));
        }
        if self.max_zones_per_symbol == 0 {
            return Err(invalid("max_zones_per_symbol must be >= 1"));
        }
        let non_negative = [
            self.overlap_tolerance_pips,
            self.min_height_atr_multiplier,
            self.min_height_pips_floor,
            self.max_height_pips_floor,
            self.max_height_atr_multiplier,
        ];
        if non_negative.iter().any(|v| !(v.is_finite() && *v >= 0.0)) {
            return Err(invalid("tolerances, floors and multipliers must be non-negative"));
        }
        if self.min_height_pips_floor > self.max_height_pips_floor {
            return Err(invalid("min_height_pips_floor exceeds max_height_pips_floor"));
        }
        if !(self.alignment_weight.is_finite() && self.alignment_weight > 0.0) {
            return Err(invalid("alignment_weight must be positive"));
        }
        if self.max_age_bars() == 0 {
            return Err(invalid("max_age_days is shorter than one bar"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    analysis: Vec<AnalysisParams>,
    #[serde(default)]
    aoi: Vec<AoiSettings>,
}

/// Validated settings for every configured timeframe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettingsTable {
    analysis: BTreeMap<Timeframe, AnalysisParams>,
    aoi: BTreeMap<Timeframe, AoiSettings>,
}

impl SettingsTable {
    /// Build and validate a table. Duplicate timeframes, invalid values, and
    /// AOI timeframes without analysis params or an `aoi_lookback` are rejected.
    pub fn new(
        analysis: Vec<AnalysisParams>,
        aoi: Vec<AoiSettings>,
    ) -> Result<Self, SettingsError> {
        let mut analysis_map = BTreeMap::new();
        for params in analysis {
            params.validate()?;
            let tf = params.timeframe;
            if analysis_map.insert(tf, params).is_some() {
                return Err(SettingsError::DuplicateTimeframe(tf));
            }
        }

        let mut aoi_map = BTreeMap::new();
        for settings in aoi {
            settings.validate()?;
            let tf = settings.timeframe;
            match analysis_map.get(&tf) {
                None => return Err(SettingsError::NotConfigured(tf)),
                Some(AnalysisParams { aoi_lookback: None, .. }) => {
                    return Err(SettingsError::MissingAoiLookback(tf));
                }
                Some(_) => {}
            }
            if aoi_map.insert(tf, settings).is_some() {
                return Err(SettingsError::DuplicateTimeframe(tf));
            }
        }

        Ok(Self {
            analysis: analysis_map,
            aoi: aoi_map,
        })
    }

    pub fn from_toml(text: &str) -> Result<Self, SettingsError> {
        let file: SettingsFile =
            toml::from_str(text).map_err(|e| SettingsError::Parse(e.to_string()))?;
        Self::new(file.analysis, file.aoi)
    }

    pub fn analysis(&self, timeframe: Timeframe) -> Result<&AnalysisParams, SettingsError> {
        self.analysis
            .get(&timeframe)
            .ok_or(SettingsError::NotConfigured(timeframe))
    }

    pub fn aoi(&self, timeframe: Timeframe) -> Result<&AoiSettings, SettingsError> {
        self.aoi
            .get(&timeframe)
            .ok_or(SettingsError::NotConfigured(timeframe))
    }

    /// Timeframes with AOI settings, lowest first.
    pub fn aoi_timeframes(&self) -> impl Iterator<Item = Timeframe> + '_ {
        self.aoi.keys().copied()
    }

    pub fn analysis_timeframes(&self) -> impl Iterator<Item = Timeframe> + '_ {
        self.analysis.keys().copied()
    }
}

impl Default for SettingsTable {
    /// Production defaults: 1W/1D/4H/1H analysis params, AOI settings for 1H/4H/1D.
    fn default() -> Self {
        let (analysis, aoi) = default_entries();
        Self {
            analysis: analysis.into_iter().map(|p| (p.timeframe, p)).collect(),
            aoi: aoi.into_iter().map(|s| (s.timeframe, s)).collect(),
        }
    }
}

fn default_entries() -> (Vec<AnalysisParams>, Vec<AoiSettings>) {
    let analysis = vec![
        default_params(Timeframe::W1, 100, None),
        default_params(Timeframe::D1, 100, Some(140)),
        default_params(Timeframe::H4, 100, Some(180)),
        default_params(Timeframe::H1, 15, Some(240)),
    ];
    let aoi = vec![
        AoiSettings {
            timeframe: Timeframe::H1,
            min_touches: 3,
            min_swing_gap_bars: 12,
            overlap_tolerance_pips: 8.0,
            max_age_days: 5,
            max_zones_per_symbol: 3,
            min_height_atr_multiplier: 0.15,
            min_height_pips_floor: 5.0,
            max_height_pips_floor: 30.0,
            max_height_atr_multiplier: 0.5,
            alignment_weight: 1.5,
            trend_alignment: vec![Timeframe::H1, Timeframe::H4, Timeframe::D1],
        },
        AoiSettings {
            timeframe: Timeframe::H4,
            min_touches: 3,
            min_swing_gap_bars: 6,
            overlap_tolerance_pips: 10.0,
            max_age_days: 5,
            max_zones_per_symbol: 3,
            min_height_atr_multiplier: 0.2,
            min_height_pips_floor: 10.0,
            max_height_pips_floor: 50.0,
            max_height_atr_multiplier: 0.7,
            alignment_weight: 1.5,
            trend_alignment: vec![Timeframe::H4, Timeframe::D1, Timeframe::W1],
        },
        AoiSettings {
            timeframe: Timeframe::D1,
            min_touches: 3,
            min_swing_gap_bars: 3,
            overlap_tolerance_pips: 15.0,
            max_age_days: 25,
            max_zones_per_symbol: 2,
            min_height_atr_multiplier: 0.25,
            min_height_pips_floor: 10.0,
            max_height_pips_floor: 100.0,
            max_height_atr_multiplier: 0.35,
            alignment_weight: 1.25,
            trend_alignment: vec![Timeframe::H4, Timeframe::D1, Timeframe::W1],
        },
    ];
    (analysis, aoi)
}

fn default_params(timeframe: Timeframe, lookback: usize, aoi_lookback: Option<usize>) -> AnalysisParams {
    AnalysisParams {
        timeframe,
        lookback,
        aoi_lookback,
        distance: 1,
        prominence: 0.0004,
    }
}

/// HTF range-position score ladder: `(threshold, score)` pairs checked in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeScoreLadder {
    /// Bullish: a position at or below the threshold earns the score.
    pub bullish: Vec<(f64, f64)>,
    /// Bearish: a position at or above the threshold earns the score.
    pub bearish: Vec<(f64, f64)>,
}

impl Default for RangeScoreLadder {
    fn default() -> Self {
        Self {
            bullish: vec![(0.25, 3.0), (0.28, 2.0), (0.32, 1.0)],
            bearish: vec![(0.75, 3.0), (0.72, 2.0), (0.68, 1.0)],
        }
    }
}

/// Entry detection and scoring configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryConfig {
    /// Most recent candles the pattern finder looks at.
    pub pattern_window: usize,
    pub atr_period: usize,
    /// AOI stop-loss tolerance in ATR units.
    pub sl_tolerance_atr: f64,
    pub fixed_obstacle_score: f64,
    pub min_obstacle_distance_atr: f64,
    /// Obstacle distance reported when no HTF level lies in the trade direction.
    pub no_obstacle_distance_atr: f64,
    pub min_total_score: f64,
    /// Weight of pattern quality (0..1) in the total score.
    pub quality_weight: f64,
    pub range_score: RangeScoreLadder,
    /// Effective stop-loss floor in ATR units.
    pub min_sl_atr: f64,
    /// Take-profit distance in multiples of the effective stop loss.
    pub tp_r_multiplier: f64,
}

impl Default for EntryConfig {
    fn default() -> Self {
        Self {
            pattern_window: 15,
            atr_period: 14,
            sl_tolerance_atr: 0.25,
            fixed_obstacle_score: 3.0,
            min_obstacle_distance_atr: 1.0,
            no_obstacle_distance_atr: 10.0,
            min_total_score: 4.0,
            quality_weight: 0.0,
            range_score: RangeScoreLadder::default(),
            min_sl_atr: 2.5,
            tp_r_multiplier: 2.25,
        }
    }
}
