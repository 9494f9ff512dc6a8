//! Derived inputs for zone generation.

use crate::domain::{pip_size, pips_to_price, price_to_pips, Candle, SwingPoint};
use crate::indicators::latest_atr;
use crate::settings::{AnalysisParams, AoiSettings};
use crate::structure::{detect_swings, structural_swings, with_terminal_swing};

/// Everything the zone pipeline needs for one symbol/timeframe window.
#[derive(Debug, Clone, PartialEq)]
pub struct AoiContext {
    pub settings: AoiSettings,
    pub pip_size: f64,
    /// ATR over the window, in pips. Zero when the window is too short.
    pub atr_pips: f64,
    pub min_height_price: f64,
    pub max_height_price: f64,
    /// Structural swings, indices relative to the window.
    pub swings: Vec<SwingPoint>,
    pub last_bar_index: usize,
    pub current_price: f64,
}

impl AoiContext {
    /// Build the context from the most recent `params.aoi_window()` candles.
    /// Returns `None` for an empty series.
    pub fn build(
        symbol: &str,
        candles: &[Candle],
        settings: &AoiSettings,
        params: &AnalysisParams,
        atr_period: usize,
    ) -> Option<Self> {
        let start = candles.len().saturating_sub(params.aoi_window());
        let window = &candles[start..];
        let last = window.last()?;

        let pip = pip_size(symbol);
        let atr_pips = price_to_pips(latest_atr(window, atr_period), pip);
        let (min_pips, max_pips) = height_limits_pips(settings, atr_pips);

        let swings = with_terminal_swing(detect_swings(window, &params.swing_params()), window);

        Some(Self {
            settings: settings.clone(),
            pip_size: pip,
            atr_pips,
            min_height_price: pips_to_price(min_pips, pip),
            max_height_price: pips_to_price(max_pips, pip),
            swings: structural_swings(&swings),
            last_bar_index: window.len() - 1,
            current_price: last.close,
        })
    }

    pub fn overlap_tolerance_price(&self) -> f64 {
        pips_to_price(self.settings.overlap_tolerance_pips, self.pip_size)
    }
}

/// Zone height limits in pips.
///
/// min = max(floor, atr × min multiplier), max = min(max floor, atr × max multiplier).
/// A non-positive ATR drops the ATR terms and leaves the floors.
pub fn height_limits_pips(settings: &AoiSettings, atr_pips: f64) -> (f64, f64) {
    if atr_pips <= 0.0 {
        return (settings.min_height_pips_floor, settings.max_height_pips_floor);
    }
    let min = settings
        .min_height_pips_floor
        .max(atr_pips * settings.min_height_atr_multiplier);
    let max = settings
        .max_height_pips_floor
        .min(atr_pips * settings.max_height_atr_multiplier);
    (min, max)
}
