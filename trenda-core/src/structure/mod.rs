//! Market structure: swing extraction, break-of-structure trend, structural swings.

pub mod analyzer;
pub mod noise;
pub mod swing;

pub use analyzer::{analyze_structure, BreakKind, StructureAnalysis, StructureBreak, StructureState};
pub use noise::structural_swings;
pub use swing::{detect_swings, with_terminal_swing, SwingParams, MIN_SWING_CANDLES};

use crate::domain::Candle;

/// Swings (with the terminal pseudo-swing) and structure for one candle window.
pub fn analyze_candles(candles: &[Candle], params: &SwingParams) -> StructureAnalysis {
    let swings = with_terminal_swing(detect_swings(candles, params), candles);
    analyze_structure(&swings)
}
