//! Areas of Interest: context, candidate pipeline, scoring.
//!
//! `analyze_zones` runs the whole chain for one symbol/timeframe window and
//! returns the complete replacement zone set. Callers persist it with
//! clear-then-insert semantics; zones are never patched incrementally.

pub mod context;
pub mod pipeline;
pub mod scoring;

pub use context::{height_limits_pips, AoiContext};
pub use pipeline::{generate_candidates, AoiCandidate};
pub use scoring::score_zones;

use tracing::debug;

use crate::domain::{AoiZone, Candle, TrendDirection, ZoneError};
use crate::settings::{AnalysisParams, AoiSettings};

/// Zones for one symbol/timeframe given the overall trend.
///
/// An empty candle window yields an empty set.
pub fn analyze_zones(
    symbol: &str,
    candles: &[Candle],
    trend: TrendDirection,
    settings: &AoiSettings,
    params: &AnalysisParams,
    atr_period: usize,
) -> Result<Vec<AoiZone>, ZoneError> {
    let Some(ctx) = AoiContext::build(symbol, candles, settings, params, atr_period) else {
        return Ok(Vec::new());
    };
    let candidates = generate_candidates(&ctx);
    let zones = score_zones(&candidates, ctx.current_price, trend, settings)?;
    debug!(
        symbol,
        timeframe = %settings.timeframe,
        candidates = candidates.len(),
        zones = zones.len(),
        "zones scored"
    );
    Ok(zones)
}
