//! Directional weighting, ranking and capacity truncation of zone candidates.

use super::pipeline::AoiCandidate;
use crate::domain::{AoiClassification, AoiZone, Timeframe, TrendDirection, ZoneError};
use crate::settings::AoiSettings;

/// Whether a candidate sits on the trend side of price: below price for a
/// bullish trend (demand), above price for a bearish trend (supply).
pub fn is_aligned(candidate: &AoiCandidate, current_price: f64, trend: TrendDirection) -> bool {
    match trend {
        TrendDirection::Bullish => candidate.lower < current_price,
        TrendDirection::Bearish => candidate.upper > current_price,
        TrendDirection::Neutral => false,
    }
}

/// Weight, rank and truncate candidates into the final zone set.
///
/// score = base × `alignment_weight` when aligned, else base. Ranking is a
/// stable sort by descending score, so ties keep detection order. Only the
/// top `max_zones_per_symbol` become zones; the rest are dropped.
pub fn score_zones(
    candidates: &[AoiCandidate],
    current_price: f64,
    trend: TrendDirection,
    settings: &AoiSettings,
) -> Result<Vec<AoiZone>, ZoneError> {
    let mut weighted: Vec<(f64, bool, &AoiCandidate)> = candidates
        .iter()
        .map(|c| {
            let aligned = is_aligned(c, current_price, trend);
            let weight = if aligned { settings.alignment_weight } else { 1.0 };
            (c.score * weight, aligned, c)
        })
        .collect();

    weighted.sort_by(|a, b| b.0.total_cmp(&a.0));
    weighted.truncate(settings.max_zones_per_symbol);

    weighted
        .into_iter()
        .map(|(score, aligned, c)| to_zone(c, score, aligned, settings.timeframe))
        .collect()
}

fn to_zone(
    candidate: &AoiCandidate,
    score: f64,
    aligned: bool,
    timeframe: Timeframe,
) -> Result<AoiZone, ZoneError> {
    let mut zone = AoiZone::new(candidate.lower, candidate.upper, timeframe)?;
    zone.classification = if aligned {
        AoiClassification::Tradable
    } else {
        AoiClassification::Reference
    };
    zone.touches = candidate.touches;
    zone.score = score;
    zone.last_swing_index = candidate.last_swing_index;
    zone.age_bars = candidate.age_bars;
    Ok(zone)
}
