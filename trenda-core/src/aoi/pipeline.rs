//! Candidate zone generation.
//!
//! Stages, in order:
//! 1. candidates: every price band spanned by two structural swings that
//!    holds at least `min_touches` swings spaced `min_swing_gap_bars` apart
//!    and whose height is within the context's limits (both inclusive);
//! 2. merge: bands within `overlap_tolerance_pips` of each other are joined
//!    while the joined height stays within the maximum;
//! 3. age: bands whose most recent swing is older than `max_age_bars` go;
//! 4. overlap: highest score first, bands that still touch a kept band
//!    (tolerance-widened) are dropped.
//!
//! The result is sorted by lower bound. Ranking happens in `scoring`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use super::context::AoiContext;
use crate::domain::SwingPoint;

/// Absolute slack for price comparisons at height limits.
pub const PRICE_EPSILON: f64 = 1e-9;

/// An unranked zone candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AoiCandidate {
    pub lower: f64,
    pub upper: f64,
    pub touches: u32,
    /// Base score before directional weighting.
    pub score: f64,
    pub last_swing_index: usize,
    pub age_bars: usize,
}

impl AoiCandidate {
    pub fn height(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Run all four stages on a prepared context.
pub fn generate_candidates(ctx: &AoiContext) -> Vec<AoiCandidate> {
    let candidates = find_candidates(ctx);
    let found = candidates.len();
    let merged = merge_nearby(
        candidates,
        ctx.overlap_tolerance_price(),
        ctx.max_height_price,
    );
    let recent = drop_old(merged, ctx.last_bar_index, ctx.settings.max_age_bars());
    let kept = drop_overlapping(recent, ctx.overlap_tolerance_price());
    debug!(
        timeframe = %ctx.settings.timeframe,
        swings = ctx.swings.len(),
        found,
        kept = kept.len(),
        "zone candidates generated"
    );
    kept
}

fn find_candidates(ctx: &AoiContext) -> Vec<AoiCandidate> {
    let settings = &ctx.settings;
    let mut chronological: Vec<SwingPoint> = ctx.swings.clone();
    chronological.sort_by_key(|s| s.index);

    let mut by_price = chronological.clone();
    by_price.sort_by(|a, b| a.price.total_cmp(&b.price).then(a.index.cmp(&b.index)));

    let mut found: BTreeMap<(i64, i64), AoiCandidate> = BTreeMap::new();
    let total = by_price.len();

    for i in 0..total {
        let lower = by_price[i].price;
        for upper_swing in by_price.iter().skip(i + settings.min_touches.saturating_sub(1)) {
            let upper = upper_swing.price;
            let height = upper - lower;
            if height > ctx.max_height_price + PRICE_EPSILON {
                break;
            }
            if height + PRICE_EPSILON < ctx.min_height_price {
                continue;
            }

            let members: Vec<usize> = chronological
                .iter()
                .filter(|s| s.price >= lower && s.price <= upper)
                .map(|s| s.index)
                .collect();
            if members.len() < settings.min_touches {
                continue;
            }
            if !has_spacing(&members, settings.min_swing_gap_bars, settings.min_touches) {
                continue;
            }
            let touches = valid_touches(&members, settings.min_swing_gap_bars);

            let last_swing_index = members.iter().copied().max().unwrap_or(0);
            let score = base_score(height, touches, last_swing_index, ctx.last_bar_index);
            let key = (price_key(lower, ctx.pip_size), price_key(upper, ctx.pip_size));
            let better = found.get(&key).map_or(true, |existing| score > existing.score);
            if better {
                found.insert(
                    key,
                    AoiCandidate {
                        lower,
                        upper,
                        touches,
                        score,
                        last_swing_index,
                        age_bars: ctx.last_bar_index.saturating_sub(last_swing_index),
                    },
                );
            }
        }
    }
    found.into_values().collect()
}

/// Dedup key: price in pips rounded to 5 decimals.
fn price_key(price: f64, pip_size: f64) -> i64 {
    (price / pip_size * 1e5).round() as i64
}

/// Touches in a chronological member list: the gaps of at least
/// `min_gap_bars` between consecutive swings.
pub fn valid_touches(indices: &[usize], min_gap_bars: usize) -> u32 {
    indices
        .windows(2)
        .filter(|w| w[1].saturating_sub(w[0]) >= min_gap_bars)
        .count() as u32
}

/// Membership gate: the first swing plus every spaced successor must reach
/// `min_touches`.
pub fn has_spacing(indices: &[usize], min_gap_bars: usize, min_touches: usize) -> bool {
    !indices.is_empty() && 1 + valid_touches(indices, min_gap_bars) as usize >= min_touches
}

/// Base zone score: touch density, decayed by recency, adjusted for freshness.
///
/// `touches^1.2 / height × 1/(1 + bars_since_last/100) × freshness`, where
/// freshness is 1.3, 1.1, 1.0 or 0.85 for 0, 1, 2 or more touches beyond three.
pub fn base_score(height: f64, touches: u32, last_swing_index: usize, last_bar_index: usize) -> f64 {
    let density = f64::from(touches).powf(1.2) / height.max(1e-6);
    let bars_since_last = last_bar_index.saturating_sub(last_swing_index) as f64;
    let recency = 1.0 / (1.0 + bars_since_last / 100.0);
    let freshness = match touches.saturating_sub(3) {
        0 => 1.3,
        1 => 1.1,
        2 => 1.0,
        _ => 0.85,
    };
    density * recency * freshness
}

/// Join candidates whose lower bound is within `tolerance` of the previous
/// band's upper bound, as long as the joined height stays at or below
/// `max_height`. Joined bands keep the wider envelope, summed touches, the
/// higher score and the most recent swing.
pub fn merge_nearby(
    mut candidates: Vec<AoiCandidate>,
    tolerance: f64,
    max_height: f64,
) -> Vec<AoiCandidate> {
    candidates.sort_by(|a, b| a.lower.total_cmp(&b.lower));
    let mut merged: Vec<AoiCandidate> = Vec::with_capacity(candidates.len());

    for zone in candidates {
        let Some(last) = merged.last_mut() else {
            merged.push(zone);
            continue;
        };
        if zone.lower > last.upper + tolerance + PRICE_EPSILON {
            merged.push(zone);
            continue;
        }
        let lower = last.lower.min(zone.lower);
        let upper = last.upper.max(zone.upper);
        if upper - lower > max_height + PRICE_EPSILON {
            merged.push(zone);
            continue;
        }
        let last_swing_index = last.last_swing_index.max(zone.last_swing_index);
        *last = AoiCandidate {
            lower,
            upper,
            touches: last.touches + zone.touches,
            score: last.score.max(zone.score),
            last_swing_index,
            age_bars: last.age_bars.min(zone.age_bars),
        };
    }
    merged
}

/// Keep candidates whose most recent swing is at most `max_age_bars` old.
pub fn drop_old(
    candidates: Vec<AoiCandidate>,
    last_bar_index: usize,
    max_age_bars: usize,
) -> Vec<AoiCandidate> {
    let cutoff = last_bar_index.saturating_sub(max_age_bars);
    candidates
        .into_iter()
        .filter(|z| z.last_swing_index >= cutoff)
        .collect()
}

/// Greedy highest-score-first selection of non-touching bands, sorted by lower bound.
pub fn drop_overlapping(mut candidates: Vec<AoiCandidate>, tolerance: f64) -> Vec<AoiCandidate> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
    let mut selected: Vec<AoiCandidate> = Vec::with_capacity(candidates.len());
    for zone in candidates {
        let touches_kept = selected.iter().any(|kept| {
            !(zone.upper < kept.lower - tolerance || zone.lower > kept.upper + tolerance)
        });
        if !touches_kept {
            selected.push(zone);
        }
    }
    selected.sort_by(|a, b| a.lower.total_cmp(&b.lower));
    selected
}
