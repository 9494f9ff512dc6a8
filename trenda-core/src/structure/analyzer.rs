//! Break-of-structure trend classification.
//!
//! The analysis is an explicit fold over the swing sequence. State is
//! re-derived from scratch on every call, so the same window always yields the
//! same result whether it is evaluated live or in replay.
//!
//! Transitions, for each swing in order once a high and a low are seeded:
//! - a swing high above the structural high is a bullish break: trend becomes
//!   bullish, the breaking swing becomes the structural high, and the most
//!   recent swing low before it becomes the structural low;
//! - a swing low below the structural low is the mirrored bearish break;
//! - anything else leaves the state unchanged.

use serde::{Deserialize, Serialize};

use crate::domain::{SwingKind, SwingPoint, TrendDirection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreakKind {
    Bullish,
    Bearish,
}

/// A confirmed structure break.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StructureBreak {
    pub kind: BreakKind,
    /// The swing that broke structure.
    pub swing: SwingPoint,
    /// The opposite structural swing picked after the break, if one exists.
    pub counterpart: Option<SwingPoint>,
}

/// Fold state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StructureState {
    /// No high/low pair seeded yet.
    Uninitialized,
    Tracking {
        high: SwingPoint,
        low: SwingPoint,
        trend: TrendDirection,
    },
}

/// Trend plus the levels bracketing the current structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureAnalysis {
    pub trend: TrendDirection,
    pub structural_high: Option<SwingPoint>,
    pub structural_low: Option<SwingPoint>,
    /// Every break in the order it happened.
    pub breaks: Vec<StructureBreak>,
}

impl StructureAnalysis {
    pub fn neutral() -> Self {
        Self {
            trend: TrendDirection::Neutral,
            structural_high: None,
            structural_low: None,
            breaks: Vec::new(),
        }
    }
}

/// Classify the trend of a swing sequence (oldest first).
///
/// Fewer than two swings, or no swing of either kind, yields Neutral with no
/// structural levels.
pub fn analyze_structure(swings: &[SwingPoint]) -> StructureAnalysis {
    if swings.len() < 2 {
        return StructureAnalysis::neutral();
    }
    let seed = seed_state(swings);
    if seed == StructureState::Uninitialized {
        return StructureAnalysis::neutral();
    }

    let mut breaks = Vec::new();
    let state = swings
        .iter()
        .enumerate()
        .fold(seed, |state, (i, swing)| {
            let (next, brk) = step(state, swings, i, swing);
            breaks.extend(brk);
            next
        });

    match state {
        StructureState::Tracking { high, low, trend } => StructureAnalysis {
            trend,
            structural_high: Some(high),
            structural_low: Some(low),
            breaks,
        },
        StructureState::Uninitialized => StructureAnalysis::neutral(),
    }
}

/// First high and first low in chronological order.
fn seed_state(swings: &[SwingPoint]) -> StructureState {
    let high = swings.iter().find(|s| s.kind == SwingKind::High);
    let low = swings.iter().find(|s| s.kind == SwingKind::Low);
    match (high, low) {
        (Some(&high), Some(&low)) => StructureState::Tracking {
            high,
            low,
            trend: TrendDirection::Neutral,
        },
        _ => StructureState::Uninitialized,
    }
}

fn step(
    state: StructureState,
    swings: &[SwingPoint],
    position: usize,
    swing: &SwingPoint,
) -> (StructureState, Option<StructureBreak>) {
    let StructureState::Tracking { high, low, trend } = state else {
        return (state, None);
    };

    match swing.kind {
        SwingKind::High if swing.price > high.price => {
            let counterpart = last_before(swings, position, SwingKind::Low);
            let next = StructureState::Tracking {
                high: *swing,
                low: counterpart.unwrap_or(low),
                trend: TrendDirection::Bullish,
            };
            let brk = StructureBreak {
                kind: BreakKind::Bullish,
                swing: *swing,
                counterpart,
            };
            (next, Some(brk))
        }
        SwingKind::Low if swing.price < low.price => {
            let counterpart = last_before(swings, position, SwingKind::High);
            let next = StructureState::Tracking {
                high: counterpart.unwrap_or(high),
                low: *swing,
                trend: TrendDirection::Bearish,
            };
            let brk = StructureBreak {
                kind: BreakKind::Bearish,
                swing: *swing,
                counterpart,
            };
            (next, Some(brk))
        }
        _ => (StructureState::Tracking { high, low, trend }, None),
    }
}

fn last_before(swings: &[SwingPoint], position: usize, kind: SwingKind) -> Option<SwingPoint> {
    swings[..position]
        .iter()
        .rev()
        .find(|s| s.kind == kind)
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(i: usize, p: f64) -> SwingPoint {
        SwingPoint::high(i, p)
    }

    fn l(i: usize, p: f64) -> SwingPoint {
        SwingPoint::low(i, p)
    }

    #[test]
    fn fewer_than_two_swings_is_neutral() {
        assert_eq!(analyze_structure(&[]), StructureAnalysis::neutral());
        assert_eq!(analyze_structure(&[h(1, 1.0)]), StructureAnalysis::neutral());
    }

    #[test]
    fn only_highs_is_neutral() {
        let swings = [h(1, 1.0), h(3, 1.2), h(5, 1.4)];
        assert_eq!(analyze_structure(&swings), StructureAnalysis::neutral());
    }

    #[test]
    fn no_break_stays_neutral_with_seed_levels() {
        let swings = [h(1, 1.20), l(3, 1.10), h(5, 1.18), l(7, 1.12)];
        let a = analyze_structure(&swings);
        assert_eq!(a.trend, TrendDirection::Neutral);
        assert_eq!(a.structural_high, Some(h(1, 1.20)));
        assert_eq!(a.structural_low, Some(l(3, 1.10)));
        assert!(a.breaks.is_empty());
    }

    #[test]
    fn higher_high_is_bullish_and_moves_low_up() {
        let swings = [h(1, 1.20), l(3, 1.10), h(5, 1.18), l(7, 1.15), h(9, 1.25)];
        let a = analyze_structure(&swings);
        assert_eq!(a.trend, TrendDirection::Bullish);
        assert_eq!(a.structural_high, Some(h(9, 1.25)));
        assert_eq!(a.structural_low, Some(l(7, 1.15)));
        assert_eq!(a.breaks.len(), 1);
        assert_eq!(a.breaks[0].kind, BreakKind::Bullish);
        assert_eq!(a.breaks[0].counterpart, Some(l(7, 1.15)));
    }

    #[test]
    fn bullish_then_bearish_break() {
        let swings = [
            h(1, 1.20),
            l(3, 1.10),
            h(5, 1.25), // bullish break, low stays l(3)
            l(7, 1.15),
            h(9, 1.22),
            l(11, 1.05), // bearish break below 1.10, high becomes h(9)
        ];
        let a = analyze_structure(&swings);
        assert_eq!(a.trend, TrendDirection::Bearish);
        assert_eq!(a.structural_low, Some(l(11, 1.05)));
        assert_eq!(a.structural_high, Some(h(9, 1.22)));
        let kinds: Vec<BreakKind> = a.breaks.iter().map(|b| b.kind).collect();
        assert_eq!(kinds, vec![BreakKind::Bullish, BreakKind::Bearish]);
    }

    #[test]
    fn consecutive_same_kind_swings_tolerated() {
        // Two lows in a row: the later, lower one breaks.
        let swings = [h(1, 1.20), l(3, 1.10), l(5, 1.08), h(7, 1.15), l(9, 1.07)];
        let a = analyze_structure(&swings);
        assert_eq!(a.trend, TrendDirection::Bearish);
        assert_eq!(a.structural_low, Some(l(9, 1.07)));
        assert_eq!(a.structural_high, Some(h(7, 1.15)));
        assert_eq!(a.breaks.len(), 2);
    }

    #[test]
    fn break_without_prior_counterpart_keeps_old_level() {
        // The first low comes after the breaking high.
        let swings = [h(1, 1.20), h(2, 1.25), l(4, 1.10)];
        let a = analyze_structure(&swings);
        assert_eq!(a.trend, TrendDirection::Bullish);
        assert_eq!(a.structural_high, Some(h(2, 1.25)));
        assert_eq!(a.structural_low, Some(l(4, 1.10)));
        assert_eq!(a.breaks[0].counterpart, None);
    }
}
