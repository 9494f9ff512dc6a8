//! Multi-timeframe trend consensus.
//!
//! The rule prefers the middle timeframe rather than a majority vote:
//! - any unknown trend: no consensus;
//! - three or more inputs: the first three are used, and the middle trend wins
//!   when it agrees with either neighbour;
//! - two inputs: both must agree;
//! - fewer: no consensus.
//!
//! A Neutral consensus is reported as such; [`TrendSnapshot::overall`] only
//! yields a tradable direction.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::{Timeframe, TrendDirection};

/// Consensus over trends ordered lowest timeframe first.
pub fn consensus(trends: &[Option<TrendDirection>]) -> Option<TrendDirection> {
    if trends.iter().any(Option::is_none) {
        return None;
    }
    let agreed = match trends {
        [lower, middle, higher, ..] => {
            if middle == lower || middle == higher {
                *middle
            } else {
                None
            }
        }
        [a, b] if a == b => *a,
        _ => None,
    };
    agreed
}

/// Per-timeframe trends for one symbol, as read from the trend store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendSnapshot {
    trends: BTreeMap<Timeframe, Option<TrendDirection>>,
}

impl TrendSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, timeframe: Timeframe, trend: Option<TrendDirection>) {
        self.trends.insert(timeframe, trend);
    }

    pub fn with(mut self, timeframe: Timeframe, trend: Option<TrendDirection>) -> Self {
        self.insert(timeframe, trend);
        self
    }

    pub fn get(&self, timeframe: Timeframe) -> Option<TrendDirection> {
        self.trends.get(&timeframe).copied().flatten()
    }

    /// Raw consensus across `timeframes`, in the order given. May be Neutral.
    pub fn consensus(&self, timeframes: &[Timeframe]) -> Option<TrendDirection> {
        let ordered: Vec<Option<TrendDirection>> =
            timeframes.iter().map(|tf| self.get(*tf)).collect();
        consensus(&ordered)
    }

    /// Directional consensus across `timeframes`; Neutral is not tradable.
    pub fn overall(&self, timeframes: &[Timeframe]) -> Option<TrendDirection> {
        self.consensus(timeframes).filter(|t| t.is_directional())
    }

    /// The first timeframe (in the order given) whose trend is not `direction`.
    /// `None` when every timeframe agrees.
    pub fn conflicted_timeframe(
        &self,
        direction: TrendDirection,
        timeframes: &[Timeframe],
    ) -> Option<Timeframe> {
        timeframes
            .iter()
            .copied()
            .find(|tf| self.get(*tf) != Some(direction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TrendDirection::{Bearish, Bullish, Neutral};

    #[test]
    fn middle_agrees_with_lower() {
        assert_eq!(
            consensus(&[Some(Bullish), Some(Bullish), Some(Bearish)]),
            Some(Bullish)
        );
    }

    #[test]
    fn middle_agrees_with_higher() {
        assert_eq!(
            consensus(&[Some(Bearish), Some(Bullish), Some(Bullish)]),
            Some(Bullish)
        );
    }

    #[test]
    fn middle_outlier_is_no_consensus() {
        assert_eq!(
            consensus(&[Some(Bullish), Some(Bearish), Some(Bullish)]),
            None
        );
    }

    #[test]
    fn two_inputs_must_agree() {
        assert_eq!(consensus(&[Some(Bullish), Some(Bullish)]), Some(Bullish));
        assert_eq!(consensus(&[Some(Bullish), Some(Bearish)]), None);
    }

    #[test]
    fn two_vs_three_asymmetry() {
        // The flanks agree with each other, but without the middle there is no consensus
        // for three inputs, while the same two flanks alone would agree.
        assert_eq!(
            consensus(&[Some(Bearish), Some(Bullish), Some(Bearish)]),
            None
        );
        assert_eq!(consensus(&[Some(Bearish), Some(Bearish)]), Some(Bearish));
    }

    #[test]
    fn fewer_than_two_is_no_consensus() {
        assert_eq!(consensus(&[]), None);
        assert_eq!(consensus(&[Some(Bullish)]), None);
    }

    #[test]
    fn unknown_trend_blocks_consensus() {
        assert_eq!(consensus(&[Some(Bullish), None, Some(Bullish)]), None);
        assert_eq!(consensus(&[Some(Bullish), Some(Bullish), None]), None);
    }

    #[test]
    fn neutral_consensus_is_reported() {
        assert_eq!(
            consensus(&[Some(Neutral), Some(Neutral), Some(Bullish)]),
            Some(Neutral)
        );
        assert_eq!(consensus(&[Some(Neutral), Some(Neutral)]), Some(Neutral));
    }

    #[test]
    fn neutral_snapshot_has_no_overall_direction() {
        let snap = TrendSnapshot::new()
            .with(Timeframe::H4, Some(Bullish))
            .with(Timeframe::D1, Some(Neutral))
            .with(Timeframe::W1, Some(Neutral));
        let tfs = [Timeframe::H4, Timeframe::D1, Timeframe::W1];
        assert_eq!(snap.consensus(&tfs), Some(Neutral));
        assert_eq!(snap.overall(&tfs), None);
    }

    #[test]
    fn extra_inputs_beyond_three_are_ignored() {
        assert_eq!(
            consensus(&[Some(Bearish), Some(Bearish), Some(Bullish), Some(Bullish)]),
            Some(Bearish)
        );
    }

    #[test]
    fn snapshot_overall_and_conflict() {
        let snap = TrendSnapshot::new()
            .with(Timeframe::H4, Some(Bearish))
            .with(Timeframe::D1, Some(Bullish))
            .with(Timeframe::W1, Some(Bullish));
        let tfs = [Timeframe::H4, Timeframe::D1, Timeframe::W1];
        assert_eq!(snap.overall(&tfs), Some(Bullish));
        assert_eq!(snap.conflicted_timeframe(Bullish, &tfs), Some(Timeframe::H4));
        assert_eq!(snap.conflicted_timeframe(Bearish, &tfs), Some(Timeframe::D1));
    }

    #[test]
    fn snapshot_missing_timeframe_is_unknown() {
        let snap = TrendSnapshot::new()
            .with(Timeframe::H4, Some(Bullish))
            .with(Timeframe::D1, Some(Bullish));
        let tfs = [Timeframe::H4, Timeframe::D1, Timeframe::W1];
        assert_eq!(snap.overall(&tfs), None);
        assert_eq!(snap.conflicted_timeframe(Bullish, &tfs), Some(Timeframe::W1));
    }
}
