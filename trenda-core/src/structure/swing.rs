//! Swing detection on closing prices.
//!
//! A close at index i is a swing high when it is a local maximum (strict rise
//! on the left, strict fall after any plateau on the right), survives the
//! minimum-distance filter, and has a prominence of at least `prominence`.
//! Lows are the same test on negated closes.
//!
//! Prominence is measured the classic way: walk left and right from the peak
//! until a strictly higher close (or the window edge) and take the peak minus
//! the higher of the two minima found on each side.
//!
//! Plateaus and equal-priority peaks resolve to the earliest index.

use serde::{Deserialize, Serialize};

use crate::domain::{Candle, SwingKind, SwingPoint};

/// Swing-detection parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwingParams {
    /// Minimum index distance between two swings of the same kind.
    pub distance: usize,
    /// Minimum prominence in price units.
    pub prominence: f64,
    /// Only the last `lookback` candles are examined. Indices still refer to
    /// the full input slice.
    pub lookback: Option<usize>,
}

impl Default for SwingParams {
    fn default() -> Self {
        Self {
            distance: 1,
            prominence: 0.0004,
            lookback: None,
        }
    }
}

/// Minimum candles for any swing to exist (a peak needs a neighbour on each side).
pub const MIN_SWING_CANDLES: usize = 3;

/// Swing highs and lows ordered by index, oldest first. Fewer than
/// `MIN_SWING_CANDLES` candles in the window yields an empty list.
pub fn detect_swings(candles: &[Candle], params: &SwingParams) -> Vec<SwingPoint> {
    let start = params
        .lookback
        .map_or(0, |n| candles.len().saturating_sub(n));
    let window = &candles[start..];
    if window.len() < MIN_SWING_CANDLES {
        return Vec::new();
    }

    let closes: Vec<f64> = window.iter().map(|c| c.close).collect();
    let negated: Vec<f64> = closes.iter().map(|c| -c).collect();

    let mut swings: Vec<SwingPoint> = find_peaks(&closes, params.distance, params.prominence)
        .into_iter()
        .map(|i| SwingPoint::high(start + i, closes[i]))
        .chain(
            find_peaks(&negated, params.distance, params.prominence)
                .into_iter()
                .map(|i| SwingPoint::low(start + i, closes[i])),
        )
        .collect();

    // A close cannot be both a strict maximum and a strict minimum, so
    // indices are unique and the sort is total.
    swings.sort_by_key(|s| s.index);
    swings
}

/// Append a terminal pseudo-swing at the last candle, of the opposite kind to
/// the last detected swing, priced at the last close. This lets the most
/// recent close break structure before it has been confirmed as a swing.
///
/// Empty swing lists stay empty. If the last swing already sits on the last
/// candle nothing is appended.
pub fn with_terminal_swing(mut swings: Vec<SwingPoint>, candles: &[Candle]) -> Vec<SwingPoint> {
    let (Some(last_swing), Some(last_candle)) = (swings.last().copied(), candles.last()) else {
        return swings;
    };
    let last_index = candles.len() - 1;
    if last_swing.index >= last_index {
        return swings;
    }
    swings.push(SwingPoint {
        index: last_index,
        price: last_candle.close,
        kind: last_swing.kind.opposite(),
    });
    swings
}

/// Indices of qualifying peaks in `x`, ascending.
pub(crate) fn find_peaks(x: &[f64], distance: usize, prominence: f64) -> Vec<usize> {
    let peaks = local_maxima(x);
    let peaks = select_by_distance(x, &peaks, distance);
    peaks
        .into_iter()
        .filter(|&p| peak_prominence(x, p) >= prominence)
        .collect()
}

/// Strict local maxima; a flat top counts once, at its first index.
fn local_maxima(x: &[f64]) -> Vec<usize> {
    let n = x.len();
    let mut peaks = Vec::new();
    if n < 3 {
        return peaks;
    }
    let mut i = 1;
    while i < n - 1 {
        if x[i - 1] < x[i] {
            let mut ahead = i + 1;
            while ahead < n - 1 && x[ahead] == x[i] {
                ahead += 1;
            }
            if x[ahead] < x[i] {
                peaks.push(i);
            }
            i = ahead;
        } else {
            i += 1;
        }
    }
    peaks
}

/// Keep the highest peaks first, dropping any peak closer than `distance`
/// to an already kept one. Equal heights favour the earlier index.
fn select_by_distance(x: &[f64], peaks: &[usize], distance: usize) -> Vec<usize> {
    if distance <= 1 || peaks.len() < 2 {
        return peaks.to_vec();
    }
    let mut order: Vec<usize> = (0..peaks.len()).collect();
    order.sort_by(|&a, &b| {
        x[peaks[b]]
            .total_cmp(&x[peaks[a]])
            .then(peaks[a].cmp(&peaks[b]))
    });

    let mut keep = vec![true; peaks.len()];
    for &j in &order {
        if !keep[j] {
            continue;
        }
        for (k, kept) in keep.iter_mut().enumerate() {
            if k != j && peaks[k].abs_diff(peaks[j]) < distance {
                *kept = false;
            }
        }
    }
    peaks
        .iter()
        .zip(keep)
        .filter_map(|(&p, k)| k.then_some(p))
        .collect()
}

fn peak_prominence(x: &[f64], peak: usize) -> f64 {
    let height = x[peak];

    let mut left_min = height;
    for &v in x[..=peak].iter().rev() {
        if v > height {
            break;
        }
        left_min = left_min.min(v);
    }

    let mut right_min = height;
    for &v in &x[peak..] {
        if v > height {
            break;
        }
        right_min = right_min.min(v);
    }

    height - left_min.max(right_min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_candles;

    fn params(prominence: f64) -> SwingParams {
        SwingParams {
            distance: 1,
            prominence,
            lookback: None,
        }
    }

    #[test]
    fn simple_peak_and_trough() {
        let candles = make_candles(&[1.0, 2.0, 1.0, 0.5, 1.5], 0.1);
        let swings = detect_swings(&candles, &params(0.1));
        assert_eq!(
            swings,
            vec![SwingPoint::high(1, 2.0), SwingPoint::low(3, 0.5)]
        );
    }

    #[test]
    fn too_few_candles_is_empty() {
        let candles = make_candles(&[1.0, 2.0], 0.1);
        assert!(detect_swings(&candles, &params(0.0)).is_empty());
        assert!(detect_swings(&[], &params(0.0)).is_empty());
    }

    #[test]
    fn plateau_resolves_to_earliest_index() {
        let candles = make_candles(&[1.0, 2.0, 2.0, 2.0, 1.0], 0.1);
        let swings = detect_swings(&candles, &params(0.5));
        assert_eq!(swings, vec![SwingPoint::high(1, 2.0)]);
    }

    #[test]
    fn edges_are_never_peaks() {
        let candles = make_candles(&[3.0, 2.0, 1.0], 0.1);
        assert!(detect_swings(&candles, &params(0.0)).is_empty());
    }

    #[test]
    fn prominence_filters_small_wiggles() {
        // Wiggles at 1 and 3 rise at most 0.0002 above their bases.
        let closes = [1.1000, 1.1003, 1.1001, 1.1002, 1.1001, 1.1020, 1.1000];
        let candles = make_candles(&closes, 0.0001);
        let highs: Vec<usize> = detect_swings(&candles, &params(0.0004))
            .into_iter()
            .filter(|s| s.kind == SwingKind::High)
            .map(|s| s.index)
            .collect();
        assert_eq!(highs, vec![5]);
    }

    #[test]
    fn prominence_uses_higher_of_two_bases() {
        // Peak 3.0 at index 2: left base 1.0 (edge), right base 2.5 before a higher 4.0.
        let x = [1.0, 2.0, 3.0, 2.5, 4.0, 0.0];
        assert!((peak_prominence(&x, 2) - 0.5).abs() < 1e-12);
        assert!((peak_prominence(&x, 4) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn distance_keeps_tallest_then_earliest() {
        let x = [0.0, 2.0, 0.0, 3.0, 0.0, 3.0, 0.0];
        assert_eq!(find_peaks(&x, 3, 0.0), vec![3]);
        assert_eq!(find_peaks(&x, 2, 0.0), vec![1, 3, 5]);
        assert_eq!(find_peaks(&x, 1, 0.0), vec![1, 3, 5]);
    }

    #[test]
    fn lookback_offsets_indices() {
        let closes = [5.0, 9.0, 5.0, 1.0, 2.0, 1.0, 3.0];
        let candles = make_candles(&closes, 0.1);
        let p = SwingParams {
            lookback: Some(4),
            ..params(0.1)
        };
        // Window is [1.0, 2.0, 1.0, 3.0] starting at index 3.
        assert_eq!(
            detect_swings(&candles, &p),
            vec![SwingPoint::high(4, 2.0), SwingPoint::low(5, 1.0)]
        );
    }

    #[test]
    fn terminal_swing_is_opposite_kind_at_last_close() {
        let candles = make_candles(&[1.0, 2.0, 1.0, 1.5, 1.8], 0.1);
        let swings = detect_swings(&candles, &params(0.1));
        assert_eq!(swings.last().map(|s| s.kind), Some(SwingKind::Low));
        let with_last = with_terminal_swing(swings, &candles);
        assert_eq!(with_last.last(), Some(&SwingPoint::high(4, 1.8)));
    }

    #[test]
    fn terminal_swing_skipped_for_empty_input() {
        let candles = make_candles(&[1.0, 1.0, 1.0], 0.1);
        assert!(with_terminal_swing(Vec::new(), &candles).is_empty());
    }
}
