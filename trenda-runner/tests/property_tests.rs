//! Property tests for collaborator contracts.
//!
//! 1. Closed window: only candles opened before the cutoff, newest suffix
//! 2. Zone replacement: the stored set always equals the last replacement

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use trenda_core::domain::{AoiZone, Candle, Timeframe};
use trenda_runner::{closed_window, AoiStore, MemoryAoiStore};

fn hourly(n: usize) -> Vec<Candle> {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let p = 1.1 + (i % 7) as f64 * 0.0002;
            Candle::new(base + Duration::hours(i as i64), p, p + 0.0004, p - 0.0004, p).unwrap()
        })
        .collect()
}

fn arb_zone_set() -> impl Strategy<Value = Vec<AoiZone>> {
    prop::collection::vec(1u32..50, 0..6).prop_map(|offsets| {
        offsets
            .into_iter()
            .map(|o| {
                let lower = 1.0 + o as f64 * 0.01;
                AoiZone::new(lower, lower + 0.005, Timeframe::H4).unwrap()
            })
            .collect()
    })
}

// ── 1. Closed window ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn window_is_closed_suffix(n in 0usize..80, cut in 0i64..100, lookback in 0usize..40) {
        let candles = hourly(n);
        let cutoff = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::hours(cut);
        let window = closed_window(&candles, lookback, cutoff);

        let closed: Vec<&Candle> = candles.iter().filter(|c| c.time < cutoff).collect();
        prop_assert_eq!(window.len(), closed.len().min(lookback));
        prop_assert!(window.iter().all(|c| c.time < cutoff));
        let expected = &closed[closed.len() - window.len()..];
        for (got, want) in window.iter().zip(expected) {
            prop_assert_eq!(got, *want);
        }
    }
}

// ── 2. Zone replacement ──────────────────────────────────────────────

proptest! {
    #[test]
    fn stored_set_is_last_replacement(sets in prop::collection::vec(arb_zone_set(), 1..5)) {
        let store = MemoryAoiStore::new();
        for set in &sets {
            store.replace("EURUSD", Timeframe::H4, set).unwrap();
        }
        let last = sets.last().unwrap();
        let mut expected: Vec<AoiZone> = Vec::new();
        for zone in last {
            match expected.iter_mut().find(|z| z.lower == zone.lower && z.upper == zone.upper) {
                Some(existing) => *existing = zone.clone(),
                None => expected.push(zone.clone()),
            }
        }
        prop_assert_eq!(store.zones("EURUSD", Timeframe::H4).unwrap(), expected);
    }
}
