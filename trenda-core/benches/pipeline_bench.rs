//! Criterion benchmarks for the analysis hot paths.
//!
//! Benchmarks:
//! 1. Swing detection over growing windows
//! 2. Full AOI pipeline (context → candidates → scoring)
//! 3. Entry detection across a zone set

use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use trenda_core::aoi::analyze_zones;
use trenda_core::domain::{Candle, Timeframe, TrendDirection};
use trenda_core::entry::detect_entry;
use trenda_core::settings::SettingsTable;
use trenda_core::structure::{analyze_candles, SwingParams};
use trenda_core::synthetic::{random_walk, WalkParams};

// ── Helpers ──────────────────────────────────────────────────────────

fn series(timeframe: Timeframe, n: usize) -> Vec<Candle> {
    let end = Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap();
    random_walk(42, "EURUSD", timeframe, end, n, &WalkParams::default())
}

// ── 1. Structure ─────────────────────────────────────────────────────

fn bench_structure(c: &mut Criterion) {
    let mut group = c.benchmark_group("structure");
    for n in [100, 500, 2_000] {
        let candles = series(Timeframe::H4, n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &candles, |b, candles| {
            b.iter(|| analyze_candles(black_box(candles), &SwingParams::default()))
        });
    }
    group.finish();
}

// ── 2. AOI pipeline ──────────────────────────────────────────────────

fn bench_aoi_pipeline(c: &mut Criterion) {
    let table = SettingsTable::default();
    let mut group = c.benchmark_group("aoi_pipeline");
    for tf in [Timeframe::H4, Timeframe::D1] {
        let candles = series(tf, 400);
        let settings = table.aoi(tf).unwrap();
        let params = table.analysis(tf).unwrap();
        group.bench_function(tf.label(), |b| {
            b.iter(|| {
                analyze_zones(
                    "EURUSD",
                    black_box(&candles),
                    TrendDirection::Bullish,
                    settings,
                    params,
                    14,
                )
            })
        });
    }
    group.finish();
}

// ── 3. Entry detection ───────────────────────────────────────────────

fn bench_entry(c: &mut Criterion) {
    let table = SettingsTable::default();
    let h4 = series(Timeframe::H4, 400);
    let zones = analyze_zones(
        "EURUSD",
        &h4,
        TrendDirection::Bullish,
        table.aoi(Timeframe::H4).unwrap(),
        table.analysis(Timeframe::H4).unwrap(),
        14,
    )
    .unwrap();
    let h1 = series(Timeframe::H1, 100);
    c.bench_function("entry_detect", |b| {
        b.iter(|| detect_entry(black_box(&h1), &zones, TrendDirection::Bullish, 15))
    });
}

criterion_group!(benches, bench_structure, bench_aoi_pipeline, bench_entry);
criterion_main!(benches);
