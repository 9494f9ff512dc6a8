//! Synthetic candle series.
//!
//! Two generators:
//! - `random_walk`: seeded noise. A sub-seed is derived from
//!   `(master_seed, symbol, timeframe)` with BLAKE3, so every series is
//!   reproducible on its own regardless of generation order. Moves scale with
//!   the square root of the candle's hours.
//! - `scripted`: closes interpolated along fixed legs, for series with a
//!   known shape.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::{Candle, Timeframe};

/// Random-walk generator parameters, sized for one-hour candles.
#[derive(Debug, Clone, PartialEq)]
pub struct WalkParams {
    pub start_price: f64,
    /// Max close-to-close move as a fraction of price.
    pub step: f64,
    /// Max wick extension beyond the body as a fraction of price.
    pub wick: f64,
    /// Slow sinusoidal drift amplitude as a fraction of price; creates swings.
    pub cycle: f64,
    pub cycle_bars: f64,
}

impl Default for WalkParams {
    fn default() -> Self {
        Self {
            start_price: 1.1000,
            step: 0.0008,
            wick: 0.0004,
            cycle: 0.0015,
            cycle_bars: 40.0,
        }
    }
}

pub fn sub_seed(master_seed: u64, symbol: &str, timeframe: Timeframe) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&master_seed.to_le_bytes());
    hasher.update(symbol.as_bytes());
    hasher.update(timeframe.label().as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hasher.finalize().as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}

/// `count` consecutive candles on `timeframe`, the last one opening at
/// `end - timeframe.duration()` (so every candle is closed at `end`).
pub fn random_walk(
    master_seed: u64,
    symbol: &str,
    timeframe: Timeframe,
    end: DateTime<Utc>,
    count: usize,
    params: &WalkParams,
) -> Vec<Candle> {
    let mut rng = StdRng::seed_from_u64(sub_seed(master_seed, symbol, timeframe));
    let step = timeframe.duration();
    let start = end - step * count as i32;
    let scale = f64::from(timeframe.hours()).sqrt();
    let (max_move, max_wick) = (params.step * scale, params.wick * scale);

    let mut candles = Vec::with_capacity(count);
    let mut close = params.start_price;
    for i in 0..count {
        let open = close;
        let phase = std::f64::consts::TAU * i as f64 / params.cycle_bars.max(1.0);
        let drift =
            scale * params.cycle * phase.cos() * std::f64::consts::TAU / params.cycle_bars.max(1.0);
        let noise: f64 = rng.gen_range(-max_move..=max_move);
        close = (open * (1.0 + drift + noise)).max(f64::EPSILON);
        let up: f64 = rng.gen_range(0.0..=max_wick);
        let down: f64 = rng.gen_range(0.0..=max_wick);
        candles.push(Candle {
            time: start + step * i as i32,
            open,
            high: open.max(close) * (1.0 + up),
            low: open.min(close) * (1.0 - down),
            close,
            volume: None,
        });
    }
    candles
}

/// One straight stretch of a scripted series: `bars` candles closing evenly
/// spaced towards `to`, the last one exactly on it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Leg {
    pub bars: usize,
    pub to: f64,
}

impl Leg {
    pub const fn new(bars: usize, to: f64) -> Self {
        Self { bars, to }
    }
}

/// Candles whose closes start at `start_price` and follow `legs`.
///
/// Each candle opens at the previous close (the first opens at `start_price`)
/// and its wicks extend `spread` beyond the body. The series holds
/// `1 + Σ legs.bars` candles, the last one opening at `end - timeframe.duration()`.
pub fn scripted(
    timeframe: Timeframe,
    end: DateTime<Utc>,
    start_price: f64,
    legs: &[Leg],
    spread: f64,
) -> Vec<Candle> {
    let mut closes = vec![start_price];
    for leg in legs {
        let from = closes[closes.len() - 1];
        for k in 1..=leg.bars {
            closes.push(if k == leg.bars {
                leg.to
            } else {
                from + (leg.to - from) * k as f64 / leg.bars as f64
            });
        }
    }

    let step = timeframe.duration();
    let start = end - step * closes.len() as i32;
    let mut open = start_price;
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let candle = Candle {
                time: start + step * i as i32,
                open,
                high: open.max(close) + spread,
                low: open.min(close) - spread,
                close,
                volume: None,
            };
            open = close;
            candle
        })
        .collect()
}
