//! Replay harness.
//!
//! Walks a historical cursor over a period one entry-timeframe candle at a
//! time and runs the same cycles the live scheduler would: a timeframe's
//! trend and AOI cycles run when the cursor sits on one of its candle
//! boundaries (all of them on the first step), and the entry cycle runs
//! every step. Candle windows come from the same cutoff logic as live runs.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use trenda_core::domain::{OutputDigest, SignalId, Timeframe};
use trenda_core::entry::EntrySignal;
use trenda_core::fingerprint::{digest, FingerprintError};

use crate::clock::ReplayClock;
use crate::cycle::{CycleContext, CycleReport};

#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub steps: usize,
    pub cycles: usize,
    pub failures: usize,
    /// Zones written across all AOI cycles.
    pub zones_stored: usize,
    /// Unique signals in first-seen order.
    pub signals: Vec<EntrySignal>,
    /// BLAKE3 over the signal list.
    pub digest: OutputDigest,
}

fn on_boundary(timeframe: Timeframe, at: DateTime<Utc>) -> bool {
    timeframe.last_close(at) == at
}

/// Replay `[start, end]`. `base` supplies everything except the clock, which
/// is replaced by a cursor over the period.
pub fn replay(
    base: &CycleContext<'_>,
    trend_timeframes: &[Timeframe],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<ReplayReport, FingerprintError> {
    let step = base.entry_timeframe.duration();
    let mut at = base.entry_timeframe.last_close(start);
    if at < start {
        at += step;
    }

    let cursor = ReplayClock::new(at);
    let ctx = CycleContext {
        clock: &cursor,
        ..*base
    };
    let aoi_timeframes: Vec<Timeframe> = ctx.settings.aoi_timeframes().collect();

    let mut steps = 0;
    let mut cycles = 0;
    let mut failures = 0;
    let mut zones_stored = 0;
    let mut seen: BTreeSet<SignalId> = BTreeSet::new();
    let mut signals = Vec::new();

    let mut absorb = |report: CycleReport, signals: &mut Vec<EntrySignal>| {
        cycles += 1;
        failures += report.failures().count();
        zones_stored += report.zones_stored();
        for signal in report.signals() {
            if seen.insert(signal.id.clone()) {
                signals.push(signal.clone());
            }
        }
    };

    while at <= end {
        cursor.set(at);
        let first = steps == 0;
        for &tf in trend_timeframes {
            if first || on_boundary(tf, at) {
                absorb(ctx.run_trend_cycle(tf), &mut signals);
            }
        }
        for &tf in &aoi_timeframes {
            if first || on_boundary(tf, at) {
                absorb(ctx.run_aoi_cycle(tf), &mut signals);
            }
        }
        absorb(ctx.run_entry_cycle(), &mut signals);
        steps += 1;
        at += step;
    }

    let digest = digest(&signals)?;
    info!(
        steps,
        cycles,
        failures,
        zones_stored,
        signals = signals.len(),
        digest = %digest,
        "replay finished"
    );
    Ok(ReplayReport {
        start,
        end,
        steps,
        cycles,
        failures,
        zones_stored,
        signals,
        digest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn boundaries() {
        let monday = Utc.with_ymd_and_hms(2024, 5, 6, 0, 0, 0).unwrap();
        assert!(on_boundary(Timeframe::W1, monday));
        assert!(on_boundary(Timeframe::D1, monday));
        let tuesday_4 = Utc.with_ymd_and_hms(2024, 5, 7, 4, 0, 0).unwrap();
        assert!(!on_boundary(Timeframe::W1, tuesday_4));
        assert!(!on_boundary(Timeframe::D1, tuesday_4));
        assert!(on_boundary(Timeframe::H4, tuesday_4));
        assert!(on_boundary(Timeframe::H1, tuesday_4));
        let tuesday_5 = Utc.with_ymd_and_hms(2024, 5, 7, 5, 0, 0).unwrap();
        assert!(!on_boundary(Timeframe::H4, tuesday_5));
    }
}
