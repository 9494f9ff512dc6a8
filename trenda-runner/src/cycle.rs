//! Analysis cycles: trend, AOI and entry.
//!
//! Each cycle fans out over symbols (rayon, or sequentially when parallelism
//! is disabled) and returns one outcome per unit. A failing unit is logged
//! and reported; it never aborts the other units of the same cycle.
//!
//! Cycles read the decision time from the clock once, so every unit of a
//! cycle sees the same cutoff.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info};

use trenda_core::aoi::analyze_zones;
use trenda_core::domain::{SignalId, Timeframe, TrendDirection, ZoneError};
use trenda_core::entry::{detect_entry, qualify, EntrySignal, HtfContext, HtfLevel};
use trenda_core::indicators::latest_atr;
use trenda_core::settings::{EntryConfig, SettingsError, SettingsTable};
use trenda_core::structure::analyze_candles;

use crate::clock::Clock;
use crate::gates::{GateInput, GateRejection, GateSet};
use crate::source::{CandleSource, SourceError};
use crate::store::{AoiStore, SignalSink, StoreError, TrendStore};

/// Timeframes whose last closed candle feeds the HTF context of an entry.
pub const HTF_LEVELS: [Timeframe; 3] = [Timeframe::H4, Timeframe::D1, Timeframe::W1];

#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Zone(#[from] ZoneError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CycleKind {
    Trend,
    Aoi,
    Entry,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum UnitOutcome {
    TrendUpdated(TrendDirection),
    ZonesReplaced(usize),
    NoData,
    NoConsensus,
    NoZones,
    NoPattern,
    Rejected(GateRejection),
    BelowThreshold,
    Signal(Box<EntrySignal>),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitReport {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub outcome: UnitOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    pub kind: CycleKind,
    pub timeframe: Timeframe,
    pub at: DateTime<Utc>,
    pub units: Vec<UnitReport>,
}

impl CycleReport {
    pub fn signals(&self) -> impl Iterator<Item = &EntrySignal> {
        self.units.iter().filter_map(|u| match &u.outcome {
            UnitOutcome::Signal(s) => Some(s.as_ref()),
            _ => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = &UnitReport> {
        self.units
            .iter()
            .filter(|u| matches!(u.outcome, UnitOutcome::Failed(_)))
    }

    /// Zones written by the AOI units of this cycle.
    pub fn zones_stored(&self) -> usize {
        self.units
            .iter()
            .map(|u| match u.outcome {
                UnitOutcome::ZonesReplaced(n) => n,
                _ => 0,
            })
            .sum()
    }
}

/// Everything a cycle needs: configuration plus the collaborators it talks to.
#[derive(Clone, Copy)]
pub struct CycleContext<'a> {
    pub symbols: &'a [String],
    pub settings: &'a SettingsTable,
    pub entry: &'a EntryConfig,
    pub gates: &'a GateSet,
    /// Timeframes whose trends decide the entry direction, lowest first.
    pub alignment: &'a [Timeframe],
    pub entry_timeframe: Timeframe,
    pub source: &'a dyn CandleSource,
    pub trends: &'a dyn TrendStore,
    pub zones: &'a dyn AoiStore,
    pub sink: &'a dyn SignalSink,
    pub clock: &'a dyn Clock,
    pub parallel: bool,
}

impl<'a> CycleContext<'a> {
    fn fan_out<F>(&self, kind: CycleKind, timeframe: Timeframe, unit: F) -> CycleReport
    where
        F: Fn(&str) -> Result<UnitOutcome, CycleError> + Sync,
    {
        let run = |symbol: &String| {
            let outcome = unit(symbol).unwrap_or_else(|e| {
                error!(symbol = %symbol, timeframe = %timeframe, cycle = ?kind, error = %e, "unit failed");
                UnitOutcome::Failed(e.to_string())
            });
            UnitReport {
                symbol: symbol.clone(),
                timeframe,
                outcome,
            }
        };
        let units: Vec<UnitReport> = if self.parallel {
            self.symbols.par_iter().map(run).collect()
        } else {
            self.symbols.iter().map(run).collect()
        };
        CycleReport {
            kind,
            timeframe,
            at: self.clock.now(),
            units,
        }
    }

    // ── Trend ────────────────────────────────────────────────────────

    /// Recompute and store the structure trend of every symbol on `timeframe`.
    pub fn run_trend_cycle(&self, timeframe: Timeframe) -> CycleReport {
        let cutoff = self.clock.cutoff(timeframe);
        self.fan_out(CycleKind::Trend, timeframe, |symbol| {
            let params = self.settings.analysis(timeframe)?;
            let Some(candles) = self.source.fetch(symbol, timeframe, params.lookback, cutoff)? else {
                return Ok(UnitOutcome::NoData);
            };
            let analysis = analyze_candles(&candles, &params.swing_params());
            self.trends.put_trend(
                symbol,
                timeframe,
                analysis.trend,
                analysis.structural_high.map(|s| s.price),
                analysis.structural_low.map(|s| s.price),
            )?;
            debug!(symbol, timeframe = %timeframe, trend = %analysis.trend, "trend stored");
            Ok(UnitOutcome::TrendUpdated(analysis.trend))
        })
    }

    // ── AOI ──────────────────────────────────────────────────────────

    /// Regenerate the zone set of every symbol on `timeframe`.
    ///
    /// Without trend consensus the stored set is cleared. Without data it is
    /// left as is.
    pub fn run_aoi_cycle(&self, timeframe: Timeframe) -> CycleReport {
        let cutoff = self.clock.cutoff(timeframe);
        self.fan_out(CycleKind::Aoi, timeframe, |symbol| {
            let aoi = self.settings.aoi(timeframe)?;
            let params = self.settings.analysis(timeframe)?;
            let snapshot = self.trends.snapshot(symbol, &aoi.trend_alignment)?;
            let Some(direction) = snapshot.overall(&aoi.trend_alignment) else {
                self.zones.replace(symbol, timeframe, &[])?;
                return Ok(UnitOutcome::NoConsensus);
            };
            let Some(candles) = self.source.fetch(symbol, timeframe, params.aoi_window(), cutoff)? else {
                return Ok(UnitOutcome::NoData);
            };
            let zones = analyze_zones(symbol, &candles, direction, aoi, params, self.entry.atr_period)?;
            self.zones.replace(symbol, timeframe, &zones)?;
            info!(symbol, timeframe = %timeframe, direction = %direction, zones = zones.len(), "zones replaced");
            Ok(UnitOutcome::ZonesReplaced(zones.len()))
        })
    }

    // ── Entry ────────────────────────────────────────────────────────

    /// Look for a retest of a tradable zone on the entry timeframe.
    pub fn run_entry_cycle(&self) -> CycleReport {
        let timeframe = self.entry_timeframe;
        let cutoff = self.clock.cutoff(timeframe);
        self.fan_out(CycleKind::Entry, timeframe, |symbol| {
            self.entry_unit(symbol, cutoff)
        })
    }

    fn entry_unit(&self, symbol: &str, cutoff: DateTime<Utc>) -> Result<UnitOutcome, CycleError> {
        let snapshot = self.trends.snapshot(symbol, self.alignment)?;
        let Some(direction) = snapshot.overall(self.alignment) else {
            return Ok(UnitOutcome::NoConsensus);
        };
        let zones = self.zones.fetch_tradable(symbol)?;
        if zones.is_empty() {
            return Ok(UnitOutcome::NoZones);
        }

        let lookback = self
            .settings
            .analysis(self.entry_timeframe)?
            .lookback
            .max(self.entry.pattern_window)
            .max(self.entry.atr_period + 1);
        let Some(candles) = self.source.fetch(symbol, self.entry_timeframe, lookback, cutoff)? else {
            return Ok(UnitOutcome::NoData);
        };
        let Some(pattern) = detect_entry(&candles, &zones, direction, self.entry.pattern_window) else {
            return Ok(UnitOutcome::NoPattern);
        };

        let atr = latest_atr(&candles, self.entry.atr_period);
        let levels = self.htf_levels(symbol)?;
        let htf = HtfContext::compute(
            direction,
            pattern.entry_price(),
            atr,
            &levels,
            &snapshot,
            self.alignment,
            self.entry.no_obstacle_distance_atr,
        );

        let input = GateInput {
            direction,
            signal_time: pattern.signal_time(),
            htf: &htf,
        };
        if let Err(rejection) = self.gates.check(&input) {
            info!(symbol, gate = %rejection.gate, reason = %rejection.reason, "pattern rejected");
            return Ok(UnitOutcome::Rejected(rejection));
        }

        let Some(signal) = qualify(symbol, pattern, atr, htf, snapshot, self.entry) else {
            debug!(symbol, "pattern below score threshold");
            return Ok(UnitOutcome::BelowThreshold);
        };
        let id: SignalId = self.sink.store_entry_signal(&signal)?;
        info!(
            symbol,
            id = %id,
            direction = %signal.direction,
            entry = signal.entry_price,
            score = signal.score.total,
            quality = signal.score.quality.score,
            "entry signal"
        );
        Ok(UnitOutcome::Signal(Box::new(signal)))
    }

    /// Last closed candle on each HTF level timeframe. Missing data is skipped.
    fn htf_levels(&self, symbol: &str) -> Result<Vec<HtfLevel>, CycleError> {
        let mut levels = Vec::with_capacity(HTF_LEVELS.len());
        for tf in HTF_LEVELS {
            if let Some(candles) = self.source.fetch(symbol, tf, 1, self.clock.cutoff(tf))? {
                levels.extend(HtfLevel::from_closed(tf, &candles));
            }
        }
        Ok(levels)
    }

    // ── All ──────────────────────────────────────────────────────────

    /// One full pass: trends on `trend_timeframes`, zones on every configured
    /// AOI timeframe, then entries.
    pub fn run_all(&self, trend_timeframes: &[Timeframe]) -> Vec<CycleReport> {
        let mut reports: Vec<CycleReport> = trend_timeframes
            .iter()
            .map(|tf| self.run_trend_cycle(*tf))
            .collect();
        let aoi_timeframes: Vec<Timeframe> = self.settings.aoi_timeframes().collect();
        reports.extend(aoi_timeframes.into_iter().map(|tf| self.run_aoi_cycle(tf)));
        reports.push(self.run_entry_cycle());
        reports
    }
}
