//! Persistence collaborators: trend store, AOI store, signal sink.
//!
//! Zone sets are replaced wholesale each AOI cycle. `AoiStore::replace` is
//! the only write path the cycles use; implementations must make it appear
//! atomic to readers. The in-memory store does the clear and the insert
//! under a single lock.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use trenda_core::consensus::TrendSnapshot;
use trenda_core::domain::{AoiZone, SignalId, Timeframe, TrendDirection};
use trenda_core::entry::EntrySignal;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} lock poisoned")]
    Poisoned(&'static str),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

fn lock<'a, T>(m: &'a Mutex<T>, what: &'static str) -> Result<MutexGuard<'a, T>, StoreError> {
    m.lock().map_err(|_| StoreError::Poisoned(what))
}

// ── Trend store ──────────────────────────────────────────────────────

/// Stored trend plus the structural extremes it was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendRecord {
    pub trend: TrendDirection,
    pub structural_high: Option<f64>,
    pub structural_low: Option<f64>,
}

pub trait TrendStore: Send + Sync {
    /// `None` when no trend has been stored yet.
    fn get_trend(&self, symbol: &str, timeframe: Timeframe) -> Result<Option<TrendDirection>, StoreError>;

    fn put_trend(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        trend: TrendDirection,
        high: Option<f64>,
        low: Option<f64>,
    ) -> Result<(), StoreError>;

    /// Stored trends for `timeframes`, unknown ones recorded as `None`.
    fn snapshot(&self, symbol: &str, timeframes: &[Timeframe]) -> Result<TrendSnapshot, StoreError> {
        let mut snapshot = TrendSnapshot::new();
        for &tf in timeframes {
            snapshot.insert(tf, self.get_trend(symbol, tf)?);
        }
        Ok(snapshot)
    }
}

#[derive(Debug, Default)]
pub struct MemoryTrendStore {
    records: Mutex<BTreeMap<(String, Timeframe), TrendRecord>>,
}

impl MemoryTrendStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, symbol: &str, timeframe: Timeframe) -> Result<Option<TrendRecord>, StoreError> {
        let records = lock(&self.records, "trend store")?;
        Ok(records.get(&(symbol.to_string(), timeframe)).copied())
    }
}

impl TrendStore for MemoryTrendStore {
    fn get_trend(&self, symbol: &str, timeframe: Timeframe) -> Result<Option<TrendDirection>, StoreError> {
        Ok(self.record(symbol, timeframe)?.map(|r| r.trend))
    }

    fn put_trend(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        trend: TrendDirection,
        high: Option<f64>,
        low: Option<f64>,
    ) -> Result<(), StoreError> {
        let mut records = lock(&self.records, "trend store")?;
        records.insert(
            (symbol.to_string(), timeframe),
            TrendRecord {
                trend,
                structural_high: high,
                structural_low: low,
            },
        );
        Ok(())
    }
}

// ── AOI store ────────────────────────────────────────────────────────

pub trait AoiStore: Send + Sync {
    fn clear(&self, symbol: &str, timeframe: Timeframe) -> Result<(), StoreError>;

    /// Insert zones, overwriting any stored zone with the same bounds.
    fn upsert(&self, symbol: &str, timeframe: Timeframe, zones: &[AoiZone]) -> Result<(), StoreError>;

    /// Tradable zones across all timeframes, lowest timeframe first.
    fn fetch_tradable(&self, symbol: &str) -> Result<Vec<AoiZone>, StoreError>;

    /// Replace the zone set for one symbol/timeframe: clear, then upsert when non-empty.
    fn replace(&self, symbol: &str, timeframe: Timeframe, zones: &[AoiZone]) -> Result<(), StoreError> {
        self.clear(symbol, timeframe)?;
        if !zones.is_empty() {
            self.upsert(symbol, timeframe, zones)?;
        }
        Ok(())
    }
}

type ZoneMap = BTreeMap<(String, Timeframe), Vec<AoiZone>>;

fn upsert_into(map: &mut ZoneMap, symbol: &str, timeframe: Timeframe, zones: &[AoiZone]) {
    let stored = map.entry((symbol.to_string(), timeframe)).or_default();
    for zone in zones {
        match stored
            .iter_mut()
            .find(|z| z.lower == zone.lower && z.upper == zone.upper)
        {
            Some(existing) => *existing = zone.clone(),
            None => stored.push(zone.clone()),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryAoiStore {
    zones: Mutex<ZoneMap>,
}

impl MemoryAoiStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored zones for one symbol/timeframe, tradable or not.
    pub fn zones(&self, symbol: &str, timeframe: Timeframe) -> Result<Vec<AoiZone>, StoreError> {
        let map = lock(&self.zones, "aoi store")?;
        Ok(map
            .get(&(symbol.to_string(), timeframe))
            .cloned()
            .unwrap_or_default())
    }
}

impl AoiStore for MemoryAoiStore {
    fn clear(&self, symbol: &str, timeframe: Timeframe) -> Result<(), StoreError> {
        lock(&self.zones, "aoi store")?.remove(&(symbol.to_string(), timeframe));
        Ok(())
    }

    fn upsert(&self, symbol: &str, timeframe: Timeframe, zones: &[AoiZone]) -> Result<(), StoreError> {
        let mut map = lock(&self.zones, "aoi store")?;
        upsert_into(&mut map, symbol, timeframe, zones);
        Ok(())
    }

    fn fetch_tradable(&self, symbol: &str) -> Result<Vec<AoiZone>, StoreError> {
        let map = lock(&self.zones, "aoi store")?;
        Ok(map
            .iter()
            .filter(|((s, _), _)| s == symbol)
            .flat_map(|(_, zones)| zones.iter().filter(|z| z.is_tradable()).cloned())
            .collect())
    }

    fn replace(&self, symbol: &str, timeframe: Timeframe, zones: &[AoiZone]) -> Result<(), StoreError> {
        let mut map = lock(&self.zones, "aoi store")?;
        map.remove(&(symbol.to_string(), timeframe));
        if !zones.is_empty() {
            upsert_into(&mut map, symbol, timeframe, zones);
        }
        Ok(())
    }
}

/// A write seen by [`RecordingAoiStore`].
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOp {
    Clear {
        symbol: String,
        timeframe: Timeframe,
    },
    Upsert {
        symbol: String,
        timeframe: Timeframe,
        zones: Vec<AoiZone>,
    },
}

/// Memory store that records every write, in order.
#[derive(Debug, Default)]
pub struct RecordingAoiStore {
    inner: MemoryAoiStore,
    ops: Mutex<Vec<StoreOp>>,
}

impl RecordingAoiStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> Result<Vec<StoreOp>, StoreError> {
        Ok(lock(&self.ops, "op log")?.clone())
    }

    pub fn take_ops(&self) -> Result<Vec<StoreOp>, StoreError> {
        Ok(std::mem::take(&mut *lock(&self.ops, "op log")?))
    }

    pub fn zones(&self, symbol: &str, timeframe: Timeframe) -> Result<Vec<AoiZone>, StoreError> {
        self.inner.zones(symbol, timeframe)
    }
}

impl AoiStore for RecordingAoiStore {
    fn clear(&self, symbol: &str, timeframe: Timeframe) -> Result<(), StoreError> {
        lock(&self.ops, "op log")?.push(StoreOp::Clear {
            symbol: symbol.to_string(),
            timeframe,
        });
        self.inner.clear(symbol, timeframe)
    }

    fn upsert(&self, symbol: &str, timeframe: Timeframe, zones: &[AoiZone]) -> Result<(), StoreError> {
        lock(&self.ops, "op log")?.push(StoreOp::Upsert {
            symbol: symbol.to_string(),
            timeframe,
            zones: zones.to_vec(),
        });
        self.inner.upsert(symbol, timeframe, zones)
    }

    fn fetch_tradable(&self, symbol: &str) -> Result<Vec<AoiZone>, StoreError> {
        self.inner.fetch_tradable(symbol)
    }
}

// ── Signal sink ──────────────────────────────────────────────────────

pub trait SignalSink: Send + Sync {
    /// Persist a qualified signal. Storing the same ID twice keeps one copy.
    fn store_entry_signal(&self, signal: &EntrySignal) -> Result<SignalId, StoreError>;
}

#[derive(Debug, Default)]
pub struct MemorySignalSink {
    signals: Mutex<Vec<EntrySignal>>,
}

impl MemorySignalSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signals(&self) -> Result<Vec<EntrySignal>, StoreError> {
        Ok(lock(&self.signals, "signal sink")?.clone())
    }
}

impl SignalSink for MemorySignalSink {
    fn store_entry_signal(&self, signal: &EntrySignal) -> Result<SignalId, StoreError> {
        let mut signals = lock(&self.signals, "signal sink")?;
        if !signals.iter().any(|s| s.id == signal.id) {
            signals.push(signal.clone());
        }
        Ok(signal.id.clone())
    }
}

/// Append-only JSONL file, one signal per line.
///
/// IDs already written are skipped, so replaying over the same period does
/// not duplicate lines.
#[derive(Debug)]
pub struct JsonlSignalSink {
    path: PathBuf,
    guard: Mutex<()>,
}

impl JsonlSignalSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read all signals. Malformed lines are skipped.
    pub fn read_all(&self) -> Result<Vec<EntrySignal>, StoreError> {
        let file = match fs::File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_err(e)),
        };
        let mut signals = Vec::new();
        for line in io::BufReader::new(file).lines() {
            let line = line.map_err(|e| self.io_err(e))?;
            if line.trim().is_empty() {
                continue;
            }
            if let Ok(signal) = serde_json::from_str::<EntrySignal>(&line) {
                signals.push(signal);
            }
        }
        Ok(signals)
    }

    fn io_err(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl SignalSink for JsonlSignalSink {
    fn store_entry_signal(&self, signal: &EntrySignal) -> Result<SignalId, StoreError> {
        let _guard = lock(&self.guard, "signal file")?;
        if self.read_all()?.iter().any(|s| s.id == signal.id) {
            return Ok(signal.id.clone());
        }

        let json = serde_json::to_string(signal)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_err(e))?;
        writeln!(file, "{json}").map_err(|e| self.io_err(e))?;
        file.flush().map_err(|e| self.io_err(e))?;
        Ok(signal.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trenda_core::domain::AoiClassification;

    fn zone(lower: f64, upper: f64, tradable: bool) -> AoiZone {
        let mut z = AoiZone::new(lower, upper, Timeframe::H4).unwrap();
        z.classification = if tradable {
            AoiClassification::Tradable
        } else {
            AoiClassification::Reference
        };
        z
    }

    #[test]
    fn trend_snapshot_marks_unknown() {
        let store = MemoryTrendStore::new();
        store
            .put_trend("EURUSD", Timeframe::H4, TrendDirection::Bullish, Some(1.2), Some(1.1))
            .unwrap();
        let snap = store
            .snapshot("EURUSD", &[Timeframe::H4, Timeframe::D1])
            .unwrap();
        assert_eq!(snap.get(Timeframe::H4), Some(TrendDirection::Bullish));
        assert_eq!(snap.get(Timeframe::D1), None);
        let rec = store.record("EURUSD", Timeframe::H4).unwrap().unwrap();
        assert_eq!(rec.structural_high, Some(1.2));
    }

    #[test]
    fn replace_discards_previous_set() {
        let store = MemoryAoiStore::new();
        store
            .replace("EURUSD", Timeframe::H4, &[zone(1.10, 1.11, true), zone(1.12, 1.13, false)])
            .unwrap();
        store
            .replace("EURUSD", Timeframe::H4, &[zone(1.14, 1.15, true)])
            .unwrap();
        let zones = store.zones("EURUSD", Timeframe::H4).unwrap();
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].lower, 1.14);

        store.replace("EURUSD", Timeframe::H4, &[]).unwrap();
        assert!(store.zones("EURUSD", Timeframe::H4).unwrap().is_empty());
    }

    #[test]
    fn upsert_overwrites_same_bounds() {
        let store = MemoryAoiStore::new();
        let mut z = zone(1.10, 1.11, true);
        store.upsert("EURUSD", Timeframe::H4, &[z.clone()]).unwrap();
        z.score = 9.0;
        store.upsert("EURUSD", Timeframe::H4, &[z]).unwrap();
        let zones = store.zones("EURUSD", Timeframe::H4).unwrap();
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].score, 9.0);
    }

    #[test]
    fn fetch_tradable_filters_and_scopes_symbol() {
        let store = MemoryAoiStore::new();
        store
            .replace("EURUSD", Timeframe::H4, &[zone(1.10, 1.11, true), zone(1.12, 1.13, false)])
            .unwrap();
        store
            .replace("EURUSD", Timeframe::D1, &[zone(1.05, 1.07, true)])
            .unwrap();
        store
            .replace("GBPUSD", Timeframe::H4, &[zone(1.25, 1.26, true)])
            .unwrap();
        let tradable = store.fetch_tradable("EURUSD").unwrap();
        assert_eq!(tradable.len(), 2);
        assert_eq!(tradable[0].lower, 1.10);
        assert_eq!(tradable[1].lower, 1.05);
    }

    #[test]
    fn recording_store_logs_clear_then_upsert() {
        let store = RecordingAoiStore::new();
        store.replace("EURUSD", Timeframe::H4, &[zone(1.10, 1.11, true)]).unwrap();
        store.replace("EURUSD", Timeframe::H4, &[]).unwrap();
        let ops = store.ops().unwrap();
        assert_eq!(ops.len(), 3);
        assert!(matches!(ops[0], StoreOp::Clear { .. }));
        assert!(matches!(ops[1], StoreOp::Upsert { ref zones, .. } if zones.len() == 1));
        assert!(matches!(ops[2], StoreOp::Clear { .. }));
    }
}
