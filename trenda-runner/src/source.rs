//! Candle sources.
//!
//! A source returns the most recent `lookback` closed candles opened strictly
//! before `cutoff`, oldest first. `Ok(None)` means no data for that
//! symbol/timeframe; callers skip the unit for this cycle and try again on
//! the next one.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use trenda_core::domain::{validate_series, Candle, CandleError, Timeframe};
use trenda_core::synthetic::{random_walk, WalkParams};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: unparseable time '{value}'")]
    BadTime { row: usize, value: String },

    #[error("invalid candle data: {0}")]
    Candle(#[from] CandleError),

    #[error("source unavailable: {0}")]
    Unavailable(String),
}

pub trait CandleSource: Send + Sync {
    fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        lookback: usize,
        cutoff: DateTime<Utc>,
    ) -> Result<Option<Vec<Candle>>, SourceError>;
}

/// The last `lookback` candles opened before `cutoff`. Requires time-sorted input.
pub fn closed_window(candles: &[Candle], lookback: usize, cutoff: DateTime<Utc>) -> Vec<Candle> {
    let end = candles.partition_point(|c| c.time < cutoff);
    candles[end.saturating_sub(lookback)..end].to_vec()
}

fn window_or_none(candles: &[Candle], lookback: usize, cutoff: DateTime<Utc>) -> Option<Vec<Candle>> {
    let window = closed_window(candles, lookback, cutoff);
    (!window.is_empty()).then_some(window)
}

// ── In-memory ────────────────────────────────────────────────────────

/// Preloaded series keyed by symbol and timeframe.
#[derive(Debug, Default)]
pub struct MemorySource {
    series: RwLock<HashMap<(String, Timeframe), Vec<Candle>>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        candles: Vec<Candle>,
    ) -> Result<(), SourceError> {
        validate_series(&candles)?;
        let mut series = self
            .series
            .write()
            .map_err(|_| SourceError::Unavailable("memory source lock poisoned".into()))?;
        series.insert((symbol.to_string(), timeframe), candles);
        Ok(())
    }

    pub fn with(self, symbol: &str, timeframe: Timeframe, candles: Vec<Candle>) -> Result<Self, SourceError> {
        self.insert(symbol, timeframe, candles)?;
        Ok(self)
    }

    /// Open time of the newest candle held for one symbol/timeframe.
    pub fn latest(&self, symbol: &str, timeframe: Timeframe) -> Option<DateTime<Utc>> {
        let series = self.series.read().ok()?;
        series
            .get(&(symbol.to_string(), timeframe))
            .and_then(|candles| candles.last().map(|c| c.time))
    }
}

impl CandleSource for MemorySource {
    fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        lookback: usize,
        cutoff: DateTime<Utc>,
    ) -> Result<Option<Vec<Candle>>, SourceError> {
        let series = self
            .series
            .read()
            .map_err(|_| SourceError::Unavailable("memory source lock poisoned".into()))?;
        Ok(series
            .get(&(symbol.to_string(), timeframe))
            .and_then(|candles| window_or_none(candles, lookback, cutoff)))
    }
}

// ── CSV ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    time: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: Option<f64>,
}

fn parse_time(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(value) {
        return Some(t.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|t| t.and_utc())
}

/// Parse `time,open,high,low,close[,volume]` rows into a validated series.
pub fn read_candles<R: Read>(reader: R) -> Result<Vec<Candle>, SourceError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut candles = Vec::new();
    for (row, record) in rdr.deserialize::<CsvRow>().enumerate() {
        let record = record?;
        let time = parse_time(&record.time).ok_or_else(|| SourceError::BadTime {
            row: row + 1,
            value: record.time.clone(),
        })?;
        let candle = Candle::new(time, record.open, record.high, record.low, record.close)?;
        candles.push(match record.volume {
            Some(v) => candle.with_volume(v),
            None => candle,
        });
    }
    validate_series(&candles)?;
    Ok(candles)
}

/// Write candles in the format `read_candles` accepts (RFC 3339 times).
pub fn write_candles<W: Write>(writer: W, candles: &[Candle]) -> Result<(), SourceError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for c in candles {
        wtr.serialize(CsvRow {
            time: c.time.to_rfc3339(),
            open: c.open,
            high: c.high,
            low: c.low,
            close: c.close,
            volume: c.volume,
        })?;
    }
    wtr.flush().map_err(|e| SourceError::Io {
        path: PathBuf::from("<writer>"),
        source: e,
    })?;
    Ok(())
}

/// `{dir}/{SYMBOL}_{TF}.csv`, e.g. `EURUSD_4H.csv`.
pub fn csv_path(dir: &Path, symbol: &str, timeframe: Timeframe) -> PathBuf {
    dir.join(format!("{symbol}_{}.csv", timeframe.label()))
}

/// CSV files in one directory, parsed on first use and cached.
#[derive(Debug)]
pub struct CsvSource {
    dir: PathBuf,
    cache: MemorySource,
}

impl CsvSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: MemorySource::new(),
        }
    }

    /// Load a file into the cache. Missing files are not an error.
    fn ensure_loaded(&self, symbol: &str, timeframe: Timeframe) -> Result<(), SourceError> {
        let loaded = self
            .cache
            .series
            .read()
            .map(|s| s.contains_key(&(symbol.to_string(), timeframe)))
            .unwrap_or(false);
        if loaded {
            return Ok(());
        }
        let path = csv_path(&self.dir, symbol, timeframe);
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(SourceError::Io { path, source: e }),
        };
        let candles = read_candles(file)?;
        debug!(symbol, timeframe = %timeframe, rows = candles.len(), path = %path.display(), "loaded csv");
        self.cache.insert(symbol, timeframe, candles)
    }

    pub fn latest(&self, symbol: &str, timeframe: Timeframe) -> Result<Option<DateTime<Utc>>, SourceError> {
        self.ensure_loaded(symbol, timeframe)?;
        Ok(self.cache.latest(symbol, timeframe))
    }
}

impl CandleSource for CsvSource {
    fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        lookback: usize,
        cutoff: DateTime<Utc>,
    ) -> Result<Option<Vec<Candle>>, SourceError> {
        self.ensure_loaded(symbol, timeframe)?;
        self.cache.fetch(symbol, timeframe, lookback, cutoff)
    }
}

// ── Synthetic ────────────────────────────────────────────────────────

/// Seeded random walks that always end right before the cutoff. For demos.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    pub seed: u64,
    pub params: WalkParams,
}

impl SyntheticSource {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            params: WalkParams::default(),
        }
    }
}

impl CandleSource for SyntheticSource {
    fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        lookback: usize,
        cutoff: DateTime<Utc>,
    ) -> Result<Option<Vec<Candle>>, SourceError> {
        let candles = random_walk(self.seed, symbol, timeframe, cutoff, lookback, &self.params);
        Ok((!candles.is_empty()).then_some(candles))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn hourly(n: usize) -> Vec<Candle> {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| {
                let p = 1.1 + i as f64 * 0.0001;
                Candle::new(base + Duration::hours(i as i64), p, p + 0.0005, p - 0.0005, p).unwrap()
            })
            .collect()
    }

    #[test]
    fn window_excludes_forming_candle() {
        let candles = hourly(10);
        let cutoff = candles[6].time;
        let w = closed_window(&candles, 3, cutoff);
        assert_eq!(w.len(), 3);
        assert_eq!(w.last().unwrap().time, candles[5].time);
        assert!(closed_window(&candles, 3, candles[0].time).is_empty());
    }

    #[test]
    fn memory_source_none_when_missing() {
        let src = MemorySource::new().with("EURUSD", Timeframe::H1, hourly(5)).unwrap();
        let cutoff = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(src.fetch("EURUSD", Timeframe::H1, 3, cutoff).unwrap().unwrap().len(), 3);
        assert!(src.fetch("GBPUSD", Timeframe::H1, 3, cutoff).unwrap().is_none());
        assert!(src.fetch("EURUSD", Timeframe::H4, 3, cutoff).unwrap().is_none());
    }

    #[test]
    fn memory_source_rejects_unsorted_series() {
        let mut candles = hourly(3);
        candles.swap(0, 2);
        assert!(MemorySource::new().insert("EURUSD", Timeframe::H1, candles).is_err());
    }

    #[test]
    fn csv_accepts_both_time_formats() {
        let text = "time,open,high,low,close,volume\n\
                    2024-01-01T00:00:00Z,1.1,1.2,1.0,1.15,100\n\
                    2024-01-01 01:00:00,1.15,1.2,1.1,1.12,\n";
        let candles = read_candles(text.as_bytes()).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].volume, Some(100.0));
        assert_eq!(candles[1].volume, None);
        assert_eq!(candles[1].time, Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap());
    }

    #[test]
    fn csv_bad_time_reports_row() {
        let text = "time,open,high,low,close\nyesterday,1.1,1.2,1.0,1.15\n";
        match read_candles(text.as_bytes()) {
            Err(SourceError::BadTime { row, value }) => {
                assert_eq!(row, 1);
                assert_eq!(value, "yesterday");
            }
            other => panic!("expected BadTime, got {other:?}"),
        }
    }

    #[test]
    fn csv_write_then_read_preserves_series() {
        let candles = hourly(4);
        let mut buf = Vec::new();
        write_candles(&mut buf, &candles).unwrap();
        assert_eq!(read_candles(buf.as_slice()).unwrap(), candles);
    }

    #[test]
    fn csv_source_reads_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = File::create(csv_path(dir.path(), "EURUSD", Timeframe::H1)).unwrap();
        write_candles(file, &hourly(6)).unwrap();

        let src = CsvSource::new(dir.path());
        let cutoff = Utc.with_ymd_and_hms(2024, 1, 1, 4, 0, 0).unwrap();
        let got = src.fetch("EURUSD", Timeframe::H1, 10, cutoff).unwrap().unwrap();
        assert_eq!(got.len(), 4);
        assert!(src.fetch("USDJPY", Timeframe::H1, 10, cutoff).unwrap().is_none());
    }

    #[test]
    fn synthetic_source_ends_before_cutoff() {
        let src = SyntheticSource::new(9);
        let cutoff = Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap();
        let candles = src.fetch("EURUSD", Timeframe::D1, 50, cutoff).unwrap().unwrap();
        assert_eq!(candles.len(), 50);
        assert!(candles.iter().all(|c| c.time < cutoff));
    }
}
