//! Trenda Runner: analysis cycles, collaborators, replay.
//!
//! This crate builds on `trenda-core` to provide:
//! - Candle sources (in-memory, CSV directory, synthetic) behind one trait
//! - Trend and AOI stores plus signal sinks (in-memory, JSONL)
//! - A decision clock shared by live runs and replay
//! - Trend, AOI and entry cycles fanned out over symbols
//! - Signal gates and the execution gate with a persistent trading lock
//! - A replay harness with an output digest for determinism checks
//! - TOML run configuration with a content fingerprint

pub mod clock;
pub mod config;
pub mod cycle;
pub mod execution;
pub mod gates;
pub mod replay;
pub mod source;
pub mod store;

pub use clock::{Clock, ReplayClock, SystemClock};
pub use config::{ConfigError, RunConfig};
pub use cycle::{CycleContext, CycleError, CycleKind, CycleReport, UnitOutcome, UnitReport};
pub use execution::{
    ExecutionGate, FileLock, LockError, LockRecord, LockStatus, MemoryLock, MemoryPositionBook,
    PositionBook, TradingLock, Verdict,
};
pub use gates::{GateConfig, GateInput, GateRejection, GateSet, SignalGate};
pub use replay::{replay, ReplayReport};
pub use source::{closed_window, CandleSource, CsvSource, MemorySource, SourceError, SyntheticSource};
pub use store::{
    AoiStore, JsonlSignalSink, MemoryAoiStore, MemorySignalSink, MemoryTrendStore,
    RecordingAoiStore, SignalSink, StoreError, StoreOp, TrendStore,
};
