//! Execution gate: the last check between a stored signal and an order.
//!
//! A persistent trading lock pauses all execution after a critical failure
//! and survives restarts until it expires or is cleared. Separately, at most
//! one position may be open per symbol. Either rejection is a verdict, not
//! an error; only lock I/O can fail.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use trenda_core::entry::EntrySignal;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("I/O error on lock file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("lock serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("lock state poisoned")]
    Poisoned,
}

/// Contents of an active lock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockRecord {
    pub reason: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl LockRecord {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |exp| now < exp)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LockStatus {
    Unlocked,
    Locked(LockRecord),
}

impl LockStatus {
    pub fn is_locked(&self) -> bool {
        matches!(self, LockStatus::Locked(_))
    }
}

pub trait TradingLock: Send + Sync {
    fn acquire(
        &self,
        reason: &str,
        now: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), LockError>;

    fn release(&self) -> Result<(), LockError>;

    /// Expired locks report `Unlocked`.
    fn status(&self, now: DateTime<Utc>) -> Result<LockStatus, LockError>;
}

/// Lock persisted as a JSON file. An unreadable file counts as locked.
#[derive(Debug, Clone)]
pub struct FileLock {
    path: PathBuf,
}

impl FileLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: io::Error) -> LockError {
        LockError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl TradingLock for FileLock {
    fn acquire(
        &self,
        reason: &str,
        now: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), LockError> {
        let record = LockRecord {
            reason: reason.to_string(),
            created_at: now,
            expires_at,
        };
        let json = serde_json::to_string_pretty(&record)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }
        fs::write(&self.path, json).map_err(|e| self.io_err(e))?;
        warn!(path = %self.path.display(), reason, "trading lock acquired");
        Ok(())
    }

    fn release(&self) -> Result<(), LockError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "trading lock released");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_err(e)),
        }
    }

    fn status(&self, now: DateTime<Utc>) -> Result<LockStatus, LockError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(LockStatus::Unlocked),
            Err(e) => return Err(self.io_err(e)),
        };
        match serde_json::from_str::<LockRecord>(&text) {
            Ok(record) if record.is_active(now) => Ok(LockStatus::Locked(record)),
            Ok(_) => Ok(LockStatus::Unlocked),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "corrupt lock file treated as locked");
                Ok(LockStatus::Locked(LockRecord {
                    reason: format!("corrupt lock file: {e}"),
                    created_at: now,
                    expires_at: None,
                }))
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryLock {
    record: Mutex<Option<LockRecord>>,
}

impl MemoryLock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TradingLock for MemoryLock {
    fn acquire(
        &self,
        reason: &str,
        now: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), LockError> {
        *self.record.lock().map_err(|_| LockError::Poisoned)? = Some(LockRecord {
            reason: reason.to_string(),
            created_at: now,
            expires_at,
        });
        Ok(())
    }

    fn release(&self) -> Result<(), LockError> {
        *self.record.lock().map_err(|_| LockError::Poisoned)? = None;
        Ok(())
    }

    fn status(&self, now: DateTime<Utc>) -> Result<LockStatus, LockError> {
        let record = self.record.lock().map_err(|_| LockError::Poisoned)?;
        Ok(match record.as_ref() {
            Some(r) if r.is_active(now) => LockStatus::Locked(r.clone()),
            _ => LockStatus::Unlocked,
        })
    }
}

// ── Positions ────────────────────────────────────────────────────────

pub trait PositionBook: Send + Sync {
    fn has_open_position(&self, symbol: &str) -> bool;
}

#[derive(Debug, Default)]
pub struct MemoryPositionBook {
    open: Mutex<BTreeSet<String>>,
}

impl MemoryPositionBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self, symbol: &str) {
        if let Ok(mut open) = self.open.lock() {
            open.insert(symbol.to_string());
        }
    }

    pub fn close(&self, symbol: &str) {
        if let Ok(mut open) = self.open.lock() {
            open.remove(symbol);
        }
    }
}

impl PositionBook for MemoryPositionBook {
    fn has_open_position(&self, symbol: &str) -> bool {
        self.open
            .lock()
            .map(|open| open.contains(symbol))
            .unwrap_or(true)
    }
}

// ── Gate ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Admitted,
    TradingPaused(String),
    PositionAlreadyOpen,
}

pub struct ExecutionGate<'a> {
    lock: &'a dyn TradingLock,
    positions: &'a dyn PositionBook,
}

impl<'a> ExecutionGate<'a> {
    pub fn new(lock: &'a dyn TradingLock, positions: &'a dyn PositionBook) -> Self {
        Self { lock, positions }
    }

    /// Lock first, then the per-symbol position check.
    pub fn admit(&self, signal: &EntrySignal, now: DateTime<Utc>) -> Result<Verdict, LockError> {
        if let LockStatus::Locked(record) = self.lock.status(now)? {
            info!(symbol = %signal.symbol, id = %signal.id, reason = %record.reason, "signal held: trading paused");
            return Ok(Verdict::TradingPaused(record.reason));
        }
        if self.positions.has_open_position(&signal.symbol) {
            info!(symbol = %signal.symbol, id = %signal.id, "signal held: position already open");
            return Ok(Verdict::PositionAlreadyOpen);
        }
        Ok(Verdict::Admitted)
    }
}
