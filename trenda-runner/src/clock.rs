//! Decision clock.
//!
//! Every cycle asks the clock for "now" and derives a per-timeframe cutoff
//! from it: only candles opened strictly before the cutoff are closed and may
//! be analysed. Live runs use the system time; replay uses a cursor that the
//! harness advances, so both paths share the same cutoff logic.

use chrono::{DateTime, Utc};
use std::sync::RwLock;

use trenda_core::domain::Timeframe;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Open time of the forming candle on `timeframe`; candles opened before it are closed.
    fn cutoff(&self, timeframe: Timeframe) -> DateTime<Utc> {
        timeframe.last_close(self.now())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Historical cursor for replay and tests.
#[derive(Debug)]
pub struct ReplayClock {
    cursor: RwLock<DateTime<Utc>>,
}

impl ReplayClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            cursor: RwLock::new(start),
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        match self.cursor.write() {
            Ok(mut cursor) => *cursor = at,
            Err(poisoned) => *poisoned.into_inner() = at,
        }
    }
}

impl Clock for ReplayClock {
    fn now(&self) -> DateTime<Utc> {
        match self.cursor.read() {
            Ok(cursor) => *cursor,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
