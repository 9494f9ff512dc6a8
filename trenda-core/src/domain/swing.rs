//! Swing points: local extrema of a candle series.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwingKind {
    High,
    Low,
}

impl SwingKind {
    pub fn opposite(self) -> Self {
        match self {
            SwingKind::High => SwingKind::Low,
            SwingKind::Low => SwingKind::High,
        }
    }
}

/// A swing high or low. `index` is the position in the analysed candle sequence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwingPoint {
    pub index: usize,
    pub price: f64,
    pub kind: SwingKind,
}

impl SwingPoint {
    pub fn high(index: usize, price: f64) -> Self {
        Self {
            index,
            price,
            kind: SwingKind::High,
        }
    }

    pub fn low(index: usize, price: f64) -> Self {
        Self {
            index,
            price,
            kind: SwingKind::Low,
        }
    }
}
