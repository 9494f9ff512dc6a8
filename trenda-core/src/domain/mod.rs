//! Domain value types for trenda.

pub mod aoi;
pub mod candle;
pub mod forex;
pub mod ids;
pub mod swing;
pub mod timeframe;
pub mod trend;

pub use aoi::{AoiClassification, AoiZone, ZoneError};
pub use candle::{validate_series, Candle, CandleError};
pub use forex::{pip_size, pips_to_price, price_to_pips};
pub use ids::{OutputDigest, SignalId};
pub use swing::{SwingKind, SwingPoint};
pub use timeframe::Timeframe;
pub use trend::TrendDirection;

/// Symbol type alias
pub type Symbol = String;
