use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Content hash of an analysis output (BLAKE3 hex).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputDigest(pub String);

impl OutputDigest {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes).to_hex().to_string())
    }
}

impl fmt::Display for OutputDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Deterministic entry-signal ID (symbol + signal time + zone bounds).
///
/// The same pattern seen live and in replay gets the same ID, which lets
/// downstream consumers deduplicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SignalId(pub String);

impl SignalId {
    pub fn derive(symbol: &str, signal_time: DateTime<Utc>, lower: f64, upper: f64) -> Self {
        use serde_json::json;

        let canonical = json!({
            "lower": lower,
            "signal_time": signal_time.to_rfc3339(),
            "symbol": symbol,
            "upper": upper,
        });
        let hash = blake3::hash(canonical.to_string().as_bytes());
        // 16 hex chars is plenty for per-symbol uniqueness.
        Self(hash.to_hex()[..16].to_string())
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn signal_id_deterministic() {
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let a = SignalId::derive("EURUSD", t, 1.1, 1.102);
        let b = SignalId::derive("EURUSD", t, 1.1, 1.102);
        assert_eq!(a, b);
        assert_eq!(a.0.len(), 16);
    }

    #[test]
    fn signal_id_differs_by_symbol() {
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        assert_ne!(
            SignalId::derive("EURUSD", t, 1.1, 1.102),
            SignalId::derive("GBPUSD", t, 1.1, 1.102)
        );
    }

    #[test]
    fn signal_id_differs_by_zone() {
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let id = SignalId::derive("EURUSD", t, 1.1, 1.102);
        assert_ne!(id, SignalId::derive("EURUSD", t, 1.1, 1.103));
        assert_ne!(id, SignalId::derive("EURUSD", t, 1.099, 1.102));
        assert_ne!(id, SignalId::derive("EURUSD", t + chrono::Duration::hours(1), 1.1, 1.102));
    }

    #[test]
    fn digest_is_hex() {
        let d = OutputDigest::from_bytes(b"zones");
        assert_eq!(d.0.len(), 64);
        assert!(d.0.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
