//! Content fingerprints for determinism checks.
//!
//! A fingerprint is the BLAKE3 hash of a value's canonical JSON. Maps inside
//! hashed values are `BTreeMap`s, so key order (and therefore the hash) is
//! stable across runs and machines.

use serde::Serialize;
use thiserror::Error;

use crate::domain::OutputDigest;
use crate::settings::{EntryConfig, SettingsTable};

#[derive(Debug, Error)]
#[error("failed to serialize value for fingerprinting: {0}")]
pub struct FingerprintError(#[from] serde_json::Error);

/// Digest of any serializable value.
pub fn digest<T: Serialize + ?Sized>(value: &T) -> Result<OutputDigest, FingerprintError> {
    let json = serde_json::to_vec(value)?;
    Ok(OutputDigest::from_bytes(&json))
}

/// Identity of the analysis parameters: two runs with the same settings
/// digest see the same swing, zone and entry thresholds.
pub fn settings_digest(
    settings: &SettingsTable,
    entry: &EntryConfig,
) -> Result<OutputDigest, FingerprintError> {
    #[derive(Serialize)]
    struct Canonical<'a> {
        settings: &'a SettingsTable,
        entry: &'a EntryConfig,
    }
    digest(&Canonical { settings, entry })
}
