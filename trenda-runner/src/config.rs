//! Serializable run configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use trenda_core::domain::{OutputDigest, Timeframe};
use trenda_core::fingerprint::{digest, FingerprintError};
use trenda_core::settings::{AnalysisParams, AoiSettings, EntryConfig, SettingsError, SettingsTable};

use crate::gates::GateConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Everything needed to reproduce a run.
///
/// Empty `analysis` and `aoi` tables fall back to the built-in settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub symbols: Vec<String>,
    /// Timeframes whose trend cycle runs, lowest first.
    pub trend_timeframes: Vec<Timeframe>,
    /// Timeframes whose trends decide the entry direction, lowest first.
    pub alignment: Vec<Timeframe>,
    pub entry_timeframe: Timeframe,
    pub data_dir: PathBuf,
    pub signal_file: PathBuf,
    pub lock_file: PathBuf,
    /// Seed for synthetic candles when no data directory is used.
    pub seed: u64,
    pub parallel: bool,
    pub gates: GateConfig,
    pub entry: EntryConfig,
    pub analysis: Vec<AnalysisParams>,
    pub aoi: Vec<AoiSettings>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            symbols: vec!["EURUSD".into(), "GBPUSD".into(), "USDJPY".into()],
            trend_timeframes: Timeframe::ALL.to_vec(),
            alignment: vec![Timeframe::H4, Timeframe::D1, Timeframe::W1],
            entry_timeframe: Timeframe::H1,
            data_dir: PathBuf::from("data"),
            signal_file: PathBuf::from("signals.jsonl"),
            lock_file: PathBuf::from("trading.lock"),
            seed: 42,
            parallel: true,
            gates: GateConfig::default(),
            entry: EntryConfig::default(),
            analysis: Vec::new(),
            aoi: Vec::new(),
        }
    }
}

impl RunConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&text)
    }

    /// Settings table from the inline tables, or the defaults when both are empty.
    pub fn settings_table(&self) -> Result<SettingsTable, SettingsError> {
        if self.analysis.is_empty() && self.aoi.is_empty() {
            return Ok(SettingsTable::default());
        }
        SettingsTable::new(self.analysis.clone(), self.aoi.clone())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbols.is_empty() {
            return Err(ConfigError::Invalid("no symbols configured".into()));
        }
        if self.alignment.is_empty() {
            return Err(ConfigError::Invalid("alignment timeframes are empty".into()));
        }
        let table = self.settings_table()?;
        table.analysis(self.entry_timeframe)?;
        for tf in &self.trend_timeframes {
            table.analysis(*tf)?;
        }
        Ok(())
    }

    /// Content hash of the configuration; identical configs share it.
    pub fn fingerprint(&self) -> Result<OutputDigest, FingerprintError> {
        digest(self)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
