//! Engine parameters and application configuration.

use crate::allocation::{RiskProfile, RiskProfileTable, DEFAULT_DRIFT_THRESHOLD_PCT};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Tunable parameters of the metrics engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Drift in percentage points tolerated before a rebalance directive is emitted
    pub drift_threshold_pct: f64,
    /// Risk-free rate per return period, subtracted in the Sharpe-like ratio
    pub risk_free_rate: f64,
    /// Return periods per year, used to annualize volatility
    pub periods_per_year: u32,
    /// Allowed deviation from 100 when validating risk profile targets
    pub profile_tolerance: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            drift_threshold_pct: DEFAULT_DRIFT_THRESHOLD_PCT,
            risk_free_rate: 0.0,
            periods_per_year: 252,
            profile_tolerance: 0.01,
        }
    }
}

/// Application configuration, stored as TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Profile used when a request does not name one
    pub default_profile: RiskProfile,
    /// Optional JSON or TOML file overriding the built-in profile targets
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_profiles_path: Option<PathBuf>,
    /// Optional portfolio snapshot file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portfolio_path: Option<PathBuf>,
    pub engine: EngineConfig,
}

impl AppConfig {
    /// Get the default config file path.
    ///
    /// Default path: `~/.folio/config.toml`
    /// Can be overridden with `FOLIO_CONFIG_FILE` environment variable.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = env::var("FOLIO_CONFIG_FILE") {
            return PathBuf::from(path);
        }

        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(".folio/config.toml"))
            .unwrap_or_else(|| PathBuf::from("folio.toml"))
    }

    /// Load config from the default path.
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::default_path())
    }

    /// Load config from a specific path. A missing file yields the defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Save config to a specific path.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// The profile table: the configured file if any, else the built-in one.
    pub fn risk_profiles(&self) -> Result<RiskProfileTable> {
        match &self.risk_profiles_path {
            Some(path) => RiskProfileTable::load_from_path(path),
            None => Ok(RiskProfileTable::builtin()),
        }
    }
}
