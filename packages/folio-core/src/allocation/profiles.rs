//! Built-in risk profiles and loadable target tables.

use crate::types::{Allocation, AssetClass};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;
use tracing::debug;

/// Investor risk appetite, each with a target asset-class allocation.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskProfile {
    Conservative,
    #[default]
    Moderate,
    Aggressive,
}

impl RiskProfile {
    pub const ALL: [RiskProfile; 3] = [
        RiskProfile::Conservative,
        RiskProfile::Moderate,
        RiskProfile::Aggressive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskProfile::Conservative => "conservative",
            RiskProfile::Moderate => "moderate",
            RiskProfile::Aggressive => "aggressive",
        }
    }

    /// The built-in target allocation for this profile.
    pub fn target(&self) -> TargetAllocation {
        let (stock, bond, cash, description) = match self {
            RiskProfile::Conservative => (40.0, 50.0, 10.0, "Low risk, income-focused portfolio"),
            RiskProfile::Moderate => (60.0, 35.0, 5.0, "Balanced growth and income portfolio"),
            RiskProfile::Aggressive => (80.0, 15.0, 5.0, "High growth potential with higher risk"),
        };

        TargetAllocation {
            description: description.to_string(),
            targets: Allocation::new()
                .with(AssetClass::Stock, stock)
                .with(AssetClass::Bond, bond)
                .with(AssetClass::Cash, cash),
        }
    }
}

impl fmt::Display for RiskProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskProfile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "conservative" => Ok(RiskProfile::Conservative),
            "moderate" => Ok(RiskProfile::Moderate),
            "aggressive" => Ok(RiskProfile::Aggressive),
            _ => Err(Error::UnknownRiskProfile(s.to_string())),
        }
    }
}

/// Target percentages per asset class.
///
/// Serialized flat, matching the profile file layout:
/// `{"stocks": 60, "bonds": 35, "cash": 5, "description": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TargetAllocation {
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub targets: Allocation,
}

impl TargetAllocation {
    pub fn total(&self) -> f64 {
        self.targets.total()
    }

    /// Reject targets that do not sum to 100 within `tolerance`.
    pub fn validate(&self, profile: RiskProfile, tolerance: f64) -> Result<()> {
        let total = self.total();
        if (total - 100.0).abs() > tolerance {
            return Err(Error::InvalidRiskProfile {
                profile: profile.to_string(),
                total,
            });
        }
        Ok(())
    }
}

/// Built-in profile table.
pub static BUILTIN_PROFILES: LazyLock<RiskProfileTable> = LazyLock::new(RiskProfileTable::builtin);

/// Risk profile → target allocation table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct RiskProfileTable {
    profiles: BTreeMap<RiskProfile, TargetAllocation>,
}

impl Default for RiskProfileTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RiskProfileTable {
    /// The three built-in profiles.
    pub fn builtin() -> Self {
        Self {
            profiles: RiskProfile::ALL
                .iter()
                .map(|profile| (*profile, profile.target()))
                .collect(),
        }
    }

    /// Parse a JSON table. Profiles absent from the input keep their built-in targets.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let loaded: BTreeMap<RiskProfile, TargetAllocation> = serde_json::from_str(content)?;
        Ok(Self::builtin().merged(loaded))
    }

    /// Parse a TOML table with the same layout as the JSON form.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let loaded: BTreeMap<RiskProfile, TargetAllocation> = toml::from_str(content)?;
        Ok(Self::builtin().merged(loaded))
    }

    /// Load a table from disk; `.toml` files are parsed as TOML, anything else as JSON.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let table = if is_toml(path) {
            Self::from_toml_str(&content)?
        } else {
            Self::from_json_str(&content)?
        };
        debug!(path = %path.display(), "Loaded risk profiles");
        Ok(table)
    }

    /// Write the table to disk in the format implied by the extension.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = if is_toml(path) {
            toml::to_string_pretty(&self.profiles)?
        } else {
            serde_json::to_string_pretty(&self.profiles)?
        };
        fs::write(path, content)?;
        Ok(())
    }

    fn merged(mut self, loaded: BTreeMap<RiskProfile, TargetAllocation>) -> Self {
        self.profiles.extend(loaded);
        self
    }

    /// Look up a profile's targets without validating them.
    pub fn get(&self, profile: RiskProfile) -> Option<&TargetAllocation> {
        self.profiles.get(&profile)
    }

    /// Look up a profile's targets, rejecting tables that do not sum to 100.
    pub fn resolve(&self, profile: RiskProfile, tolerance: f64) -> Result<&TargetAllocation> {
        let target = self
            .get(profile)
            .ok_or_else(|| Error::UnknownRiskProfile(profile.to_string()))?;
        target.validate(profile, tolerance)?;
        Ok(target)
    }

    pub fn iter(&self) -> impl Iterator<Item = (RiskProfile, &TargetAllocation)> {
        self.profiles.iter().map(|(profile, target)| (*profile, target))
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false)
}
