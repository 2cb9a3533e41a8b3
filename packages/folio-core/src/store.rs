//! Portfolio snapshot persistence.
//!
//! The engine itself never touches disk; this store is the collaborator that
//! keeps holdings and recorded prices in a JSON file and hands them over as a
//! [`MetricsRequest`].

use crate::allocation::RiskProfile;
use crate::metrics::MetricsRequest;
use crate::types::{Holding, PriceHistory, PricePoint};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Holdings and price history of one portfolio.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PortfolioSnapshot {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub risk_profile: RiskProfile,
    #[serde(default)]
    pub holdings: Vec<Holding>,
    /// Chronological price points per symbol
    #[serde(default)]
    pub prices: PriceHistory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl PortfolioSnapshot {
    pub fn new(name: &str, risk_profile: RiskProfile) -> Self {
        Self {
            name: name.to_string(),
            risk_profile,
            ..Default::default()
        }
    }

    /// A metrics request for this snapshot under its own risk profile.
    pub fn request(&self) -> MetricsRequest<'_> {
        self.request_with(self.risk_profile)
    }

    /// A metrics request for this snapshot under another risk profile.
    pub fn request_with(&self, profile: RiskProfile) -> MetricsRequest<'_> {
        MetricsRequest::new(&self.holdings, &self.prices, profile)
    }
}

/// Portfolio store that manages holdings and persists to JSON.
#[derive(Debug)]
pub struct PortfolioStore {
    /// Path to the snapshot JSON file
    path: PathBuf,
    /// In-memory snapshot
    snapshot: PortfolioSnapshot,
}

impl PortfolioStore {
    /// Open the store at the default path.
    ///
    /// Default path: `~/.folio/portfolio.json`
    /// Can be overridden with `FOLIO_PORTFOLIO_FILE` environment variable.
    pub fn new() -> Result<Self> {
        Self::with_path(Self::default_path())
    }

    /// Open the store at a custom path. A missing file starts an empty snapshot;
    /// a file holding an invalid holding is rejected.
    pub fn with_path(path: PathBuf) -> Result<Self> {
        let snapshot = Self::load_from_path(&path)?;
        Ok(Self { path, snapshot })
    }

    /// Create an in-memory store (no persistence).
    pub fn in_memory() -> Self {
        Self {
            path: PathBuf::new(),
            snapshot: PortfolioSnapshot::default(),
        }
    }

    /// Get the default snapshot file path.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = env::var("FOLIO_PORTFOLIO_FILE") {
            return PathBuf::from(path);
        }

        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(".folio/portfolio.json"))
            .unwrap_or_else(|| PathBuf::from("portfolio.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_from_path(path: &Path) -> Result<PortfolioSnapshot> {
        if !path.exists() {
            return Ok(PortfolioSnapshot::default());
        }

        let content = fs::read_to_string(path)?;
        let snapshot: PortfolioSnapshot = serde_json::from_str(&content)?;
        for holding in &snapshot.holdings {
            holding.validate()?;
        }
        debug!(
            path = %path.display(),
            holdings = snapshot.holdings.len(),
            "Loaded portfolio snapshot"
        );
        Ok(snapshot)
    }

    /// Save the current snapshot to disk.
    pub fn save(&mut self) -> Result<()> {
        // Skip if in-memory only
        if self.path.as_os_str().is_empty() {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        if self.snapshot.created_at.is_none() {
            self.snapshot.created_at = Some(Utc::now());
        }
        self.snapshot.updated_at = Some(Utc::now());

        let content = serde_json::to_string_pretty(&self.snapshot)?;
        fs::write(&self.path, content)?;
        Ok(())
    }

    /// Reload the snapshot from disk.
    pub fn reload(&mut self) -> Result<()> {
        self.snapshot = Self::load_from_path(&self.path)?;
        Ok(())
    }

    pub fn get(&self) -> &PortfolioSnapshot {
        &self.snapshot
    }

    pub fn get_mut(&mut self) -> &mut PortfolioSnapshot {
        &mut self.snapshot
    }

    pub fn holdings(&self) -> &[Holding] {
        &self.snapshot.holdings
    }

    /// Find a holding by symbol (case-insensitive).
    pub fn find_holding(&self, symbol: &str) -> Option<&Holding> {
        let symbol_upper = symbol.trim().to_uppercase();
        self.snapshot
            .holdings
            .iter()
            .find(|h| h.symbol == symbol_upper)
    }

    /// Add a holding, or merge it into an existing one for the same symbol.
    ///
    /// Merging applies cost averaging:
    /// - New quantity = old quantity + added quantity
    /// - New cost basis = (old_qty * old_cost + added_qty * added_cost) / new quantity
    ///
    /// The existing asset class is kept and a sector is only filled in when
    /// missing. Returns the resulting
    /// holding and whether it was an update (true) or add (false).
    pub fn add_holding(&mut self, holding: Holding) -> Result<(Holding, bool)> {
        holding.validate()?;

        let Some(idx) = self
            .snapshot
            .holdings
            .iter()
            .position(|h| h.symbol == holding.symbol)
        else {
            info!(symbol = %holding.symbol, quantity = holding.quantity, "Added holding");
            self.snapshot.holdings.push(holding.clone());
            return Ok((holding, false));
        };

        let existing = &mut self.snapshot.holdings[idx];

        let total_quantity = existing.quantity + holding.quantity;
        if total_quantity > 0.0 {
            existing.cost_basis = (existing.total_cost() + holding.total_cost()) / total_quantity;
        } else {
            existing.cost_basis = holding.cost_basis;
        }
        existing.quantity = total_quantity;
        if existing.sector.is_none() {
            existing.sector = holding.sector;
        }

        info!(symbol = %existing.symbol, quantity = existing.quantity, "Updated holding");
        Ok((existing.clone(), true))
    }

    /// Remove a holding by symbol.
    pub fn remove_holding(&mut self, symbol: &str) -> Result<Holding> {
        let symbol_upper = symbol.trim().to_uppercase();

        if let Some(idx) = self
            .snapshot
            .holdings
            .iter()
            .position(|h| h.symbol == symbol_upper)
        {
            Ok(self.snapshot.holdings.remove(idx))
        } else {
            Err(Error::HoldingNotFound(symbol_upper))
        }
    }

    /// Record a price point, keeping the symbol's history chronological.
    ///
    /// A point at an already-recorded timestamp replaces the old one.
    pub fn record_price(
        &mut self,
        symbol: &str,
        timestamp: DateTime<Utc>,
        price: f64,
    ) -> Result<()> {
        if !price.is_finite() || price <= 0.0 {
            return Err(Error::InvalidHolding(format!(
                "{symbol}: price must be positive, got {price}"
            )));
        }

        let point = PricePoint::new(symbol, timestamp, price);
        let series = self.snapshot.prices.entry(point.symbol.clone()).or_default();

        match series.binary_search_by(|p| p.timestamp.cmp(&timestamp)) {
            Ok(idx) => series[idx] = point,
            Err(idx) => series.insert(idx, point),
        }
        Ok(())
    }

    /// Recorded prices for a symbol (empty when none).
    pub fn price_history(&self, symbol: &str) -> &[PricePoint] {
        self.snapshot
            .prices
            .get(&symbol.trim().to_uppercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn set_risk_profile(&mut self, profile: RiskProfile) {
        self.snapshot.risk_profile = profile;
    }
}
