//! Core data types for the folio metrics engine.

use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Chronological price points keyed by symbol.
pub type PriceHistory = BTreeMap<String, Vec<PricePoint>>;

/// Categorical grouping used for allocation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    #[serde(alias = "stocks", alias = "equity")]
    Stock,
    #[serde(alias = "bonds")]
    Bond,
    Cash,
}

impl AssetClass {
    /// All asset classes in reporting order.
    pub const ALL: [AssetClass; 3] = [AssetClass::Stock, AssetClass::Bond, AssetClass::Cash];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetClass::Stock => "stock",
            AssetClass::Bond => "bond",
            AssetClass::Cash => "cash",
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetClass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "stock" | "stocks" | "equity" => Ok(AssetClass::Stock),
            "bond" | "bonds" => Ok(AssetClass::Bond),
            "cash" => Ok(AssetClass::Cash),
            other => Err(Error::InvalidHolding(format!("unknown asset class '{other}'"))),
        }
    }
}

/// A position in one asset within a portfolio.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Holding {
    /// Ticker symbol (uppercase)
    pub symbol: String,
    /// Number of units held
    pub quantity: f64,
    /// Cost basis per unit
    pub cost_basis: f64,
    /// Asset class used for allocation
    pub asset_class: AssetClass,
    /// Optional sector label used for concentration reporting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    /// Optional purchase date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_date: Option<NaiveDate>,
}

impl Holding {
    /// Create a new holding. The symbol is normalized to uppercase.
    pub fn new(symbol: &str, quantity: f64, cost_basis: f64, asset_class: AssetClass) -> Self {
        Self {
            symbol: symbol.trim().to_uppercase(),
            quantity,
            cost_basis,
            asset_class,
            sector: None,
            purchase_date: None,
        }
    }

    /// Create a holding, rejecting empty symbols, negative quantities and
    /// non-positive cost bases.
    pub fn try_new(
        symbol: &str,
        quantity: f64,
        cost_basis: f64,
        asset_class: AssetClass,
    ) -> Result<Self> {
        let holding = Self::new(symbol, quantity, cost_basis, asset_class);
        holding.validate()?;
        Ok(holding)
    }

    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = Some(sector.into());
        self
    }

    pub fn with_purchase_date(mut self, date: NaiveDate) -> Self {
        self.purchase_date = Some(date);
        self
    }

    /// Check the holding invariants.
    pub fn validate(&self) -> Result<()> {
        if self.symbol.is_empty() {
            return Err(Error::InvalidHolding("symbol must not be empty".to_string()));
        }
        if !self.quantity.is_finite() || self.quantity < 0.0 {
            return Err(Error::InvalidHolding(format!(
                "{}: quantity must be non-negative, got {}",
                self.symbol, self.quantity
            )));
        }
        if !self.cost_basis.is_finite() || self.cost_basis <= 0.0 {
            return Err(Error::InvalidHolding(format!(
                "{}: cost basis must be positive, got {}",
                self.symbol, self.cost_basis
            )));
        }
        Ok(())
    }

    /// Total cost of this holding.
    pub fn total_cost(&self) -> f64 {
        self.quantity * self.cost_basis
    }
}

/// A recorded market price for a symbol.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricePoint {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

impl PricePoint {
    pub fn new(symbol: &str, timestamp: DateTime<Utc>, price: f64) -> Self {
        Self {
            symbol: symbol.trim().to_uppercase(),
            timestamp,
            price,
        }
    }
}

/// Portfolio value at a point in time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ValuePoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Valuation of a single holding at its latest price.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HoldingValuation {
    pub symbol: String,
    pub asset_class: AssetClass,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    pub quantity: f64,
    /// Latest price used for the valuation
    pub price: f64,
    /// quantity * price
    pub market_value: f64,
    /// quantity * cost basis
    pub cost: f64,
    /// Unrealized gain/loss in currency units
    pub gain_loss: f64,
    /// Unrealized gain/loss percentage (0 when cost is 0)
    pub gain_loss_percent: f64,
}

/// Valuation of a set of holdings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Valuation {
    /// Holdings that had a latest price, in input order
    pub holdings: Vec<HoldingValuation>,
    pub total_value: f64,
    pub total_cost: f64,
    pub total_gain_loss: f64,
    pub total_gain_loss_percent: f64,
    /// Symbols excluded from totals because no latest price was available
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<String>,
    /// Symbols excluded from totals because the holding failed validation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub invalid: Vec<String>,
}

/// Allocation percentages per asset class.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Allocation(BTreeMap<AssetClass, f64>);

impl Allocation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Percentage for an asset class (0 when absent).
    pub fn get(&self, class: AssetClass) -> f64 {
        self.0.get(&class).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, class: AssetClass, pct: f64) {
        self.0.insert(class, pct);
    }

    pub fn with(mut self, class: AssetClass, pct: f64) -> Self {
        self.set(class, pct);
        self
    }

    /// Sum of all percentages.
    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AssetClass, f64)> + '_ {
        self.0.iter().map(|(class, pct)| (*class, *pct))
    }
}

impl FromIterator<(AssetClass, f64)> for Allocation {
    fn from_iter<T: IntoIterator<Item = (AssetClass, f64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Rebalance direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RebalanceAction {
    Buy,
    Sell,
}

/// A suggested buy/sell action to reduce drift for one asset class.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RebalanceDirective {
    pub asset_class: AssetClass,
    pub action: RebalanceAction,
    /// Absolute drift in percentage points
    pub magnitude_pct: f64,
}

/// How concentrated the portfolio is in its largest sector.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConcentrationLevel {
    Low,
    Medium,
    High,
}

/// What an advisory recommendation is about.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RecommendationKind {
    Rebalance,
    Diversification,
}

/// Urgency of an advisory recommendation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// Free-form advice next to the numeric rebalance directives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub message: String,
    pub priority: Priority,
}

/// Return metrics for a single symbol's price history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SymbolMetrics {
    pub symbol: String,
    pub returns: Vec<f64>,
    pub volatility: f64,
    /// `None` when volatility is zero
    pub sharpe_like: Option<f64>,
}

/// Everything the engine derives for one request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricsResult {
    pub risk_profile: String,
    pub valuation: Valuation,
    /// Portfolio value over the timestamps common to all valued holdings
    pub value_series: Vec<ValuePoint>,
    /// Period-over-period returns of `value_series`
    pub returns: Vec<f64>,
    /// Arithmetic mean of `returns` (0 when there are none)
    pub mean_return: f64,
    /// Sample standard deviation of `returns`
    pub volatility: f64,
    pub annualized_volatility: f64,
    /// `None` when volatility is zero
    pub sharpe_like: Option<f64>,
    pub symbols: Vec<SymbolMetrics>,
    pub allocation: Allocation,
    pub target_allocation: Allocation,
    pub directives: Vec<RebalanceDirective>,
    pub sector_allocation: BTreeMap<String, f64>,
    pub concentration: ConcentrationLevel,
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// API response wrapper used by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create an error response.
    pub fn err(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_holding_new_normalizes_symbol() {
        let holding = Holding::new(" aapl ", 10.0, 150.0, AssetClass::Stock);
        assert_eq!(holding.symbol, "AAPL");
        assert_eq!(holding.total_cost(), 1500.0);
        assert!(holding.sector.is_none());
    }

    #[test]
    fn test_holding_validation() {
        assert!(Holding::try_new("AAPL", 0.0, 1.0, AssetClass::Stock).is_ok());
        assert!(matches!(
            Holding::try_new("AAPL", -1.0, 1.0, AssetClass::Stock),
            Err(Error::InvalidHolding(_))
        ));
        assert!(matches!(
            Holding::try_new("AAPL", 1.0, 0.0, AssetClass::Stock),
            Err(Error::InvalidHolding(_))
        ));
        assert!(matches!(
            Holding::try_new("  ", 1.0, 1.0, AssetClass::Stock),
            Err(Error::InvalidHolding(_))
        ));
    }

    #[test]
    fn test_asset_class_parsing() {
        assert_eq!("Stocks".parse::<AssetClass>().unwrap(), AssetClass::Stock);
        assert_eq!("bond".parse::<AssetClass>().unwrap(), AssetClass::Bond);
        assert_eq!("CASH".parse::<AssetClass>().unwrap(), AssetClass::Cash);
        assert!("gold".parse::<AssetClass>().is_err());

        let class: AssetClass = serde_json::from_str("\"bonds\"").unwrap();
        assert_eq!(class, AssetClass::Bond);
        assert_eq!(serde_json::to_string(&AssetClass::Stock).unwrap(), "\"stock\"");
    }

    #[test]
    fn test_allocation_defaults_to_zero() {
        let allocation = Allocation::new()
            .with(AssetClass::Stock, 70.0)
            .with(AssetClass::Bond, 30.0);
        assert_eq!(allocation.get(AssetClass::Cash), 0.0);
        assert_eq!(allocation.total(), 100.0);

        let json = serde_json::to_string(&allocation).unwrap();
        assert_eq!(json, r#"{"stock":70.0,"bond":30.0}"#);
    }

    #[test]
    fn test_api_response() {
        let response: ApiResponse<String> = ApiResponse::ok("test".to_string());
        assert!(response.ok);
        assert_eq!(response.data, Some("test".to_string()));

        let err_response: ApiResponse<String> = ApiResponse::err("error");
        assert!(!err_response.ok);
        assert_eq!(err_response.error, Some("error".to_string()));
    }
}
