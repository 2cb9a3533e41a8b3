//! Folio Core - Portfolio metrics and rebalance recommendation library.
//!
//! This crate provides a pure, synchronous metrics engine over plain data:
//!
//! - **Valuation**: market value and unrealized gain/loss per holding and in total
//! - **Returns**: lazy period-over-period return series from price history
//! - **Risk metrics**: sample volatility (periodic and annualized), Sharpe-like ratio
//! - **Rebalancing**: drift of the current asset-class allocation against a risk profile
//!
//! Holdings and prices are supplied by the caller; nothing here performs I/O apart
//! from the optional [`store::PortfolioStore`] and [`config::AppConfig`] helpers.
//!
//! # Example
//!
//! ```rust
//! use folio_core::{AssetClass, Holding, MetricsEngine, MetricsRequest, PricePoint, RiskProfile};
//! use std::collections::BTreeMap;
//!
//! let holdings = vec![Holding::new("AAPL", 10.0, 100.0, AssetClass::Stock)];
//! let mut history = BTreeMap::new();
//! history.insert(
//!     "AAPL".to_string(),
//!     vec![PricePoint::new("AAPL", chrono::Utc::now(), 150.0)],
//! );
//!
//! let engine = MetricsEngine::default();
//! let result = engine
//!     .compute(&MetricsRequest::new(&holdings, &history, RiskProfile::Moderate))
//!     .unwrap();
//! assert_eq!(result.valuation.total_value, 1500.0);
//! ```

pub mod allocation;
pub mod config;
pub mod metrics;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use types::{
    Allocation, ApiResponse, AssetClass, ConcentrationLevel, Holding, HoldingValuation,
    MetricsResult, PriceHistory, PricePoint, Priority, RebalanceAction, RebalanceDirective,
    Recommendation, RecommendationKind, SymbolMetrics, Valuation, ValuePoint,
};

// Re-export main functionality
pub use allocation::{
    advise, recommend_rebalance, RiskProfile, RiskProfileTable, TargetAllocation,
    BUILTIN_PROFILES,
};
pub use config::{AppConfig, EngineConfig};
pub use metrics::{
    annualize_volatility, compute_returns, compute_sharpe_like, compute_valuation,
    compute_volatility, current_allocation, mean, portfolio_value_series, sector_allocation,
    MetricsEngine, MetricsRequest, PriceLookup, Returns,
};
pub use store::{PortfolioSnapshot, PortfolioStore};

/// Error types for folio-core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML write error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("No latest price available for {0}")]
    MissingPrice(String),

    #[error("{0} is undefined: volatility is zero")]
    DivisionUndefined(String),

    #[error("Risk profile {profile} targets sum to {total:.2}%, expected 100%")]
    InvalidRiskProfile { profile: String, total: f64 },

    #[error("Unknown risk profile: {0}")]
    UnknownRiskProfile(String),

    #[error("Invalid holding: {0}")]
    InvalidHolding(String),

    #[error("Holding not found: {0}")]
    HoldingNotFound(String),
}

/// Result type for folio-core operations.
pub type Result<T> = std::result::Result<T, Error>;
