//! Portfolio metrics.
//!
//! Provides valuation, return series, risk metrics and the engine that ties
//! them together for a single request.

mod engine;
mod returns;
mod risk;
mod valuation;

pub use engine::{MetricsEngine, MetricsRequest};
pub use returns::{compute_returns, Priced, Returns};
pub use risk::{annualize_volatility, compute_sharpe_like, compute_volatility, mean};
pub use valuation::{
    compute_valuation, concentration_level, current_allocation, portfolio_value_series,
    sector_allocation, PriceLookup, UNLABELED_SECTOR,
};
