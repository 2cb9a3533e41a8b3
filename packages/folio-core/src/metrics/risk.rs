//! Return-based risk metrics.
//!
//! Provides mean, sample volatility (periodic and annualized) and a
//! Sharpe-like ratio over a series of periodic returns.

use crate::{Error, Result};

/// Volatility at or below this is treated as zero.
const ZERO_VOLATILITY: f64 = 1e-12;

/// Arithmetic mean of the returns (0 for an empty slice).
pub fn mean(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    returns.iter().sum::<f64>() / returns.len() as f64
}

/// Sample standard deviation of the returns.
///
/// Uses the `n - 1` denominator; defined as 0 for fewer than two returns.
pub fn compute_volatility(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }

    let mean = mean(returns);
    let variance =
        returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (returns.len() - 1) as f64;

    variance.sqrt()
}

/// Scale a periodic volatility to a yearly one.
pub fn annualize_volatility(volatility: f64, periods_per_year: u32) -> f64 {
    volatility * f64::from(periods_per_year).sqrt()
}

/// Excess mean return per unit of volatility.
///
/// `(mean(returns) - risk_free_rate) / volatility(returns)`, where the
/// risk-free rate is expressed per period like the returns. Fails with
/// [`Error::DivisionUndefined`] when volatility is zero, which includes
/// series with fewer than two returns.
pub fn compute_sharpe_like(returns: &[f64], risk_free_rate: f64) -> Result<f64> {
    let volatility = compute_volatility(returns);
    if volatility <= ZERO_VOLATILITY {
        return Err(Error::DivisionUndefined("sharpe_like".to_string()));
    }

    Ok((mean(returns) - risk_free_rate) / volatility)
}
