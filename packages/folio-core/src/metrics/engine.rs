//! The metrics engine: one pure computation per request.

use super::returns::compute_returns;
use super::risk::{annualize_volatility, compute_sharpe_like, compute_volatility, mean};
use super::valuation::{
    compute_valuation, concentration_level, current_allocation, portfolio_value_series,
    sector_allocation, PriceLookup,
};
use crate::allocation::{advise, recommend_rebalance, RiskProfile, RiskProfileTable};
use crate::config::EngineConfig;
use crate::types::{Holding, MetricsResult, PriceHistory, SymbolMetrics};
use crate::{Error, Result};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Inputs for a single metrics computation.
///
/// Everything the engine needs is passed in here; the engine keeps no state
/// between requests.
#[derive(Clone, Copy)]
pub struct MetricsRequest<'a> {
    pub holdings: &'a [Holding],
    /// Chronological price history per symbol
    pub history: &'a PriceHistory,
    /// Latest quotes overriding the last history point
    pub latest_prices: Option<&'a dyn PriceLookup>,
    pub profile: RiskProfile,
}

impl<'a> MetricsRequest<'a> {
    pub fn new(holdings: &'a [Holding], history: &'a PriceHistory, profile: RiskProfile) -> Self {
        Self {
            holdings,
            history,
            latest_prices: None,
            profile,
        }
    }

    pub fn with_latest_prices(mut self, prices: &'a dyn PriceLookup) -> Self {
        self.latest_prices = Some(prices);
        self
    }
}

/// Explicit quotes first, then the last point of the history.
struct LatestQuotes<'a> {
    quotes: Option<&'a dyn PriceLookup>,
    history: &'a PriceHistory,
}

impl PriceLookup for LatestQuotes<'_> {
    fn latest_price(&self, symbol: &str) -> Option<f64> {
        self.quotes
            .and_then(|quotes| quotes.latest_price(symbol))
            .or_else(|| self.history.latest_price(symbol))
    }
}

/// Computes valuation, return/risk metrics and rebalance directives.
#[derive(Debug, Clone, Default)]
pub struct MetricsEngine {
    config: EngineConfig,
    profiles: RiskProfileTable,
}

impl MetricsEngine {
    /// Create an engine using the built-in risk profiles.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            profiles: RiskProfileTable::builtin(),
        }
    }

    /// Replace the risk profile table.
    pub fn with_profiles(mut self, profiles: RiskProfileTable) -> Self {
        self.profiles = profiles;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn profiles(&self) -> &RiskProfileTable {
        &self.profiles
    }

    /// Run every metric for the request.
    ///
    /// Invalid holdings, missing prices and undefined ratios are reported in
    /// [`MetricsResult::warnings`]; only an invalid risk profile fails the
    /// whole request. A portfolio with no value gets no directives or advice.
    pub fn compute(&self, request: &MetricsRequest<'_>) -> Result<MetricsResult> {
        let target = self
            .profiles
            .resolve(request.profile, self.config.profile_tolerance)?;
        let mut warnings = Vec::new();

        let quotes = LatestQuotes {
            quotes: request.latest_prices,
            history: request.history,
        };
        let valuation = compute_valuation(request.holdings, &quotes);
        warnings.extend(
            request
                .holdings
                .iter()
                .filter_map(|holding| holding.validate().err())
                .map(|e| e.to_string()),
        );
        warnings.extend(
            valuation
                .skipped
                .iter()
                .map(|symbol| Error::MissingPrice(symbol.clone()).to_string()),
        );

        let valued: Vec<Holding> = request
            .holdings
            .iter()
            .filter(|holding| {
                holding.validate().is_ok() && !valuation.skipped.contains(&holding.symbol)
            })
            .cloned()
            .collect();
        let value_series = portfolio_value_series(&valued, request.history);
        let returns: Vec<f64> = compute_returns(&value_series).collect();
        let volatility = compute_volatility(&returns);
        let sharpe_like = self.sharpe_or_warn(&returns, "portfolio", &mut warnings);

        let symbols = self.symbol_metrics(request, &mut warnings);

        let allocation = current_allocation(&valuation);
        let sectors = sector_allocation(&valuation);
        let concentration = concentration_level(&sectors);
        let (directives, recommendations) = if valuation.total_value > 0.0 {
            (
                recommend_rebalance(&allocation, target, self.config.drift_threshold_pct),
                advise(request.profile, &allocation, target, &sectors),
            )
        } else {
            warn!("Portfolio has no value; skipping rebalance");
            warnings.push("rebalance: portfolio has no value".to_string());
            (Vec::new(), Vec::new())
        };

        debug!(
            profile = %request.profile,
            total_value = valuation.total_value,
            directives = directives.len(),
            warnings = warnings.len(),
            "Computed portfolio metrics"
        );

        Ok(MetricsResult {
            risk_profile: request.profile.to_string(),
            valuation,
            value_series,
            mean_return: mean(&returns),
            returns,
            volatility,
            annualized_volatility: annualize_volatility(volatility, self.config.periods_per_year),
            sharpe_like,
            symbols,
            allocation,
            target_allocation: target.targets.clone(),
            directives,
            sector_allocation: sectors,
            concentration,
            recommendations,
            warnings,
        })
    }

    /// Per-symbol return metrics, once per distinct held symbol with history.
    fn symbol_metrics(
        &self,
        request: &MetricsRequest<'_>,
        warnings: &mut Vec<String>,
    ) -> Vec<SymbolMetrics> {
        let mut seen = HashSet::new();

        request
            .holdings
            .iter()
            .filter(|holding| seen.insert(holding.symbol.as_str()))
            .filter_map(|holding| {
                let points = request.history.get(&holding.symbol)?;
                let returns: Vec<f64> = compute_returns(points).collect();
                let volatility = compute_volatility(&returns);
                let sharpe_like = self.sharpe_or_warn(&returns, &holding.symbol, warnings);

                Some(SymbolMetrics {
                    symbol: holding.symbol.clone(),
                    returns,
                    volatility,
                    sharpe_like,
                })
            })
            .collect()
    }

    fn sharpe_or_warn(
        &self,
        returns: &[f64],
        label: &str,
        warnings: &mut Vec<String>,
    ) -> Option<f64> {
        match compute_sharpe_like(returns, self.config.risk_free_rate) {
            Ok(ratio) => Some(ratio),
            Err(e) => {
                warn!(label, "{e}");
                warnings.push(format!("{label}: {e}"));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        AssetClass, ConcentrationLevel, PricePoint, Priority, RebalanceAction, RecommendationKind,
    };
    use approx::assert_abs_diff_eq;
    use chrono::{DateTime, TimeZone, Utc};
    use std::collections::HashMap;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, d, 20, 0, 0).unwrap()
    }

    fn series(symbol: &str, prices: &[f64]) -> Vec<PricePoint> {
        prices
            .iter()
            .enumerate()
            .map(|(i, price)| PricePoint::new(symbol, day(i as u32 + 1), *price))
            .collect()
    }

    #[test]
    fn test_compute_single_holding() {
        let holdings = vec![Holding::new("AAPL", 10.0, 100.0, AssetClass::Stock)];
        let mut history = PriceHistory::new();
        history.insert("AAPL".to_string(), series("AAPL", &[100.0, 110.0, 121.0, 150.0]));

        let engine = MetricsEngine::default();
        let result = engine
            .compute(&MetricsRequest::new(&holdings, &history, RiskProfile::Moderate))
            .unwrap();

        assert_eq!(result.valuation.total_value, 1500.0);
        assert_eq!(result.valuation.total_gain_loss, 500.0);
        assert_eq!(result.value_series.len(), 4);
        assert_eq!(result.returns.len(), 3);
        assert!(result.volatility > 0.0);
        assert!(result.sharpe_like.is_some());
        assert_eq!(result.symbols.len(), 1);
        assert_eq!(result.allocation.get(AssetClass::Stock), 100.0);

        // 100% stock against 60/35/5
        assert_eq!(result.directives.len(), 2);
        assert_eq!(result.directives[0].action, RebalanceAction::Sell);
        assert_eq!(result.directives[0].magnitude_pct, 40.0);
        assert_eq!(result.directives[1].asset_class, AssetClass::Bond);

        assert_eq!(result.concentration, ConcentrationLevel::High);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_zero_volatility_yields_none_and_warning() {
        let holdings = vec![Holding::new("AAPL", 1.0, 100.0, AssetClass::Stock)];
        let mut history = PriceHistory::new();
        history.insert("AAPL".to_string(), series("AAPL", &[100.0, 110.0, 121.0]));

        let engine = MetricsEngine::new(EngineConfig {
            risk_free_rate: 0.10,
            ..Default::default()
        });
        let result = engine
            .compute(&MetricsRequest::new(&holdings, &history, RiskProfile::Aggressive))
            .unwrap();

        assert_abs_diff_eq!(result.returns[0], 0.10, epsilon = 1e-12);
        assert_eq!(result.volatility, 0.0);
        assert_eq!(result.annualized_volatility, 0.0);
        assert!(result.sharpe_like.is_none());
        assert!(result.symbols[0].sharpe_like.is_none());
        assert_eq!(result.warnings.len(), 2);
        assert!(result.warnings[0].starts_with("portfolio:"));
    }

    #[test]
    fn test_missing_price_is_a_warning() {
        let holdings = vec![
            Holding::new("VTI", 10.0, 200.0, AssetClass::Stock),
            Holding::new("GHOST", 5.0, 10.0, AssetClass::Bond),
        ];
        let mut history = PriceHistory::new();
        history.insert("VTI".to_string(), series("VTI", &[200.0, 210.0, 205.0]));

        let result = MetricsEngine::default()
            .compute(&MetricsRequest::new(&holdings, &history, RiskProfile::Moderate))
            .unwrap();

        assert_eq!(result.valuation.skipped, vec!["GHOST".to_string()]);
        assert_eq!(result.valuation.total_value, 2050.0);
        assert!(result
            .warnings
            .iter()
            .any(|w| w == "No latest price available for GHOST"));
    }

    #[test]
    fn test_latest_quotes_override_history() {
        let holdings = vec![
            Holding::new("VTI", 1.0, 100.0, AssetClass::Stock),
            Holding::new("BND", 1.0, 100.0, AssetClass::Bond),
        ];
        let mut history = PriceHistory::new();
        history.insert("VTI".to_string(), series("VTI", &[100.0, 101.0]));
        history.insert("BND".to_string(), series("BND", &[100.0, 99.0]));

        let quotes: HashMap<String, f64> = [("VTI".to_string(), 120.0)].into_iter().collect();
        let request = MetricsRequest::new(&holdings, &history, RiskProfile::Moderate)
            .with_latest_prices(&quotes);
        let result = MetricsEngine::default().compute(&request).unwrap();

        assert_eq!(result.valuation.holdings[0].price, 120.0);
        assert_eq!(result.valuation.holdings[1].price, 99.0);
        assert_eq!(result.valuation.total_value, 219.0);
    }

    #[test]
    fn test_invalid_profile_fails_request() {
        let table = RiskProfileTable::from_json_str(
            r#"{"conservative": {"stocks": 10, "bonds": 10, "cash": 10}}"#,
        )
        .unwrap();
        let engine = MetricsEngine::default().with_profiles(table);

        let holdings = vec![Holding::new("VTI", 1.0, 100.0, AssetClass::Stock)];
        let history = PriceHistory::new();
        let result =
            engine.compute(&MetricsRequest::new(&holdings, &history, RiskProfile::Conservative));

        assert!(matches!(result, Err(Error::InvalidRiskProfile { .. })));
        assert!(engine
            .compute(&MetricsRequest::new(&holdings, &history, RiskProfile::Moderate))
            .is_ok());
    }

    #[test]
    fn test_compute_is_pure() {
        let holdings = vec![
            Holding::new("VTI", 3.0, 90.0, AssetClass::Stock).with_sector("Broad Market"),
            Holding::new("BND", 4.0, 75.0, AssetClass::Bond),
        ];
        let mut history = PriceHistory::new();
        history.insert("VTI".to_string(), series("VTI", &[95.0, 97.5, 96.0, 99.0]));
        history.insert("BND".to_string(), series("BND", &[74.0, 74.5, 74.2, 74.9]));

        let engine = MetricsEngine::default();
        let request = MetricsRequest::new(&holdings, &history, RiskProfile::Conservative);
        let first = engine.compute(&request).unwrap();
        let second = engine.compute(&request).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_invalid_holding_is_a_warning() {
        let holdings = vec![
            Holding::new("VTI", 10.0, 100.0, AssetClass::Stock),
            Holding::new("BND", -5.0, 0.0, AssetClass::Bond),
        ];
        let mut history = PriceHistory::new();
        history.insert("VTI".to_string(), series("VTI", &[100.0, 102.0]));
        history.insert("BND".to_string(), series("BND", &[80.0, 81.0]));

        let result = MetricsEngine::default()
            .compute(&MetricsRequest::new(&holdings, &history, RiskProfile::Moderate))
            .unwrap();

        assert_eq!(result.valuation.invalid, vec!["BND".to_string()]);
        assert_eq!(result.valuation.total_value, 1020.0);
        assert_eq!(result.allocation.get(AssetClass::Stock), 100.0);
        assert_eq!(result.allocation.get(AssetClass::Bond), 0.0);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.starts_with("Invalid holding: BND")));

        // Only VTI feeds the value series.
        assert_eq!(result.value_series[1].value, 1020.0);
        assert_eq!(result.directives[0].action, RebalanceAction::Sell);
        assert_eq!(result.directives[0].magnitude_pct, 40.0);
    }

    #[test]
    fn test_valueless_portfolio_gets_no_directives() {
        let history = PriceHistory::new();
        let engine = MetricsEngine::default();

        let empty = engine
            .compute(&MetricsRequest::new(&[], &history, RiskProfile::Moderate))
            .unwrap();
        assert!(empty.directives.is_empty());
        assert!(empty.recommendations.is_empty());
        assert!(empty.warnings.iter().any(|w| w.starts_with("rebalance:")));

        let holdings = vec![Holding::new("VTI", 0.0, 100.0, AssetClass::Stock)];
        let mut history = PriceHistory::new();
        history.insert("VTI".to_string(), series("VTI", &[100.0, 101.0]));
        let zero = engine
            .compute(&MetricsRequest::new(&holdings, &history, RiskProfile::Conservative))
            .unwrap();
        assert_eq!(zero.valuation.total_value, 0.0);
        assert!(zero.directives.is_empty());
        assert!(zero.recommendations.is_empty());
    }

    #[test]
    fn test_mean_return_and_advice() {
        let holdings = vec![
            Holding::new("AAPL", 10.0, 100.0, AssetClass::Stock).with_sector("Technology"),
            Holding::new("BND", 1.0, 100.0, AssetClass::Bond).with_sector("Fixed Income"),
        ];
        let mut history = PriceHistory::new();
        history.insert("AAPL".to_string(), series("AAPL", &[100.0, 110.0, 99.0]));
        history.insert("BND".to_string(), series("BND", &[100.0, 100.0, 100.0]));

        let result = MetricsEngine::default()
            .compute(&MetricsRequest::new(&holdings, &history, RiskProfile::Conservative))
            .unwrap();

        // 1100 -> 1200 -> 1090
        let expected = (100.0 / 1100.0 + (-110.0 / 1200.0)) / 2.0;
        assert_abs_diff_eq!(result.mean_return, expected, epsilon = 1e-12);

        assert_eq!(result.recommendations.len(), 2);
        assert_eq!(result.recommendations[0].priority, Priority::High);
        assert!(result.recommendations[0].message.starts_with("Technology"));
        assert_eq!(
            result.recommendations[1].kind,
            RecommendationKind::Diversification
        );
    }

    #[test]
    fn test_duplicate_symbols_reported_once() {
        let holdings = vec![
            Holding::new("VTI", 1.0, 100.0, AssetClass::Stock),
            Holding::new("VTI", 2.0, 110.0, AssetClass::Stock),
        ];
        let mut history = PriceHistory::new();
        history.insert("VTI".to_string(), series("VTI", &[100.0, 105.0, 103.0]));

        let result = MetricsEngine::default()
            .compute(&MetricsRequest::new(&holdings, &history, RiskProfile::Moderate))
            .unwrap();

        assert_eq!(result.symbols.len(), 1);
        assert_eq!(result.valuation.holdings.len(), 2);
        assert_eq!(result.valuation.total_value, 309.0);
    }
}
