//! End-to-end scenarios through the public API.

use approx::assert_abs_diff_eq;
use chrono::{DateTime, Duration, TimeZone, Utc};
use folio_core::{
    compute_returns, compute_sharpe_like, compute_valuation, compute_volatility,
    recommend_rebalance, Allocation, AssetClass, EngineConfig, Error, Holding, MetricsEngine,
    MetricsRequest, PortfolioStore, PriceHistory, PricePoint, RebalanceAction,
    RebalanceDirective, RiskProfile, BUILTIN_PROFILES,
};
use std::collections::HashMap;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, 21, 0, 0).unwrap()
}

fn daily(symbol: &str, prices: &[f64]) -> Vec<PricePoint> {
    prices
        .iter()
        .enumerate()
        .map(|(i, price)| PricePoint::new(symbol, start() + Duration::days(i as i64), *price))
        .collect()
}

#[test]
fn risk_profiles_sum_to_one_hundred() {
    for profile in RiskProfile::ALL {
        let target = BUILTIN_PROFILES.get(profile).unwrap();
        assert_abs_diff_eq!(target.total(), 100.0, epsilon = 0.01);
    }
}

#[test]
fn short_series_have_no_returns() {
    assert_eq!(compute_returns(&daily("AAPL", &[])).count(), 0);
    assert_eq!(compute_returns(&daily("AAPL", &[101.0])).count(), 0);
}

#[test]
fn constant_prices_have_zero_volatility() {
    let returns: Vec<f64> = compute_returns(&daily("CASH", &[1.0; 6])).collect();
    assert_eq!(compute_volatility(&returns), 0.0);
}

#[test]
fn on_target_allocation_needs_no_rebalance() {
    for profile in RiskProfile::ALL {
        let target = profile.target();
        assert!(recommend_rebalance(&target.targets, &target, 5.0).is_empty());
    }
}

#[test]
fn single_holding_valuation() {
    let holdings = vec![Holding::new("AAPL", 10.0, 100.0, AssetClass::Stock)];
    let quotes: HashMap<String, f64> = [("AAPL".to_string(), 150.0)].into_iter().collect();

    let valuation = compute_valuation(&holdings, &quotes);

    assert_eq!(valuation.total_value, 1500.0);
    assert_eq!(valuation.total_gain_loss, 500.0);
}

#[test]
fn compounding_series_sharpe_is_undefined() {
    let returns: Vec<f64> = compute_returns(&[100.0, 110.0, 121.0]).collect();

    assert_eq!(returns.len(), 2);
    assert_abs_diff_eq!(returns[0], 0.10, epsilon = 1e-12);
    assert_abs_diff_eq!(returns[1], 0.10, epsilon = 1e-12);
    assert_eq!(compute_volatility(&returns), 0.0);
    assert!(matches!(
        compute_sharpe_like(&returns, 0.10),
        Err(Error::DivisionUndefined(_))
    ));
}

#[test]
fn overweight_stocks_against_moderate() {
    let current = Allocation::new()
        .with(AssetClass::Stock, 90.0)
        .with(AssetClass::Bond, 5.0)
        .with(AssetClass::Cash, 5.0);

    let directives = recommend_rebalance(&current, &RiskProfile::Moderate.target(), 5.0);

    assert_eq!(
        directives,
        vec![
            RebalanceDirective {
                asset_class: AssetClass::Stock,
                action: RebalanceAction::Sell,
                magnitude_pct: 30.0,
            },
            RebalanceDirective {
                asset_class: AssetClass::Bond,
                action: RebalanceAction::Buy,
                magnitude_pct: 30.0,
            },
        ]
    );
}

#[test]
fn full_engine_run_over_mixed_portfolio() {
    let holdings = vec![
        Holding::new("VTI", 45.0, 200.0, AssetClass::Stock).with_sector("Broad Market"),
        Holding::new("BND", 100.0, 72.0, AssetClass::Bond).with_sector("Fixed Income"),
        Holding::new("SGOV", 5.0, 100.0, AssetClass::Cash),
        Holding::new("UNPRICED", 1.0, 10.0, AssetClass::Stock),
    ];

    let mut history = PriceHistory::new();
    history.insert("VTI".to_string(), daily("VTI", &[200.0, 202.0, 199.0, 204.0]));
    history.insert("BND".to_string(), daily("BND", &[72.0, 72.1, 72.3, 72.2]));
    history.insert("SGOV".to_string(), daily("SGOV", &[100.0, 100.0, 100.0, 100.0]));

    let engine = MetricsEngine::new(EngineConfig {
        drift_threshold_pct: 5.0,
        ..Default::default()
    });
    let result = engine
        .compute(&MetricsRequest::new(&holdings, &history, RiskProfile::Moderate))
        .unwrap();

    // 45 * 204 + 100 * 72.2 + 5 * 100
    assert_abs_diff_eq!(result.valuation.total_value, 16900.0, epsilon = 1e-9);
    assert_eq!(result.valuation.skipped, vec!["UNPRICED".to_string()]);
    assert_eq!(result.value_series.len(), 4);
    assert_eq!(result.returns.len(), 3);
    assert!(result.volatility > 0.0);
    assert!(result.annualized_volatility > result.volatility);
    assert!(result.sharpe_like.is_some());

    // SGOV never moves: its own ratio is undefined
    let sgov = result.symbols.iter().find(|s| s.symbol == "SGOV").unwrap();
    assert!(sgov.sharpe_like.is_none());
    assert_eq!(sgov.volatility, 0.0);

    // stock 54.3%, bond 42.7%, cash 3.0% against 60 / 35 / 5
    assert_abs_diff_eq!(result.allocation.total(), 100.0, epsilon = 1e-9);
    assert_eq!(result.directives.len(), 2);
    assert_eq!(result.directives[0].asset_class, AssetClass::Stock);
    assert_eq!(result.directives[0].action, RebalanceAction::Buy);
    assert_eq!(result.directives[1].asset_class, AssetClass::Bond);
    assert_eq!(result.directives[1].action, RebalanceAction::Sell);

    assert!(result.warnings.iter().any(|w| w.contains("UNPRICED")));
    assert!(result.warnings.iter().any(|w| w.starts_with("SGOV:")));

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["risk_profile"], "moderate");
    assert!(json["sharpe_like"].is_number());
}

#[test]
fn store_feeds_engine() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("portfolio.json");

    let mut store = PortfolioStore::with_path(path.clone()).unwrap();
    store
        .add_holding(Holding::new("AAPL", 10.0, 100.0, AssetClass::Stock))
        .unwrap();
    for (i, price) in [120.0, 135.0, 150.0].iter().enumerate() {
        store
            .record_price("AAPL", start() + Duration::days(i as i64), *price)
            .unwrap();
    }
    store.save().unwrap();

    let reopened = PortfolioStore::with_path(path).unwrap();
    let result = MetricsEngine::default()
        .compute(&reopened.get().request())
        .unwrap();

    assert_eq!(result.valuation.total_value, 1500.0);
    assert_eq!(result.valuation.total_gain_loss, 500.0);
    assert_eq!(result.returns.len(), 2);
}
