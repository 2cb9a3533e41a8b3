//! Holding valuation and allocation breakdowns.

use crate::types::{
    Allocation, AssetClass, ConcentrationLevel, Holding, HoldingValuation, PriceHistory,
    Valuation, ValuePoint,
};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Sector label for holdings without one.
pub const UNLABELED_SECTOR: &str = "Other";

/// Latest-price lookup by symbol. The price may be absent.
pub trait PriceLookup {
    fn latest_price(&self, symbol: &str) -> Option<f64>;
}

impl PriceLookup for HashMap<String, f64> {
    fn latest_price(&self, symbol: &str) -> Option<f64> {
        self.get(symbol).copied()
    }
}

impl PriceLookup for BTreeMap<String, f64> {
    fn latest_price(&self, symbol: &str) -> Option<f64> {
        self.get(symbol).copied()
    }
}

/// The last recorded point of each symbol's history.
impl PriceLookup for PriceHistory {
    fn latest_price(&self, symbol: &str) -> Option<f64> {
        self.get(symbol)
            .and_then(|points| points.last())
            .map(|point| point.price)
    }
}

impl<T: PriceLookup + ?Sized> PriceLookup for &T {
    fn latest_price(&self, symbol: &str) -> Option<f64> {
        (**self).latest_price(symbol)
    }
}

fn require_price<P: PriceLookup + ?Sized>(prices: &P, symbol: &str) -> Result<f64> {
    match prices.latest_price(symbol) {
        Some(price) if price.is_finite() && price > 0.0 => Ok(price),
        _ => Err(Error::MissingPrice(symbol.to_string())),
    }
}

fn percent_of(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        (part / whole) * 100.0
    } else {
        0.0
    }
}

/// Value each holding at its latest price.
///
/// Holdings that fail [`Holding::validate`] are listed in
/// [`Valuation::invalid`], holdings without a usable latest price in
/// [`Valuation::skipped`]. Neither counts towards the totals; the rest are
/// still valued.
pub fn compute_valuation<P: PriceLookup + ?Sized>(holdings: &[Holding], prices: &P) -> Valuation {
    let mut valuation = Valuation::default();

    for holding in holdings {
        if let Err(e) = holding.validate() {
            warn!(symbol = %holding.symbol, "{e}; excluding holding from totals");
            valuation.invalid.push(holding.symbol.clone());
            continue;
        }

        let price = match require_price(prices, &holding.symbol) {
            Ok(price) => price,
            Err(e) => {
                warn!(symbol = %holding.symbol, "{e}; excluding holding from totals");
                valuation.skipped.push(holding.symbol.clone());
                continue;
            }
        };

        let market_value = holding.quantity * price;
        let cost = holding.total_cost();
        let gain_loss = market_value - cost;

        valuation.total_value += market_value;
        valuation.total_cost += cost;
        valuation.holdings.push(HoldingValuation {
            symbol: holding.symbol.clone(),
            asset_class: holding.asset_class,
            sector: holding.sector.clone(),
            quantity: holding.quantity,
            price,
            market_value,
            cost,
            gain_loss,
            gain_loss_percent: percent_of(gain_loss, cost),
        });
    }

    valuation.total_gain_loss = valuation.total_value - valuation.total_cost;
    valuation.total_gain_loss_percent = percent_of(valuation.total_gain_loss, valuation.total_cost);

    debug!(
        valued = valuation.holdings.len(),
        skipped = valuation.skipped.len(),
        invalid = valuation.invalid.len(),
        total_value = valuation.total_value,
        "Computed valuation"
    );
    valuation
}

/// Share of the valued total held in each asset class, in percent.
///
/// Every class is present; all are 0 when the total value is 0.
pub fn current_allocation(valuation: &Valuation) -> Allocation {
    AssetClass::ALL
        .iter()
        .map(|&class| {
            let value: f64 = valuation
                .holdings
                .iter()
                .filter(|h| h.asset_class == class)
                .map(|h| h.market_value)
                .fold(0.0, |acc, v| acc + v);
            (class, percent_of(value, valuation.total_value))
        })
        .collect()
}

/// Share of the valued total held in each sector, in percent.
pub fn sector_allocation(valuation: &Valuation) -> BTreeMap<String, f64> {
    let mut values: BTreeMap<String, f64> = BTreeMap::new();
    for holding in &valuation.holdings {
        let sector = holding.sector.as_deref().unwrap_or(UNLABELED_SECTOR);
        *values.entry(sector.to_string()).or_default() += holding.market_value;
    }

    values
        .into_iter()
        .map(|(sector, value)| (sector, percent_of(value, valuation.total_value)))
        .collect()
}

/// Classify the weight of the largest sector: above 40% is high, above 20% medium.
pub fn concentration_level(sectors: &BTreeMap<String, f64>) -> ConcentrationLevel {
    let largest = sectors.values().copied().fold(0.0_f64, f64::max);
    if largest > 40.0 {
        ConcentrationLevel::High
    } else if largest > 20.0 {
        ConcentrationLevel::Medium
    } else {
        ConcentrationLevel::Low
    }
}

/// Portfolio value at every timestamp where all contributing holdings have a price.
///
/// A holding contributes when its quantity is positive and its symbol has
/// price history; holdings without history are ignored rather than
/// truncating the series to nothing.
pub fn portfolio_value_series(holdings: &[Holding], history: &PriceHistory) -> Vec<ValuePoint> {
    let series: Vec<(f64, BTreeMap<DateTime<Utc>, f64>)> = holdings
        .iter()
        .filter(|holding| holding.quantity > 0.0)
        .filter_map(|holding| {
            let points = history.get(&holding.symbol)?;
            if points.is_empty() {
                return None;
            }
            let by_time = points
                .iter()
                .map(|point| (point.timestamp, point.price))
                .collect();
            Some((holding.quantity, by_time))
        })
        .collect();

    if series.is_empty() {
        return Vec::new();
    }

    let mut totals: BTreeMap<DateTime<Utc>, (f64, usize)> = BTreeMap::new();
    for (quantity, by_time) in &series {
        for (timestamp, price) in by_time {
            let entry = totals.entry(*timestamp).or_insert((0.0, 0));
            entry.0 += quantity * price;
            entry.1 += 1;
        }
    }

    totals
        .into_iter()
        .filter(|(_, (_, count))| *count == series.len())
        .map(|(timestamp, (value, _))| ValuePoint { timestamp, value })
        .collect()
}
