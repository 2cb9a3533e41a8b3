use crate::allocation::TargetAllocation;
use crate::types::{Allocation, AssetClass, RebalanceAction, RebalanceDirective};
use tracing::debug;

/// Drift (in percentage points) tolerated before a directive is emitted.
pub const DEFAULT_DRIFT_THRESHOLD_PCT: f64 = 5.0;

/// Compare the current allocation with a target and suggest trades.
///
/// For each asset class `delta = target% - current%`. Classes whose absolute
/// drift is strictly greater than `drift_threshold_pct` produce a directive
/// (buy when under target, sell when over); the rest are omitted. Directives
/// come out in [`AssetClass::ALL`] order.
pub fn recommend_rebalance(
    current: &Allocation,
    target: &TargetAllocation,
    drift_threshold_pct: f64,
) -> Vec<RebalanceDirective> {
    AssetClass::ALL
        .iter()
        .filter_map(|&class| {
            let delta = target.targets.get(class) - current.get(class);
            if delta.abs() <= drift_threshold_pct {
                return None;
            }

            let action = if delta > 0.0 {
                RebalanceAction::Buy
            } else {
                RebalanceAction::Sell
            };
            debug!(%class, delta, "Allocation drift above threshold");

            Some(RebalanceDirective {
                asset_class: class,
                action,
                magnitude_pct: delta.abs(),
            })
        })
        .collect()
}
