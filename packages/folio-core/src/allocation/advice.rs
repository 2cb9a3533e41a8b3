use crate::allocation::{RiskProfile, TargetAllocation};
use crate::metrics::UNLABELED_SECTOR;
use crate::types::{Allocation, AssetClass, Priority, Recommendation, RecommendationKind};
use std::collections::BTreeMap;
use tracing::debug;

/// Weight (in percent) above which a single sector is flagged as overweight.
pub const SECTOR_OVERWEIGHT_PCT: f64 = 40.0;

/// Advisory notes for a valued portfolio.
///
/// Each labeled sector above [`SECTOR_OVERWEIGHT_PCT`] yields a high-priority
/// rebalance note. A conservative portfolio holding less bond than its target
/// yields a medium-priority diversification note. An empty allocation (total
/// value 0) yields nothing.
pub fn advise(
    profile: RiskProfile,
    current: &Allocation,
    target: &TargetAllocation,
    sectors: &BTreeMap<String, f64>,
) -> Vec<Recommendation> {
    let mut advice = Vec::new();
    if current.total() <= 0.0 {
        return advice;
    }

    for (sector, &weight) in sectors {
        if sector == UNLABELED_SECTOR || weight <= SECTOR_OVERWEIGHT_PCT {
            continue;
        }
        debug!(sector, weight, "Sector overweight");
        advice.push(Recommendation {
            kind: RecommendationKind::Rebalance,
            message: format!(
                "{sector} sector is {weight:.1}% of the portfolio. \
                 Consider diversifying into other sectors."
            ),
            priority: Priority::High,
        });
    }

    let bonds = current.get(AssetClass::Bond);
    let bond_target = target.targets.get(AssetClass::Bond);
    if profile == RiskProfile::Conservative && bonds < bond_target {
        advice.push(Recommendation {
            kind: RecommendationKind::Diversification,
            message: format!(
                "Bonds are {bonds:.1}% of the portfolio against a {bond_target:.1}% target. \
                 Consider adding bond ETFs for stability and income."
            ),
            priority: Priority::Medium,
        });
    }

    advice
}
