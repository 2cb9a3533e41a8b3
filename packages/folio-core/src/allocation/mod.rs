//! Target allocations and rebalance recommendations.
//!
//! Risk profiles form a closed set with a static target table; loaded tables
//! may override the built-in targets.

mod advice;
mod profiles;
mod rebalance;

pub use advice::{advise, SECTOR_OVERWEIGHT_PCT};
pub use profiles::{RiskProfile, RiskProfileTable, TargetAllocation, BUILTIN_PROFILES};
pub use rebalance::{recommend_rebalance, DEFAULT_DRIFT_THRESHOLD_PCT};
