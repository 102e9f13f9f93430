use super::allocator::{Allocation, ExclusionReason};
use crate::catalogue::MarketKey;
use crate::ledger::types::Wager;
use std::collections::HashMap;

/// Full-precision running sums for one market.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MarketTotals {
    pub active_stake: f64,
    pub active_expected_payout: f64,
    pub realized_net_profit: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct AllocationStats {
    pub active_allocated: u64,
    pub settled_allocated: u64,
    pub excluded_unpriced: u64,
    pub excluded_degenerate: u64,
    pub excluded_no_legs: u64,
}

impl AllocationStats {
    pub fn allocated(&self) -> u64 {
        self.active_allocated + self.settled_allocated
    }

    pub fn excluded(&self) -> u64 {
        self.excluded_unpriced + self.excluded_degenerate + self.excluded_no_legs
    }
}

/// Folds per-leg allocations into per-market sums. Only addition happens
/// here, so the totals do not depend on the order wagers arrive in.
#[derive(Debug, Default)]
pub struct MarketAggregator {
    totals: HashMap<MarketKey, MarketTotals>,
    stats: AllocationStats,
}

impl MarketAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, wager: &Wager, allocation: &Allocation) {
        match allocation {
            Allocation::Allocated { legs, .. } => {
                if wager.status.is_settled() {
                    self.stats.settled_allocated += 1;
                } else {
                    self.stats.active_allocated += 1;
                }
                for leg in legs {
                    let t = self.totals.entry(leg.market.clone()).or_default();
                    t.active_stake += leg.stake;
                    t.active_expected_payout += leg.expected_payout;
                    t.realized_net_profit += leg.realized_profit;
                    tracing::trace!(
                        wager = %wager.id,
                        market = %leg.market,
                        weight = leg.weight,
                        "leg allocated"
                    );
                }
            }
            Allocation::Excluded(ExclusionReason::UnpricedLeg(_)) => self.stats.excluded_unpriced += 1,
            Allocation::Excluded(ExclusionReason::DegenerateOdds) => self.stats.excluded_degenerate += 1,
            Allocation::Excluded(ExclusionReason::NoLegs) => self.stats.excluded_no_legs += 1,
        }
    }

    /// Zero totals for markets nothing was allocated to.
    pub fn totals(&self, market: &MarketKey) -> MarketTotals {
        self.totals.get(market).copied().unwrap_or_default()
    }

    pub fn stats(&self) -> AllocationStats {
        self.stats
    }
}
