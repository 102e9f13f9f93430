/// Parlay decomposition.
///
/// A wager's money is split across its legs' markets in proportion to each
/// leg's excess odds (decimal - 1). Expected payout uses the wager-level
/// combined probability (product of the legs' vig-adjusted probabilities),
/// since the payout only lands if every leg wins.
///
///   weight_i   = (d_i - 1) / sum_j (d_j - 1)
///   stake_i    = weight_i * stake
///   expected_i = weight_i * payout * prod_j p_j
///   realized_i = weight_i * net_profit
///
/// All-or-nothing: one unpriced leg excludes the whole wager.

use super::pricing::{BestPriceSelector, PriceQuote};
use crate::catalogue::MarketKey;
use crate::ledger::types::Wager;
use crate::quotes::QuoteStore;
use chrono::{DateTime, Utc};
use smallvec::SmallVec;

#[derive(Debug, Clone, PartialEq)]
pub struct LegAllocation {
    pub market: MarketKey,
    pub weight: f64,
    pub stake: f64,
    pub expected_payout: f64,
    pub realized_profit: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExclusionReason {
    NoLegs,
    /// Index of the first leg without a usable price.
    UnpricedLeg(usize),
    /// Excess odds sum to zero or less; no proportional split exists.
    DegenerateOdds,
}

impl std::fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoLegs => write!(f, "no legs"),
            Self::UnpricedLeg(i) => write!(f, "leg {i} unpriced"),
            Self::DegenerateOdds => write!(f, "degenerate odds"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Allocation {
    Allocated {
        combined_probability: f64,
        legs: SmallVec<[LegAllocation; 4]>,
    },
    Excluded(ExclusionReason),
}

/// Excess-odds weights. `None` when the excess sum is not positive.
pub fn leg_weights(decimal_odds: &[f64]) -> Option<SmallVec<[f64; 4]>> {
    let excess_sum: f64 = decimal_odds.iter().map(|d| d - 1.0).sum();
    if excess_sum <= 0.0 {
        return None;
    }
    Some(decimal_odds.iter().map(|d| (d - 1.0) / excess_sum).collect())
}

/// Split a wager across its legs given one price per leg (same order).
/// Pure function.
pub fn allocate(wager: &Wager, prices: &[PriceQuote]) -> Allocation {
    debug_assert_eq!(wager.legs.len(), prices.len());

    if wager.legs.is_empty() {
        return Allocation::Excluded(ExclusionReason::NoLegs);
    }
    if let Some(i) = prices.iter().position(|p| !p.is_priced()) {
        return Allocation::Excluded(ExclusionReason::UnpricedLeg(i));
    }

    let combined_probability: f64 = prices.iter().map(|p| p.probability).product();
    let decimals: SmallVec<[f64; 4]> = prices.iter().map(|p| p.decimal_odds).collect();
    let Some(weights) = leg_weights(&decimals) else {
        return Allocation::Excluded(ExclusionReason::DegenerateOdds);
    };

    let settled = wager.status.is_settled();
    let expected_total = wager.potential_payout * combined_probability;

    let legs = wager
        .legs
        .iter()
        .zip(weights.iter())
        .map(|(leg, &w)| {
            if settled {
                LegAllocation {
                    market: leg.market.clone(),
                    weight: w,
                    stake: 0.0,
                    expected_payout: 0.0,
                    realized_profit: w * wager.net_profit,
                }
            } else {
                LegAllocation {
                    market: leg.market.clone(),
                    weight: w,
                    stake: w * wager.stake,
                    expected_payout: w * expected_total,
                    realized_profit: 0.0,
                }
            }
        })
        .collect();

    Allocation::Allocated {
        combined_probability,
        legs,
    }
}

/// Prices each leg through the run's selector, then allocates.
pub struct LegWeightAllocator {
    cutoff: DateTime<Utc>,
}

impl LegWeightAllocator {
    pub fn new(cutoff: DateTime<Utc>) -> Self {
        Self { cutoff }
    }

    pub fn allocate_wager<Q: QuoteStore + ?Sized>(
        &self,
        selector: &mut BestPriceSelector<'_, Q>,
        wager: &Wager,
    ) -> Allocation {
        let mut prices: SmallVec<[PriceQuote; 4]> = SmallVec::with_capacity(wager.legs.len());
        for leg in &wager.legs {
            let quote = selector.best_price(&leg.market, &leg.participant, self.cutoff);
            let unpriced = !quote.is_priced();
            prices.push(quote);
            // No point pricing the rest of a parlay that is already excluded.
            if unpriced {
                break;
            }
        }
        let allocation = if prices.len() < wager.legs.len() {
            Allocation::Excluded(ExclusionReason::UnpricedLeg(prices.len() - 1))
        } else {
            allocate(wager, &prices)
        };

        if let Allocation::Excluded(reason) = &allocation {
            tracing::debug!(wager = %wager.id, parlay = wager.is_parlay(), %reason, "wager excluded");
        }
        allocation
    }
}
