use super::aggregator::{AllocationStats, MarketAggregator};
use super::pricing::PricingStats;
use crate::catalogue::MarketCatalogue;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One output row. Field names follow the dashboard's column headers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MarketRow {
    pub event_type: String,
    pub event_label: String,
    pub active_dollars_at_stake: f64,
    pub active_expected_payout: f64,
    pub realized_net_profit: f64,
    pub expected_value: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EvTotals {
    pub active_dollars_at_stake: f64,
    pub active_expected_payout: f64,
    pub realized_net_profit: f64,
    pub expected_value: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RunStats {
    pub allocation: AllocationStats,
    pub pricing: PricingStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvTable {
    pub run_id: String,
    pub cutoff: DateTime<Utc>,
    pub rows: Vec<MarketRow>,
    pub totals: EvTotals,
    pub stats: RunStats,
}

/// Two-decimal rounding on the exact binary value, ties to even: 0.125
/// becomes 0.12 and 2.675 (stored just below) becomes 2.67.
pub fn round2(x: f64) -> f64 {
    // `+ 0.0` folds "-0.00" back to 0.
    format!("{x:.2}").parse::<f64>().map_or(x, |r| r + 0.0)
}

/// One row per catalogue market, in (EventType, EventLabel) order, with zero
/// figures for untouched markets. Rounding happens here and nowhere earlier;
/// totals are column sums of the rounded rows, so they always agree with
/// what is displayed.
pub fn build_table(
    catalogue: &MarketCatalogue,
    aggregator: &MarketAggregator,
    run_id: String,
    cutoff: DateTime<Utc>,
    pricing: PricingStats,
) -> EvTable {
    let mut rows = Vec::with_capacity(catalogue.market_count());
    let mut totals = EvTotals::default();

    // Catalogue keys iterate in sorted order already.
    for key in catalogue.keys() {
        let t = aggregator.totals(key);
        let ev = t.active_expected_payout - t.active_stake + t.realized_net_profit;
        let row = MarketRow {
            event_type: key.event_type.clone(),
            event_label: key.event_label.clone(),
            active_dollars_at_stake: round2(t.active_stake),
            active_expected_payout: round2(t.active_expected_payout),
            realized_net_profit: round2(t.realized_net_profit),
            expected_value: round2(ev),
        };

        totals.active_dollars_at_stake += row.active_dollars_at_stake;
        totals.active_expected_payout += row.active_expected_payout;
        totals.realized_net_profit += row.realized_net_profit;
        totals.expected_value += row.expected_value;
        rows.push(row);
    }

    EvTable {
        run_id,
        cutoff,
        rows,
        // Sums of two-decimal figures pick up float noise; re-round.
        totals: EvTotals {
            active_dollars_at_stake: round2(totals.active_dollars_at_stake),
            active_expected_payout: round2(totals.active_expected_payout),
            realized_net_profit: round2(totals.realized_net_profit),
            expected_value: round2(totals.expected_value),
        },
        stats: RunStats {
            allocation: aggregator.stats(),
            pricing,
        },
    }
}
