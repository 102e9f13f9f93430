pub mod aggregator;
pub mod allocator;
pub mod positions;
pub mod pricing;
pub mod principal;
pub mod table;

use crate::catalogue::MarketCatalogue;
use crate::errors::{EngineError, EngineResult};
use crate::ledger::types::WagerStatus;
use crate::ledger::WagerLedger;
use crate::quotes::QuoteStore;
use aggregator::MarketAggregator;
use allocator::LegWeightAllocator;
use chrono::{DateTime, Utc};
use pricing::BestPriceSelector;
use table::EvTable;

#[derive(Debug, Clone)]
pub struct EvRequest {
    pub bankroll: String,
    pub league: String,
    pub cutoff: DateTime<Utc>,
}

/// One full evaluation: ledger -> prices -> allocation -> per-market table.
///
/// Fails only when the ledger cannot be read. Missing or broken quotes never
/// fail a run; the affected wagers are excluded instead.
pub fn run_ev_table<L, Q>(
    catalogue: &MarketCatalogue,
    ledger: &L,
    quotes: &Q,
    request: &EvRequest,
    quote_window: usize,
) -> EngineResult<EvTable>
where
    L: WagerLedger + ?Sized,
    Q: QuoteStore + ?Sized,
{
    let run_id = uuid::Uuid::new_v4().to_string();
    let span = tracing::info_span!(
        "ev_run",
        run_id = %run_id,
        bankroll = %request.bankroll,
        league = %request.league,
        cutoff = %request.cutoff,
    );
    let _enter = span.enter();

    let fetch = |statuses: &[WagerStatus]| {
        ledger
            .fetch_wagers(&request.bankroll, &request.league, statuses)
            .map_err(|e| {
                tracing::error!(error = %e, "ledger read failed, aborting run");
                EngineError::Ledger(e.to_string())
            })
    };
    let active = fetch(&[WagerStatus::Active])?;
    let settled = fetch(&WagerStatus::SETTLED)?;

    let mut selector = BestPriceSelector::new(catalogue, quotes, quote_window);
    let allocator = LegWeightAllocator::new(request.cutoff);
    let mut aggregator = MarketAggregator::new();

    for wager in active.iter().chain(settled.iter()) {
        let allocation = allocator.allocate_wager(&mut selector, wager);
        aggregator.add(wager, &allocation);
    }

    let table = table::build_table(catalogue, &aggregator, run_id, request.cutoff, selector.stats());
    tracing::info!(
        active = active.len(),
        settled = settled.len(),
        allocated = table.stats.allocation.allocated(),
        excluded = table.stats.allocation.excluded(),
        store_queries = table.stats.pricing.store_queries,
        ev = table.totals.expected_value,
        "ev table built"
    );
    Ok(table)
}
