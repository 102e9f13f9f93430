use crate::catalogue::MarketCatalogue;
use crate::config::AppConfig;
use crate::engine::positions::{self, PositionsReport};
use crate::engine::principal::{self, PrincipalReport};
use crate::engine::table::EvTable;
use crate::engine::{self, EvRequest};
use crate::errors::EngineResult;
use crate::ledger::SqliteLedger;
use crate::quotes::SqliteQuoteStore;
use chrono::{DateTime, Utc};
use portable_atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// ── Lock-free counters ──

pub struct PerfCounters {
    pub runs_completed: AtomicU64,
    pub runs_failed: AtomicU64,
    pub wagers_allocated: AtomicU64,
    pub wagers_excluded: AtomicU64,
    pub quote_lookups: AtomicU64,
    pub quote_store_queries: AtomicU64,
}

impl PerfCounters {
    pub fn new() -> Self {
        Self {
            runs_completed: AtomicU64::new(0),
            runs_failed: AtomicU64::new(0),
            wagers_allocated: AtomicU64::new(0),
            wagers_excluded: AtomicU64::new(0),
            quote_lookups: AtomicU64::new(0),
            quote_store_queries: AtomicU64::new(0),
        }
    }

    fn record(&self, result: &EngineResult<EvTable>) {
        match result {
            Ok(table) => {
                let stats = &table.stats;
                self.runs_completed.fetch_add(1, Ordering::Relaxed);
                self.wagers_allocated.fetch_add(stats.allocation.allocated(), Ordering::Relaxed);
                self.wagers_excluded.fetch_add(stats.allocation.excluded(), Ordering::Relaxed);
                self.quote_lookups.fetch_add(stats.pricing.lookups, Ordering::Relaxed);
                self.quote_store_queries.fetch_add(stats.pricing.store_queries, Ordering::Relaxed);
            }
            Err(_) => {
                self.runs_failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

// ── Application shared state ──

/// Everything here is read-only after startup apart from the counters.
pub struct AppState {
    pub config: AppConfig,
    pub catalogue: MarketCatalogue,
    pub ledger: SqliteLedger,
    pub quotes: SqliteQuoteStore,
    pub counters: PerfCounters,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        catalogue: MarketCatalogue,
        ledger: SqliteLedger,
        quotes: SqliteQuoteStore,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            catalogue,
            ledger,
            quotes,
            counters: PerfCounters::new(),
        })
    }

    /// Blocking: runs SQLite queries on the calling thread.
    pub fn run_ev(&self, league: Option<String>, cutoff: Option<DateTime<Utc>>) -> EngineResult<EvTable> {
        let request = EvRequest {
            bankroll: self.config.bankroll.clone(),
            league: league.unwrap_or_else(|| self.config.league.clone()),
            cutoff: cutoff.unwrap_or_else(Utc::now),
        };
        let result = engine::run_ev_table(
            &self.catalogue,
            &self.ledger,
            &self.quotes,
            &request,
            self.config.quote_window,
        );
        self.counters.record(&result);
        result
    }

    /// Blocking, like `run_ev`.
    pub fn principal(&self) -> EngineResult<PrincipalReport> {
        principal::principal_report(&self.ledger, &self.config.bankroll)
    }

    pub fn positions(&self, league: Option<String>) -> EngineResult<PositionsReport> {
        let league = league.unwrap_or_else(|| self.config.league.clone());
        positions::positions_report(&self.ledger, &self.config.bankroll, &league)
    }
}
