/// Best available price per (market, participant) as of a cutoff, with the
/// market's vig stripped from the implied probability.
///
/// A selector lives for exactly one run: its memo cache is keyed by cutoff,
/// and quotes move between runs.

use crate::catalogue::{MarketCatalogue, MarketKey};
use crate::odds::{parse_odds, to_decimal, to_implied_probability};
use crate::quotes::{QuoteRow, QuoteStore};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceQuote {
    pub decimal_odds: f64,
    /// Vig-adjusted win probability. 0.0 means "no usable price".
    pub probability: f64,
    pub american: i64,
    pub sportsbook: Option<String>,
}

impl PriceQuote {
    pub const UNPRICED: PriceQuote = PriceQuote {
        decimal_odds: 1.0,
        probability: 0.0,
        american: 0,
        sportsbook: None,
    };

    #[inline]
    pub fn is_priced(&self) -> bool {
        self.probability > 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PriceKey {
    market: MarketKey,
    participant: String,
    cutoff: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct PricingStats {
    pub lookups: u64,
    pub store_queries: u64,
    pub store_errors: u64,
}

pub struct BestPriceSelector<'a, Q: QuoteStore + ?Sized> {
    catalogue: &'a MarketCatalogue,
    store: &'a Q,
    window: usize,
    cache: HashMap<PriceKey, PriceQuote>,
    stats: PricingStats,
}

impl<'a, Q: QuoteStore + ?Sized> BestPriceSelector<'a, Q> {
    pub fn new(catalogue: &'a MarketCatalogue, store: &'a Q, window: usize) -> Self {
        Self {
            catalogue,
            store,
            window,
            cache: HashMap::new(),
            stats: PricingStats::default(),
        }
    }

    pub fn stats(&self) -> PricingStats {
        self.stats
    }

    /// Never fails: untracked markets, missing quotes and store errors all
    /// come back as `PriceQuote::UNPRICED`.
    pub fn best_price(
        &mut self,
        market: &MarketKey,
        participant: &str,
        cutoff: DateTime<Utc>,
    ) -> PriceQuote {
        self.stats.lookups += 1;

        let key = PriceKey {
            market: market.clone(),
            participant: participant.to_string(),
            cutoff,
        };
        if let Some(hit) = self.cache.get(&key) {
            return hit.clone();
        }

        let quote = self.lookup(market, participant, &cutoff);
        self.cache.insert(key, quote.clone());
        quote
    }

    fn lookup(&mut self, market: &MarketKey, participant: &str, cutoff: &DateTime<Utc>) -> PriceQuote {
        let catalogue = self.catalogue;
        let Some(source) = catalogue.source(market) else {
            tracing::debug!(market = %market, "untracked market, no price");
            return PriceQuote::UNPRICED;
        };
        let name = catalogue.canonical_participant(participant);

        self.stats.store_queries += 1;
        let rows = match self.store.recent_quotes(
            &source.table,
            name,
            cutoff,
            catalogue.sportsbooks(),
            self.window,
        ) {
            Ok(rows) => rows,
            Err(e) => {
                self.stats.store_errors += 1;
                tracing::warn!(
                    market = %market,
                    participant = %name,
                    error = %e,
                    "quote lookup failed, treating as unpriced"
                );
                return PriceQuote::UNPRICED;
            }
        };

        let Some((american, book)) = select_best(&rows) else {
            tracing::debug!(market = %market, participant = %name, rows = rows.len(), "no usable quote");
            return PriceQuote::UNPRICED;
        };

        tracing::trace!(
            market = %market,
            participant = %name,
            american,
            newest = rows.first().map_or("", |r| r.taken_at.as_str()),
            "price selected"
        );

        let vig = catalogue.vig_for(market);
        PriceQuote {
            decimal_odds: to_decimal(american),
            probability: to_implied_probability(american) * (1.0 - vig),
            american,
            sportsbook: catalogue.sportsbooks().get(book).cloned(),
        }
    }
}

/// Scan newest first; the first row with any non-zero price decides. Within
/// that row the lowest implied probability (the bettor's best price) wins,
/// ties going to the earlier sportsbook column.
/// Returns the American price and its sportsbook column index.
pub fn select_best(rows: &[QuoteRow]) -> Option<(i64, usize)> {
    for row in rows {
        let mut best: Option<(i64, usize, f64)> = None;
        for (i, raw) in row.prices.iter().enumerate() {
            let odds = parse_odds(raw);
            if odds == 0 {
                continue;
            }
            let p = to_implied_probability(odds);
            if best.map_or(true, |(_, _, bp)| p < bp) {
                best = Some((odds, i, p));
            }
        }
        if let Some((odds, i, _)) = best {
            return Some((odds, i));
        }
    }
    None
}
