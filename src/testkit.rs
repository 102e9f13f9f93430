//! In-memory SQLite fixtures for unit tests.

use crate::catalogue::{MarketCatalogue, MarketKey, MarketSource};
use crate::db::DbPool;
use rusqlite::types::Value;
use rusqlite::Connection;
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::sync::{Arc, Mutex};

pub const PLACED_AT: &str = "2025-01-10 18:30:00";

pub fn empty_pool() -> DbPool {
    let conn = Connection::open_in_memory().expect("in-memory sqlite");
    Arc::new(Mutex::new(conn))
}

pub fn ledger_pool() -> DbPool {
    let db = empty_pool();
    db.lock()
        .unwrap()
        .execute_batch(include_str!("../migrations/001_ledger.sql"))
        .expect("ledger schema");
    db
}

/// `legs` entries are (league, event_type, event_label, participant).
#[allow(clippy::too_many_arguments)]
pub fn insert_wager(
    db: &DbPool,
    id: &str,
    bankroll: &str,
    status: &str,
    stake: f64,
    payout: f64,
    net_profit: f64,
    legs: &[(&str, &str, &str, &str)],
) {
    let conn = db.lock().unwrap();
    conn.execute(
        "INSERT INTO bets (WagerID, WhichBankroll, WLCA, DollarsAtStake, PotentialPayout, NetProfit, LegCount, DateTimePlaced)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![id, bankroll, status, stake, payout, net_profit, legs.len() as i64, PLACED_AT],
    )
    .unwrap();
    for (league, et, el, who) in legs {
        conn.execute(
            "INSERT INTO legs (WagerID, LeagueName, EventType, EventLabel, ParticipantName)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![id, league, et, el, who],
        )
        .unwrap();
    }
}

pub const BOOKS: [&str; 3] = ["DraftKings", "FanDuel", "BetMGM"];

pub fn championship() -> MarketKey {
    MarketKey::new("Championship", "NBA Championship")
}

pub fn east() -> MarketKey {
    MarketKey::new("Conference Winner", "Eastern Conference")
}

pub fn mvp() -> MarketKey {
    MarketKey::new("Most Valuable Player Award", "Award")
}

/// Three-market catalogue over `BOOKS` with a 0.05 default vig.
pub fn catalogue() -> MarketCatalogue {
    let mut markets = BTreeMap::new();
    markets.insert(championship(), MarketSource { table: "NBAChampionship".into(), vig: None });
    markets.insert(east(), MarketSource { table: "NBAEasternConference".into(), vig: None });
    markets.insert(mvp(), MarketSource { table: "NBAMVP".into(), vig: Some(0.10) });
    let mut aliases = HashMap::new();
    aliases.insert("LA Clippers".to_string(), "Los Angeles Clippers".to_string());
    MarketCatalogue::new(
        markets,
        aliases,
        BOOKS.iter().map(|b| b.to_string()).collect(),
        0.05,
    )
    .unwrap()
}

/// Quote store with one empty table per catalogue market.
pub fn quotes_pool(catalogue: &MarketCatalogue) -> DbPool {
    let db = empty_pool();
    {
        let conn = db.lock().unwrap();
        let books = catalogue
            .sportsbooks()
            .iter()
            .map(|b| format!("\"{b}\""))
            .collect::<Vec<_>>()
            .join(", ");
        for key in catalogue.keys() {
            let table = &catalogue.source(key).unwrap().table;
            conn.execute_batch(&format!(
                "CREATE TABLE \"{table}\" (team_name TEXT NOT NULL, date_created TEXT NOT NULL, {books});"
            ))
            .unwrap();
        }
    }
    db
}

/// `prices` aligns with `BOOKS`.
pub fn insert_quote(db: &DbPool, table: &str, team: &str, date_created: &str, prices: [Value; 3]) {
    let conn = db.lock().unwrap();
    let cols = BOOKS.iter().map(|b| format!("\"{b}\"")).collect::<Vec<_>>().join(", ");
    let [a, b, c] = prices;
    conn.execute(
        &format!("INSERT INTO \"{table}\" (team_name, date_created, {cols}) VALUES (?1, ?2, ?3, ?4, ?5)"),
        rusqlite::params![team, date_created, a, b, c],
    )
    .unwrap();
}

pub fn american(odds: i64) -> Value {
    Value::Integer(odds)
}

pub fn text(odds: &str) -> Value {
    Value::Text(odds.to_string())
}

pub fn none() -> Value {
    Value::Null
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Run `f` under a debug-level subscriber and return what it logged.
pub fn capture_logs<F: FnOnce()>(f: F) -> String {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_writer(move || writer.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    let bytes = buffer.0.lock().unwrap().clone();
    String::from_utf8_lossy(&bytes).into_owned()
}
