/// Odds-quote store boundary.
///
/// One table per tracked market; each row is a timestamped snapshot of one
/// participant's American price at every tracked sportsbook.

use crate::db::{self, DbPool};
use crate::errors::EngineResult;
use crate::odds::RawOdds;
use chrono::{DateTime, Utc};
use smallvec::SmallVec;

#[derive(Debug, Clone)]
pub struct QuoteRow {
    pub taken_at: String,
    /// Raw prices aligned with the catalogue's sportsbook list.
    pub prices: SmallVec<[RawOdds; 8]>,
}

pub trait QuoteStore: Send + Sync {
    /// Up to `limit` snapshots for `participant` taken at or before `cutoff`,
    /// newest first.
    fn recent_quotes(
        &self,
        table: &str,
        participant: &str,
        cutoff: &DateTime<Utc>,
        sportsbooks: &[String],
        limit: usize,
    ) -> EngineResult<Vec<QuoteRow>>;
}

#[derive(Clone)]
pub struct SqliteQuoteStore {
    db: DbPool,
}

impl SqliteQuoteStore {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }
}

impl QuoteStore for SqliteQuoteStore {
    fn recent_quotes(
        &self,
        table: &str,
        participant: &str,
        cutoff: &DateTime<Utc>,
        sportsbooks: &[String],
        limit: usize,
    ) -> EngineResult<Vec<QuoteRow>> {
        // Identifiers were validated when the catalogue was built.
        let cols = sportsbooks
            .iter()
            .map(|b| format!("\"{b}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT date_created, {cols} FROM \"{table}\"
              WHERE team_name = ?1 AND date_created <= ?2
              ORDER BY date_created DESC LIMIT ?3"
        );

        let conn = db::lock(&self.db)?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            rusqlite::params![participant, db::sql_timestamp(cutoff), limit as i64],
            |row| {
                let mut prices = SmallVec::with_capacity(sportsbooks.len());
                for i in 0..sportsbooks.len() {
                    prices.push(RawOdds::from(row.get_ref(i + 1)?));
                }
                Ok(QuoteRow {
                    taken_at: db::value_as_string(row.get_ref(0)?),
                    prices,
                })
            },
        )?;
        let quotes = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(quotes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{self, american, none, text};
    use chrono::TimeZone;

    fn books() -> Vec<String> {
        testkit::BOOKS.iter().map(|b| b.to_string()).collect()
    }

    #[test]
    fn test_newest_first_before_cutoff() {
        let cat = testkit::catalogue();
        let db = testkit::quotes_pool(&cat);
        testkit::insert_quote(&db, "NBAChampionship", "Boston Celtics", "2025-01-01 10:00:00", [american(300), none(), none()]);
        testkit::insert_quote(&db, "NBAChampionship", "Boston Celtics", "2025-01-03 10:00:00", [american(250), text("+260"), none()]);
        testkit::insert_quote(&db, "NBAChampionship", "Boston Celtics", "2025-02-01 10:00:00", [american(150), none(), none()]);
        testkit::insert_quote(&db, "NBAChampionship", "Denver Nuggets", "2025-01-02 10:00:00", [american(500), none(), none()]);

        let store = SqliteQuoteStore::new(db);
        let cutoff = Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap();
        let rows = store
            .recent_quotes("NBAChampionship", "Boston Celtics", &cutoff, &books(), 100)
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].taken_at, "2025-01-03 10:00:00");
        assert_eq!(rows[0].prices[0], RawOdds::Integer(250));
        assert_eq!(rows[0].prices[1], RawOdds::Text("+260".into()));
        assert_eq!(rows[0].prices[2], RawOdds::Missing);
        assert_eq!(rows[1].taken_at, "2025-01-01 10:00:00");
    }

    #[test]
    fn test_cutoff_is_inclusive_and_limit_applies() {
        let cat = testkit::catalogue();
        let db = testkit::quotes_pool(&cat);
        for day in 1..=5 {
            let ts = format!("2025-01-0{day} 12:00:00");
            testkit::insert_quote(&db, "NBAMVP", "Nikola Jokic", &ts, [american(-120), none(), none()]);
        }
        let store = SqliteQuoteStore::new(db);
        let cutoff = Utc.with_ymd_and_hms(2025, 1, 4, 12, 0, 0).unwrap();

        let rows = store.recent_quotes("NBAMVP", "Nikola Jokic", &cutoff, &books(), 2).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].taken_at, "2025-01-04 12:00:00");
        assert_eq!(rows[1].taken_at, "2025-01-03 12:00:00");
    }

    #[test]
    fn test_missing_table_errors() {
        let store = SqliteQuoteStore::new(testkit::empty_pool());
        let cutoff = Utc.with_ymd_and_hms(2025, 1, 4, 12, 0, 0).unwrap();
        assert!(store.recent_quotes("NBAMVP", "Nikola Jokic", &cutoff, &books(), 10).is_err());
    }
}
