pub mod types;

use crate::catalogue::MarketKey;
use crate::db::{self, DbPool};
use crate::errors::EngineResult;
use smallvec::SmallVec;
use std::collections::HashMap;
use types::{LedgerRow, Leg, PositionLeg, PrincipalRow, Wager, WagerStatus};

/// Read-only view of the wager ledger.
/// Errors here are fatal to a run: the caller must not build a table from a
/// partial ledger.
pub trait WagerLedger: Send + Sync {
    /// Wagers of `bankroll` with at least one leg in `league`, restricted to
    /// `statuses`. Only legs in `league` are returned.
    fn fetch_wagers(
        &self,
        bankroll: &str,
        league: &str,
        statuses: &[WagerStatus],
    ) -> EngineResult<Vec<Wager>>;

    /// Distinct (wager, league) pairs for every wager of `bankroll`.
    fn principal_rows(&self, bankroll: &str) -> EngineResult<Vec<PrincipalRow>>;

    /// Most recent placement time of any wager of `bankroll`.
    fn last_placed(&self, bankroll: &str) -> EngineResult<Option<String>>;

    /// Legs in `league` of the bankroll's active wagers, straights and
    /// parlays alike.
    fn active_positions(&self, bankroll: &str, league: &str) -> EngineResult<Vec<PositionLeg>>;
}

#[derive(Clone)]
pub struct SqliteLedger {
    db: DbPool,
}

impl SqliteLedger {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }
}

impl WagerLedger for SqliteLedger {
    fn fetch_wagers(
        &self,
        bankroll: &str,
        league: &str,
        statuses: &[WagerStatus],
    ) -> EngineResult<Vec<Wager>> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = (0..statuses.len())
            .map(|i| format!("?{}", i + 3))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT b.WagerID, b.DollarsAtStake, b.PotentialPayout, b.NetProfit, b.WLCA,
                    l.EventType, l.EventLabel, l.ParticipantName
               FROM bets b JOIN legs l ON b.WagerID = l.WagerID
              WHERE b.WhichBankroll = ?1
                AND l.LeagueName = ?2
                AND b.WLCA IN ({placeholders})
              ORDER BY b.WagerID, l.LegID"
        );

        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = vec![
            Box::new(bankroll.to_string()),
            Box::new(league.to_string()),
        ];
        params.extend(
            statuses
                .iter()
                .map(|s| Box::new(s.as_str()) as Box<dyn rusqlite::types::ToSql>),
        );

        let conn = db::lock(&self.db)?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(params.iter()), |row| {
            Ok(LedgerRow {
                wager_id: db::value_as_string(row.get_ref(0)?),
                stake: db::value_as_f64(row.get_ref(1)?),
                potential_payout: db::value_as_f64(row.get_ref(2)?),
                net_profit: db::value_as_f64(row.get_ref(3)?),
                status: row.get(4)?,
                event_type: row.get(5)?,
                event_label: row.get(6)?,
                participant: row.get(7)?,
            })
        })?;
        let rows = rows.collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(bankroll, league, rows = rows.len(), "ledger rows fetched");
        Ok(group_wagers(rows))
    }

    fn principal_rows(&self, bankroll: &str) -> EngineResult<Vec<PrincipalRow>> {
        let conn = db::lock(&self.db)?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT b.WagerID, l.LeagueName, b.WLCA, b.DollarsAtStake, b.NetProfit
               FROM bets b JOIN legs l ON b.WagerID = l.WagerID
              WHERE b.WhichBankroll = ?1",
        )?;
        let rows = stmt.query_map(rusqlite::params![bankroll], |row| {
            Ok((
                db::value_as_string(row.get_ref(0)?),
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                db::value_as_f64(row.get_ref(3)?),
                db::value_as_f64(row.get_ref(4)?),
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (wager_id, league, status, stake, net_profit) = row?;
            match status.parse::<WagerStatus>() {
                Ok(status) => out.push(PrincipalRow {
                    wager_id,
                    league,
                    status,
                    stake,
                    net_profit,
                }),
                Err(e) => tracing::warn!(wager = %wager_id, error = %e, "skipping ledger row"),
            }
        }
        Ok(out)
    }

    fn last_placed(&self, bankroll: &str) -> EngineResult<Option<String>> {
        let conn = db::lock(&self.db)?;
        let last = conn.query_row(
            "SELECT MAX(DateTimePlaced) FROM bets WHERE WhichBankroll = ?1",
            rusqlite::params![bankroll],
            |row| row.get::<_, Option<String>>(0),
        )?;
        Ok(last)
    }

    fn active_positions(&self, bankroll: &str, league: &str) -> EngineResult<Vec<PositionLeg>> {
        let conn = db::lock(&self.db)?;
        let mut stmt = conn.prepare(
            "SELECT b.WagerID, b.LegCount, l.EventType, l.EventLabel, l.ParticipantName,
                    b.DollarsAtStake, b.PotentialPayout
               FROM bets b JOIN legs l ON b.WagerID = l.WagerID
              WHERE b.WhichBankroll = ?1
                AND l.LeagueName = ?2
                AND b.WLCA = 'Active'
              ORDER BY b.WagerID, l.LegID",
        )?;
        let rows = stmt.query_map(rusqlite::params![bankroll, league], |row| {
            Ok(PositionLeg {
                wager_id: db::value_as_string(row.get_ref(0)?),
                leg_count: db::value_as_f64(row.get_ref(1)?).max(0.0) as u32,
                event_type: row.get(2)?,
                event_label: row.get(3)?,
                participant: row.get(4)?,
                stake: db::value_as_f64(row.get_ref(5)?),
                potential_payout: db::value_as_f64(row.get_ref(6)?),
            })
        })?;
        let legs = rows.collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(bankroll, league, legs = legs.len(), "active positions fetched");
        Ok(legs)
    }
}

/// Fold wager-leg join rows into wagers, keeping first-seen wager order and
/// leg order. Money figures come from the first row that carries a non-zero
/// value, since join rows repeat the wager columns.
pub fn group_wagers(rows: Vec<LedgerRow>) -> Vec<Wager> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut wagers: Vec<Wager> = Vec::new();

    for row in rows {
        let status = match row.status.parse::<WagerStatus>() {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(wager = %row.wager_id, error = %e, "skipping ledger row");
                continue;
            }
        };

        let leg = Leg {
            market: MarketKey::new(row.event_type, row.event_label),
            participant: row.participant,
        };

        match index.get(&row.wager_id).copied() {
            Some(i) => {
                let w = &mut wagers[i];
                if w.stake == 0.0 {
                    w.stake = clamp_stake(&row.wager_id, row.stake);
                }
                if w.potential_payout == 0.0 {
                    w.potential_payout = row.potential_payout;
                }
                if w.net_profit == 0.0 {
                    w.net_profit = row.net_profit;
                }
                w.legs.push(leg);
            }
            None => {
                index.insert(row.wager_id.clone(), wagers.len());
                let mut legs = SmallVec::new();
                legs.push(leg);
                wagers.push(Wager {
                    stake: clamp_stake(&row.wager_id, row.stake),
                    id: row.wager_id,
                    potential_payout: row.potential_payout,
                    net_profit: row.net_profit,
                    status,
                    legs,
                });
            }
        }
    }

    wagers
}

fn clamp_stake(wager_id: &str, stake: f64) -> f64 {
    if stake < 0.0 {
        tracing::warn!(wager = %wager_id, stake, "negative stake in ledger, treating as 0");
        0.0
    } else {
        stake
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit;

    fn row(id: &str, status: &str, stake: f64, et: &str, el: &str, who: &str) -> LedgerRow {
        LedgerRow {
            wager_id: id.into(),
            stake,
            potential_payout: stake * 3.0,
            net_profit: 0.0,
            status: status.into(),
            event_type: et.into(),
            event_label: el.into(),
            participant: who.into(),
        }
    }

    #[test]
    fn test_group_wagers_keeps_order() {
        let rows = vec![
            row("W2", "Active", 50.0, "Championship", "NBA Championship", "Boston Celtics"),
            row("W1", "Active", 20.0, "Most Valuable Player Award", "Award", "Nikola Jokic"),
            row("W2", "Active", 50.0, "Conference Winner", "Eastern Conference", "Boston Celtics"),
        ];
        let wagers = group_wagers(rows);
        assert_eq!(wagers.len(), 2);
        assert_eq!(wagers[0].id, "W2");
        assert_eq!(wagers[0].legs.len(), 2);
        assert!(wagers[0].is_parlay());
        assert_eq!(wagers[0].legs[1].market, MarketKey::new("Conference Winner", "Eastern Conference"));
        assert_eq!(wagers[1].id, "W1");
        assert!(!wagers[1].is_parlay());
    }

    #[test]
    fn test_group_wagers_skips_unknown_status_and_clamps_stake() {
        let rows = vec![
            row("W1", "Push", 10.0, "A", "B", "x"),
            row("W2", "Active", -5.0, "A", "B", "y"),
        ];
        let wagers = group_wagers(rows);
        assert_eq!(wagers.len(), 1);
        assert_eq!(wagers[0].id, "W2");
        assert_eq!(wagers[0].stake, 0.0);
    }

    #[test]
    fn test_fetch_wagers_filters() {
        let db = testkit::ledger_pool();
        testkit::insert_wager(&db, "W1", "GreenAleph", "Active", 100.0, 250.0, 0.0, &[
            ("NBA", "Championship", "NBA Championship", "Boston Celtics"),
        ]);
        testkit::insert_wager(&db, "W2", "GreenAleph", "Win", 40.0, 120.0, 80.0, &[
            ("NBA", "Championship", "NBA Championship", "Denver Nuggets"),
        ]);
        testkit::insert_wager(&db, "W3", "OtherBank", "Active", 10.0, 30.0, 0.0, &[
            ("NBA", "Championship", "NBA Championship", "Boston Celtics"),
        ]);
        testkit::insert_wager(&db, "W4", "GreenAleph", "Active", 10.0, 30.0, 0.0, &[
            ("MLB", "World Series", "World Series", "New York Yankees"),
        ]);

        let ledger = SqliteLedger::new(db);
        let active = ledger
            .fetch_wagers("GreenAleph", "NBA", &[WagerStatus::Active])
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "W1");
        assert_eq!(active[0].potential_payout, 250.0);

        let settled = ledger
            .fetch_wagers("GreenAleph", "NBA", &WagerStatus::SETTLED)
            .unwrap();
        assert_eq!(settled.len(), 1);
        assert_eq!(settled[0].status, WagerStatus::Win);
        assert_eq!(settled[0].net_profit, 80.0);

        assert!(ledger.fetch_wagers("GreenAleph", "NBA", &[]).unwrap().is_empty());
    }

    #[test]
    fn test_missing_tables_is_an_error() {
        let ledger = SqliteLedger::new(testkit::empty_pool());
        assert!(ledger.fetch_wagers("GreenAleph", "NBA", &[WagerStatus::Active]).is_err());
        assert!(ledger.principal_rows("GreenAleph").is_err());
    }

    #[test]
    fn test_active_positions() {
        let db = testkit::ledger_pool();
        testkit::insert_wager(&db, "W1", "GreenAleph", "Active", 100.0, 250.0, 0.0, &[
            ("NBA", "Championship", "NBA Championship", "Boston Celtics"),
        ]);
        testkit::insert_wager(&db, "P1", "GreenAleph", "Active", 20.0, 300.0, 0.0, &[
            ("NBA", "Championship", "NBA Championship", "Denver Nuggets"),
            ("MLB", "World Series", "World Series", "New York Yankees"),
        ]);
        testkit::insert_wager(&db, "W2", "GreenAleph", "Win", 40.0, 120.0, 80.0, &[
            ("NBA", "Championship", "NBA Championship", "Boston Celtics"),
        ]);

        let legs = SqliteLedger::new(db).active_positions("GreenAleph", "NBA").unwrap();
        assert_eq!(legs.len(), 2);
        assert_eq!(legs[0].wager_id, "P1");
        assert_eq!(legs[0].leg_count, 2);
        assert_eq!(legs[0].participant, "Denver Nuggets");
        assert_eq!(legs[1].wager_id, "W1");
        assert_eq!(legs[1].leg_count, 1);
        assert_eq!(legs[1].potential_payout, 250.0);
    }

    #[test]
    fn test_last_placed() {
        let db = testkit::ledger_pool();
        let ledger = SqliteLedger::new(db.clone());
        assert_eq!(ledger.last_placed("GreenAleph").unwrap(), None);

        testkit::insert_wager(&db, "W1", "GreenAleph", "Active", 1.0, 2.0, 0.0, &[
            ("NBA", "A", "B", "x"),
        ]);
        assert_eq!(
            ledger.last_placed("GreenAleph").unwrap().as_deref(),
            Some(testkit::PLACED_AT)
        );
    }
}
