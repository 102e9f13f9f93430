use super::table::round2;
use crate::errors::EngineResult;
use crate::ledger::WagerLedger;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaguePrincipal {
    pub league: String,
    pub active_stake: f64,
    pub realized_profit: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrincipalReport {
    pub bankroll: String,
    pub leagues: Vec<LeaguePrincipal>,
    pub total_active_stake: f64,
    pub total_realized_profit: f64,
    /// Active principal less whatever net profit is already booked on the
    /// active wagers.
    pub total_deployed: f64,
    /// Most recent placement time in the ledger.
    pub last_update: Option<String>,
}

/// Money at risk and money realized per league for one bankroll.
///
/// A wager with legs in two leagues shows up under both, but the grand
/// totals count it once.
pub fn principal_report<L: WagerLedger + ?Sized>(ledger: &L, bankroll: &str) -> EngineResult<PrincipalReport> {
    let rows = ledger.principal_rows(bankroll)?;
    let last_update = ledger.last_placed(bankroll)?;

    let mut per_league: BTreeMap<String, (f64, f64)> = BTreeMap::new();
    let mut counted: HashSet<&str> = HashSet::new();
    let mut total_active = 0.0;
    let mut total_realized = 0.0;
    let mut active_net_profit = 0.0;

    for row in &rows {
        let (active, realized) = if row.status.is_settled() {
            (0.0, row.net_profit)
        } else {
            (row.stake, 0.0)
        };

        let entry = per_league.entry(row.league.clone()).or_default();
        entry.0 += active;
        entry.1 += realized;

        if counted.insert(row.wager_id.as_str()) {
            total_active += active;
            total_realized += realized;
            if !row.status.is_settled() {
                active_net_profit += row.net_profit;
            }
        }
    }

    let mut leagues: Vec<LeaguePrincipal> = per_league
        .into_iter()
        .map(|(league, (active, realized))| LeaguePrincipal {
            league,
            active_stake: round2(active),
            realized_profit: round2(realized),
        })
        .collect();
    // BTreeMap order already breaks ties by name; the sort is stable.
    leagues.sort_by(|a, b| a.active_stake.total_cmp(&b.active_stake));

    tracing::debug!(bankroll, leagues = leagues.len(), wagers = counted.len(), "principal report built");

    Ok(PrincipalReport {
        bankroll: bankroll.to_string(),
        leagues,
        total_active_stake: round2(total_active),
        total_realized_profit: round2(total_realized),
        total_deployed: round2(total_active - active_net_profit),
        last_update,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::SqliteLedger;
    use crate::testkit;

    #[test]
    fn test_multi_league_wager_counted_once_in_total() {
        let db = testkit::ledger_pool();
        testkit::insert_wager(&db, "W1", "GreenAleph", "Active", 100.0, 250.0, 0.0, &[
            ("NBA", "Championship", "NBA Championship", "Boston Celtics"),
        ]);
        testkit::insert_wager(&db, "W2", "GreenAleph", "Active", 30.0, 300.0, 0.0, &[
            ("NBA", "Championship", "NBA Championship", "Boston Celtics"),
            ("MLB", "World Series", "World Series", "New York Yankees"),
        ]);
        testkit::insert_wager(&db, "W3", "GreenAleph", "Win", 20.0, 60.0, 40.0, &[
            ("MLB", "World Series", "World Series", "Los Angeles Dodgers"),
        ]);
        testkit::insert_wager(&db, "W4", "GreenAleph", "Loss", 15.0, 45.0, -15.0, &[
            ("NBA", "Most Valuable Player Award", "Award", "Nikola Jokic"),
        ]);
        testkit::insert_wager(&db, "W5", "OtherBank", "Active", 999.0, 2000.0, 0.0, &[
            ("NBA", "Championship", "NBA Championship", "Boston Celtics"),
        ]);

        let report = principal_report(&SqliteLedger::new(db), "GreenAleph").unwrap();
        assert_eq!(report.leagues.len(), 2);

        // Ascending by active stake: MLB 30, NBA 130.
        assert_eq!(report.leagues[0].league, "MLB");
        assert_eq!(report.leagues[0].active_stake, 30.0);
        assert_eq!(report.leagues[0].realized_profit, 40.0);
        assert_eq!(report.leagues[1].league, "NBA");
        assert_eq!(report.leagues[1].active_stake, 130.0);
        assert_eq!(report.leagues[1].realized_profit, -15.0);

        assert_eq!(report.total_active_stake, 130.0);
        assert_eq!(report.total_realized_profit, 25.0);
        assert_eq!(report.total_deployed, 130.0);
        assert_eq!(report.last_update.as_deref(), Some(testkit::PLACED_AT));
    }

    #[test]
    fn test_total_deployed_nets_active_profit() {
        let db = testkit::ledger_pool();
        testkit::insert_wager(&db, "W1", "GreenAleph", "Active", 200.0, 500.0, 35.0, &[
            ("NBA", "Championship", "NBA Championship", "Boston Celtics"),
            ("MLB", "World Series", "World Series", "New York Yankees"),
        ]);
        testkit::insert_wager(&db, "W2", "GreenAleph", "Active", 50.0, 150.0, 0.0, &[
            ("NBA", "Championship", "NBA Championship", "Denver Nuggets"),
        ]);
        // Settled profit does not reduce what is deployed.
        testkit::insert_wager(&db, "W3", "GreenAleph", "Win", 10.0, 30.0, 20.0, &[
            ("NBA", "Championship", "NBA Championship", "Denver Nuggets"),
        ]);

        let report = principal_report(&SqliteLedger::new(db), "GreenAleph").unwrap();
        assert_eq!(report.total_active_stake, 250.0);
        // W1 spans two leagues but is netted once.
        assert_eq!(report.total_deployed, 215.0);
    }

    #[test]
    fn test_empty_bankroll() {
        let report = principal_report(&SqliteLedger::new(testkit::ledger_pool()), "Nobody").unwrap();
        assert!(report.leagues.is_empty());
        assert_eq!(report.total_active_stake, 0.0);
        assert_eq!(report.total_deployed, 0.0);
        assert_eq!(report.last_update, None);
    }

    #[test]
    fn test_ledger_error_propagates() {
        let ledger = SqliteLedger::new(testkit::empty_pool());
        assert!(principal_report(&ledger, "GreenAleph").is_err());
    }
}
