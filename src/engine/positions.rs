/// Active exposure for one bankroll and league.
///
/// Straight bets are grouped by (EventType, participant) with a subtotal per
/// EventType and a cumulative total. Implied probability of a group is
/// sum(stake) / sum(potential payout), i.e. the break-even price paid.
/// Parlay legs are listed as-is, since their money cannot be pinned to one
/// participant.

use super::table::round2;
use crate::errors::EngineResult;
use crate::ledger::WagerLedger;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionLine {
    pub participant: String,
    pub stake: f64,
    pub potential_payout: f64,
    /// `None` when the payouts sum to zero.
    pub implied_probability: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventTypePositions {
    pub event_type: String,
    pub positions: Vec<PositionLine>,
    pub subtotal_stake: f64,
    pub subtotal_payout: f64,
    pub implied_probability: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParlayLeg {
    pub wager_id: String,
    pub event_type: String,
    pub event_label: String,
    pub participant: String,
    pub stake: f64,
    pub potential_payout: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PositionsReport {
    pub bankroll: String,
    pub league: String,
    pub straights: Vec<EventTypePositions>,
    pub total_stake: f64,
    pub total_payout: f64,
    pub implied_probability: Option<f64>,
    pub parlay_legs: Vec<ParlayLeg>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Sums {
    stake: f64,
    payout: f64,
}

impl Sums {
    fn add(&mut self, stake: f64, payout: f64) {
        self.stake += stake;
        self.payout += payout;
    }

    fn implied_probability(&self) -> Option<f64> {
        (self.payout > 0.0).then(|| self.stake / self.payout)
    }
}

pub fn positions_report<L: WagerLedger + ?Sized>(
    ledger: &L,
    bankroll: &str,
    league: &str,
) -> EngineResult<PositionsReport> {
    let legs = ledger.active_positions(bankroll, league)?;

    let mut grouped: BTreeMap<String, BTreeMap<String, Sums>> = BTreeMap::new();
    let mut cumulative = Sums::default();
    let mut parlay_legs = Vec::new();

    for leg in legs {
        if leg.leg_count == 1 {
            grouped
                .entry(leg.event_type)
                .or_default()
                .entry(leg.participant)
                .or_default()
                .add(leg.stake, leg.potential_payout);
            cumulative.add(leg.stake, leg.potential_payout);
        } else {
            parlay_legs.push(ParlayLeg {
                wager_id: leg.wager_id,
                event_type: leg.event_type,
                event_label: leg.event_label,
                participant: leg.participant,
                stake: round2(leg.stake),
                potential_payout: round2(leg.potential_payout),
            });
        }
    }

    let straights = grouped
        .into_iter()
        .map(|(event_type, participants)| {
            let mut subtotal = Sums::default();
            let positions = participants
                .into_iter()
                .map(|(participant, sums)| {
                    subtotal.add(sums.stake, sums.payout);
                    PositionLine {
                        participant,
                        stake: round2(sums.stake),
                        potential_payout: round2(sums.payout),
                        implied_probability: sums.implied_probability(),
                    }
                })
                .collect();
            EventTypePositions {
                event_type,
                positions,
                subtotal_stake: round2(subtotal.stake),
                subtotal_payout: round2(subtotal.payout),
                implied_probability: subtotal.implied_probability(),
            }
        })
        .collect::<Vec<_>>();

    tracing::debug!(
        bankroll,
        league,
        event_types = straights.len(),
        parlay_legs = parlay_legs.len(),
        "positions report built"
    );

    Ok(PositionsReport {
        bankroll: bankroll.to_string(),
        league: league.to_string(),
        straights,
        total_stake: round2(cumulative.stake),
        total_payout: round2(cumulative.payout),
        implied_probability: cumulative.implied_probability(),
        parlay_legs,
    })
}
