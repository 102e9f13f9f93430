use crate::catalogue::MarketKey;
use crate::errors::EngineError;
use smallvec::SmallVec;

/// WLCA column of the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum WagerStatus {
    Active,
    Win,
    Loss,
    Cashout,
}

impl WagerStatus {
    pub const SETTLED: [WagerStatus; 3] = [WagerStatus::Win, WagerStatus::Loss, WagerStatus::Cashout];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Win => "Win",
            Self::Loss => "Loss",
            Self::Cashout => "Cashout",
        }
    }

    #[inline]
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Active)
    }
}

impl std::fmt::Display for WagerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WagerStatus {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Active" => Ok(Self::Active),
            "Win" => Ok(Self::Win),
            "Loss" => Ok(Self::Loss),
            "Cashout" => Ok(Self::Cashout),
            other => Err(EngineError::Parse(format!("unknown wager status: {other:?}"))),
        }
    }
}

/// One constituent bet of a wager. Odds are resolved at evaluation time.
#[derive(Debug, Clone, PartialEq)]
pub struct Leg {
    pub market: MarketKey,
    pub participant: String,
}

#[derive(Debug, Clone)]
pub struct Wager {
    pub id: String,
    pub stake: f64,
    pub potential_payout: f64,
    pub net_profit: f64,
    pub status: WagerStatus,
    /// Parlays rarely exceed four legs.
    pub legs: SmallVec<[Leg; 4]>,
}

impl Wager {
    #[inline]
    pub fn is_parlay(&self) -> bool {
        self.legs.len() > 1
    }
}

/// Flat wager-leg join row as returned by the ledger.
#[derive(Debug, Clone)]
pub struct LedgerRow {
    pub wager_id: String,
    pub stake: f64,
    pub potential_payout: f64,
    pub net_profit: f64,
    pub status: String,
    pub event_type: String,
    pub event_label: String,
    pub participant: String,
}

/// Distinct (wager, league) pair for the principal report.
#[derive(Debug, Clone)]
pub struct PrincipalRow {
    pub wager_id: String,
    pub league: String,
    pub status: WagerStatus,
    pub stake: f64,
    pub net_profit: f64,
}

/// One leg of an active wager, with the wager's money columns repeated.
#[derive(Debug, Clone)]
pub struct PositionLeg {
    pub wager_id: String,
    pub leg_count: u32,
    pub event_type: String,
    pub event_label: String,
    pub participant: String,
    pub stake: f64,
    pub potential_payout: f64,
}
