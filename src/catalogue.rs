/// Static market catalogue: which (EventType, EventLabel) markets are tracked,
/// where their quotes live, how much vig to strip, and how ledger participant
/// names map onto quote-store names.
///
/// Built once at startup and passed by reference; never mutated afterwards.

use crate::errors::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// One row of the EV table. Ordering is (event_type, event_label).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MarketKey {
    pub event_type: String,
    pub event_label: String,
}

impl MarketKey {
    pub fn new(event_type: impl Into<String>, event_label: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            event_label: event_label.into(),
        }
    }
}

impl std::fmt::Display for MarketKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} / {}", self.event_type, self.event_label)
    }
}

#[derive(Debug, Clone)]
pub struct MarketSource {
    /// Quote-store table holding this market's snapshots.
    pub table: String,
    /// Per-market overround override.
    pub vig: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct MarketCatalogue {
    markets: BTreeMap<MarketKey, MarketSource>,
    aliases: HashMap<String, String>,
    sportsbooks: Vec<String>,
    default_vig: f64,
}

/// Tracked-market listing for the read API.
#[derive(Debug, Clone, Serialize)]
pub struct TrackedMarket {
    pub event_type: String,
    pub event_label: String,
    pub table: String,
    pub vig: f64,
}

// ── On-disk format ──

#[derive(Debug, Deserialize)]
struct CatalogueFile {
    default_vig: Option<f64>,
    sportsbooks: Vec<String>,
    markets: Vec<MarketEntry>,
    #[serde(default)]
    aliases: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct MarketEntry {
    event_type: String,
    event_label: String,
    table: String,
    vig: Option<f64>,
}

const NBA_FUTURES: &[(&str, &str, &str)] = &[
    ("Championship", "NBA Championship", "NBAChampionship"),
    ("Conference Winner", "Eastern Conference", "NBAEasternConference"),
    ("Conference Winner", "Western Conference", "NBAWesternConference"),
    ("Defensive Player of Year Award", "Award", "NBADefensivePotY"),
    ("Division Winner", "Atlantic Division", "NBAAtlantic"),
    ("Division Winner", "Central Division", "NBACentral"),
    ("Division Winner", "Northwest Division", "NBANorthwest"),
    ("Division Winner", "Pacific Division", "NBAPacific"),
    ("Division Winner", "Southeast Division", "NBASoutheast"),
    ("Division Winner", "Southwest Division", "NBASouthwest"),
    ("Most Improved Player Award", "Award", "NBAMIP"),
    ("Most Valuable Player Award", "Award", "NBAMVP"),
    ("Rookie of Year Award", "Award", "NBARotY"),
    ("Sixth Man of Year Award", "Award", "NBASixthMotY"),
];

const NBA_SPORTSBOOKS: &[&str] = &[
    "BetMGM",
    "DraftKings",
    "Caesars",
    "ESPNBet",
    "FanDuel",
    "BallyBet",
    "RiversCasino",
    "Bet365",
];

const NBA_ALIASES: &[(&str, &str)] = &[
    ("LA Clippers", "Los Angeles Clippers"),
    ("LA Lakers", "Los Angeles Lakers"),
    ("Philadelphia 76ers", "Philadelphia Sixers"),
];

impl MarketCatalogue {
    pub fn new(
        markets: BTreeMap<MarketKey, MarketSource>,
        aliases: HashMap<String, String>,
        sportsbooks: Vec<String>,
        default_vig: f64,
    ) -> EngineResult<Self> {
        if !(0.0..1.0).contains(&default_vig) {
            return Err(EngineError::Config(format!("default vig out of range: {default_vig}")));
        }
        if sportsbooks.is_empty() {
            return Err(EngineError::Config("catalogue lists no sportsbooks".into()));
        }
        for book in &sportsbooks {
            ensure_identifier(book)?;
        }
        for (key, source) in &markets {
            ensure_identifier(&source.table)?;
            if let Some(vig) = source.vig {
                if !(0.0..1.0).contains(&vig) {
                    return Err(EngineError::Config(format!("vig out of range for {key}: {vig}")));
                }
            }
        }
        Ok(Self {
            markets,
            aliases,
            sportsbooks,
            default_vig,
        })
    }

    /// Built-in NBA futures catalogue.
    pub fn nba_futures(default_vig: f64) -> EngineResult<Self> {
        let markets = NBA_FUTURES
            .iter()
            .map(|(et, el, table)| {
                (
                    MarketKey::new(*et, *el),
                    MarketSource { table: (*table).to_string(), vig: None },
                )
            })
            .collect();
        let aliases = NBA_ALIASES
            .iter()
            .map(|(from, to)| ((*from).to_string(), (*to).to_string()))
            .collect();
        let sportsbooks = NBA_SPORTSBOOKS.iter().map(|s| (*s).to_string()).collect();
        Self::new(markets, aliases, sportsbooks, default_vig)
    }

    /// Load a catalogue from JSON. `fallback_vig` applies when the file has no
    /// `default_vig` of its own.
    pub fn from_json(json: &str, fallback_vig: f64) -> EngineResult<Self> {
        let file: CatalogueFile = serde_json::from_str(json)?;
        let mut markets = BTreeMap::new();
        for entry in file.markets {
            let key = MarketKey::new(entry.event_type, entry.event_label);
            let source = MarketSource { table: entry.table, vig: entry.vig };
            if markets.insert(key.clone(), source).is_some() {
                return Err(EngineError::Config(format!("duplicate market in catalogue: {key}")));
            }
        }
        Self::new(
            markets,
            file.aliases,
            file.sportsbooks,
            file.default_vig.unwrap_or(fallback_vig),
        )
    }

    pub fn load(path: &Path, fallback_vig: f64) -> EngineResult<Self> {
        let json = std::fs::read_to_string(path)?;
        let catalogue = Self::from_json(&json, fallback_vig)?;
        tracing::info!(
            path = %path.display(),
            markets = catalogue.markets.len(),
            sportsbooks = catalogue.sportsbooks.len(),
            "catalogue loaded"
        );
        Ok(catalogue)
    }

    pub fn source(&self, key: &MarketKey) -> Option<&MarketSource> {
        self.markets.get(key)
    }

    pub fn vig_for(&self, key: &MarketKey) -> f64 {
        self.markets
            .get(key)
            .and_then(|s| s.vig)
            .unwrap_or(self.default_vig)
    }

    /// Quote-store name for a ledger participant; unknown names pass through.
    pub fn canonical_participant<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases.get(name).map(String::as_str).unwrap_or(name)
    }

    pub fn sportsbooks(&self) -> &[String] {
        &self.sportsbooks
    }

    /// Tracked markets in (event_type, event_label) order.
    pub fn keys(&self) -> impl Iterator<Item = &MarketKey> {
        self.markets.keys()
    }

    pub fn market_count(&self) -> usize {
        self.markets.len()
    }

    pub fn tracked_markets(&self) -> Vec<TrackedMarket> {
        self.markets
            .iter()
            .map(|(key, source)| TrackedMarket {
                event_type: key.event_type.clone(),
                event_label: key.event_label.clone(),
                table: source.table.clone(),
                vig: self.vig_for(key),
            })
            .collect()
    }
}

/// Table and column names are spliced into SQL, so only plain identifiers pass.
fn ensure_identifier(name: &str) -> EngineResult<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(EngineError::Config(format!("not a plain SQL identifier: {name:?}")))
    }
}
