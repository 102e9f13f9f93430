/// American odds helpers.
///
/// All functions are pure and total: a zero or missing price maps to the
/// sentinels (decimal 1.0, probability 0.0) instead of an error.

use rusqlite::types::ValueRef;

/// A sportsbook price as it comes out of the quote store, before parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum RawOdds {
    Missing,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl From<ValueRef<'_>> for RawOdds {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => RawOdds::Missing,
            ValueRef::Integer(i) => RawOdds::Integer(i),
            ValueRef::Real(f) => RawOdds::Real(f),
            ValueRef::Text(t) => RawOdds::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => RawOdds::Text(String::from_utf8_lossy(b).into_owned()),
        }
    }
}

/// Convert American odds to decimal odds.
/// Positive odds (e.g., +150): 1 + 150/100 = 2.5
/// Negative odds (e.g., -200): 1 + 100/200 = 1.5
/// Zero: 1.0 (no excess odds)
pub fn to_decimal(odds: i64) -> f64 {
    if odds > 0 {
        1.0 + odds as f64 / 100.0
    } else if odds < 0 {
        1.0 + 100.0 / odds.unsigned_abs() as f64
    } else {
        1.0
    }
}

/// Convert American odds to implied probability (vig still included).
/// Positive odds (e.g., +150): prob = 100 / (odds + 100)
/// Negative odds (e.g., -150): prob = |odds| / (|odds| + 100)
/// Zero: 0.0 (unpriced)
pub fn to_implied_probability(odds: i64) -> f64 {
    if odds > 0 {
        100.0 / (odds as f64 + 100.0)
    } else if odds < 0 {
        let abs = odds.unsigned_abs() as f64;
        abs / (abs + 100.0)
    } else {
        0.0
    }
}

/// Best-effort parse of a stored price into American odds. Never fails;
/// anything unusable becomes 0.
pub fn parse_odds(raw: &RawOdds) -> i64 {
    match raw {
        RawOdds::Missing => 0,
        RawOdds::Integer(i) => *i,
        RawOdds::Real(f) if f.is_finite() => f.trunc() as i64,
        RawOdds::Real(_) => 0,
        RawOdds::Text(s) => first_signed_integer(s).unwrap_or(0),
    }
}

/// First `[-+]?[0-9]+` token in `s`.
fn first_signed_integer(s: &str) -> Option<i64> {
    let bytes = s.as_bytes();
    let start = bytes.iter().position(|b| b.is_ascii_digit())?;
    let end = bytes[start..]
        .iter()
        .position(|b| !b.is_ascii_digit())
        .map_or(bytes.len(), |n| start + n);

    let negative = start > 0 && bytes[start - 1] == b'-';
    let digits = &s[start..end];
    let value = digits.parse::<i64>().ok()?;
    Some(if negative { -value } else { value })
}
