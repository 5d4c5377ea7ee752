//! Holding rows as delivered by the backing store.
//!
//! Numeric columns arrive loosely typed (a number, a text cell, or nothing)
//! and are coerced per computation, so one bad cell never rejects the batch.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::issue::{Field, Issue, IssueKind};

/// A loosely-typed numeric cell.
#[derive(Clone, Debug, PartialEq)]
pub enum Numeric {
    Number(f64),
    Text(String),
}

/// Result of coercing a [`Numeric`] cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Coerced {
    /// Empty cell.
    Absent,
    /// Finite, non-negative value.
    Value(f64),
    /// Present but unusable.
    Invalid,
}

impl Default for Numeric {
    fn default() -> Self {
        Numeric::Text(String::new())
    }
}

impl From<f64> for Numeric {
    fn from(v: f64) -> Self {
        Numeric::Number(v)
    }
}

impl From<&str> for Numeric {
    fn from(s: &str) -> Self {
        Numeric::Text(s.to_string())
    }
}

impl From<String> for Numeric {
    fn from(s: String) -> Self {
        Numeric::Text(s)
    }
}

impl Numeric {
    /// Coerce to a non-negative finite number.
    ///
    /// Text accepts a decimal comma (`"12,5"`) and whitespace digit grouping
    /// (`"1 250"`).
    pub fn coerce(&self) -> Coerced {
        match self {
            Numeric::Number(v) => check(*v),
            Numeric::Text(raw) => {
                let cleaned: String = raw
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .map(|c| if c == ',' { '.' } else { c })
                    .collect();
                if cleaned.is_empty() {
                    return Coerced::Absent;
                }
                match cleaned.parse::<f64>() {
                    Ok(v) => check(v),
                    Err(_) => Coerced::Invalid,
                }
            }
        }
    }

    /// The coerced value, or `None` when absent or invalid.
    pub fn value(&self) -> Option<f64> {
        match self.coerce() {
            Coerced::Value(v) => Some(v),
            _ => None,
        }
    }

    /// The raw cell as text, for issue reports.
    pub fn raw(&self) -> String {
        match self {
            Numeric::Number(v) => v.to_string(),
            Numeric::Text(s) => s.clone(),
        }
    }
}

fn check(v: f64) -> Coerced {
    if v.is_finite() && v >= 0.0 {
        Coerced::Value(v)
    } else {
        Coerced::Invalid
    }
}

impl fmt::Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Numeric::Number(v) => write!(f, "{v}"),
            Numeric::Text(s) => f.write_str(s),
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Numeric {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Numeric::Number(v) => serializer.serialize_f64(*v),
            Numeric::Text(s) => serializer.serialize_str(s),
        }
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Numeric {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct NumericVisitor;

        impl serde::de::Visitor<'_> for NumericVisitor {
            type Value = Numeric;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a number, a text cell, or nothing")
            }

            fn visit_f64<E: serde::de::Error>(self, v: f64) -> Result<Numeric, E> {
                Ok(Numeric::Number(v))
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Numeric, E> {
                Ok(Numeric::Number(v as f64))
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Numeric, E> {
                Ok(Numeric::Number(v as f64))
            }

            fn visit_i128<E: serde::de::Error>(self, v: i128) -> Result<Numeric, E> {
                Ok(Numeric::Number(v as f64))
            }

            fn visit_u128<E: serde::de::Error>(self, v: u128) -> Result<Numeric, E> {
                Ok(Numeric::Number(v as f64))
            }

            fn visit_bool<E: serde::de::Error>(self, v: bool) -> Result<Numeric, E> {
                Ok(Numeric::Text(v.to_string()))
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Numeric, E> {
                Ok(Numeric::Text(v.to_string()))
            }

            fn visit_string<E: serde::de::Error>(self, v: String) -> Result<Numeric, E> {
                Ok(Numeric::Text(v))
            }

            fn visit_unit<E: serde::de::Error>(self) -> Result<Numeric, E> {
                Ok(Numeric::default())
            }

            fn visit_none<E: serde::de::Error>(self) -> Result<Numeric, E> {
                Ok(Numeric::default())
            }
        }

        deserializer.deserialize_any(NumericVisitor)
    }
}

/// One row of the portfolio.
///
/// Only `ticker`, `shares`, `price` and `currency` are required for
/// valuation; everything else defaults to empty.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Holding {
    pub ticker: String,
    #[cfg_attr(feature = "serde", serde(alias = "company"))]
    pub name: String,
    pub shares: Numeric,
    pub price: Numeric,
    pub currency: String,
    pub category: String,
    pub target_weight_pct: Numeric,
    pub dividend_per_share: Numeric,
    pub dividend_date: String,
    pub comment: String,
}

impl Holding {
    /// Create a holding with the required fields set.
    pub fn new(ticker: &str, shares: f64, price: f64, currency: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            shares: Numeric::Number(shares),
            price: Numeric::Number(price),
            currency: currency.to_string(),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }

    pub fn with_target(mut self, weight_pct: f64) -> Self {
        self.target_weight_pct = Numeric::Number(weight_pct);
        self
    }

    pub fn with_dividend(mut self, per_share: f64, date: &str) -> Self {
        self.dividend_per_share = Numeric::Number(per_share);
        self.dividend_date = date.to_string();
        self
    }

    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = comment.to_string();
        self
    }

    /// Normalized lookup key: trimmed, upper-case ticker.
    pub fn key(&self) -> String {
        ticker_key(&self.ticker)
    }
}

/// Normalize a ticker for keyed comparisons.
pub fn ticker_key(ticker: &str) -> String {
    ticker.trim().to_ascii_uppercase()
}

/// Collapse duplicate tickers: the last occurrence wins, kept at the position
/// of the first. Rows with a blank ticker are skipped.
pub fn collapse_duplicates(holdings: &[Holding]) -> (Vec<&Holding>, Vec<Issue>) {
    let mut slots: FxHashMap<String, usize> = FxHashMap::default();
    let mut rows: Vec<&Holding> = Vec::with_capacity(holdings.len());
    let mut issues = Vec::new();

    for holding in holdings {
        let key = holding.key();
        if key.is_empty() {
            issues.push(Issue::new(
                "",
                IssueKind::MissingTicker {
                    name: holding.name.clone(),
                },
            ));
            continue;
        }
        match slots.get(&key) {
            Some(&idx) => {
                rows[idx] = holding;
                issues.push(Issue::new(&holding.ticker, IssueKind::DuplicateTicker));
            }
            None => {
                slots.insert(key, rows.len());
                rows.push(holding);
            }
        }
    }

    (rows, issues)
}

/// Coerce a required numeric field. Absent and invalid both exclude the row.
pub(crate) fn required(
    holding: &Holding,
    cell: &Numeric,
    field: Field,
    issues: &mut Vec<Issue>,
) -> Option<f64> {
    match cell.coerce() {
        Coerced::Value(v) => Some(v),
        Coerced::Absent | Coerced::Invalid => {
            issues.push(Issue::new(
                &holding.ticker,
                IssueKind::InvalidNumeric {
                    field,
                    raw: cell.raw(),
                },
            ));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerce_numbers_and_text() {
        assert_eq!(Numeric::from(12.5).coerce(), Coerced::Value(12.5));
        assert_eq!(Numeric::from("12.5").coerce(), Coerced::Value(12.5));
        assert_eq!(Numeric::from(" 12,5 ").coerce(), Coerced::Value(12.5));
        assert_eq!(Numeric::from("1 250").coerce(), Coerced::Value(1250.0));
        assert_eq!(Numeric::from("1\u{a0}250,75").coerce(), Coerced::Value(1250.75));
    }

    #[test]
    fn coerce_absent_and_invalid() {
        assert_eq!(Numeric::default().coerce(), Coerced::Absent);
        assert_eq!(Numeric::from("   ").coerce(), Coerced::Absent);
        assert_eq!(Numeric::from("ten").coerce(), Coerced::Invalid);
        assert_eq!(Numeric::from("-3").coerce(), Coerced::Invalid);
        assert_eq!(Numeric::from(f64::NAN).coerce(), Coerced::Invalid);
        assert_eq!(Numeric::from("inf").coerce(), Coerced::Invalid);
    }

    #[test]
    fn value_helper() {
        assert_eq!(Numeric::from("3").value(), Some(3.0));
        assert_eq!(Numeric::from("x").value(), None);
        assert_eq!(Numeric::default().value(), None);
    }

    #[test]
    fn builder_sets_fields() {
        let h = Holding::new("ko", 10.0, 60.0, "USD")
            .with_name("Coca-Cola")
            .with_category("income")
            .with_target(5.0)
            .with_dividend(0.51, "2026-12-15");
        assert_eq!(h.key(), "KO");
        assert_eq!(h.target_weight_pct.value(), Some(5.0));
        assert_eq!(h.dividend_date, "2026-12-15");
    }

    #[test]
    fn duplicates_last_wins_at_first_position() {
        let rows = vec![
            Holding::new("AAPL", 1.0, 100.0, "USD"),
            Holding::new("MSFT", 2.0, 300.0, "USD"),
            Holding::new("aapl ", 5.0, 110.0, "USD"),
        ];
        let (kept, issues) = collapse_duplicates(&rows);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].shares.value(), Some(5.0));
        assert_eq!(kept[1].ticker, "MSFT");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::DuplicateTicker);
    }

    #[test]
    fn blank_ticker_skipped() {
        let rows = vec![
            Holding::new("  ", 1.0, 1.0, "SEK").with_name("Mystery AB"),
            Holding::new("VOLV-B", 10.0, 250.0, "SEK"),
        ];
        let (kept, issues) = collapse_duplicates(&rows);
        assert_eq!(kept.len(), 1);
        assert_eq!(issues[0].ticker, "");
        assert_eq!(
            issues[0].kind,
            IssueKind::MissingTicker {
                name: "Mystery AB".into()
            }
        );
    }
}
