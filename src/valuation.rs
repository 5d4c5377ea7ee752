//! Valuation: local price × shares → reporting-currency value and weight.
//!
//! Best effort. Rows with unusable shares or price are left out of the total
//! and reported as issues; rows in unknown currencies are valued at the
//! fallback rate. The result is an immutable [`Snapshot`].

use std::fmt;

use log::debug;
use rustc_hash::FxHashMap;

use crate::currency::CurrencyCode;
use crate::fx::RateTable;
use crate::holding::{self, Coerced, Holding};
use crate::issue::{Field, Issue, IssueKind};

/// Round to two decimals for display.
#[inline]
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// A holding with its reporting-currency value and portfolio weight.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ValuedHolding {
    pub ticker: String,
    pub name: String,
    pub category: String,
    pub currency: String,
    pub shares: f64,
    pub price: f64,
    /// Factor applied (fallback included).
    pub rate: f64,
    /// Full precision.
    pub value_reporting: f64,
    /// Full precision percentage of the snapshot total; 0 when the total is 0.
    pub weight_pct: f64,
    /// `None` when the row carries no usable target.
    pub target_weight_pct: Option<f64>,
}

impl ValuedHolding {
    /// Value in the holding's own currency.
    pub fn value_local(&self) -> f64 {
        self.shares * self.price
    }

    /// Weight rounded to 2 decimals.
    pub fn weight_display(&self) -> f64 {
        round2(self.weight_pct)
    }
}

/// Value and weight aggregated over a group of holdings.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Exposure {
    pub key: String,
    pub value_reporting: f64,
    pub weight_pct: f64,
    pub holdings: usize,
}

/// The valued and weighted portfolio at one evaluation instant.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Snapshot {
    reporting: CurrencyCode,
    holdings: Vec<ValuedHolding>,
    total_value: f64,
    issues: Vec<Issue>,
}

impl Snapshot {
    #[inline]
    pub fn reporting(&self) -> CurrencyCode {
        self.reporting
    }

    /// Valued holdings in input order (duplicates collapsed).
    pub fn holdings(&self) -> &[ValuedHolding] {
        &self.holdings
    }

    /// Sum of all holding values in the reporting currency.
    #[inline]
    pub fn total_value(&self) -> f64 {
        self.total_value
    }

    /// Issues met while valuing.
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// Find a holding by ticker (case-insensitive).
    pub fn get(&self, ticker: &str) -> Option<&ValuedHolding> {
        let key = holding::ticker_key(ticker);
        self.holdings
            .iter()
            .find(|h| holding::ticker_key(&h.ticker) == key)
    }

    /// True when nothing carries value (empty batch, all excluded, or all zero).
    pub fn is_empty_valued(&self) -> bool {
        self.total_value == 0.0
    }

    /// Sum of weights; ≈ 100 for any snapshot with value.
    pub fn weight_sum(&self) -> f64 {
        self.holdings.iter().map(|h| h.weight_pct).sum()
    }

    /// Exposure per category. Blank categories group under `"-"`.
    pub fn exposure_by_category(&self) -> Vec<Exposure> {
        self.exposure_by(|h| h.category.trim().to_string())
    }

    /// Exposure per holding currency (upper-cased).
    pub fn exposure_by_currency(&self) -> Vec<Exposure> {
        self.exposure_by(|h| h.currency.trim().to_ascii_uppercase())
    }

    /// Groups ordered by descending value; ties keep first appearance.
    fn exposure_by(&self, key_of: impl Fn(&ValuedHolding) -> String) -> Vec<Exposure> {
        let mut index: FxHashMap<String, usize> = FxHashMap::default();
        let mut groups: Vec<Exposure> = Vec::new();

        for h in &self.holdings {
            let mut key = key_of(h);
            if key.is_empty() {
                key = "-".to_string();
            }
            let idx = *index.entry(key.clone()).or_insert_with(|| {
                groups.push(Exposure {
                    key,
                    value_reporting: 0.0,
                    weight_pct: 0.0,
                    holdings: 0,
                });
                groups.len() - 1
            });
            let group = &mut groups[idx];
            group.value_reporting += h.value_reporting;
            group.weight_pct += h.weight_pct;
            group.holdings += 1;
        }

        groups.sort_by(|a, b| b.value_reporting.total_cmp(&a.value_reporting));
        groups
    }
}

/// Value a batch of holdings against a rate table.
///
/// Duplicate tickers collapse (last row wins). The reporting currency is the
/// table's.
pub fn value(holdings: &[Holding], table: &RateTable) -> Snapshot {
    let (rows, mut issues) = holding::collapse_duplicates(holdings);
    let mut valued = Vec::with_capacity(rows.len());
    let mut total_value = 0.0_f64;

    for h in rows {
        let shares = holding::required(h, &h.shares, Field::Shares, &mut issues);
        let price = holding::required(h, &h.price, Field::Price, &mut issues);
        let (Some(shares), Some(price)) = (shares, price) else {
            debug!("excluding {} from valuation", h.ticker);
            continue;
        };

        let lookup = table.lookup(&h.currency);
        if lookup.is_fallback() {
            issues.push(Issue::new(
                &h.ticker,
                IssueKind::MissingRate {
                    currency: h.currency.clone(),
                },
            ));
        }
        let rate = lookup.factor();

        // total_value must stay finite
        let value_reporting = shares * price * rate;
        if !(value_reporting + total_value).is_finite() {
            debug!("{}: value overflows, excluded", h.ticker);
            issues.push(Issue::new(
                &h.ticker,
                IssueKind::InvalidNumeric {
                    field: Field::Shares,
                    raw: h.shares.raw(),
                },
            ));
            continue;
        }
        total_value += value_reporting;

        valued.push(ValuedHolding {
            ticker: h.ticker.trim().to_string(),
            name: h.name.clone(),
            category: h.category.clone(),
            currency: h.currency.trim().to_ascii_uppercase(),
            shares,
            price,
            rate,
            value_reporting,
            weight_pct: 0.0,
            target_weight_pct: target_of(h, &mut issues),
        });
    }

    if total_value > 0.0 {
        for h in &mut valued {
            h.weight_pct = h.value_reporting / total_value * 100.0;
        }
    }

    Snapshot {
        reporting: table.reporting(),
        holdings: valued,
        total_value,
        issues,
    }
}

/// Optional target weight; values above 100 are invalid.
fn target_of(h: &Holding, issues: &mut Vec<Issue>) -> Option<f64> {
    match h.target_weight_pct.coerce() {
        Coerced::Absent => None,
        Coerced::Value(v) if v <= 100.0 => Some(v),
        Coerced::Value(_) | Coerced::Invalid => {
            issues.push(Issue::new(
                &h.ticker,
                IssueKind::InvalidNumeric {
                    field: Field::TargetWeight,
                    raw: h.target_weight_pct.raw(),
                },
            ));
            None
        }
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<10} {:<24} {:>10} {:>10} {:<4} {:>14} {:>8}",
            "TICKER",
            "NAME",
            "SHARES",
            "PRICE",
            "CCY",
            format!("VALUE {}", self.reporting),
            "WEIGHT"
        )?;
        for h in &self.holdings {
            writeln!(
                f,
                "{:<10} {:<24} {:>10.2} {:>10.2} {:<4} {:>14.2} {:>7.2}%",
                h.ticker,
                truncate(&h.name, 24),
                h.shares,
                h.price,
                h.currency,
                h.value_reporting,
                h.weight_display(),
            )?;
        }
        writeln!(
            f,
            "{:<10} {:<24} {:>10} {:>10} {:<4} {:>14.2}",
            "TOTAL", "", "", "", "", self.total_value
        )
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max - 1).chain(std::iter::once('…')).collect()
    }
}
