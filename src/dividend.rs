//! Dividend income forecast.
//!
//! Selects holdings whose next dividend falls at or after the evaluation
//! date, converts the expected payout into the reporting currency, and
//! buckets it by month.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use log::debug;

use crate::currency::CurrencyCode;
use crate::fx::RateTable;
use crate::holding::{self, Coerced, Holding};
use crate::issue::{Field, Issue, IssueKind};
use crate::period::{EventDate, Period};

/// One holding's expected payout.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ForecastEntry {
    pub ticker: String,
    pub name: String,
    pub period: Period,
    pub date: String,
    pub currency: String,
    pub shares: f64,
    pub dividend_per_share: f64,
    pub rate: f64,
    pub expected_income_reporting: f64,
}

/// Expected income for one month.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ForecastBucket {
    pub period: Period,
    pub total: f64,
    pub entries: Vec<ForecastEntry>,
}

/// Expected dividend income, grouped by month.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Forecast {
    reporting: CurrencyCode,
    as_of: NaiveDate,
    buckets: Vec<ForecastBucket>,
    total: f64,
    issues: Vec<Issue>,
}

impl Forecast {
    #[inline]
    pub fn reporting(&self) -> CurrencyCode {
        self.reporting
    }

    #[inline]
    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    /// Non-empty buckets in chronological order.
    pub fn buckets(&self) -> &[ForecastBucket] {
        &self.buckets
    }

    /// The bucket for `period`, if any income is expected then.
    pub fn bucket(&self, period: Period) -> Option<&ForecastBucket> {
        self.buckets.iter().find(|b| b.period == period)
    }

    /// All entries, chronologically by bucket.
    pub fn entries(&self) -> impl Iterator<Item = &ForecastEntry> {
        self.buckets.iter().flat_map(|b| b.entries.iter())
    }

    /// Sum over every qualifying holding.
    #[inline]
    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }
}

impl fmt::Display for Forecast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "DIVIDEND FORECAST (from {}):", self.as_of.format("%Y-%m-%d"))?;
        for bucket in &self.buckets {
            writeln!(f, "  {}  {:>14.2} {}", bucket.period, bucket.total, self.reporting)?;
            for e in &bucket.entries {
                writeln!(
                    f,
                    "      {:<10} {:>10} {:>10.2} × {:>8.4} {:<4} {:>14.2}",
                    e.ticker,
                    e.date,
                    e.shares,
                    e.dividend_per_share,
                    e.currency,
                    e.expected_income_reporting,
                )?;
            }
        }
        writeln!(f, "  TOTAL    {:>14.2} {}", self.total, self.reporting)
    }
}

/// Forecast upcoming dividend income as of `as_of`.
///
/// A holding contributes when its dividend date parses and is not before
/// `as_of`, its dividend per share is positive, and its share count is
/// usable. Rows without dividend data are skipped silently; malformed
/// dividend cells are reported as issues.
pub fn forecast(holdings: &[Holding], table: &RateTable, as_of: NaiveDate) -> Forecast {
    let (rows, mut issues) = holding::collapse_duplicates(holdings);
    let mut buckets: BTreeMap<Period, ForecastBucket> = BTreeMap::new();
    let mut running = 0.0_f64;

    for h in rows {
        let per_share = match h.dividend_per_share.coerce() {
            Coerced::Value(v) if v > 0.0 => v,
            Coerced::Value(_) | Coerced::Absent => continue,
            Coerced::Invalid => {
                issues.push(Issue::new(
                    &h.ticker,
                    IssueKind::InvalidNumeric {
                        field: Field::DividendPerShare,
                        raw: h.dividend_per_share.raw(),
                    },
                ));
                continue;
            }
        };

        if h.dividend_date.trim().is_empty() {
            continue;
        }
        let Some(date) = EventDate::parse(&h.dividend_date) else {
            issues.push(Issue::new(
                &h.ticker,
                IssueKind::UnparseableDate {
                    raw: h.dividend_date.clone(),
                },
            ));
            continue;
        };
        if !date.is_on_or_after(as_of) {
            debug!("{}: dividend {date} already paid", h.ticker);
            continue;
        }

        let Some(shares) = holding::required(h, &h.shares, Field::Shares, &mut issues) else {
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
        let income = shares * per_share * rate;
        // zero-income entries never open a bucket
        if income <= 0.0 {
            continue;
        }
        if !(income + running).is_finite() {
            debug!("{}: dividend income overflows, excluded", h.ticker);
            issues.push(Issue::new(
                &h.ticker,
                IssueKind::InvalidNumeric {
                    field: Field::DividendPerShare,
                    raw: h.dividend_per_share.raw(),
                },
            ));
            continue;
        }
        running += income;

        let period = date.period();
        let bucket = buckets.entry(period).or_insert_with(|| ForecastBucket {
            period,
            total: 0.0,
            entries: Vec::new(),
        });
        bucket.total += income;
        bucket.entries.push(ForecastEntry {
            ticker: h.ticker.trim().to_string(),
            name: h.name.clone(),
            period,
            date: date.to_string(),
            currency: h.currency.trim().to_ascii_uppercase(),
            shares,
            dividend_per_share: per_share,
            rate,
            expected_income_reporting: income,
        });
    }

    let buckets: Vec<ForecastBucket> = buckets.into_values().collect();
    let total = buckets.iter().map(|b| b.total).sum();

    Forecast {
        reporting: table.reporting(),
        as_of,
        buckets,
        total,
        issues,
    }
}
