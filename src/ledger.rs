//! Realized dividend income per month.
//!
//! The ledger holds raw rows as the backing store returns them, so a row
//! with a garbled period or amount survives a round trip untouched. Writes
//! are keyed by [`Period`]: recording a month that already exists overwrites
//! it in place. Reads return only clean rows, one per month, in order.

use std::collections::BTreeMap;
use std::fmt;

use log::debug;

use crate::error::{Error, Result};
use crate::holding::Numeric;
use crate::period::Period;

/// A stored ledger row, possibly malformed.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LedgerRow {
    pub period_key: String,
    pub amount: Numeric,
}

/// A clean history entry.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DividendLedgerEntry {
    pub period: Period,
    pub total_income_reporting: f64,
}

/// Instruction for the persistence layer after a [`Ledger::record`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LedgerWrite {
    pub period: Period,
    pub amount: f64,
    /// Row index written.
    pub row: usize,
    /// True if a new row was appended.
    pub appended: bool,
    /// Clean amount previously stored for the period, if any.
    pub previous: Option<f64>,
}

impl LedgerWrite {
    /// False for a rewrite of an identical amount.
    pub fn changed(&self) -> bool {
        self.previous != Some(self.amount)
    }
}

/// Per-period dividend ledger.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Ledger {
    rows: Vec<LedgerRow>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap rows loaded from storage.
    pub fn from_rows(rows: Vec<LedgerRow>) -> Self {
        Self { rows }
    }

    /// Raw rows in storage order.
    pub fn rows(&self) -> &[LedgerRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<LedgerRow> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Record `amount` for `period`, overwriting any row for the same month.
    ///
    /// Rows are matched by parsed period, so `2026-11` and `2026/11` address
    /// the same slot. The overwritten row's key is normalized to `YYYY-MM`.
    /// If storage already holds several rows for the month, the last one is
    /// written, since that is the one [`history`](Self::history) reads.
    pub fn record(&mut self, period: Period, amount: f64) -> Result<LedgerWrite> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(Error::InvalidAmount(amount));
        }

        let existing = self
            .rows
            .iter()
            .rposition(|r| Period::parse(&r.period_key) == Some(period));

        let write = match existing {
            Some(row) => {
                let previous = self.rows[row].amount.value();
                self.rows[row] = LedgerRow {
                    period_key: period.to_string(),
                    amount: Numeric::Number(amount),
                };
                LedgerWrite {
                    period,
                    amount,
                    row,
                    appended: false,
                    previous,
                }
            }
            None => {
                self.rows.push(LedgerRow {
                    period_key: period.to_string(),
                    amount: Numeric::Number(amount),
                });
                LedgerWrite {
                    period,
                    amount,
                    row: self.rows.len() - 1,
                    appended: true,
                    previous: None,
                }
            }
        };
        debug!("ledger {period}: {amount:.2} (row {})", write.row);
        Ok(write)
    }

    /// The clean amount stored for `period`.
    pub fn get(&self, period: Period) -> Option<f64> {
        self.history()
            .into_iter()
            .find(|e| e.period == period)
            .map(|e| e.total_income_reporting)
    }

    /// Clean entries ordered by period. Rows whose key or amount cannot be
    /// parsed are dropped; if storage holds two rows for one month, the
    /// later row wins.
    pub fn history(&self) -> Vec<DividendLedgerEntry> {
        let mut clean: BTreeMap<Period, f64> = BTreeMap::new();
        for row in &self.rows {
            match (Period::parse(&row.period_key), row.amount.value()) {
                (Some(period), Some(amount)) => {
                    clean.insert(period, amount);
                }
                _ => debug!("skipping ledger row {:?}={}", row.period_key, row.amount),
            }
        }
        clean
            .into_iter()
            .map(|(period, total_income_reporting)| DividendLedgerEntry {
                period,
                total_income_reporting,
            })
            .collect()
    }

    /// Clean totals summed per calendar year, ascending.
    pub fn totals_by_year(&self) -> Vec<(i32, f64)> {
        let mut years: BTreeMap<i32, f64> = BTreeMap::new();
        for entry in self.history() {
            *years.entry(entry.period.year()).or_default() += entry.total_income_reporting;
        }
        years.into_iter().collect()
    }
}

impl fmt::Display for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "DIVIDEND HISTORY:")?;
        for entry in self.history() {
            writeln!(f, "  {}  {:>14.2}", entry.period, entry.total_income_reporting)?;
        }
        for (year, total) in self.totals_by_year() {
            writeln!(f, "  {year} total {:>11.2}", total)?;
        }
        Ok(())
    }
}
