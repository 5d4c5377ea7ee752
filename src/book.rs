//! The editable set of holding rows for one cycle.
//!
//! Edits return a [`RowChange`] telling the persistence layer which row
//! moved, so it can write a single row instead of the whole table.

use log::info;

use crate::currency::CurrencyCode;
use crate::error::{Error, Result};
use crate::holding::{self, Holding, ticker_key};
use crate::issue::Issue;

/// Which row an edit touched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "change", rename_all = "snake_case"))]
pub enum RowChange {
    Appended { index: usize },
    Updated { index: usize },
    Removed { index: usize },
}

impl RowChange {
    pub fn index(&self) -> usize {
        match *self {
            RowChange::Appended { index }
            | RowChange::Updated { index }
            | RowChange::Removed { index } => index,
        }
    }
}

/// Ordered holdings, unique by ticker.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HoldingBook {
    rows: Vec<Holding>,
}

impl HoldingBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from stored rows, collapsing duplicate tickers (last wins, first
    /// position) and dropping rows without a ticker.
    pub fn from_rows(rows: &[Holding]) -> (Self, Vec<Issue>) {
        let (kept, issues) = holding::collapse_duplicates(rows);
        let rows = kept.into_iter().cloned().collect();
        (Self { rows }, issues)
    }

    pub fn rows(&self) -> &[Holding] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Holding> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row index of `ticker` (case-insensitive).
    pub fn position(&self, ticker: &str) -> Option<usize> {
        let key = ticker_key(ticker);
        self.rows.iter().position(|h| h.key() == key)
    }

    pub fn get(&self, ticker: &str) -> Option<&Holding> {
        self.position(ticker).map(|i| &self.rows[i])
    }

    /// Insert a submitted holding, or update the row with the same ticker in
    /// place.
    ///
    /// Submissions need a name and ticker, shares and price above zero, and a
    /// three-letter currency.
    pub fn upsert(&mut self, holding: Holding) -> Result<RowChange> {
        validate_submission(&holding)?;

        let change = match self.position(&holding.ticker) {
            Some(index) => {
                self.rows[index] = holding;
                RowChange::Updated { index }
            }
            None => {
                self.rows.push(holding);
                RowChange::Appended {
                    index: self.rows.len() - 1,
                }
            }
        };
        info!("{} holding at row {}", change_verb(&change), change.index());
        Ok(change)
    }

    /// Remove the row for `ticker`.
    pub fn remove(&mut self, ticker: &str) -> Option<RowChange> {
        let index = self.position(ticker)?;
        self.rows.remove(index);
        Some(RowChange::Removed { index })
    }

    /// Remove the first row whose name matches exactly (trimmed).
    pub fn remove_by_name(&mut self, name: &str) -> Option<RowChange> {
        let name = name.trim();
        let index = self.rows.iter().position(|h| h.name.trim() == name)?;
        self.rows.remove(index);
        Some(RowChange::Removed { index })
    }
}

fn change_verb(change: &RowChange) -> &'static str {
    match change {
        RowChange::Appended { .. } => "appended",
        RowChange::Updated { .. } => "updated",
        RowChange::Removed { .. } => "removed",
    }
}

fn validate_submission(h: &Holding) -> Result<()> {
    if h.ticker.trim().is_empty() {
        return Err(Error::InvalidHolding("ticker must not be empty".into()));
    }
    if h.name.trim().is_empty() {
        return Err(Error::InvalidHolding(format!(
            "name for {} must not be empty",
            h.ticker
        )));
    }
    match h.shares.value() {
        Some(v) if v > 0.0 => {}
        _ => {
            return Err(Error::InvalidHolding(format!(
                "shares for {} must be > 0, got {:?}",
                h.ticker,
                h.shares.raw()
            )));
        }
    }
    match h.price.value() {
        Some(v) if v > 0.0 => {}
        _ => {
            return Err(Error::InvalidHolding(format!(
                "price for {} must be > 0, got {:?}",
                h.ticker,
                h.price.raw()
            )));
        }
    }
    if CurrencyCode::new(&h.currency).is_none() {
        return Err(Error::InvalidCurrency(h.currency.clone()));
    }
    Ok(())
}
