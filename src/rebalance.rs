//! Buy recommendations for underweight holdings.
//!
//! For each holding, `underweight_pct = target − actual`. Only positive gaps
//! are recommended, ranked by gap size. The suggested amount is the gap
//! applied to the portfolio value after the new capital is added:
//!
//! ```text
//! suggested_buy = underweight_pct / 100 × (total_value + available_capital)
//! ```
//!
//! This is proportional target sizing, not a spend plan. Each holding is
//! sized independently, so the suggestions can sum to more than
//! `available_capital` when several holdings are underweight.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::currency::CurrencyCode;
use crate::error::{Error, Result};
use crate::holding::ticker_key;
use crate::valuation::{Snapshot, ValuedHolding, round2};

/// Default length of the primary suggestion list.
pub const DEFAULT_TOP_N: usize = 5;

/// One underweight holding and how much to buy.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Recommendation {
    pub ticker: String,
    pub name: String,
    pub target_weight_pct: f64,
    pub weight_pct: f64,
    pub underweight_pct: f64,
    pub suggested_buy_reporting: f64,
}

/// Ranked recommendations.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Recommendations {
    reporting: CurrencyCode,
    total_value: f64,
    available_capital: f64,
    top_n: usize,
    entries: Vec<Recommendation>,
}

impl Recommendations {
    /// The full ranked list.
    pub fn all(&self) -> &[Recommendation] {
        &self.entries
    }

    /// The first `top_n` entries.
    pub fn top(&self) -> &[Recommendation] {
        &self.entries[..self.top_n.min(self.entries.len())]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all suggested buys. May exceed the available capital.
    pub fn total_suggested(&self) -> f64 {
        self.entries.iter().map(|r| r.suggested_buy_reporting).sum()
    }

    pub fn reporting(&self) -> CurrencyCode {
        self.reporting
    }

    pub fn available_capital(&self) -> f64 {
        self.available_capital
    }

    pub fn total_value(&self) -> f64 {
        self.total_value
    }
}

impl fmt::Display for Recommendations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.entries.is_empty() {
            return writeln!(f, "No underweight holdings.");
        }
        writeln!(
            f,
            "{:<10} {:>8} {:>8} {:>8} {:>14}",
            "TICKER",
            "TARGET",
            "ACTUAL",
            "GAP",
            format!("BUY {}", self.reporting)
        )?;
        for r in self.top() {
            writeln!(
                f,
                "{:<10} {:>7.2}% {:>7.2}% {:>7.2}% {:>14.2}",
                r.ticker,
                r.target_weight_pct,
                round2(r.weight_pct),
                round2(r.underweight_pct),
                r.suggested_buy_reporting,
            )?;
        }
        if self.entries.len() > self.top_n {
            writeln!(f, "... {} more", self.entries.len() - self.top_n)?;
        }
        Ok(())
    }
}

/// Ranks underweight holdings against their targets.
///
/// Targets come from each holding's `target_weight_pct` unless an explicit
/// override is configured for its ticker.
#[derive(Clone, Debug)]
pub struct Advisor {
    top_n: usize,
    overrides: FxHashMap<String, f64>,
}

impl Default for Advisor {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            overrides: FxHashMap::default(),
        }
    }
}

impl Advisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Length of [`Recommendations::top`]. Zero is treated as one.
    pub fn top_n(mut self, n: usize) -> Self {
        self.top_n = n.max(1);
        self
    }

    /// Explicit `(ticker, weight_pct)` targets. Each weight must be in
    /// `0..=100`; later duplicates replace earlier ones.
    pub fn with_targets<'a>(
        mut self,
        targets: impl IntoIterator<Item = (&'a str, f64)>,
    ) -> Result<Self> {
        for (ticker, weight_pct) in targets {
            if !weight_pct.is_finite() || !(0.0..=100.0).contains(&weight_pct) {
                return Err(Error::InvalidTarget {
                    ticker: ticker.to_string(),
                    weight_pct,
                });
            }
            self.overrides.insert(ticker_key(ticker), weight_pct);
        }
        Ok(self)
    }

    /// Effective target for a holding; 0 when none is configured.
    pub fn target_for(&self, holding: &ValuedHolding) -> f64 {
        self.overrides
            .get(&ticker_key(&holding.ticker))
            .copied()
            .or(holding.target_weight_pct)
            .unwrap_or(0.0)
    }

    /// Rank underweight holdings, largest gap first. Ties keep input order.
    pub fn recommend(&self, snapshot: &Snapshot, available_capital: f64) -> Result<Recommendations> {
        if !available_capital.is_finite() || available_capital < 0.0 {
            return Err(Error::InvalidCapital(available_capital));
        }

        let base = snapshot.total_value() + available_capital;
        let mut entries: Vec<Recommendation> = snapshot
            .holdings()
            .iter()
            .filter_map(|h| {
                let target = self.target_for(h);
                let underweight_pct = target - h.weight_pct;
                (underweight_pct > 0.0).then(|| Recommendation {
                    ticker: h.ticker.clone(),
                    name: h.name.clone(),
                    target_weight_pct: target,
                    weight_pct: h.weight_pct,
                    underweight_pct,
                    suggested_buy_reporting: (underweight_pct / 100.0 * base).max(0.0),
                })
            })
            .collect();

        // stable: equal gaps stay in input order
        entries.sort_by(|a, b| b.underweight_pct.total_cmp(&a.underweight_pct));

        Ok(Recommendations {
            reporting: snapshot.reporting(),
            total_value: snapshot.total_value(),
            available_capital,
            top_n: self.top_n,
            entries,
        })
    }
}

/// Recommend with the default advisor (holding targets, top 5).
pub fn recommend(snapshot: &Snapshot, available_capital: f64) -> Result<Recommendations> {
    Advisor::default().recommend(snapshot, available_capital)
}
