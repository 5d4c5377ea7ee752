//! Currency conversion into the reporting currency.
//!
//! A [`RateTable`] is read once per evaluation cycle and passed in immutably.
//! Lookups never fail: a code missing from the table (unknown, malformed, or
//! dropped because its quote was stale) is valued at [`FALLBACK_RATE`].
//!
//! Rates come from a [`RateSource`] collaborator. [`resolve_rates`] applies
//! the fallback policy at that seam, so the engine only ever sees a complete
//! table and the caller learns whether it is live or substituted.

use std::fmt;

use log::{debug, warn};
use rustc_hash::FxHashMap;

use crate::currency::CurrencyCode;
use crate::error::{Error, Result};

/// Factor applied when a currency is not in the table.
pub const FALLBACK_RATE: f64 = 1.0;

/// Multiplicative factors from each currency into the reporting currency.
///
/// Always contains the identity entry for the reporting currency.
#[derive(Clone, Debug, PartialEq)]
pub struct RateTable {
    reporting: CurrencyCode,
    rates: FxHashMap<CurrencyCode, f64>,
}

/// Outcome of a single rate lookup.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RateLookup {
    Found(f64),
    Fallback,
}

impl RateLookup {
    /// The factor to apply.
    #[inline]
    pub fn factor(self) -> f64 {
        match self {
            RateLookup::Found(rate) => rate,
            RateLookup::Fallback => FALLBACK_RATE,
        }
    }

    #[inline]
    pub fn is_fallback(self) -> bool {
        matches!(self, RateLookup::Fallback)
    }
}

impl RateTable {
    /// A table holding only the identity entry.
    pub fn new(reporting: CurrencyCode) -> Self {
        let mut rates = FxHashMap::default();
        rates.insert(reporting, 1.0);
        Self { reporting, rates }
    }

    /// Build a table from `(code, factor)` pairs.
    pub fn from_pairs(
        reporting: CurrencyCode,
        pairs: impl IntoIterator<Item = (CurrencyCode, f64)>,
    ) -> Result<Self> {
        let mut table = Self::new(reporting);
        for (code, rate) in pairs {
            table.insert(code, rate)?;
        }
        Ok(table)
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_rate(mut self, code: CurrencyCode, rate: f64) -> Result<Self> {
        self.insert(code, rate)?;
        Ok(self)
    }

    /// Insert or replace a factor. Factors must be positive and finite, and
    /// the reporting currency's identity entry cannot change.
    pub fn insert(&mut self, code: CurrencyCode, rate: f64) -> Result<()> {
        if !rate.is_finite() || rate <= 0.0 || (code == self.reporting && rate != 1.0) {
            return Err(Error::InvalidRate {
                currency: code,
                rate,
            });
        }
        self.rates.insert(code, rate);
        Ok(())
    }

    /// Build a table from quotes against a base currency.
    ///
    /// `quotes` are units of each currency per one unit of `base` (the shape
    /// of a typical FX API response). The factor for `X` is
    /// `quote(reporting) / quote(X)`. Malformed codes and non-positive quotes
    /// are skipped.
    pub fn from_base_quotes<'a>(
        reporting: CurrencyCode,
        base: CurrencyCode,
        quotes: impl IntoIterator<Item = (&'a str, f64)>,
    ) -> Result<Self> {
        let mut per_base: FxHashMap<CurrencyCode, f64> = FxHashMap::default();
        per_base.insert(base, 1.0);
        for (raw, quote) in quotes {
            match CurrencyCode::new(raw) {
                Some(code) if quote.is_finite() && quote > 0.0 => {
                    per_base.insert(code, quote);
                }
                _ => debug!("skipping quote {raw:?}={quote}"),
            }
        }

        let reporting_quote = *per_base
            .get(&reporting)
            .ok_or(Error::MissingReportingQuote(reporting))?;

        let mut table = Self::new(reporting);
        for (code, quote) in per_base {
            if code != reporting {
                table.insert(code, reporting_quote / quote)?;
            }
        }
        Ok(table)
    }

    /// Fixed defaults into SEK, used when no rate source is reachable and no
    /// fallback is configured.
    pub fn fallback_sek() -> Self {
        let mut table = Self::new(CurrencyCode::SEK);
        for (code, rate) in [
            (CurrencyCode::USD, 10.50),
            (CurrencyCode::CAD, 7.80),
            (CurrencyCode::NOK, 1.00),
        ] {
            table.rates.insert(code, rate);
        }
        table
    }

    #[inline]
    pub fn reporting(&self) -> CurrencyCode {
        self.reporting
    }

    /// Number of entries, identity included.
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    /// Never true: the identity entry is always present.
    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Entries sorted by currency code.
    pub fn entries(&self) -> Vec<(CurrencyCode, f64)> {
        let mut entries: Vec<_> = self.rates.iter().map(|(c, r)| (*c, *r)).collect();
        entries.sort_by_key(|(c, _)| *c);
        entries
    }

    /// Look up a code, reporting whether the fallback applied.
    pub fn lookup(&self, code: &str) -> RateLookup {
        CurrencyCode::new(code)
            .and_then(|c| self.rates.get(&c).copied())
            .map_or(RateLookup::Fallback, RateLookup::Found)
    }

    /// Factor for `code`, or [`FALLBACK_RATE`] if unknown.
    pub fn rate(&self, code: &str) -> f64 {
        self.lookup(code).factor()
    }

    /// Convert a local-currency amount into the reporting currency.
    pub fn convert(&self, amount: f64, code: &str) -> f64 {
        amount * self.rate(code)
    }
}

impl fmt::Display for RateTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "RATES (into {}):", self.reporting)?;
        for (code, rate) in self.entries() {
            writeln!(f, "  {code}  {rate:>12.4}")?;
        }
        Ok(())
    }
}

/// Failure of an external rate source.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RateSourceError {
    #[error("rate source unavailable: {0}")]
    Unavailable(String),

    #[error("malformed rate response: {0}")]
    Malformed(String),
}

/// External provider of currency rates.
pub trait RateSource {
    /// Fetch a complete table into `reporting`.
    fn fetch(&self, reporting: CurrencyCode) -> std::result::Result<RateTable, RateSourceError>;
}

/// A source that always returns the same table.
#[derive(Clone, Debug)]
pub struct StaticRates(pub RateTable);

impl RateSource for StaticRates {
    fn fetch(&self, reporting: CurrencyCode) -> std::result::Result<RateTable, RateSourceError> {
        if self.0.reporting() != reporting {
            return Err(RateSourceError::Unavailable(format!(
                "static table reports in {}, not {reporting}",
                self.0.reporting()
            )));
        }
        Ok(self.0.clone())
    }
}

/// Where a resolved table came from.
#[derive(Clone, Debug, PartialEq)]
pub enum RateOrigin {
    Live,
    Fallback { reason: String },
}

/// A complete table plus its provenance.
#[derive(Clone, Debug)]
pub struct ResolvedRates {
    pub table: RateTable,
    pub origin: RateOrigin,
}

impl ResolvedRates {
    pub fn is_fallback(&self) -> bool {
        matches!(self.origin, RateOrigin::Fallback { .. })
    }
}

/// Fetch rates from `source`, substituting `fallback` on failure.
///
/// Failure is logged as a warning and recorded in the returned origin; it is
/// never propagated.
pub fn resolve_rates(
    source: &dyn RateSource,
    reporting: CurrencyCode,
    fallback: &RateTable,
) -> ResolvedRates {
    match source.fetch(reporting) {
        Ok(table) => ResolvedRates {
            table,
            origin: RateOrigin::Live,
        },
        Err(e) => {
            warn!("{e}; using fallback rates into {}", fallback.reporting());
            if fallback.reporting() != reporting {
                warn!(
                    "fallback table reports in {}, requested {reporting}",
                    fallback.reporting()
                );
            }
            ResolvedRates {
                table: fallback.clone(),
                origin: RateOrigin::Fallback {
                    reason: e.to_string(),
                },
            }
        }
    }
}
