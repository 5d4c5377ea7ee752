//! # divfolio
//!
//! Valuation, rebalancing, and dividend projection for a multi-currency
//! equity portfolio.
//!
//! ## Features
//!
//! - **Valuation**: local price × shares × rate, summed into one reporting
//!   currency, with per-holding weight
//! - **Rebalance advice**: rank underweight holdings and size purchases
//! - **Dividend forecast**: upcoming payouts bucketed by month
//! - **Dividend ledger**: realized monthly totals, one row per month
//! - **Best effort**: bad cells degrade a single row, never the batch
//!
//! The engine does no I/O. Callers load holdings and rates, run the engine,
//! and persist the returned write instructions themselves.
//!
//! ## Quick Start
//!
//! ```
//! use divfolio::{CurrencyCode, Holding, RateTable, recommend, value};
//!
//! let rates = RateTable::new(CurrencyCode::SEK)
//!     .with_rate(CurrencyCode::USD, 10.0)
//!     .unwrap();
//!
//! let holdings = vec![
//!     Holding::new("A", 10.0, 100.0, "USD").with_target(50.0),
//!     Holding::new("B", 5.0, 200.0, "SEK").with_target(50.0),
//! ];
//!
//! let snapshot = value(&holdings, &rates);
//! assert_eq!(snapshot.total_value(), 11_000.0);
//! assert_eq!(snapshot.holdings()[0].weight_display(), 90.91);
//!
//! // B is 9.09% against a 50% target
//! let advice = recommend(&snapshot, 1_000.0).unwrap();
//! assert_eq!(advice.top()[0].ticker, "B");
//! ```
//!
//! ## Dividends
//!
//! ```
//! use chrono::NaiveDate;
//! use divfolio::{CurrencyCode, Holding, Ledger, Period, RateTable, forecast};
//!
//! let rates = RateTable::new(CurrencyCode::SEK)
//!     .with_rate(CurrencyCode::USD, 10.0)
//!     .unwrap();
//! let holdings = vec![Holding::new("KO", 10.0, 60.0, "USD").with_dividend(2.0, "2026-11-14")];
//!
//! let as_of = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
//! let fc = forecast(&holdings, &rates, as_of);
//! let nov = Period::new(2026, 11).unwrap();
//! assert_eq!(fc.bucket(nov).unwrap().total, 200.0);
//!
//! let mut ledger = Ledger::new();
//! ledger.record(nov, fc.total()).unwrap();
//! ledger.record(nov, 210.0).unwrap(); // overwrites, no duplicate
//! assert_eq!(ledger.history().len(), 1);
//! ```

pub mod book;
mod currency;
pub mod dividend;
mod error;
pub mod fx;
pub mod holding;
mod issue;
pub mod ledger;
pub mod period;
pub mod rebalance;
pub mod valuation;

// Re-export public API
pub use book::{HoldingBook, RowChange};
pub use currency::CurrencyCode;
pub use dividend::{Forecast, ForecastBucket, ForecastEntry, forecast};
pub use error::{Error, Result};
pub use fx::{RateLookup, RateOrigin, RateSource, RateSourceError, RateTable, ResolvedRates, resolve_rates};
pub use holding::{Coerced, Holding, Numeric};
pub use issue::{Field, Issue, IssueKind};
pub use ledger::{DividendLedgerEntry, Ledger, LedgerRow, LedgerWrite};
pub use period::{EventDate, Period};
pub use rebalance::{Advisor, Recommendation, Recommendations, recommend};
pub use valuation::{Exposure, Snapshot, ValuedHolding, round2, value};
