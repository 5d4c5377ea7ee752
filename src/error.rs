//! Hard failures for structurally invalid input.
//!
//! Data-quality problems in individual rows are never errors; they degrade the
//! row and are reported as [`Issue`](crate::Issue)s instead.

use crate::currency::CurrencyCode;

/// Errors returned by engine constructors and explicit submissions.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("invalid currency code: {0:?}")]
    InvalidCurrency(String),

    #[error("invalid rate for {currency}: {rate} (must be positive and finite)")]
    InvalidRate { currency: CurrencyCode, rate: f64 },

    #[error("no quote for reporting currency {0} in base quotes")]
    MissingReportingQuote(CurrencyCode),

    #[error("invalid holding: {0}")]
    InvalidHolding(String),

    #[error("invalid target for {ticker}: {weight_pct} (must be within 0..=100)")]
    InvalidTarget { ticker: String, weight_pct: f64 },

    #[error("available capital must be non-negative and finite, got {0}")]
    InvalidCapital(f64),

    #[error("invalid ledger amount: {0} (must be non-negative and finite)")]
    InvalidAmount(f64),

    #[error("invalid period: {0:?}")]
    InvalidPeriod(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(
            Error::InvalidCurrency("US".into()).to_string(),
            "invalid currency code: \"US\""
        );
        assert_eq!(
            Error::InvalidRate {
                currency: CurrencyCode::USD,
                rate: -1.0
            }
            .to_string(),
            "invalid rate for USD: -1 (must be positive and finite)"
        );
    }

    #[test]
    fn is_error() {
        let err: Box<dyn std::error::Error> = Box::new(Error::InvalidCapital(-5.0));
        assert!(err.to_string().contains("capital"));
    }
}
