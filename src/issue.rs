//! Non-fatal data-quality issues.
//!
//! Every computation returns the issues it met alongside its result. The
//! affected row is degraded (fallback rate) or excluded, the rest continue.

use std::fmt;

/// Numeric fields of a holding row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Field {
    Shares,
    Price,
    TargetWeight,
    DividendPerShare,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Shares => write!(f, "shares"),
            Field::Price => write!(f, "price"),
            Field::TargetWeight => write!(f, "target_weight_pct"),
            Field::DividendPerShare => write!(f, "dividend_per_share"),
        }
    }
}

/// What went wrong with a row.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum IssueKind {
    /// Currency not in the rate table; valued at the fallback factor 1.0.
    MissingRate { currency: String },
    /// A numeric field was missing, non-numeric, negative, or out of range.
    InvalidNumeric { field: Field, raw: String },
    /// Dividend date present but not a recognizable date or period.
    UnparseableDate { raw: String },
    /// Ticker seen earlier in the batch; this later row replaced it.
    DuplicateTicker,
    /// Row has a blank ticker and cannot be keyed. Carries the row's name.
    MissingTicker { name: String },
}

/// A single issue, tied to the row's ticker.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Issue {
    pub ticker: String,
    pub kind: IssueKind,
}

impl Issue {
    pub fn new(ticker: &str, kind: IssueKind) -> Self {
        Self {
            ticker: ticker.trim().to_string(),
            kind,
        }
    }

    /// True if the row was degraded but still counted.
    pub fn is_degraded(&self) -> bool {
        matches!(
            self.kind,
            IssueKind::MissingRate { .. } | IssueKind::DuplicateTicker
        )
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ticker = if self.ticker.is_empty() {
            "<blank>"
        } else {
            &self.ticker
        };
        match &self.kind {
            IssueKind::MissingRate { currency } => {
                write!(f, "{ticker}: no rate for {currency:?}, using 1.0")
            }
            IssueKind::InvalidNumeric { field, raw } => {
                write!(f, "{ticker}: invalid {field} {raw:?}, excluded")
            }
            IssueKind::UnparseableDate { raw } => {
                write!(f, "{ticker}: unparseable dividend date {raw:?}, excluded")
            }
            IssueKind::DuplicateTicker => write!(f, "{ticker}: duplicate ticker, last row wins"),
            IssueKind::MissingTicker { name } if name.trim().is_empty() => {
                write!(f, "{ticker}: missing ticker, row skipped")
            }
            IssueKind::MissingTicker { name } => {
                write!(f, "{ticker}: missing ticker for {:?}, row skipped", name.trim())
            }
        }
    }
}
