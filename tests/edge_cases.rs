//! Edge-case tests: adversarial inputs to every public API.

use chrono::NaiveDate;
use divfolio::{
    CurrencyCode, Field, Holding, HoldingBook, IssueKind, Ledger, LedgerRow, Numeric, Period,
    RateTable, forecast, recommend, value,
};

fn sek() -> RateTable {
    RateTable::new(CurrencyCode::SEK)
}

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

// ============================================================================
// Empty inputs
// ============================================================================

#[test]
fn empty_batch_everything_zero() {
    let snap = value(&[], &sek());
    assert_eq!(snap.total_value(), 0.0);
    assert!(snap.is_empty_valued());
    assert!(snap.issues().is_empty());
    assert!(snap.exposure_by_category().is_empty());

    assert!(recommend(&snap, 0.0).unwrap().is_empty());

    let fc = forecast(&[], &sek(), as_of());
    assert_eq!(fc.total(), 0.0);
    assert!(fc.buckets().is_empty());

    assert!(Ledger::new().history().is_empty());
}

#[test]
fn all_rows_excluded() {
    let mut a = Holding::new("A", 1.0, 1.0, "SEK");
    a.shares = "lots".into();
    let mut b = Holding::new("B", 1.0, 1.0, "SEK");
    b.price = Numeric::Number(-4.0);

    let snap = value(&[a, b], &sek());
    assert_eq!(snap.total_value(), 0.0);
    assert!(snap.holdings().is_empty());
    assert_eq!(snap.issues().len(), 2);
}

#[test]
fn all_zero_value_weights_zero() {
    let holdings = vec![
        Holding::new("A", 0.0, 10.0, "SEK").with_target(50.0),
        Holding::new("B", 0.0, 10.0, "SEK"),
    ];
    let snap = value(&holdings, &sek());
    assert_eq!(snap.holdings().len(), 2);
    for h in snap.holdings() {
        assert_eq!(h.weight_pct, 0.0);
        assert!(h.weight_pct.is_finite());
    }
}

// ============================================================================
// Malformed cells
// ============================================================================

#[test]
fn text_cells_with_decimal_comma() {
    let mut h = Holding::new("VOLV-B", 0.0, 0.0, "sek");
    h.shares = "1 000".into();
    h.price = "251,40".into();
    let snap = value(&[h], &sek());
    assert!((snap.total_value() - 251_400.0).abs() < 1e-6);
    assert_eq!(snap.holdings()[0].currency, "SEK");
}

#[test]
fn malformed_currency_falls_back() {
    let snap = value(&[Holding::new("X", 2.0, 3.0, "")], &sek());
    assert_eq!(snap.total_value(), 6.0);
    assert_eq!(
        snap.issues()[0].kind,
        IssueKind::MissingRate {
            currency: String::new()
        }
    );
}

#[test]
fn invalid_target_is_not_a_candidate() {
    let mut h = Holding::new("A", 1.0, 1.0, "SEK");
    h.target_weight_pct = "twenty".into();
    let snap = value(&[h, Holding::new("B", 1.0, 1.0, "SEK")], &sek());
    assert_eq!(snap.holdings()[0].target_weight_pct, None);
    assert!(recommend(&snap, 100.0).unwrap().is_empty());
    assert!(matches!(
        snap.issues()[0].kind,
        IssueKind::InvalidNumeric {
            field: Field::TargetWeight,
            ..
        }
    ));
}

#[test]
fn overflowing_value_is_excluded() {
    let holdings = vec![
        Holding::new("A", 1e200, 1e200, "SEK").with_target(50.0),
        Holding::new("B", 1.0, 1.0, "SEK").with_target(50.0),
    ];
    let snap = value(&holdings, &sek());
    assert_eq!(snap.total_value(), 1.0);
    assert_eq!(snap.holdings().len(), 1);
    assert_eq!(snap.holdings()[0].ticker, "B");
    assert_eq!(snap.holdings()[0].weight_pct, 100.0);
    assert!(matches!(
        snap.issues()[0].kind,
        IssueKind::InvalidNumeric {
            field: Field::Shares,
            ..
        }
    ));

    let recs = recommend(&snap, 0.0).unwrap();
    assert!(recs.all().iter().all(|r| r.underweight_pct.is_finite()));
}

#[test]
fn overflowing_sum_is_excluded() {
    let holdings = vec![
        Holding::new("A", 1.0, f64::MAX, "SEK"),
        Holding::new("B", 1.0, f64::MAX, "SEK"),
    ];
    let snap = value(&holdings, &sek());
    assert!(snap.total_value().is_finite());
    assert_eq!(snap.holdings().len(), 1);
    assert_eq!(snap.holdings()[0].weight_pct, 100.0);
    assert_eq!(snap.issues().len(), 1);
}

#[test]
fn overflowing_dividend_is_excluded() {
    let holdings = vec![
        Holding::new("A", 1e200, 1.0, "SEK").with_dividend(1e200, "2026-12-01"),
        Holding::new("B", 10.0, 1.0, "SEK").with_dividend(2.0, "2026-12-01"),
    ];
    let fc = forecast(&holdings, &sek(), as_of());
    assert_eq!(fc.total(), 20.0);
    assert_eq!(fc.entries().count(), 1);
    assert!(matches!(
        fc.issues()[0].kind,
        IssueKind::InvalidNumeric {
            field: Field::DividendPerShare,
            ..
        }
    ));
}

#[test]
fn forecast_with_invalid_shares() {
    let mut h = Holding::new("A", 1.0, 1.0, "SEK").with_dividend(2.0, "2026-12-01");
    h.shares = "".into();
    let fc = forecast(&[h], &sek(), as_of());
    assert_eq!(fc.total(), 0.0);
    assert_eq!(fc.issues().len(), 1);
}

#[test]
fn forecast_duplicate_ticker_last_wins() {
    let holdings = vec![
        Holding::new("A", 1.0, 1.0, "SEK").with_dividend(2.0, "2026-12-01"),
        Holding::new("A", 3.0, 1.0, "SEK").with_dividend(2.0, "2026-12-01"),
    ];
    let fc = forecast(&holdings, &sek(), as_of());
    assert_eq!(fc.total(), 6.0);
    assert_eq!(fc.issues()[0].kind, IssueKind::DuplicateTicker);
}

// ============================================================================
// Ledger
// ============================================================================

#[test]
fn ledger_dirty_duplicates_in_storage() {
    let ledger = Ledger::from_rows(vec![
        LedgerRow {
            period_key: "2026-01".into(),
            amount: 10.0.into(),
        },
        LedgerRow {
            period_key: "2026/01".into(),
            amount: 12.0.into(),
        },
    ]);
    let history = ledger.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].total_income_reporting, 12.0);
}

#[test]
fn ledger_record_after_garbage_rows() {
    let mut ledger = Ledger::from_rows(vec![LedgerRow {
        period_key: "???".into(),
        amount: "x".into(),
    }]);
    let w = ledger
        .record(Period::new(2026, 5).unwrap(), 42.0)
        .unwrap();
    assert!(w.appended);
    assert_eq!(w.row, 1);
    assert_eq!(ledger.len(), 2);
    assert_eq!(ledger.history().len(), 1);
}

// ============================================================================
// Book
// ============================================================================

#[test]
fn book_remove_missing_ticker() {
    let mut book = HoldingBook::new();
    assert_eq!(book.remove("NOPE"), None);
    assert_eq!(book.remove_by_name("Nobody"), None);
}

#[test]
fn book_upsert_text_numbers() {
    let mut book = HoldingBook::new();
    let mut h = Holding::new("ERIC-B", 0.0, 0.0, "SEK").with_name("Ericsson");
    h.shares = "100".into();
    h.price = "85,20".into();
    assert!(book.upsert(h).is_ok());
}
