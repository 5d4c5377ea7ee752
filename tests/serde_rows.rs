//! Holding and ledger rows as a spreadsheet-backed store hands them over.

#![cfg(feature = "serde")]

use divfolio::{
    Coerced, CurrencyCode, Holding, Ledger, LedgerRow, Numeric, RateTable, RowChange, value,
};

#[test]
fn mixed_cell_types_deserialize() {
    let json = r#"[
        {"ticker": "KO", "company": "Coca-Cola", "shares": 10, "price": "60,50",
         "currency": "usd", "dividend_date": "2026-12-15"},
        {"ticker": "ENB", "shares": "", "price": 55.0, "currency": "CAD"},
        {"ticker": "X", "shares": true, "price": null, "currency": "SEK"}
    ]"#;
    let rows: Vec<Holding> = serde_json::from_str(json).unwrap();

    assert_eq!(rows[0].name, "Coca-Cola");
    assert_eq!(rows[0].shares, Numeric::Number(10.0));
    assert_eq!(rows[0].price.coerce(), Coerced::Value(60.5));
    assert_eq!(rows[1].shares.coerce(), Coerced::Absent);
    assert_eq!(rows[2].shares, Numeric::Text("true".into()));
    assert_eq!(rows[2].price, Numeric::default());
    assert_eq!(rows[2].category, "");

    let table = RateTable::new(CurrencyCode::SEK)
        .with_rate(CurrencyCode::USD, 10.0)
        .unwrap();
    let snap = value(&rows, &table);
    assert_eq!(snap.holdings().len(), 1);
    assert_eq!(snap.total_value(), 6_050.0);
    // ENB: blank shares; X: bad shares and blank price
    assert_eq!(snap.issues().len(), 3);
}

#[test]
fn snapshot_serializes() {
    let table = RateTable::new(CurrencyCode::SEK);
    let snap = value(&[Holding::new("B", 5.0, 200.0, "SEK")], &table);
    let v = serde_json::to_value(&snap).unwrap();
    assert_eq!(v["reporting"], "SEK");
    assert_eq!(v["total_value"], 1_000.0);
    assert_eq!(v["holdings"][0]["ticker"], "B");
}

#[test]
fn ledger_rows_round_trip_raw() {
    let json = r#"[{"period_key":"2026/02","amount":"1 200,50"},{"period_key":"??","amount":1}]"#;
    let rows: Vec<LedgerRow> = serde_json::from_str(json).unwrap();
    let ledger = Ledger::from_rows(rows.clone());
    assert_eq!(ledger.history().len(), 1);
    assert_eq!(ledger.history()[0].total_income_reporting, 1_200.5);

    let back = serde_json::to_string(ledger.rows()).unwrap();
    let again: Vec<LedgerRow> = serde_json::from_str(&back).unwrap();
    assert_eq!(again, rows);
}

#[test]
fn row_change_tagged() {
    let v = serde_json::to_value(RowChange::Updated { index: 3 }).unwrap();
    assert_eq!(v["change"], "updated");
    assert_eq!(v["index"], 3);
}
