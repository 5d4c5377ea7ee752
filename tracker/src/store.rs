//! File-backed stores for holdings (CSV) and the dividend ledger (JSON).
//!
//! A missing file reads as empty. Writes go to a sibling temp file first and
//! are renamed into place.

use std::fs;
use std::path::{Path, PathBuf};

use divfolio::{Holding, Ledger, LedgerRow};
use log::{debug, info};

use crate::error::{Error, Result};

/// Column order of the holdings file.
pub const HOLDING_COLUMNS: [&str; 10] = [
    "ticker",
    "name",
    "shares",
    "price",
    "currency",
    "category",
    "target_weight_pct",
    "dividend_per_share",
    "dividend_date",
    "comment",
];

/// Read holding rows. Optional columns may be missing; cells are kept raw
/// so the engine can report malformed values per row.
pub fn load_holdings(path: &Path) -> Result<Vec<Holding>> {
    if !path.exists() {
        info!("{} not found, starting with no holdings", path.display());
        return Ok(Vec::new());
    }
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)?;
    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let row: Holding = result?;
        rows.push(row);
    }
    debug!("loaded {} holding rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Rewrite the holdings file.
pub fn save_holdings(path: &Path, rows: &[Holding]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    wtr.write_record(HOLDING_COLUMNS)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| Error::Write {
            path: path.to_path_buf(),
            source: e.into_error(),
        })?;
    write_atomic(path, &bytes)?;
    debug!("saved {} holding rows to {}", rows.len(), path.display());
    Ok(())
}

/// Read the ledger rows as stored, malformed rows included.
pub fn load_ledger(path: &Path) -> Result<Ledger> {
    if !path.exists() {
        info!("{} not found, starting with an empty ledger", path.display());
        return Ok(Ledger::new());
    }
    let contents = fs::read_to_string(path).map_err(|e| Error::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    if contents.trim().is_empty() {
        return Ok(Ledger::new());
    }
    let rows: Vec<LedgerRow> = serde_json::from_str(&contents)?;
    Ok(Ledger::from_rows(rows))
}

/// Rewrite the ledger file.
pub fn save_ledger(path: &Path, ledger: &Ledger) -> Result<()> {
    let mut json = serde_json::to_vec_pretty(ledger.rows())?;
    json.push(b'\n');
    write_atomic(path, &json)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let write_err = |source| Error::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    let tmp = tmp_path(path);
    fs::write(&tmp, bytes).map_err(write_err)?;
    fs::rename(&tmp, path).map_err(write_err)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use divfolio::{Numeric, Period};

    #[test]
    fn missing_files_read_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_holdings(&dir.path().join("none.csv")).unwrap().is_empty());
        assert!(load_ledger(&dir.path().join("none.json")).unwrap().is_empty());
    }

    #[test]
    fn holdings_tolerate_missing_columns_and_bad_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("holdings.csv");
        fs::write(
            &path,
            "ticker,name,shares,price,currency\n\
             KO,Coca-Cola,10,60.5,USD\n\
             VOLV-B,Volvo,\"1 000\",\"251,40\",SEK\n\
             BAD,Broken,lots,1,SEK\n",
        )
        .unwrap();

        let rows = load_holdings(&path).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].shares.value(), Some(10.0));
        assert_eq!(rows[0].price.value(), Some(60.5));
        assert_eq!(rows[1].shares.value(), Some(1000.0));
        assert_eq!(rows[1].price.value(), Some(251.4));
        assert_eq!(rows[2].shares, Numeric::Text("lots".into()));
        assert_eq!(rows[0].category, "");
    }

    #[test]
    fn oversized_integer_cell_stays_in_its_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("holdings.csv");
        fs::write(
            &path,
            "ticker,shares,price,currency\n\
             A,100000000000000000000,1,SEK\n\
             B,1,1,SEK\n",
        )
        .unwrap();

        let rows = load_holdings(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].shares.value(), Some(1e20));
        assert_eq!(rows[1].ticker, "B");
        assert_eq!(rows[1].shares.value(), Some(1.0));
    }

    #[test]
    fn holdings_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("holdings.csv");
        let rows = vec![
            Holding::new("KO", 10.0, 60.0, "USD")
                .with_name("Coca-Cola")
                .with_category("Staples")
                .with_dividend(0.51, "2026-12-15"),
            Holding::new("ENB", 30.0, 55.0, "CAD").with_target(15.0),
        ];
        save_holdings(&path, &rows).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with(&HOLDING_COLUMNS.join(",")));

        let loaded = load_holdings(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].name, "Coca-Cola");
        assert_eq!(loaded[0].dividend_date, "2026-12-15");
        assert_eq!(loaded[1].target_weight_pct.value(), Some(15.0));
    }

    #[test]
    fn empty_holdings_keep_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("holdings.csv");
        save_holdings(&path, &[]).unwrap();
        assert!(load_holdings(&path).unwrap().is_empty());
        assert!(fs::read_to_string(&path).unwrap().starts_with("ticker,"));
    }

    #[test]
    fn ledger_save_then_load_keeps_dirty_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let mut ledger = Ledger::from_rows(vec![LedgerRow {
            period_key: "garbage".into(),
            amount: "n/a".into(),
        }]);
        ledger.record(Period::new(2026, 3).unwrap(), 410.0).unwrap();
        save_ledger(&path, &ledger).unwrap();

        let loaded = load_ledger(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.rows()[0].period_key, "garbage");
        assert_eq!(loaded.history().len(), 1);
        assert_eq!(loaded.history()[0].total_income_reporting, 410.0);
        assert!(!tmp_path(&path).exists());
    }
}
