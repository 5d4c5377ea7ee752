//! JSONL audit trail logging.
//!
//! Each tracker run appends events to an audit.jsonl file, one JSON object
//! per line.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use divfolio::{Issue, LedgerWrite, RateOrigin, ResolvedRates, RowChange, Snapshot};
use serde::Serialize;

use crate::error::Result;

/// An audit event written to the JSONL trail.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub event: &'static str,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

/// Append-only audit logger.
pub struct AuditLog {
    writer: BufWriter<std::fs::File>,
}

impl AuditLog {
    /// Open (or create) the audit log file for appending.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Log an event with arbitrary JSON data.
    pub fn log(&mut self, event: &'static str, data: serde_json::Value) -> Result<()> {
        let entry = AuditEvent {
            event,
            ts: Utc::now(),
            data,
        };
        let json = serde_json::to_string(&entry)?;
        writeln!(self.writer, "{json}")?;
        self.writer.flush()?;
        Ok(())
    }
}

pub fn log_run_started(audit: &mut AuditLog, command: &str, holdings_file: &Path) -> Result<()> {
    audit.log(
        "run_started",
        serde_json::json!({
            "command": command,
            "holdings_file": holdings_file.display().to_string(),
        }),
    )
}

pub fn log_rates_resolved(audit: &mut AuditLog, rates: &ResolvedRates) -> Result<()> {
    let (origin, reason) = match &rates.origin {
        RateOrigin::Live => ("live", None),
        RateOrigin::Fallback { reason } => ("fallback", Some(reason.as_str())),
    };
    let table: serde_json::Map<String, serde_json::Value> = rates
        .table
        .entries()
        .into_iter()
        .map(|(code, rate)| (code.to_string(), rate.into()))
        .collect();
    audit.log(
        "rates_resolved",
        serde_json::json!({
            "origin": origin,
            "reason": reason,
            "reporting": rates.table.reporting(),
            "rates": table,
        }),
    )
}

pub fn log_snapshot(audit: &mut AuditLog, snapshot: &Snapshot) -> Result<()> {
    let holdings: Vec<_> = snapshot
        .holdings()
        .iter()
        .map(|h| {
            serde_json::json!({
                "ticker": h.ticker,
                "value": h.value_reporting,
                "weight_pct": h.weight_display(),
            })
        })
        .collect();
    audit.log(
        "snapshot_valued",
        serde_json::json!({
            "reporting": snapshot.reporting(),
            "total": snapshot.total_value(),
            "holdings": holdings,
        }),
    )
}

/// Logs nothing for an empty slice.
pub fn log_issues(audit: &mut AuditLog, issues: &[Issue]) -> Result<()> {
    if issues.is_empty() {
        return Ok(());
    }
    audit.log(
        "issues",
        serde_json::json!({ "issues": serde_json::to_value(issues)? }),
    )
}

pub fn log_holding_upserted(audit: &mut AuditLog, ticker: &str, change: RowChange) -> Result<()> {
    audit.log(
        "holding_upserted",
        serde_json::json!({
            "ticker": ticker,
            "change": change,
        }),
    )
}

pub fn log_holding_removed(audit: &mut AuditLog, ticker: &str, change: RowChange) -> Result<()> {
    audit.log(
        "holding_removed",
        serde_json::json!({
            "ticker": ticker,
            "row": change.index(),
        }),
    )
}

pub fn log_ledger_recorded(audit: &mut AuditLog, write: &LedgerWrite) -> Result<()> {
    audit.log("ledger_recorded", serde_json::to_value(write)?)
}
