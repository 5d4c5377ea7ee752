//! Command orchestration: load → resolve rates → run the engine → persist.
//!
//! Each command opens the audit trail, reads the stores fresh, and writes
//! back only what it changed.

use chrono::NaiveDate;
use divfolio::{
    Advisor, Forecast, Holding, HoldingBook, Issue, Ledger, LedgerWrite, Period, RateSource,
    Recommendations, ResolvedRates, RowChange, Snapshot,
};
use log::{info, warn};

use crate::audit::{self, AuditLog};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::rates::{CachedRateSource, HttpRateSource};
use crate::store;
use crate::targets::TargetSpec;

/// The configured live source: HTTP behind the file cache.
pub fn http_source(config: &Config) -> Result<CachedRateSource<HttpRateSource>> {
    let http = HttpRateSource::new(&config.rates.url, config.base()?, config.timeout())?;
    Ok(CachedRateSource::new(
        http,
        config.rates.cache_file.clone(),
        config.ttl(),
    ))
}

/// One command run against the configured stores.
pub struct Tracker<'a> {
    config: &'a Config,
    source: &'a dyn RateSource,
    audit: AuditLog,
}

impl<'a> Tracker<'a> {
    /// Open the audit trail and record the start of `command`.
    pub fn open(config: &'a Config, source: &'a dyn RateSource, command: &str) -> Result<Self> {
        let mut audit = AuditLog::open(&config.audit_path())?;
        audit::log_run_started(&mut audit, command, &config.portfolio.holdings_file)?;
        Ok(Self {
            config,
            source,
            audit,
        })
    }

    /// Fetch rates, falling back to the configured fixed table.
    pub fn resolve_rates(&mut self) -> Result<ResolvedRates> {
        let reporting = self.config.reporting()?;
        let fallback = self.config.fallback_table()?;
        let resolved = divfolio::resolve_rates(self.source, reporting, &fallback);
        if resolved.is_fallback() {
            warn!("valuing with fixed fallback rates");
        }
        audit::log_rates_resolved(&mut self.audit, &resolved)?;
        Ok(resolved)
    }

    fn holdings(&self) -> Result<Vec<Holding>> {
        store::load_holdings(&self.config.portfolio.holdings_file)
    }

    fn report_issues(&mut self, issues: &[Issue]) -> Result<()> {
        for issue in issues {
            warn!("{issue}");
        }
        audit::log_issues(&mut self.audit, issues)
    }

    /// Value the stored holdings.
    pub fn value(&mut self) -> Result<Snapshot> {
        let rates = self.resolve_rates()?;
        let snapshot = divfolio::value(&self.holdings()?, &rates.table);
        audit::log_snapshot(&mut self.audit, &snapshot)?;
        self.report_issues(snapshot.issues())?;
        Ok(snapshot)
    }

    /// The advisor for this config: targets file overrides plus `top_n`.
    pub fn advisor(&self) -> Result<Advisor> {
        let top_n = self.config.advisor.top_n;
        match &self.config.portfolio.targets_file {
            Some(path) => TargetSpec::load(path)?.advisor(top_n),
            None => Ok(Advisor::new().top_n(top_n)),
        }
    }

    /// Rank underweight holdings. `capital` overrides the configured amount.
    pub fn advise(&mut self, capital: Option<f64>) -> Result<Recommendations> {
        let advisor = self.advisor()?;
        let snapshot = self.value()?;
        let capital = capital.unwrap_or(self.config.advisor.available_capital);
        Ok(advisor.recommend(&snapshot, capital)?)
    }

    /// Upcoming dividends on or after `as_of`.
    pub fn forecast(&mut self, as_of: NaiveDate) -> Result<Forecast> {
        let rates = self.resolve_rates()?;
        let forecast = divfolio::forecast(&self.holdings()?, &rates.table, as_of);
        self.report_issues(forecast.issues())?;
        Ok(forecast)
    }

    /// Record realized income for `period`. Without an amount, the period's
    /// forecast total (counting the whole month) is recorded.
    pub fn record(&mut self, period: Period, amount: Option<f64>) -> Result<LedgerWrite> {
        let amount = match amount {
            Some(a) => a,
            None => {
                let forecast = self.forecast(period.first_day())?;
                forecast.bucket(period).map_or(0.0, |b| b.total)
            }
        };

        let config = self.config;
        let path = &config.portfolio.ledger_file;
        let mut ledger = store::load_ledger(path)?;
        let write = ledger.record(period, amount)?;
        if write.changed() {
            store::save_ledger(path, &ledger)?;
        }
        info!(
            "recorded {:.2} for {} at row {}",
            write.amount, write.period, write.row
        );
        audit::log_ledger_recorded(&mut self.audit, &write)?;
        Ok(write)
    }

    /// The stored ledger. Use [`Ledger::history`] for the clean view.
    pub fn ledger(&self) -> Result<Ledger> {
        store::load_ledger(&self.config.portfolio.ledger_file)
    }

    /// Insert or update a holding by ticker.
    pub fn add(&mut self, holding: Holding) -> Result<RowChange> {
        let config = self.config;
        let path = &config.portfolio.holdings_file;
        let (mut book, issues) = HoldingBook::from_rows(&store::load_holdings(path)?);
        self.report_issues(&issues)?;

        let ticker = holding.ticker.trim().to_string();
        let change = book.upsert(holding)?;
        store::save_holdings(path, book.rows())?;
        audit::log_holding_upserted(&mut self.audit, &ticker, change)?;
        Ok(change)
    }

    /// Delete the holding with `ticker`, or failing that, the first holding
    /// whose name is exactly `ticker`.
    pub fn remove(&mut self, ticker: &str) -> Result<RowChange> {
        let config = self.config;
        let path = &config.portfolio.holdings_file;
        let (mut book, issues) = HoldingBook::from_rows(&store::load_holdings(path)?);
        self.report_issues(&issues)?;

        let change = book
            .remove(ticker)
            .or_else(|| book.remove_by_name(ticker))
            .ok_or_else(|| Error::UnknownTicker(ticker.to_string()))?;
        store::save_holdings(path, book.rows())?;
        audit::log_holding_removed(&mut self.audit, ticker, change)?;
        Ok(change)
    }
}
