//! TOML configuration loading and validation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use divfolio::{CurrencyCode, RateTable};
use serde::Deserialize;

use crate::error::{Error, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub portfolio: PortfolioConfig,
    #[serde(default)]
    pub rates: RatesConfig,
    #[serde(default)]
    pub advisor: AdvisorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PortfolioConfig {
    #[serde(default = "default_reporting")]
    pub reporting_currency: String,
    #[serde(default = "default_holdings_file")]
    pub holdings_file: PathBuf,
    #[serde(default = "default_ledger_file")]
    pub ledger_file: PathBuf,
    #[serde(default)]
    pub targets_file: Option<PathBuf>,
}

fn default_reporting() -> String {
    "SEK".into()
}
fn default_holdings_file() -> PathBuf {
    "holdings.csv".into()
}
fn default_ledger_file() -> PathBuf {
    "dividend_ledger.json".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct RatesConfig {
    #[serde(default = "default_rates_url")]
    pub url: String,
    #[serde(default = "default_base")]
    pub base: String,
    #[serde(default = "default_cache_file")]
    pub cache_file: PathBuf,
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Fixed factors into the reporting currency, used when no live or
    /// cached rates are available.
    #[serde(default)]
    pub fallback: Option<BTreeMap<String, f64>>,
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self {
            url: default_rates_url(),
            base: default_base(),
            cache_file: default_cache_file(),
            ttl_secs: default_ttl(),
            timeout_secs: default_timeout(),
            fallback: None,
        }
    }
}

fn default_rates_url() -> String {
    "https://api.exchangerate.host/latest".into()
}
fn default_base() -> String {
    "USD".into()
}
fn default_cache_file() -> PathBuf {
    "./cache/rates.json".into()
}
fn default_ttl() -> u64 {
    86_400
}
fn default_timeout() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdvisorConfig {
    #[serde(default)]
    pub available_capital: f64,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            available_capital: 0.0,
            top_n: default_top_n(),
        }
    }
}

fn default_top_n() -> usize {
    divfolio::rebalance::DEFAULT_TOP_N
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default = "default_audit_file")]
    pub audit_file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            audit_file: default_audit_file(),
        }
    }
}

fn default_log_dir() -> String {
    "./logs".into()
}
fn default_audit_file() -> String {
    "audit.jsonl".into()
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&contents)
    }

    /// Parse and validate config text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config invariants.
    fn validate(&self) -> Result<()> {
        self.reporting()?;
        self.base()?;
        if self.rates.url.trim().is_empty() {
            return Err(Error::Config("rates url must not be empty".into()));
        }
        if self.rates.ttl_secs == 0 {
            return Err(Error::Config("ttl_secs must be > 0".into()));
        }
        if self.rates.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be > 0".into()));
        }
        self.fallback_table()?;
        if self.advisor.top_n == 0 {
            return Err(Error::Config("top_n must be > 0".into()));
        }
        let capital = self.advisor.available_capital;
        if !capital.is_finite() || capital < 0.0 {
            return Err(Error::Config(format!(
                "available_capital must be >= 0, got {capital}"
            )));
        }
        Ok(())
    }

    /// The reporting currency.
    pub fn reporting(&self) -> Result<CurrencyCode> {
        parse_code(&self.portfolio.reporting_currency, "reporting_currency")
    }

    /// Base currency of the rate API's quotes.
    pub fn base(&self) -> Result<CurrencyCode> {
        parse_code(&self.rates.base, "rates.base")
    }

    /// The fixed table used when rates cannot be fetched.
    ///
    /// Without a `[rates.fallback]` section this is the built-in SEK table,
    /// or an identity-only table for any other reporting currency.
    pub fn fallback_table(&self) -> Result<RateTable> {
        let reporting = self.reporting()?;
        let Some(pairs) = &self.rates.fallback else {
            return Ok(if reporting == CurrencyCode::SEK {
                RateTable::fallback_sek()
            } else {
                RateTable::new(reporting)
            });
        };

        let mut table = RateTable::new(reporting);
        for (raw, rate) in pairs {
            let code = parse_code(raw, "rates.fallback")?;
            table.insert(code, *rate).map_err(|e| Error::Config(e.to_string()))?;
        }
        Ok(table)
    }

    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.rates.ttl_secs).unwrap_or(i64::MAX))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.rates.timeout_secs)
    }

    /// Full path to the audit log file.
    pub fn audit_path(&self) -> PathBuf {
        Path::new(&self.logging.dir).join(&self.logging.audit_file)
    }
}

fn parse_code(raw: &str, field: &str) -> Result<CurrencyCode> {
    CurrencyCode::new(raw)
        .ok_or_else(|| Error::Config(format!("{field}: {raw:?} is not a currency code")))
}
