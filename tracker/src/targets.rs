//! Target weight overrides (targets.json) loading and validation.

use std::path::Path;

use divfolio::Advisor;
use divfolio::holding::ticker_key;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Explicit target weights, taking precedence over the holdings' own
/// `target_weight_pct` column.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TargetSpec {
    pub targets: Vec<TargetWeight>,
}

/// A single target: ticker + weight in percent.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TargetWeight {
    pub ticker: String,
    pub weight_pct: f64,
}

impl TargetSpec {
    /// Load and validate a targets.json file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(&contents)
    }

    /// Parse from a JSON string (useful for testing).
    pub fn from_json(json: &str) -> Result<Self> {
        let spec: TargetSpec = serde_json::from_str(json)?;
        spec.validate()?;
        Ok(spec)
    }

    fn validate(&self) -> Result<()> {
        if self.targets.is_empty() {
            return Err(Error::Target("targets list is empty".into()));
        }

        let mut seen = FxHashSet::default();
        for t in &self.targets {
            let key = ticker_key(&t.ticker);
            if key.is_empty() {
                return Err(Error::Target("empty ticker".into()));
            }
            if !seen.insert(key) {
                return Err(Error::Target(format!("duplicate ticker: {}", t.ticker)));
            }
            if !t.weight_pct.is_finite() || t.weight_pct <= 0.0 || t.weight_pct > 100.0 {
                return Err(Error::Target(format!(
                    "weight for {} ({}) must be in (0, 100]",
                    t.ticker, t.weight_pct
                )));
            }
        }

        let sum: f64 = self.targets.iter().map(|t| t.weight_pct).sum();
        if sum > 100.0 + 1e-9 {
            return Err(Error::Target(format!("weights sum to {sum:.2}% (> 100%)")));
        }

        Ok(())
    }

    /// (ticker, weight_pct) pairs.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, f64)> {
        self.targets.iter().map(|t| (t.ticker.as_str(), t.weight_pct))
    }

    /// An advisor using these targets.
    pub fn advisor(&self, top_n: usize) -> Result<Advisor> {
        Ok(Advisor::new().top_n(top_n).with_targets(self.pairs())?)
    }
}
