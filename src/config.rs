//! Ledger configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::types::*;

/// How writes guard against concurrent edits of the same member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrencyMode {
    /// Send the member's revision with every write; stale writes fail with a conflict
    #[default]
    Versioned,
    /// Overwrite whatever is stored
    LastWriteWins,
}

/// Settings for a [`crate::Ledger`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Years every member's payment matrix covers
    pub year_range: YearRange,
    /// Upper bound on any single store call
    pub store_timeout_ms: u64,
    pub concurrency: ConcurrencyMode,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            year_range: YearRange::default(),
            store_timeout_ms: 10_000,
            concurrency: ConcurrencyMode::default(),
        }
    }
}

impl LedgerConfig {
    /// Parse and validate a JSON document; missing keys take their defaults
    pub fn from_json(json: &str) -> LedgerResult<Self> {
        let config: LedgerConfig = serde_json::from_str(json)
            .map_err(|e| LedgerError::Config(format!("Malformed ledger config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_year_range(mut self, year_range: YearRange) -> Self {
        self.year_range = year_range;
        self
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_concurrency(mut self, concurrency: ConcurrencyMode) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn validate(&self) -> LedgerResult<()> {
        self.year_range.validate()?;
        if self.store_timeout_ms == 0 {
            return Err(LedgerError::Config(
                "Store timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
