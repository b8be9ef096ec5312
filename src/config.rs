// src/config.rs

use std::{env, time::Duration};

use crate::error::{Result, ScrapeError};
use crate::month::Month;

pub const DEFAULT_START_MONTH: &str = "2017/01";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Settings fixed when a [`crate::Scraper`] is constructed.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// Rows older than this month are dropped, and table pagination stops once reached.
    pub start_month: Month,
    /// How many indicators `fetch_many` works on at once. Pages of a single
    /// indicator are always fetched one after another.
    pub concurrency: usize,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            start_month: Month::from_ym_unchecked(2017, 1),
            concurrency: 1,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: format!("econscraper/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ScraperConfig {
    pub fn with_start_month(mut self, start_month: Month) -> Self {
        self.start_month = start_month;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Defaults overlaid with `ECON_START_MONTH`, `ECON_CONCURRENCY` and
    /// `ECON_TIMEOUT_SECS` when set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut cfg = Self::default();

        if let Some(raw) = lookup("ECON_START_MONTH") {
            cfg.start_month = raw
                .parse()
                .map_err(|e| ScrapeError::Config(format!("ECON_START_MONTH: {}", e)))?;
        }
        if let Some(raw) = lookup("ECON_CONCURRENCY") {
            let n: usize = raw
                .trim()
                .parse()
                .map_err(|_| ScrapeError::Config(format!("ECON_CONCURRENCY: {:?}", raw)))?;
            cfg = cfg.with_concurrency(n);
        }
        if let Some(raw) = lookup("ECON_TIMEOUT_SECS") {
            let secs: u64 = raw
                .trim()
                .parse()
                .map_err(|_| ScrapeError::Config(format!("ECON_TIMEOUT_SECS: {:?}", raw)))?;
            cfg.timeout = Duration::from_secs(secs);
        }

        Ok(cfg)
    }
}
