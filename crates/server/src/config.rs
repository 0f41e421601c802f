//! Shared configuration for every process role.
//!
//! The writer and reader roles must agree on where the store lives, so both
//! read the same variables (optionally from `.env`).

use anyhow::{anyhow, Context};
use persistence::{StoreOptions, DEFAULT_BUSY_TIMEOUT_MS};
use refresher::DEFAULT_REFRESH_INTERVAL_SECS;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DB_PATH: &str = "data/agora.db";
pub const DEFAULT_OPERATOR: &str = "NICO_2028";

#[derive(Debug, Clone)]
pub struct Config {
    /// Store file (AGORA_DB_PATH)
    pub db_path: PathBuf,
    /// Seconds between signal refresh ticks (AGORA_REFRESH_INTERVAL_SECS)
    pub refresh_interval: Duration,
    /// SQLite busy timeout in ms (AGORA_BUSY_TIMEOUT_MS)
    pub busy_timeout: Duration,
    /// Handle shown on the landing page (AGORA_OPERATOR)
    pub operator: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let number = |key: &str, default: u64| -> anyhow::Result<u64> {
            match lookup(key) {
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .with_context(|| format!("{key} must be a non-negative integer, got '{raw}'")),
                None => Ok(default),
            }
        };

        let refresh_secs = number("AGORA_REFRESH_INTERVAL_SECS", DEFAULT_REFRESH_INTERVAL_SECS)?;
        if refresh_secs == 0 {
            return Err(anyhow!("AGORA_REFRESH_INTERVAL_SECS must be at least 1"));
        }

        Ok(Self {
            db_path: lookup("AGORA_DB_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
            refresh_interval: Duration::from_secs(refresh_secs),
            busy_timeout: Duration::from_millis(number(
                "AGORA_BUSY_TIMEOUT_MS",
                DEFAULT_BUSY_TIMEOUT_MS,
            )?),
            operator: lookup("AGORA_OPERATOR").unwrap_or_else(|| DEFAULT_OPERATOR.to_string()),
        })
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions::new(&self.db_path).busy_timeout(self.busy_timeout)
    }

    /// Refresh interval, with `--interval-secs` taking precedence over the env
    pub fn refresh_interval_with(&self, override_secs: Option<u64>) -> anyhow::Result<Duration> {
        match override_secs {
            Some(0) => Err(anyhow!("--interval-secs must be at least 1")),
            Some(secs) => Ok(Duration::from_secs(secs)),
            None => Ok(self.refresh_interval),
        }
    }
}
