//! Runtime configuration of the offline subsystem.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::sync::RetryPolicy;

pub const DEFAULT_DATABASE_FILE_NAME: &str = "fieldsafe.db";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

const ENV_API_URL: &str = "FIELDSAFE_API_URL";
const ENV_REQUEST_TIMEOUT_SECS: &str = "FIELDSAFE_REQUEST_TIMEOUT_SECS";
const ENV_SYNC_MAX_ATTEMPTS: &str = "FIELDSAFE_SYNC_MAX_ATTEMPTS";
const ENV_SYNC_BACKOFF_BASE_SECS: &str = "FIELDSAFE_SYNC_BACKOFF_BASE_SECS";

/// How schema migration steps are wrapped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionMode {
    /// Native exclusive transaction of the driver.
    #[default]
    Exclusive,
    /// Explicit `BEGIN` / `COMMIT`, with `ROLLBACK` on failure.
    Manual,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OfflineConfig {
    pub api_base_url: String,
    pub database_file_name: String,
    pub request_timeout_secs: u64,
    pub retry: RetryPolicy,
    pub transaction_mode: TransactionMode,
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            database_file_name: DEFAULT_DATABASE_FILE_NAME.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            retry: RetryPolicy::default(),
            transaction_mode: TransactionMode::default(),
        }
    }
}

impl OfflineConfig {
    /// Defaults overlaid with `FIELDSAFE_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Overlay values produced by `lookup`. Unparseable numbers are logged and
    /// ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL)
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
        {
            self.api_base_url = url;
        }
        if let Some(value) = parse_override(&lookup, ENV_REQUEST_TIMEOUT_SECS) {
            self.request_timeout_secs = value;
        }
        if let Some(value) = parse_override(&lookup, ENV_SYNC_MAX_ATTEMPTS) {
            self.retry.max_attempts = value;
        }
        if let Some(value) = parse_override(&lookup, ENV_SYNC_BACKOFF_BASE_SECS) {
            self.retry.base_delay_secs = value;
        }
        self
    }

    pub fn is_api_configured(&self) -> bool {
        !self.api_base_url.is_empty()
    }
}

fn parse_override<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("[OfflineSync] Ignoring invalid {}='{}'", key, raw);
            None
        }
    }
}
