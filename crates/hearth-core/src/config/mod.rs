//! Sync configuration.
//!
//! The endpoint itself is persisted state owned by the orchestrator; this
//! module holds the tunables around it and the endpoint validation rules.

use std::time::Duration;

use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

/// Quiet window after the last local mutation before a background sync runs.
pub const DEFAULT_DEBOUNCE_MS: u64 = 3_000;
/// Upper bound on a single fetch or push.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

pub const DEBOUNCE_ENV: &str = "HEARTH_SYNC_DEBOUNCE_MS";
pub const REQUEST_TIMEOUT_ENV: &str = "HEARTH_SYNC_TIMEOUT_SECS";
pub const SYNC_URL_ENV: &str = "HEARTH_SYNC_URL";

/// Scheduling and timeout knobs for the sync orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    pub debounce: Duration,
    pub request_timeout: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl SyncOptions {
    /// Defaults overridden by `HEARTH_SYNC_DEBOUNCE_MS` / `HEARTH_SYNC_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`Self::from_env`] with an injectable variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut options = Self::default();

        if let Some(raw) = normalize_text_option(lookup(DEBOUNCE_ENV)) {
            options.debounce = Duration::from_millis(parse_u64(DEBOUNCE_ENV, &raw)?);
        }
        if let Some(raw) = normalize_text_option(lookup(REQUEST_TIMEOUT_ENV)) {
            let secs = parse_u64(REQUEST_TIMEOUT_ENV, &raw)?;
            if secs == 0 {
                return Err(Error::InvalidInput(format!(
                    "{REQUEST_TIMEOUT_ENV} must be greater than zero"
                )));
            }
            options.request_timeout = Duration::from_secs(secs);
        }

        Ok(options)
    }
}

/// Validate a user-supplied endpoint.
///
/// Blank input means "no endpoint" and yields `Ok(None)`; anything else must
/// be an absolute http(s) URL.
pub fn normalize_endpoint(raw: &str) -> Result<Option<String>> {
    let Some(endpoint) = normalize_text_option(Some(raw.to_string())) else {
        return Ok(None);
    };
    if is_http_url(&endpoint) {
        Ok(Some(endpoint))
    } else {
        Err(Error::InvalidInput(
            "sync endpoint must include http:// or https://".to_string(),
        ))
    }
}

fn parse_u64(key: &str, raw: &str) -> Result<u64> {
    raw.parse()
        .map_err(|_| Error::InvalidInput(format!("{key} must be a whole number, got '{raw}'")))
}
