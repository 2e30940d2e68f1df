//! Runtime configuration.
//!
//! All settings come from `SV_*` environment variables and are read once in
//! `main`. Empty or unparsable values fall back to the defaults below, so a
//! typo in the environment never stops the tool from running.
//!
//! | Variable            | Default          |
//! |---------------------|------------------|
//! | `SV_HOME`           | `~/.sv`          |
//! | `SV_BASE_URL`       | `https://go.dev` |
//! | `SV_HTTP_TIMEOUT`   | `10s`            |
//! | `SV_DOWNLOAD_RETRY` | `3`              |
//! | `SV_CONCURRENCY`    | CPU count        |
//! | `SV_DEBUG`          | `false`          |

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

use crate::toolchain::retry::RetryConfig;

pub const HOME_ENV: &str = "SV_HOME";
pub const BASE_URL_ENV: &str = "SV_BASE_URL";
pub const HTTP_TIMEOUT_ENV: &str = "SV_HTTP_TIMEOUT";
pub const DOWNLOAD_RETRY_ENV: &str = "SV_DOWNLOAD_RETRY";
pub const CONCURRENCY_ENV: &str = "SV_CONCURRENCY";
pub const DEBUG_ENV: &str = "SV_DEBUG";

const DEFAULT_BASE_URL: &str = "https://go.dev";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_DOWNLOAD_RETRY: u32 = 3;

/// Settings shared by every command.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the on-disk layout (`bin/`, `cache/`, `downloads/`, `go`).
    pub home: PathBuf,
    /// Base URL for archive downloads and the release catalog.
    pub base_url: String,
    /// Timeout for probes and catalog requests.
    pub http_timeout: Duration,
    /// Number of download attempts.
    pub download_retry: u32,
    /// Number of parts fetched in parallel.
    pub concurrency: usize,
    pub debug: bool,
}

impl Config {
    /// Builds the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if `SV_HOME` is unset and the home directory cannot
    /// be determined.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be determined.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let home = match value(HOME_ENV) {
            Some(home) => PathBuf::from(home.trim()),
            None => dirs::home_dir()
                .context("Cannot determine home directory. Set SV_HOME environment variable.")?
                .join(".sv"),
        };

        let mut config = Self::with_home(home);
        if let Some(url) = value(BASE_URL_ENV) {
            config.base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(timeout) = value(HTTP_TIMEOUT_ENV).and_then(|v| parse_duration(&v)) {
            config.http_timeout = timeout;
        }
        if let Some(retry) = value(DOWNLOAD_RETRY_ENV)
            .and_then(|v| v.trim().parse::<u32>().ok())
            .filter(|n| *n > 0)
        {
            config.download_retry = retry;
        }
        if let Some(concurrency) = value(CONCURRENCY_ENV)
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|n| *n > 0)
        {
            config.concurrency = concurrency;
        }
        if let Some(debug) = value(DEBUG_ENV).and_then(|v| parse_bool(&v)) {
            config.debug = debug;
        }
        Ok(config)
    }

    /// Default settings rooted at `home`.
    #[must_use = "returns a new config without side effects"]
    pub fn with_home(home: PathBuf) -> Self {
        Self {
            home,
            base_url: DEFAULT_BASE_URL.to_string(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            download_retry: DEFAULT_DOWNLOAD_RETRY,
            concurrency: default_concurrency(),
            debug: false,
        }
    }

    /// Retry policy for downloads.
    #[must_use]
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.download_retry,
            ..RetryConfig::default()
        }
    }
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism().map_or(4, std::num::NonZeroUsize::get)
}

/// Parses `500ms`, `10s`, `2m`, `1h`, or a bare number of seconds.
fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);
    let amount: u64 = digits.parse().ok()?;
    let duration = match unit.trim() {
        "" | "s" => Duration::from_secs(amount),
        "ms" => Duration::from_millis(amount),
        "m" => Duration::from_secs(amount.checked_mul(60)?),
        "h" => Duration::from_secs(amount.checked_mul(3600)?),
        _ => return None,
    };
    (!duration.is_zero()).then_some(duration)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
