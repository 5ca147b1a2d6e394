use std::time::Duration;

use chrono::NaiveDate;

use crate::limits::DEFAULT_HTTP_TIMEOUT_MS;
use crate::model::UserId;

/// Runtime settings, read from `FIXCAL_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Backend base URL; without one the binary runs against an empty in-memory source.
    pub api_url: Option<String>,
    pub fixer: UserId,
    pub requester: Option<UserId>,
    /// Selected day; today when unset.
    pub date: Option<NaiveDate>,
    pub poll_interval: Option<Duration>,
    pub http_timeout: Duration,
    pub metrics_port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { var: &'static str, value: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing(var) => write!(f, "{var} must be set"),
            ConfigError::Invalid { var, value } => write!(f, "invalid {var}: {value:?}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| get(var).filter(|v| !v.trim().is_empty());

        let fixer = get("FIXCAL_FIXER").ok_or(ConfigError::Missing("FIXCAL_FIXER"))?;
        let date = parse(&get, "FIXCAL_DATE", |s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
        })?;
        let poll_interval = parse(&get, "FIXCAL_POLL_SECS", |s| {
            s.parse::<u64>().ok().filter(|n| *n > 0).map(Duration::from_secs)
        })?;
        let http_timeout = parse(&get, "FIXCAL_HTTP_TIMEOUT_MS", |s| {
            s.parse::<u64>().ok().map(Duration::from_millis)
        })?
        .unwrap_or(Duration::from_millis(DEFAULT_HTTP_TIMEOUT_MS));
        let metrics_port = parse(&get, "FIXCAL_METRICS_PORT", |s| s.parse::<u16>().ok())?;

        Ok(Self {
            api_url: get("FIXCAL_API_URL"),
            fixer,
            requester: get("FIXCAL_REQUESTER"),
            date,
            poll_interval,
            http_timeout,
            metrics_port,
        })
    }
}

fn parse<T>(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    f: impl Fn(&str) -> Option<T>,
) -> Result<Option<T>, ConfigError> {
    match get(var) {
        None => Ok(None),
        Some(value) => match f(value.trim()) {
            Some(v) => Ok(Some(v)),
            None => Err(ConfigError::Invalid { var, value }),
        },
    }
}
