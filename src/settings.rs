//! Process settings read from the environment.

use crate::error::ConfigError;
use crate::expression::EvaluatorLimits;
use crate::querykit::PoolOptions;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub settings_path: PathBuf,
    pub querykit_host: String,
    pub querykit_port: u16,
    pub pool: PoolOptions,
    pub request_timeout: Duration,
    pub body_limit: usize,
    pub max_operations: u64,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = match lookup("SERVICE_PORT") {
            Some(raw) => parse("SERVICE_PORT", &raw)?,
            None => return Err(ConfigError::Settings("SERVICE_PORT is required".into())),
        };
        if port == 0 {
            return Err(ConfigError::Settings("SERVICE_PORT must be non-zero".into()));
        }

        let pool = PoolOptions {
            min_size: or_default(&lookup, "QUERYKIT_POOL_MIN", 8)?,
            max_size: or_default(&lookup, "QUERYKIT_POOL_MAX", 16)?,
            dial_timeout: secs(&lookup, "QUERYKIT_DIAL_TIMEOUT_SECS", 20)?,
            idle_timeout: secs(&lookup, "QUERYKIT_IDLE_TIMEOUT_SECS", 60)?,
            wait_timeout: secs(&lookup, "QUERYKIT_WAIT_TIMEOUT_SECS", 20)?,
        };
        if pool.max_size == 0 {
            return Err(ConfigError::Settings("QUERYKIT_POOL_MAX must be non-zero".into()));
        }

        Ok(Settings {
            host: lookup("SERVICE_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            settings_path: lookup("SERVICE_SETTINGS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./settings")),
            querykit_host: lookup("QUERYKIT_HOST").unwrap_or_else(|| "127.0.0.1".into()),
            querykit_port: or_default(&lookup, "QUERYKIT_PORT", 44444)?,
            pool,
            request_timeout: secs(&lookup, "QUERYKIT_REQUEST_TIMEOUT_SECS", 30)?,
            body_limit: or_default(&lookup, "REQUEST_BODY_LIMIT_BYTES", 1024 * 1024)?,
            max_operations: or_default(&lookup, "EXPRESSION_MAX_OPERATIONS", 100_000)?,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn querykit_uri(&self) -> String {
        format!("http://{}:{}", self.querykit_host, self.querykit_port)
    }

    pub fn evaluator_limits(&self) -> EvaluatorLimits {
        EvaluatorLimits {
            max_operations: self.max_operations,
            ..EvaluatorLimits::default()
        }
    }
}

fn parse<T: FromStr>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| ConfigError::Settings(format!("{key}={raw}: {e}")))
}

fn or_default<T, F>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => parse(key, &raw),
        _ => Ok(default),
    }
}

fn secs<F>(lookup: &F, key: &str, default: u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    or_default(lookup, key, default).map(Duration::from_secs)
}
