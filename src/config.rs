use crate::dial::{DialConfig, Network};
use crate::error::{ConfigurationError, Result};
use crate::retry::{RetryPolicy, DEFAULT_BACKOFF_UNIT, DEFAULT_MAX_ATTEMPTS};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for an executor built on the default dial factory.
///
/// Timeouts are in milliseconds; zero disables the timeout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub network: Network,
    pub address: String,
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
    pub write_timeout_ms: u64,
    pub max_attempts: u32,
    pub backoff_unit_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            network: Network::Tcp,
            address: "127.0.0.1:6379".to_string(),
            connect_timeout_ms: 5000,
            read_timeout_ms: 0,
            write_timeout_ms: 0,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_unit_ms: DEFAULT_BACKOFF_UNIT.as_millis() as u64,
        }
    }
}

fn parse_var<T>(key: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| ConfigurationError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })
}

impl ExecutorConfig {
    /// Defaults overridden by `REDOER_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ExecutorConfig::from_env`] with an explicit variable source.
    ///
    /// Lets tests supply variables without touching the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(network) = lookup("REDOER_NETWORK") {
            config.network = network.trim().parse()?;
        }
        if let Some(address) = lookup("REDOER_ADDRESS") {
            config.address = address.trim().to_string();
        }
        if let Some(raw) = lookup("REDOER_CONNECT_TIMEOUT_MS") {
            config.connect_timeout_ms = parse_var("REDOER_CONNECT_TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = lookup("REDOER_READ_TIMEOUT_MS") {
            config.read_timeout_ms = parse_var("REDOER_READ_TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = lookup("REDOER_WRITE_TIMEOUT_MS") {
            config.write_timeout_ms = parse_var("REDOER_WRITE_TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = lookup("REDOER_MAX_ATTEMPTS") {
            config.max_attempts = parse_var("REDOER_MAX_ATTEMPTS", &raw)?;
        }
        if let Some(raw) = lookup("REDOER_BACKOFF_UNIT_MS") {
            config.backoff_unit_ms = parse_var("REDOER_BACKOFF_UNIT_MS", &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(ConfigurationError::InvalidValue {
                key: "max_attempts".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }

        if self.address.is_empty() {
            return Err(ConfigurationError::InvalidAddress {
                address: self.address.clone(),
                message: "address is empty".to_string(),
            });
        }

        if self.network == Network::Tcp && !self.address.contains(':') {
            return Err(ConfigurationError::InvalidAddress {
                address: self.address.clone(),
                message: "expected host:port".to_string(),
            });
        }

        Ok(())
    }

    pub fn dial_config(&self) -> DialConfig {
        DialConfig {
            network: self.network,
            address: self.address.clone(),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            read_timeout: Duration::from_millis(self.read_timeout_ms),
            write_timeout: Duration::from_millis(self.write_timeout_ms),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.backoff_unit_ms))
    }
}
