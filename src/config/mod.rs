//! Configuration (layered: code > env > config file > defaults).
//!
//! Environment state is read in exactly one place, [`LedgerConfig::from_env`].
//! The retry, transaction and pagination components receive plain values
//! assembled from a config at startup and never consult the environment.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::observability::{NoopSink, ObservabilitySink, TracingSink};
use crate::util::retry::{default_retryable_status_codes, RetryOptions};

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Process-wide defaults for the ledger client.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub service_name: String,
    pub retry: RetryDefaults,
    pub observability: ObservabilityConfig,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            service_name: "ledger-client".to_string(),
            retry: RetryDefaults::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Retry defaults, seeded into every [`RetryOptions`] built from this config.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryDefaults {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub retryable_status_codes: BTreeSet<u16>,
}

impl Default for RetryDefaults {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 100,
            max_delay_ms: 1000,
            retryable_status_codes: default_retryable_status_codes(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub enabled: bool,
}

impl LedgerConfig {
    /// Load from environment variables (`LEDGER_MAX_RETRIES`, `LEDGER_INITIAL_DELAY_MS`, etc.).
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        Self::default().merge_env(|key| std::env::var(key).ok())
    }

    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Overlay values from a variable lookup onto this config.
    pub fn merge_env(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(name) = lookup("LEDGER_SERVICE_NAME") {
            self.service_name = name;
        }
        if let Some(raw) = lookup("LEDGER_MAX_RETRIES") {
            self.retry.max_retries = parse_number("LEDGER_MAX_RETRIES", &raw)?;
        }
        if let Some(raw) = lookup("LEDGER_INITIAL_DELAY_MS") {
            self.retry.initial_delay_ms = parse_number("LEDGER_INITIAL_DELAY_MS", &raw)?;
        }
        if let Some(raw) = lookup("LEDGER_MAX_DELAY_MS") {
            self.retry.max_delay_ms = parse_number("LEDGER_MAX_DELAY_MS", &raw)?;
        }
        if let Some(raw) = lookup("LEDGER_RETRYABLE_STATUS_CODES") {
            self.retry.retryable_status_codes = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| parse_number("LEDGER_RETRYABLE_STATUS_CODES", s))
                .collect::<Result<_, _>>()?;
        }
        if let Some(raw) = lookup("LEDGER_OBSERVABILITY_ENABLED") {
            self.observability.enabled = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" | "" => false,
                other => {
                    return Err(ConfigError::Invalid(format!(
                        "LEDGER_OBSERVABILITY_ENABLED: expected a boolean, got {other:?}"
                    )))
                }
            };
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.initial_delay_ms == 0 {
            return Err(ConfigError::Invalid(
                "initial_delay_ms must be greater than zero".to_string(),
            ));
        }
        if self.retry.max_delay_ms < self.retry.initial_delay_ms {
            return Err(ConfigError::Invalid(format!(
                "max_delay_ms ({}) must be >= initial_delay_ms ({})",
                self.retry.max_delay_ms, self.retry.initial_delay_ms
            )));
        }
        Ok(())
    }

    /// Retry options seeded from this config. Override per instance as needed.
    pub fn retry_options(&self) -> RetryOptions {
        RetryOptions::builder()
            .max_retries(self.retry.max_retries)
            .initial_delay(Duration::from_millis(self.retry.initial_delay_ms))
            .max_delay(Duration::from_millis(self.retry.max_delay_ms))
            .retryable_status_codes(self.retry.retryable_status_codes.clone())
            .build()
    }

    /// The sink matching `observability.enabled`.
    pub fn sink(&self) -> Arc<dyn ObservabilitySink> {
        if self.observability.enabled {
            Arc::new(TracingSink::new(self.service_name.clone()))
        } else {
            Arc::new(NoopSink)
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{key}: expected a number, got {raw:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn merge_env_overrides_retry_defaults() {
        let config = LedgerConfig::default()
            .merge_env(lookup(&[
                ("LEDGER_MAX_RETRIES", "5"),
                ("LEDGER_INITIAL_DELAY_MS", "50"),
                ("LEDGER_MAX_DELAY_MS", "400"),
                ("LEDGER_RETRYABLE_STATUS_CODES", "503, 504"),
                ("LEDGER_OBSERVABILITY_ENABLED", "true"),
            ]))
            .unwrap();

        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.initial_delay_ms, 50);
        assert_eq!(config.retry.max_delay_ms, 400);
        assert_eq!(
            config.retry.retryable_status_codes,
            BTreeSet::from([503, 504])
        );
        assert!(config.observability.enabled);
    }

    #[test]
    fn merge_env_rejects_non_numeric_values() {
        let err = LedgerConfig::default()
            .merge_env(lookup(&[("LEDGER_MAX_RETRIES", "many")]))
            .unwrap_err();
        assert!(err.to_string().contains("LEDGER_MAX_RETRIES"), "{err}");
    }

    #[test]
    fn merge_env_rejects_inverted_delays() {
        let err = LedgerConfig::default()
            .merge_env(lookup(&[("LEDGER_MAX_DELAY_MS", "10")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
