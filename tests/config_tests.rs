//! Tests for configuration loading.

use std::collections::BTreeSet;
use std::io::Write;
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use ledger_client::config::{ConfigError, LedgerConfig};

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

const CONFIG_ENV_VARS: [&str; 6] = [
    "LEDGER_SERVICE_NAME",
    "LEDGER_MAX_RETRIES",
    "LEDGER_INITIAL_DELAY_MS",
    "LEDGER_MAX_DELAY_MS",
    "LEDGER_RETRYABLE_STATUS_CODES",
    "LEDGER_OBSERVABILITY_ENABLED",
];

struct EnvGuard {
    saved: Vec<(String, Option<String>)>,
}

impl EnvGuard {
    fn capture(keys: &[&str]) -> Self {
        let saved = keys
            .iter()
            .map(|key| ((*key).to_string(), std::env::var(key).ok()))
            .collect();
        Self { saved }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.saved {
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }
    }
}

fn env_lock_guard() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn clear_config_env() {
    for key in CONFIG_ENV_VARS {
        std::env::remove_var(key);
    }
}

#[test]
fn defaults_match_documented_values() {
    let config = LedgerConfig::default();
    assert_eq!(config.service_name, "ledger-client");
    assert_eq!(config.retry.max_retries, 3);
    assert_eq!(config.retry.initial_delay_ms, 100);
    assert_eq!(config.retry.max_delay_ms, 1000);
    assert_eq!(
        config.retry.retryable_status_codes,
        BTreeSet::from([408, 429, 500, 502, 503, 504])
    );
    assert!(!config.observability.enabled);
}

#[test]
fn from_env_reads_ledger_variables() {
    let _lock = env_lock_guard();
    let _guard = EnvGuard::capture(&CONFIG_ENV_VARS);
    clear_config_env();
    std::env::set_var("LEDGER_SERVICE_NAME", "payments");
    std::env::set_var("LEDGER_MAX_RETRIES", "7");
    std::env::set_var("LEDGER_OBSERVABILITY_ENABLED", "1");

    let config = LedgerConfig::from_env().unwrap();

    assert_eq!(config.service_name, "payments");
    assert_eq!(config.retry.max_retries, 7);
    assert_eq!(config.retry.initial_delay_ms, 100);
    assert!(config.observability.enabled);
}

#[test]
fn from_env_rejects_bad_boolean() {
    let _lock = env_lock_guard();
    let _guard = EnvGuard::capture(&CONFIG_ENV_VARS);
    clear_config_env();
    std::env::set_var("LEDGER_OBSERVABILITY_ENABLED", "sometimes");

    let err = LedgerConfig::from_env().unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)), "{err}");
}

#[test]
fn toml_keeps_defaults_for_missing_keys() {
    let config = LedgerConfig::from_toml_str(
        r#"
service_name = "ledger-worker"

[retry]
max_retries = 5
retryable_status_codes = [503]
"#,
    )
    .unwrap();

    assert_eq!(config.service_name, "ledger-worker");
    assert_eq!(config.retry.max_retries, 5);
    assert_eq!(config.retry.initial_delay_ms, 100);
    assert_eq!(config.retry.retryable_status_codes, BTreeSet::from([503]));
}

#[test]
fn toml_with_inverted_delays_is_invalid() {
    let err = LedgerConfig::from_toml_str(
        r#"
[retry]
initial_delay_ms = 500
max_delay_ms = 100
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let err = LedgerConfig::from_toml_str("retry = [").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn from_file_loads_toml() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[retry]\ninitial_delay_ms = 25\nmax_delay_ms = 200\n\n[observability]\nenabled = true"
    )
    .unwrap();

    let config = LedgerConfig::from_file(file.path()).unwrap();

    assert_eq!(config.retry.initial_delay_ms, 25);
    assert_eq!(config.retry.max_delay_ms, 200);
    assert!(config.observability.enabled);
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = LedgerConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn retry_options_are_seeded_from_config() {
    let config = LedgerConfig::from_toml_str(
        r#"
[retry]
max_retries = 1
initial_delay_ms = 20
max_delay_ms = 80
"#,
    )
    .unwrap();

    let options = config.retry_options();
    assert_eq!(options.max_retries, 1);
    assert_eq!(options.initial_delay, Duration::from_millis(20));
    assert_eq!(options.max_delay, Duration::from_millis(80));
    assert!(options.retry_condition.is_none());

    let overridden = config.retry_options().with_max_retries(9);
    assert_eq!(overridden.max_retries, 9);
    assert_eq!(config.retry.max_retries, 1);
}
