//! Runtime configuration for the Q&A core.
//!
//! # Responsibility
//! - Describe store, transaction, logging and pagination settings.
//! - Load them from a JSON document and apply environment overrides.
//!
//! # Invariants
//! - Every field has a default, so an empty document is a valid config.
//! - `validate()` rejects values that would make transactions unbounded.

use crate::db::TxPolicy;
use log::warn;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DB_PATH: &str = "DEVFLOW_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "DEVFLOW_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "DEVFLOW_LOG_DIR";
pub const ENV_LOG_MAX_FILES: &str = "DEVFLOW_LOG_MAX_FILES";
pub const ENV_TX_MAX_ATTEMPTS: &str = "DEVFLOW_TX_MAX_ATTEMPTS";
pub const ENV_TX_TIMEOUT_MS: &str = "DEVFLOW_TX_TIMEOUT_MS";

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    pub store: StoreConfig,
    pub transactions: TxPolicyConfig,
    pub logging: LoggingConfig,
    pub pagination: PaginationConfig,
}

/// Store driver settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Database file. Required for `Store::open`.
    pub path: Option<PathBuf>,
    /// How long a connection waits on a locked database before failing.
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: 5_000,
        }
    }
}

impl StoreConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

/// Bounds for mutating transactions.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TxPolicyConfig {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Backoff unit; attempt `n` sleeps `n * base_backoff_ms`.
    pub base_backoff_ms: u64,
    /// Transactions running longer than this are rolled back.
    pub timeout_ms: u64,
}

impl Default for TxPolicyConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff_ms: 25,
            timeout_ms: 2_000,
        }
    }
}

impl TxPolicyConfig {
    pub fn policy(&self) -> TxPolicy {
        TxPolicy {
            max_attempts: self.max_attempts.max(1),
            base_backoff: Duration::from_millis(self.base_backoff_ms),
            timeout: Duration::from_millis(self.timeout_ms),
        }
    }
}

/// Logging backend settings consumed by `init_logging_from`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    /// Absolute directory for rolling log files. Logging stays off when unset.
    pub dir: Option<String>,
    /// Size at which the active file is rotated.
    pub max_file_size_mb: u64,
    /// Rotated files kept next to the active one.
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: crate::logging::default_log_level().to_string(),
            dir: None,
            max_file_size_mb: 10,
            max_files: 5,
        }
    }
}

/// Page size bounds applied by the validation gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PaginationConfig {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            max_page_size: 100,
        }
    }
}

impl CoreConfig {
    /// Parses a JSON configuration document.
    pub fn from_json_str(raw: &str) -> Result<Self, String> {
        let config: Self =
            serde_json::from_str(raw).map_err(|err| format!("invalid config document: {err}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `DEVFLOW_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, String> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary key lookup.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        if let Some(path) = lookup(ENV_DB_PATH) {
            self.store.path = Some(PathBuf::from(path));
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.logging.level = level;
        }
        if let Some(dir) = lookup(ENV_LOG_DIR) {
            self.logging.dir = Some(dir);
        }
        if let Some(value) = lookup(ENV_LOG_MAX_FILES) {
            self.logging.max_files = parse_override(ENV_LOG_MAX_FILES, &value)?;
        }
        if let Some(value) = lookup(ENV_TX_MAX_ATTEMPTS) {
            self.transactions.max_attempts = parse_override(ENV_TX_MAX_ATTEMPTS, &value)?;
        }
        if let Some(value) = lookup(ENV_TX_TIMEOUT_MS) {
            self.transactions.timeout_ms = parse_override(ENV_TX_TIMEOUT_MS, &value)?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Checks cross-field constraints.
    pub fn validate(&self) -> Result<(), String> {
        if self.transactions.max_attempts == 0 {
            return Err("transactions.max_attempts must be >= 1".to_string());
        }
        if self.transactions.timeout_ms == 0 {
            return Err("transactions.timeout_ms must be > 0".to_string());
        }
        if self.logging.max_file_size_mb == 0 {
            return Err("logging.max_file_size_mb must be > 0".to_string());
        }
        if self.logging.max_files == 0 {
            return Err("logging.max_files must be >= 1".to_string());
        }
        if self.pagination.max_page_size == 0 {
            return Err("pagination.max_page_size must be > 0".to_string());
        }
        if self.pagination.default_page_size == 0
            || self.pagination.default_page_size > self.pagination.max_page_size
        {
            return Err(format!(
                "pagination.default_page_size must be within 1..={}",
                self.pagination.max_page_size
            ));
        }
        Ok(())
    }
}

fn parse_override<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|err| {
        warn!("event=config_override module=config status=error key={key}");
        format!("invalid value for {key}: {err}")
    })
}

#[cfg(test)]
mod tests {
    use super::{CoreConfig, ENV_DB_PATH, ENV_LOG_MAX_FILES, ENV_TX_MAX_ATTEMPTS};
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn empty_document_uses_defaults() {
        let config = CoreConfig::from_json_str("{}").expect("empty config should parse");
        assert_eq!(config, CoreConfig::default());
        let policy = config.transactions.policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.timeout, Duration::from_millis(2_000));
        assert_eq!(config.pagination.default_page_size, 10);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = CoreConfig::from_json_str(r#"{"store": {"url": "x"}}"#)
            .expect_err("unknown field should fail");
        assert!(err.contains("invalid config document"));
    }

    #[test]
    fn overrides_replace_document_values() {
        let env: HashMap<&str, &str> =
            HashMap::from([(ENV_DB_PATH, "/tmp/devflow.db"), (ENV_TX_MAX_ATTEMPTS, "5")]);
        let config = CoreConfig::default()
            .with_overrides(|key| env.get(key).map(|value| value.to_string()))
            .expect("overrides should apply");
        assert_eq!(config.store.path, Some(PathBuf::from("/tmp/devflow.db")));
        assert_eq!(config.transactions.max_attempts, 5);
    }

    #[test]
    fn invalid_override_and_zero_attempts_fail() {
        let err = CoreConfig::default()
            .with_overrides(|key| (key == ENV_TX_MAX_ATTEMPTS).then(|| "many".to_string()))
            .expect_err("non-numeric override should fail");
        assert!(err.contains(ENV_TX_MAX_ATTEMPTS));

        let err = CoreConfig::from_json_str(r#"{"transactions": {"max_attempts": 0}}"#)
            .expect_err("zero attempts should fail");
        assert!(err.contains("max_attempts"));
    }

    #[test]
    fn logging_rotation_is_configurable_and_bounded() {
        let config = CoreConfig::from_json_str(
            r#"{"logging": {"dir": "/var/log/devflow", "max_file_size_mb": 2}}"#,
        )
        .expect("rotation settings should parse");
        assert_eq!(config.logging.max_file_size_mb, 2);
        assert_eq!(config.logging.max_files, 5);

        let config = config
            .with_overrides(|key| (key == ENV_LOG_MAX_FILES).then(|| "12".to_string()))
            .expect("max files override should apply");
        assert_eq!(config.logging.max_files, 12);

        let err = CoreConfig::from_json_str(r#"{"logging": {"max_files": 0}}"#)
            .expect_err("zero retained files should fail");
        assert!(err.contains("max_files"));
    }
}
