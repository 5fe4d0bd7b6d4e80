//! Runtime configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::retry::RetryPolicy;

/// Top-level configuration shared by the registry, allowance and quote
/// subsystems.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the SDK-info / route aggregator API.
    pub api_url: String,

    /// JSON-RPC endpoint used for contract reads.
    pub rpc_url: String,

    /// Client-side timeout for registry and allowance HTTP calls.
    pub http_timeout_secs: u64,

    /// Maximum registry snapshot age before an automatic refresh.
    pub registry_ttl_secs: u64,

    /// Maximum number of calls per batched contract read.
    pub allowance_batch_size: usize,

    /// Refetch interval for a ready quote.
    pub quote_refetch_interval_ms: u64,

    /// Age under which a ready quote is served without refetching.
    pub quote_stale_time_ms: u64,

    pub retry: RetryConfig,

    /// Directory for `FileStorage`. `None` keeps everything in memory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_dir: Option<PathBuf>,
}

/// Backoff settings for quote fetches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            // 3 attempts in total, backing off 1s then 2s. See `RetryPolicy`.
            max_attempts: 3,
            initial_delay_ms: 1_000,
            max_delay_ms: 30_000,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "https://api.0xsquid.com".to_string(),
            rpc_url: "https://eth.llamarpc.com".to_string(),
            http_timeout_secs: 30,
            registry_ttl_secs: 86_400,
            allowance_batch_size: 8_192,
            quote_refetch_interval_ms: 15_000,
            quote_stale_time_ms: 10_000,
            retry: RetryConfig::default(),
            storage_dir: None,
        }
    }
}

impl Config {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Apply `SWAPKIT_*` environment variable overrides.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SWAPKIT_API_URL") {
            self.api_url = v;
        }
        if let Some(v) = lookup("SWAPKIT_RPC_URL") {
            self.rpc_url = v;
        }
        if let Some(v) = lookup("SWAPKIT_STORAGE_DIR") {
            self.storage_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("SWAPKIT_HTTP_TIMEOUT_SECS") {
            self.http_timeout_secs = parse_number("SWAPKIT_HTTP_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("SWAPKIT_REGISTRY_TTL_SECS") {
            self.registry_ttl_secs = parse_number("SWAPKIT_REGISTRY_TTL_SECS", &v)?;
        }
        if let Some(v) = lookup("SWAPKIT_ALLOWANCE_BATCH_SIZE") {
            let size: usize = parse_number("SWAPKIT_ALLOWANCE_BATCH_SIZE", &v)?;
            if size == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "SWAPKIT_ALLOWANCE_BATCH_SIZE".to_string(),
                    value: v,
                });
            }
            self.allowance_batch_size = size;
        }
        Ok(self)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn quote_refetch_interval(&self) -> Duration {
        Duration::from_millis(self.quote_refetch_interval_ms)
    }

    pub fn quote_stale_time(&self) -> Duration {
        Duration::from_millis(self.quote_stale_time_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts.max(1),
            initial_delay: Duration::from_millis(self.retry.initial_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
            backoff_multiplier: 2.0,
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.http_timeout(), Duration::from_secs(30));
        assert_eq!(config.registry_ttl_secs, 86_400);
        assert_eq!(config.allowance_batch_size, 8_192);
        assert_eq!(config.quote_refetch_interval(), Duration::from_secs(15));
        assert_eq!(config.quote_stale_time(), Duration::from_secs(10));
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = Config::from_json(r#"{"apiUrl": "ignored", "registry_ttl_secs": 60}"#).unwrap();
        assert_eq!(config.registry_ttl_secs, 60);
        assert_eq!(config.allowance_batch_size, 8_192);
        assert!(config.storage_dir.is_none());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("swapkit.json");
        std::fs::write(&path, r#"{"quote_stale_time_ms": 5000}"#).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.quote_stale_time(), Duration::from_secs(5));

        let missing = Config::from_file(dir.path().join("missing.json"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));

        std::fs::write(&path, "{").unwrap();
        assert!(matches!(Config::from_file(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("SWAPKIT_API_URL", "http://localhost:3000"),
            ("SWAPKIT_ALLOWANCE_BATCH_SIZE", "100"),
        ]
        .into_iter()
        .collect();
        let config = Config::default()
            .with_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.api_url, "http://localhost:3000");
        assert_eq!(config.allowance_batch_size, 100);
    }

    #[test]
    fn test_env_override_rejects_zero_batch() {
        let result = Config::default().with_overrides(|k| {
            (k == "SWAPKIT_ALLOWANCE_BATCH_SIZE").then(|| "0".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_retry_policy_from_config() {
        let policy = Config::default().retry_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.initial_delay, Duration::from_secs(1));
        assert_eq!(policy.max_delay, Duration::from_secs(30));
    }
}
