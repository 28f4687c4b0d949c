//! TOML configuration.
//!
//! Every value has a default, so an empty file (or no file at all, via
//! [`Config::minimal`]) gives a working setup. See
//! `config/wordshape.example.toml` for the full set of options.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::retry::RetryPolicy;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub dictionary: DictionaryConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DictionaryConfig {
    /// Word list location. Must be `https://`.
    #[serde(default = "default_url")]
    pub url: String,
    /// Largest accepted response body.
    #[serde(default = "default_max_size_bytes")]
    pub max_size_bytes: u64,
    /// Fewer accepted words than this aborts the load.
    #[serde(default = "default_min_word_count")]
    pub min_word_count: usize,
    /// Hard timeout for a single download attempt.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for DictionaryConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            max_size_bytes: default_max_size_bytes(),
            min_word_count: default_min_word_count(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_url() -> String {
    "https://raw.githubusercontent.com/dwyl/english-words/master/words_alpha.txt".to_string()
}
fn default_max_size_bytes() -> u64 {
    5 * 1024 * 1024
}
fn default_min_word_count() -> usize {
    wordshape_core::words::DEFAULT_MIN_WORDS
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Relative jitter applied to each backoff step, in `[0, 1)`.
    #[serde(default = "default_jitter")]
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: default_jitter(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}
fn default_initial_delay_ms() -> u64 {
    1000
}
fn default_max_delay_ms() -> u64 {
    8000
}
fn default_jitter() -> f64 {
    0.10
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            jitter: self.jitter,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// SQLite file holding the key-value cache.
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,
    /// Namespace prepended to every cache key.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    #[serde(default = "default_expiry_hours")]
    pub expiry_hours: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
            key_prefix: default_key_prefix(),
            expiry_hours: default_expiry_hours(),
        }
    }
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("./data/wordshape.sqlite")
}
fn default_key_prefix() -> String {
    "wordshape".to_string()
}
fn default_expiry_hours() -> u64 {
    24
}

impl CacheConfig {
    pub fn expiry(&self) -> chrono::Duration {
        chrono::Duration::hours(self.expiry_hours as i64)
    }
}

impl Config {
    /// Defaults for every section.
    pub fn minimal() -> Self {
        Self::default()
    }

    /// Check value ranges. Called by [`load_config`].
    pub fn validate(&self) -> Result<()> {
        if self.dictionary.url.trim().is_empty() {
            anyhow::bail!("dictionary.url must not be empty");
        }
        if self.dictionary.max_size_bytes == 0 {
            anyhow::bail!("dictionary.max_size_bytes must be > 0");
        }
        if self.dictionary.timeout_secs == 0 {
            anyhow::bail!("dictionary.timeout_secs must be > 0");
        }
        if self.retry.initial_delay_ms > self.retry.max_delay_ms {
            anyhow::bail!(
                "retry.initial_delay_ms ({}) must be <= retry.max_delay_ms ({})",
                self.retry.initial_delay_ms,
                self.retry.max_delay_ms
            );
        }
        if !(0.0..1.0).contains(&self.retry.jitter) {
            anyhow::bail!("retry.jitter must be in [0.0, 1.0)");
        }
        if self.cache.key_prefix.trim().is_empty() {
            anyhow::bail!("cache.key_prefix must not be empty");
        }
        if self.cache.expiry_hours == 0 {
            anyhow::bail!("cache.expiry_hours must be >= 1");
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

/// Load `path` if it exists, otherwise fall back to [`Config::minimal`].
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(Config::minimal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        config.validate().unwrap();
        assert_eq!(config.dictionary.max_size_bytes, 5 * 1024 * 1024);
        assert_eq!(config.dictionary.min_word_count, 1000);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.initial_delay_ms, 1000);
        assert_eq!(config.retry.max_delay_ms, 8000);
        assert_eq!(config.cache.expiry_hours, 24);
        assert_eq!(config.cache.key_prefix, "wordshape");
        assert!(config.dictionary.url.starts_with("https://"));
    }

    #[test]
    fn partial_sections_merge_with_defaults() {
        let config: Config = toml::from_str(
            r#"
            [retry]
            max_retries = 5

            [cache]
            path = "/tmp/ws.sqlite"
            "#,
        )
        .unwrap();
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.max_delay_ms, 8000);
        assert_eq!(config.cache.path, PathBuf::from("/tmp/ws.sqlite"));
        assert_eq!(config.cache.expiry_hours, 24);
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut config = Config::minimal();
        config.retry.jitter = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::minimal();
        config.retry.initial_delay_ms = 10_000;
        assert!(config.validate().is_err());

        let mut config = Config::minimal();
        config.cache.expiry_hours = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn retry_policy_from_config() {
        let policy = RetryConfig::default().policy();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.initial_delay, Duration::from_secs(1));
        assert_eq!(policy.max_delay, Duration::from_secs(8));
    }

    #[test]
    fn example_config_matches_defaults() {
        let config: Config =
            toml::from_str(include_str!("../config/wordshape.example.toml")).unwrap();
        config.validate().unwrap();
        let defaults = Config::minimal();
        assert_eq!(config.dictionary.url, defaults.dictionary.url);
        assert_eq!(config.dictionary.max_size_bytes, defaults.dictionary.max_size_bytes);
        assert_eq!(config.retry.jitter, defaults.retry.jitter);
        assert_eq!(config.cache.path, defaults.cache.path);
    }
}
