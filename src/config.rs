//! Configuration management for the PDF Splitter service
//!
//! Every tunable is read from the environment (optionally seeded from a
//! `.env` file by `dotenvy`) and passed to components at construction.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::split::{RangePolicy, DEFAULT_EXTRACT_TIMEOUT};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("{key} must be greater than zero")]
    Zero { key: &'static str },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub lifecycle: LifecycleConfig,
    pub split: SplitConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Request body limit for uploads, in bytes
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Where original uploads are written
    pub upload_dir: PathBuf,
    /// Where derived PDFs are written
    pub output_dir: PathBuf,
}

/// Timing knobs for throttling and artifact expiry
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Minimum interval between two admitted submissions from one client
    pub rate_limit_window: Duration,
    /// Lifetime of an artifact that has never been downloaded
    pub creation_ttl: Duration,
    /// Lifetime of an artifact after its first download
    pub download_ttl: Duration,
    /// How often the sweeper wakes up
    pub sweep_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct SplitConfig {
    pub range_policy: RangePolicy,
    /// Longest a single extraction may run before the request fails
    pub extract_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
                max_upload_bytes: 100 * 1024 * 1024,
            },
            storage: StorageConfig {
                upload_dir: PathBuf::from("uploads"),
                output_dir: PathBuf::from("outputs"),
            },
            lifecycle: LifecycleConfig::default(),
            split: SplitConfig {
                range_policy: RangePolicy::default(),
                extract_timeout: DEFAULT_EXTRACT_TIMEOUT,
            },
        }
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        LifecycleConfig {
            rate_limit_window: Duration::from_secs(360),
            creation_ttl: Duration::from_secs(10 * 60),
            download_ttl: Duration::from_secs(5 * 60),
            sweep_interval: Duration::from_secs(15),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Missing keys fall back
    /// to the defaults; present but malformed keys are an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let lifecycle = LifecycleConfig {
            rate_limit_window: seconds(
                &lookup,
                "RATE_LIMIT_WINDOW_SECS",
                defaults.lifecycle.rate_limit_window,
            )?,
            creation_ttl: seconds(&lookup, "FILE_TTL_SECS", defaults.lifecycle.creation_ttl)?,
            download_ttl: seconds(&lookup, "DOWNLOAD_TTL_SECS", defaults.lifecycle.download_ttl)?,
            sweep_interval: seconds(
                &lookup,
                "CLEANUP_INTERVAL_SECS",
                defaults.lifecycle.sweep_interval,
            )?,
        };
        if lifecycle.sweep_interval.is_zero() {
            // tokio::time::interval panics on a zero period
            return Err(ConfigError::Zero {
                key: "CLEANUP_INTERVAL_SECS",
            });
        }

        let extract_timeout = seconds(
            &lookup,
            "EXTRACT_TIMEOUT_SECS",
            defaults.split.extract_timeout,
        )?;
        if extract_timeout.is_zero() {
            return Err(ConfigError::Zero {
                key: "EXTRACT_TIMEOUT_SECS",
            });
        }

        Ok(Config {
            server: ServerConfig {
                host: lookup("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parsed(&lookup, "SERVER_PORT", defaults.server.port)?,
                max_upload_bytes: parsed(
                    &lookup,
                    "MAX_UPLOAD_BYTES",
                    defaults.server.max_upload_bytes,
                )?,
            },
            storage: StorageConfig {
                upload_dir: lookup("UPLOAD_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.upload_dir),
                output_dir: lookup("OUTPUT_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.output_dir),
            },
            lifecycle,
            split: SplitConfig {
                range_policy: parsed(&lookup, "RANGE_POLICY", defaults.split.range_policy)?,
                extract_timeout,
            },
        })
    }
}

fn parsed<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
    }
}

fn seconds<F>(lookup: &F, key: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    parsed(lookup, key, default.as_secs()).map(Duration::from_secs)
}
