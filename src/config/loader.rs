// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::config::consts::{DEFAULT_RETRY_INTERVAL_MS, DEFAULT_RETRY_TIMES};
use crate::config::Limit;
use crate::engine::resilience::RetryOptions;
use crate::errors::ConfigError;

/// Main configuration structure for a scheduled task run.
///
/// Describes a dependency graph of simulated tasks together with the
/// concurrency, queue and retry settings used to run it. Loaded from YAML or
/// TOML by [`load_config`].
///
/// # Fields
/// * `concurrency` - Maximum tasks in flight (optional, defaults to unbounded)
/// * `queue` - Options for task queues built from this config (optional)
/// * `retry` - Retry policy applied to every task (optional)
/// * `tasks` - The task graph, in insertion order
///
/// # Example
/// ```yaml
/// concurrency: 4
/// queue:
///   concurrency: 2
///   payload: 1
/// retry:
///   times: 3
///   interval_ms: 10
/// tasks:
///   - id: fetch
///     duration_ms: 20
///   - id: parse
///     depends_on: [fetch]
///     duration_ms: 5
///     fail_times: 1
///     timeout_ms: 100
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub concurrency: Limit,
    #[serde(default)]
    pub queue: QueueOptions,
    #[serde(default)]
    pub retry: RetryConfig,
    pub tasks: Vec<TaskConfig>,
}

/// Queue construction options.
///
/// `buffer` is how far below `concurrency` the running count must fall before
/// `unsaturated` fires; it defaults to a quarter of the concurrency.
///
/// # Example
/// ```yaml
/// queue:
///   concurrency: unbounded
///   payload: 10
///   buffer: 2
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct QueueOptions {
    pub concurrency: Limit,
    pub payload: Limit,
    pub buffer: Option<usize>,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            concurrency: Limit::SERIES,
            payload: Limit::SERIES,
            buffer: None,
        }
    }
}

/// Retry policy as written in a config file.
///
/// A fixed interval is the only backoff expressible here; computed backoff is
/// available through [`RetryOptions::with_backoff`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub times: u32,
    pub interval_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            times: DEFAULT_RETRY_TIMES,
            interval_ms: DEFAULT_RETRY_INTERVAL_MS,
        }
    }
}

impl RetryConfig {
    pub fn options<E>(&self) -> Result<RetryOptions<E>, ConfigError> {
        Ok(RetryOptions::new(self.times)?.with_interval(Duration::from_millis(self.interval_ms)))
    }
}

/// One simulated task.
///
/// The task sleeps for `duration_ms`, fails its first `fail_times` attempts,
/// and an attempt that takes longer than `timeout_ms` fails with a timeout.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TaskConfig {
    pub id: String,
    #[serde(default)]
    pub depends_on: Vec<String>, // defaults empty
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub fail_times: u32,
    pub timeout_ms: Option<u64>,
}

/// Load a config file, choosing the parser by extension (`.yaml`, `.yml` or `.toml`).
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let extension = path.extension().and_then(|ext| ext.to_str());
    if !matches!(extension, Some("yaml" | "yml" | "toml")) {
        return Err(ConfigError::UnsupportedFormat(path.to_path_buf()));
    }

    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    if extension == Some("toml") {
        toml::from_str(&content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    } else {
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Load a config file and reject it unless its task graph and retry policy are runnable.
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let cfg = load_config(path)?;

    if cfg.retry.times == 0 {
        return Err(ConfigError::ZeroAttempts);
    }
    crate::config::validate_dependency_graph(&cfg).map_err(ConfigError::Invalid)?;

    Ok(cfg)
}
