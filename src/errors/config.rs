// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised synchronously while building an engine object from bad options.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A concurrency or payload limit of zero was requested
    #[error("limit must be at least 1 (use \"unbounded\" for no limit)")]
    ZeroLimit,

    /// A limit literal that is neither a positive integer nor "unbounded"
    #[error("invalid limit '{0}': expected a positive integer or \"unbounded\"")]
    InvalidLimit(String),

    /// Retry was configured with zero attempts
    #[error("retry attempts must be at least 1")]
    ZeroAttempts,

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML config {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to parse TOML config {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Config files must end in .yaml, .yml or .toml
    #[error("unsupported config file extension: {0}")]
    UnsupportedFormat(PathBuf),

    /// The task graph described by the config is not runnable
    #[error("configuration validation failed:\n{}", render_all(.0))]
    Invalid(Vec<ValidationError>),
}

impl From<ValidationError> for ConfigError {
    fn from(error: ValidationError) -> Self {
        ConfigError::Invalid(vec![error])
    }
}

fn render_all(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Errors that can occur during dependency graph validation.
///
/// Validation runs before any task starts, so none of these are ever raised
/// after work has begun.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A circular dependency was detected in the task graph
    #[error("Cyclic dependency detected: {}", .cycle.join(" -> "))]
    CyclicDependency {
        /// One concrete cycle, first task repeated at the end
        cycle: Vec<String>,
    },

    /// A task references a dependency that doesn't exist
    #[error("Task '{task}' depends on '{missing_dependency}' which does not exist")]
    UnresolvedDependency {
        task: String,
        missing_dependency: String,
    },

    /// Two tasks were registered under the same name
    #[error("Duplicate task name: '{task}'")]
    DuplicateTask { task: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cyclic_dependency_renders_path() {
        let err = ValidationError::CyclicDependency {
            cycle: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "Cyclic dependency detected: a -> b -> a");
    }

    #[test]
    fn validation_error_converts_into_config_error() {
        let err: ConfigError = ValidationError::DuplicateTask { task: "x".into() }.into();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(err.to_string().contains("Duplicate task name: 'x'"));
    }

    #[test]
    fn every_validation_error_is_listed() {
        let err = ConfigError::Invalid(vec![
            ValidationError::DuplicateTask { task: "x".into() },
            ValidationError::UnresolvedDependency {
                task: "y".into(),
                missing_dependency: "z".into(),
            },
        ]);
        assert_eq!(
            err.to_string(),
            "configuration validation failed:\nDuplicate task name: 'x'\nTask 'y' depends on 'z' which does not exist"
        );
    }
}
