// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Configuration validation for task graph integrity.
//!
//! # Validation Pipeline
//!
//! 1. **Uniqueness Validation**: every task ID appears once
//! 2. **Reference Validation**: every `depends_on` entry names a task in the config
//! 3. **Cycle Detection**: Kahn's algorithm over the resolved graph
//!
//! The first two stages report every problem they find so a config can be
//! fixed in one pass. Cycle detection needs a structurally valid graph and is
//! skipped when either earlier stage failed.
//!
//! # Examples
//!
//! ```rust
//! use the_cadence::config::{validate_dependency_graph, Config};
//! use the_cadence::errors::ValidationError;
//!
//! let config: Config = serde_yaml::from_str(
//!     r#"
//! tasks:
//!   - id: a
//!     depends_on: [b]
//!   - id: b
//!     depends_on: [a]
//! "#,
//! )
//! .unwrap();
//!
//! let errors = validate_dependency_graph(&config).unwrap_err();
//! assert!(matches!(errors[0], ValidationError::CyclicDependency { .. }));
//! ```

use std::collections::HashSet;

use crate::config::Config;
use crate::engine::auto::Plan;
use crate::errors::ValidationError;

/// Validate the task graph described by `config`.
///
/// # Returns
///
/// * `Ok(())` - The graph can be scheduled
/// * `Err(Vec<ValidationError>)` - Every problem found
pub fn validate_dependency_graph(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(duplicate_errors) = validate_unique_task_ids(config) {
        errors.extend(duplicate_errors);
    }

    if let Err(unresolved_errors) = validate_dependency_references(config) {
        errors.extend(unresolved_errors);
    }

    if errors.is_empty() {
        if let Err(cycle) = validate_acyclic_graph(config) {
            errors.push(cycle);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_unique_task_ids(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut seen_ids = HashSet::new();
    let errors: Vec<ValidationError> = config
        .tasks
        .iter()
        .filter(|task| !seen_ids.insert(task.id.as_str()))
        .map(|task| ValidationError::DuplicateTask {
            task: task.id.clone(),
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_dependency_references(config: &Config) -> Result<(), Vec<ValidationError>> {
    let task_ids: HashSet<&str> = config.tasks.iter().map(|t| t.id.as_str()).collect();
    let mut errors = Vec::new();

    for task in &config.tasks {
        for dependency in &task.depends_on {
            if !task_ids.contains(dependency.as_str()) {
                errors.push(ValidationError::UnresolvedDependency {
                    task: task.id.clone(),
                    missing_dependency: dependency.clone(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Uses the same planner the scheduler runs, so a config that validates here
/// is accepted by [`Scheduler::new`](crate::engine::auto::Scheduler::new).
fn validate_acyclic_graph(config: &Config) -> Result<(), ValidationError> {
    Plan::build(
        config
            .tasks
            .iter()
            .map(|task| (task.id.as_str(), task.depends_on.as_slice())),
    )
    .map(|_| ())
}
