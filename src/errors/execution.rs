// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

use super::ValidationError;

/// Failure of a dependency-scheduled run.
///
/// `TaskFailed` carries the results of every task that completed before the
/// failure was observed. Tasks that were still in flight are allowed to
/// finish, but their results are left out.
#[derive(Debug, Error)]
pub enum AutoError<V, E> {
    /// The graph was rejected before anything ran
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// A task reported an error; no further tasks were started
    #[error("task '{task}' failed: {error}")]
    TaskFailed {
        task: String,
        error: E,
        results: HashMap<String, V>,
    },
}

impl<V, E> AutoError<V, E> {
    /// Name of the failed task, if a task failed.
    pub fn task(&self) -> Option<&str> {
        match self {
            AutoError::TaskFailed { task, .. } => Some(task),
            AutoError::Invalid(_) => None,
        }
    }

    /// Results of the tasks that completed before the failure.
    pub fn partial_results(&self) -> Option<&HashMap<String, V>> {
        match self {
            AutoError::TaskFailed { results, .. } => Some(results),
            AutoError::Invalid(_) => None,
        }
    }
}

/// Outcome of a queue item that did not receive a successful worker result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError<E> {
    /// The worker reported an error for the batch this item was part of
    #[error("worker failed: {0}")]
    Failed(E),

    /// The item was removed or the queue was killed before the item ran
    #[error("item was discarded before it was processed")]
    Discarded,
}

/// Failure of a unit wrapped with a time limit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeoutError<E> {
    /// The limit elapsed before the unit completed
    #[error("operation timed out after {after:?}{}", info_suffix(.info))]
    Elapsed {
        after: Duration,
        info: Option<String>,
    },
    /// The unit completed in time but reported its own error
    #[error("{0}")]
    Failed(E),
}

impl<E> TimeoutError<E> {
    pub fn is_elapsed(&self) -> bool {
        matches!(self, TimeoutError::Elapsed { .. })
    }
}

fn info_suffix(info: &Option<String>) -> String {
    info.as_deref().map(|info| format!(": {}", info)).unwrap_or_default()
}
