// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for task graph validation.

use crate::errors::ValidationError;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A task graph was rejected before any task started.
///
/// # Log Level
/// `warn!` - The caller receives the error
///
/// # Example
/// ```
/// use the_cadence::errors::ValidationError;
/// use the_cadence::observability::messages::validation::GraphRejected;
///
/// let error = ValidationError::DuplicateTask { task: "load".into() };
/// let msg = GraphRejected { task_count: 2, error: &error };
///
/// assert_eq!(msg.to_string(), "Task graph of 2 tasks rejected: Duplicate task name: 'load'");
/// ```
pub struct GraphRejected<'a> {
    pub task_count: usize,
    pub error: &'a ValidationError,
}

impl Display for GraphRejected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Task graph of {} tasks rejected: {}",
            self.task_count, self.error
        )
    }
}

impl StructuredLog for GraphRejected<'_> {
    fn log(&self) {
        tracing::warn!(
            task_count = self.task_count,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "graph_rejected",
            span_name = name,
            task_count = self.task_count,
        )
    }
}
