// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the dependency scheduler lifecycle.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// A validated graph begins executing.
///
/// # Log Level
/// `debug!` - Routine lifecycle event
pub struct ScheduleStarted<'a> {
    pub task_count: usize,
    pub concurrency: &'a str,
}

impl Display for ScheduleStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Starting dependency schedule: {} tasks, concurrency={}",
            self.task_count, self.concurrency
        )
    }
}

impl StructuredLog for ScheduleStarted<'_> {
    fn log(&self) {
        tracing::debug!(
            task_count = self.task_count,
            concurrency = self.concurrency,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "schedule",
            span_name = name,
            task_count = self.task_count,
            concurrency = self.concurrency,
        )
    }
}

/// A task's dependencies are satisfied and it has been started.
///
/// # Log Level
/// `trace!` - Per-task detail
pub struct TaskStarted<'a> {
    pub task: &'a str,
    pub dependency_count: usize,
}

impl Display for TaskStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Task '{}' started with {} dependencies satisfied",
            self.task, self.dependency_count
        )
    }
}

impl StructuredLog for TaskStarted<'_> {
    fn log(&self) {
        tracing::trace!(
            task = self.task,
            dependency_count = self.dependency_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::trace_span!("task", span_name = name, task = self.task)
    }
}

/// A task reported an error and the schedule stops starting new work.
///
/// # Log Level
/// `warn!` - The caller receives the error; this records where it came from
pub struct TaskFailed<'a> {
    pub task: &'a str,
    pub still_running: usize,
}

impl Display for TaskFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Task '{}' failed ({} running tasks left to finish unobserved)",
            self.task, self.still_running
        )
    }
}

impl StructuredLog for TaskFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            task = self.task,
            still_running = self.still_running,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("task_failed", span_name = name, task = self.task)
    }
}

/// Every task in the graph completed.
///
/// # Log Level
/// `debug!` - Routine lifecycle event
pub struct ScheduleCompleted {
    pub task_count: usize,
    pub duration: Duration,
}

impl Display for ScheduleCompleted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Dependency schedule completed: {} tasks in {:?}",
            self.task_count, self.duration
        )
    }
}

impl StructuredLog for ScheduleCompleted {
    fn log(&self) {
        tracing::debug!(
            task_count = self.task_count,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "schedule_completed",
            span_name = name,
            task_count = self.task_count,
        )
    }
}
