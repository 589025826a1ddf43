// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for task queue dispatch and lifecycle events.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A batch of pending items was handed to the worker.
///
/// # Log Level
/// `trace!` - Per-batch detail
pub struct BatchDispatched {
    pub batch_size: usize,
    pub running: usize,
    pub pending: usize,
}

impl Display for BatchDispatched {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Dispatched batch of {} items ({} running, {} pending)",
            self.batch_size, self.running, self.pending
        )
    }
}

impl StructuredLog for BatchDispatched {
    fn log(&self) {
        tracing::trace!(
            batch_size = self.batch_size,
            running = self.running,
            pending = self.pending,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::trace_span!(
            "queue_batch",
            span_name = name,
            batch_size = self.batch_size,
        )
    }
}

/// The worker reported an error for a batch.
///
/// # Log Level
/// `debug!` - Each item's ticket carries the error; the error hook sees it too
pub struct BatchFailed {
    pub batch_size: usize,
}

impl Display for BatchFailed {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Worker failed a batch of {} items", self.batch_size)
    }
}

impl StructuredLog for BatchFailed {
    fn log(&self) {
        tracing::debug!(batch_size = self.batch_size, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("queue_batch_failed", span_name = name)
    }
}

/// Pending items were dropped without running.
///
/// # Log Level
/// `debug!` - Caller-requested discard
pub struct ItemsDiscarded<'a> {
    pub count: usize,
    pub reason: &'a str,
}

impl Display for ItemsDiscarded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Discarded {} pending items ({})", self.count, self.reason)
    }
}

impl StructuredLog for ItemsDiscarded<'_> {
    fn log(&self) {
        tracing::debug!(count = self.count, reason = self.reason, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("queue_discard", span_name = name, count = self.count)
    }
}

/// A queue lifecycle hook is about to fire.
///
/// # Log Level
/// `trace!` - Hook transitions are frequent
pub struct QueueEvent<'a> {
    pub event: &'a str,
    pub running: usize,
    pub pending: usize,
}

impl Display for QueueEvent<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Queue {} ({} running, {} pending)",
            self.event, self.running, self.pending
        )
    }
}

impl StructuredLog for QueueEvent<'_> {
    fn log(&self) {
        tracing::trace!(
            event = self.event,
            running = self.running,
            pending = self.pending,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::trace_span!("queue_event", span_name = name, event = self.event)
    }
}
