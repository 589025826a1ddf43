// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for retry and timeout decisions.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// An attempt failed and another one is scheduled.
///
/// # Log Level
/// `debug!` - Expected under transient failure
pub struct RetryScheduled {
    pub attempt: u32,
    pub times: u32,
    pub delay: Duration,
}

impl Display for RetryScheduled {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Attempt {}/{} failed; retrying in {:?}",
            self.attempt, self.times, self.delay
        )
    }
}

impl StructuredLog for RetryScheduled {
    fn log(&self) {
        tracing::debug!(
            attempt = self.attempt,
            times = self.times,
            delay_ms = self.delay.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("retry", span_name = name, attempt = self.attempt)
    }
}

/// The final attempt failed, or the error filter refused a retry.
///
/// # Log Level
/// `warn!` - The error is about to reach the caller
pub struct RetriesExhausted {
    pub attempts: u32,
    pub retryable: bool,
}

impl Display for RetriesExhausted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        if self.retryable {
            write!(f, "Giving up after {} attempts", self.attempts)
        } else {
            write!(f, "Error not retryable after {} attempts", self.attempts)
        }
    }
}

impl StructuredLog for RetriesExhausted {
    fn log(&self) {
        tracing::warn!(
            attempts = self.attempts,
            retryable = self.retryable,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("retries_exhausted", span_name = name, attempts = self.attempts)
    }
}

/// A unit did not complete within its time limit.
///
/// # Log Level
/// `warn!` - The unit's eventual outcome is discarded
pub struct DeadlineExceeded<'a> {
    pub after: Duration,
    pub info: Option<&'a str>,
}

impl Display for DeadlineExceeded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self.info {
            Some(info) => write!(f, "Deadline of {:?} exceeded: {}", self.after, info),
            None => write!(f, "Deadline of {:?} exceeded", self.after),
        }
    }
}

impl StructuredLog for DeadlineExceeded<'_> {
    fn log(&self) {
        tracing::warn!(
            after_ms = self.after.as_millis() as u64,
            info = self.info,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "deadline",
            span_name = name,
            after_ms = self.after.as_millis() as u64,
        )
    }
}
