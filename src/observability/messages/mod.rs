// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! # Usage Pattern
//!
//! ```rust
//! use the_cadence::observability::messages::StructuredLog;
//! use the_cadence::observability::messages::scheduler::ScheduleStarted;
//!
//! let msg = ScheduleStarted {
//!     task_count: 3,
//!     concurrency: "2",
//! };
//!
//! msg.log();
//! assert_eq!(msg.to_string(), "Starting dependency schedule: 3 tasks, concurrency=2");
//! ```

use tracing::Span;

pub mod queue;
pub mod resilience;
pub mod scheduler;
pub mod validation;

/// A message that knows how to emit itself as a structured `tracing` event.
pub trait StructuredLog {
    /// Emit the message at its own level with its fields attached.
    fn log(&self);

    /// Build a span carrying the message's fields.
    fn span(&self, name: &str) -> Span;
}
