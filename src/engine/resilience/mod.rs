// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Wrappers that change how a unit of work fails, waits or repeats.

pub mod ensure_async;
pub mod memoize;
pub mod retry;
pub mod timeout;

pub use ensure_async::{ensure_async, yield_if_ready, EnsureAsync};
pub use memoize::{memoize, memoize_by, Memoized};
pub use retry::{retry, retryable, Interval, RetryOptions, Retryable};
pub use timeout::{timeout, with_deadline, Timed};
