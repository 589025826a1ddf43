// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Attempts made by `retry` when no count is configured
pub const DEFAULT_RETRY_TIMES: u32 = 5;
/// Delay between retry attempts when no interval is configured
pub const DEFAULT_RETRY_INTERVAL_MS: u64 = 0;
/// A queue's unsaturation buffer is its concurrency divided by this
pub const BUFFER_DIVISOR: usize = 4;
/// Spelling of the unbounded limit in config files
pub const UNBOUNDED_LITERAL: &str = "unbounded";
