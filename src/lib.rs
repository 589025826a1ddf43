// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod config;     // config files + limits
pub mod engine;     // iteration, scheduling, queues, resilience
pub mod errors;     // error handling
pub mod observability;
pub mod traits;     // worker abstraction
