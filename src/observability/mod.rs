// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! All diagnostic output of the engine goes through message types defined in
//! [`messages`]. Each message is a small struct implementing `Display` for the
//! human-readable line and [`messages::StructuredLog`] for emitting a `tracing`
//! event with typed fields, so log text never lives inline at call sites.
//!
//! Messages are organized by subsystem:
//! * `messages::scheduler` - dependency scheduler lifecycle
//! * `messages::queue` - task queue dispatch and lifecycle events
//! * `messages::resilience` - retry and timeout decisions
//! * `messages::validation` - task graph rejection
//!
//! The library never installs a subscriber. Binaries do, typically with
//! `tracing_subscriber` and an `EnvFilter` read from `RUST_LOG`.

pub mod messages;
