// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The host's "run on a later turn" primitive.
//!
//! Anything that could otherwise resolve without ever suspending (an empty
//! collection, a memoized hit, a unit that completed on its first poll) awaits
//! [`next_turn`] first, so a caller never observes completion before its own
//! code following the call has had a chance to run.

/// Suspend once and let the runtime schedule other ready work.
pub async fn next_turn() {
    tokio::task::yield_now().await;
}
