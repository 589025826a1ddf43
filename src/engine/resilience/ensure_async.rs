// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::future::Future;

use crate::engine::defer::next_turn;

/// Await `future`, but never complete on the poll that started it.
///
/// A future that is ready on its first poll has its output held back until
/// the next scheduling turn. A future that suspends on its own is passed
/// through untouched.
pub async fn yield_if_ready<F: Future>(future: F) -> F::Output {
    tokio::pin!(future);
    match futures::poll!(future.as_mut()) {
        std::task::Poll::Ready(output) => {
            next_turn().await;
            output
        }
        std::task::Poll::Pending => future.await,
    }
}

/// A unit whose calls always suspend at least once before completing.
#[derive(Debug, Clone)]
pub struct EnsureAsync<F> {
    unit: F,
}

impl<F> EnsureAsync<F> {
    pub async fn call<A, Fut>(&self, arg: A) -> Fut::Output
    where
        F: Fn(A) -> Fut,
        Fut: Future,
    {
        yield_if_ready((self.unit)(arg)).await
    }

    pub fn into_inner(self) -> F {
        self.unit
    }
}

pub fn ensure_async<F>(unit: F) -> EnsureAsync<F> {
    EnsureAsync { unit }
}
