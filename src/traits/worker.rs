// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::future::Future;

/// The processing function behind a task queue.
///
/// A worker receives a batch of queued items (exactly one item for a plain
/// queue, up to the payload for a cargo) and produces one outcome for the whole
/// batch. Every item in the batch is answered with a clone of that outcome.
///
/// Any `Fn(Vec<T>) -> impl Future<Output = Result<R, E>>` is a worker, so most
/// callers pass an async closure and never implement this trait by hand.
#[async_trait]
pub trait Worker<T: Send + 'static>: Send + Sync {
    type Output: Send + 'static;
    type Error: Send + 'static;

    async fn run(&self, batch: Vec<T>) -> Result<Self::Output, Self::Error>;
}

#[async_trait]
impl<T, F, Fut, R, E> Worker<T> for F
where
    T: Send + 'static,
    F: Fn(Vec<T>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
    R: Send + 'static,
    E: Send + 'static,
{
    type Output = R;
    type Error = E;

    async fn run(&self, batch: Vec<T>) -> Result<R, E> {
        (self)(batch).await
    }
}
