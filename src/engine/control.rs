// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Control-flow helpers over lists of units and asynchronous loops.

use std::future::Future;

use futures::future::LocalBoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};

use crate::config::Limit;
use crate::engine::collections::map;
use crate::engine::defer::next_turn;

/// One step of a [`waterfall`]: receives the previous step's output.
pub type Stage<T, E> = Box<dyn FnOnce(T) -> LocalBoxFuture<'static, Result<T, E>>>;

/// Box an async closure as a [`Stage`].
pub fn stage<T, E, F, Fut>(step: F) -> Stage<T, E>
where
    F: FnOnce(T) -> Fut + 'static,
    Fut: Future<Output = Result<T, E>> + 'static,
{
    Box::new(move |input: T| -> LocalBoxFuture<'static, Result<T, E>> { Box::pin(step(input)) })
}

/// Run independent units with at most `limit` in flight; results follow task order.
pub async fn parallel<R, E, F, Fut>(tasks: Vec<F>, limit: Limit) -> Result<Vec<R>, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    map(tasks, limit, |task| task()).await
}

/// Run units one after another; the first error stops the rest.
pub async fn series<R, E, F, Fut>(tasks: Vec<F>) -> Result<Vec<R>, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    parallel(tasks, Limit::SERIES).await
}

/// Thread a value through each stage in turn.
///
/// ```rust
/// use the_cadence::engine::control::{stage, waterfall};
///
/// # #[tokio::main]
/// # async fn main() {
/// let total: Result<i32, String> = waterfall(
///     1,
///     vec![
///         stage(|n: i32| async move { Ok(n + 1) }),
///         stage(|n: i32| async move { Ok(n * 10) }),
///     ],
/// )
/// .await;
///
/// assert_eq!(total, Ok(20));
/// # }
/// ```
pub async fn waterfall<T, E>(initial: T, stages: Vec<Stage<T, E>>) -> Result<T, E> {
    if stages.is_empty() {
        next_turn().await;
        return Ok(initial);
    }
    let mut carried = initial;
    for step in stages {
        carried = step(carried).await?;
    }
    Ok(carried)
}

/// Repeat `body` while `test` yields `true`. Returns the number of iterations.
pub async fn whilst<E, T, TFut, B, BFut>(mut test: T, mut body: B) -> Result<usize, E>
where
    T: FnMut() -> TFut,
    TFut: Future<Output = Result<bool, E>>,
    B: FnMut() -> BFut,
    BFut: Future<Output = Result<(), E>>,
{
    let mut rounds = 0;
    while test().await? {
        body().await?;
        rounds += 1;
    }
    Ok(rounds)
}

/// Repeat `body` until `test` yields `true`. The test runs before each round.
pub async fn until<E, T, TFut, B, BFut>(mut test: T, body: B) -> Result<usize, E>
where
    T: FnMut() -> TFut,
    TFut: Future<Output = Result<bool, E>>,
    B: FnMut() -> BFut,
    BFut: Future<Output = Result<(), E>>,
{
    whilst(
        || {
            let pending = test();
            async move { pending.await.map(|done| !done) }
        },
        body,
    )
    .await
}

/// Settle with whichever unit finishes first, success or failure.
///
/// `None` for an empty input. The losing units are dropped.
pub async fn race<R, E, Fut>(units: Vec<Fut>) -> Option<Result<R, E>>
where
    Fut: Future<Output = Result<R, E>>,
{
    let mut contenders: FuturesUnordered<Fut> = units.into_iter().collect();
    contenders.next().await
}
