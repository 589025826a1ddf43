// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Concurrency-bounded iteration over collections, lazy iterators and streams.
//!
//! Every collection combinator in this crate is built on the single driver in
//! this module. The driver owns the in-flight set for one iteration and keeps
//! it topped up: it starts units until the limit is reached, then each time a
//! unit settles it absorbs the result and starts the next element. This is a
//! replenishing window, not fixed-size batches.
//!
//! # Execution model
//!
//! Units run cooperatively inside the caller's task through
//! [`FuturesUnordered`]. Nothing is spawned, so units need not be `Send` and
//! can borrow from the caller's stack. Between any two suspension points a unit
//! runs uninterrupted.
//!
//! # Termination
//!
//! * The first error wins. No further element is started and the error is
//!   returned.
//! * A unit may return `ControlFlow::Break` to stop early. No further element
//!   is started and the iteration completes successfully.
//! * Either way, units already in flight run to completion before the driver
//!   returns. Their outcomes are discarded.
//! * An empty source still completes on a later turn (see [`next_turn`]).
//!
//! # Example
//!
//! ```rust
//! use std::ops::ControlFlow;
//! use the_cadence::config::Limit;
//! use the_cadence::engine::each_of;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let mut seen = Vec::new();
//! let outcome: Result<(), String> = each_of(vec!["a", "b", "c"], Limit::SERIES, |index, item| {
//!     seen.push((index, item));
//!     async move {
//!         if item == "b" {
//!             Ok(ControlFlow::Break(()))
//!         } else {
//!             Ok(ControlFlow::Continue(()))
//!         }
//!     }
//! })
//! .await;
//!
//! assert!(outcome.is_ok());
//! assert_eq!(seen, vec![(0, "a"), (1, "b")]);
//! # }
//! ```

use std::collections::{btree_map, hash_map, BTreeMap, HashMap};
use std::future::Future;
use std::iter::Enumerate;
use std::ops::ControlFlow;

use futures::stream::{FuturesUnordered, Stream, StreamExt};

use crate::config::Limit;
use crate::engine::defer::next_turn;

/// A finite or lazy source of keyed elements.
///
/// Sequences are keyed by index, maps by their own keys. Map iteration order is
/// whatever the map yields; it is stable within one run but not specified.
pub trait Collection {
    type Key;
    type Value;
    type Entries: Iterator<Item = (Self::Key, Self::Value)>;

    fn into_entries(self) -> Self::Entries;
}

impl<T> Collection for Vec<T> {
    type Key = usize;
    type Value = T;
    type Entries = Enumerate<std::vec::IntoIter<T>>;

    fn into_entries(self) -> Self::Entries {
        self.into_iter().enumerate()
    }
}

impl<K, V, S> Collection for HashMap<K, V, S> {
    type Key = K;
    type Value = V;
    type Entries = hash_map::IntoIter<K, V>;

    fn into_entries(self) -> Self::Entries {
        self.into_iter()
    }
}

impl<K, V> Collection for BTreeMap<K, V> {
    type Key = K;
    type Value = V;
    type Entries = btree_map::IntoIter<K, V>;

    fn into_entries(self) -> Self::Entries {
        self.into_iter()
    }
}

/// Any iterator, pulled one element at a time as slots free up.
///
/// Elements are keyed by the order in which they were pulled. An iterator that
/// never ends keeps the iteration running until a unit fails or breaks.
pub struct Lazy<I>(pub I);

impl<I: Iterator> Collection for Lazy<I> {
    type Key = usize;
    type Value = I::Item;
    type Entries = Enumerate<I>;

    fn into_entries(self) -> Self::Entries {
        self.0.enumerate()
    }
}

/// How an iteration finished when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Exit<B> {
    Exhausted,
    Stopped(B),
}

/// Drive `unit` over `entries` with at most `limit` units in flight.
///
/// `absorb` receives each successful `Continue` output together with the key
/// of the element that produced it, in completion order.
pub(crate) async fn drive<I, K, V, R, B, E, F, Fut, A>(
    entries: I,
    limit: Limit,
    mut unit: F,
    mut absorb: A,
) -> Result<Exit<B>, E>
where
    I: Iterator<Item = (K, V)>,
    K: Clone,
    F: FnMut(K, V) -> Fut,
    Fut: Future<Output = Result<ControlFlow<B, R>, E>>,
    A: FnMut(K, R),
{
    let cap = limit.get();
    let mut entries = entries.fuse();
    let mut in_flight = FuturesUnordered::new();
    let mut started = 0usize;

    loop {
        while in_flight.len() < cap {
            let Some((key, value)) = entries.next() else {
                break;
            };
            let pending = unit(key.clone(), value);
            in_flight.push(async move { (key, pending.await) });
            started += 1;
        }

        let Some((key, outcome)) = in_flight.next().await else {
            if started == 0 {
                next_turn().await;
            }
            return Ok(Exit::Exhausted);
        };

        let decided = match outcome {
            Ok(ControlFlow::Continue(output)) => {
                absorb(key, output);
                continue;
            }
            Ok(ControlFlow::Break(found)) => Ok(Exit::Stopped(found)),
            Err(error) => Err(error),
        };
        settle_abandoned(in_flight).await;
        return decided;
    }
}

/// Let units that outlived their iteration finish, discarding what they return.
pub(crate) async fn settle_abandoned<S: Stream + Unpin>(in_flight: S) {
    in_flight.for_each(|_| async {}).await;
}

enum Step<T, D> {
    Pulled(Option<T>),
    Settled(D),
}

/// Stream counterpart of [`drive`]: the next element is requested only while a
/// slot is free, and settling units are observed while a pull is outstanding.
async fn drive_stream<S, R, B, E, F, Fut, A>(
    source: S,
    limit: Limit,
    mut unit: F,
    mut absorb: A,
) -> Result<Exit<B>, E>
where
    S: Stream,
    F: FnMut(usize, S::Item) -> Fut,
    Fut: Future<Output = Result<ControlFlow<B, R>, E>>,
    A: FnMut(usize, R),
{
    let cap = limit.get();
    let source = source.fuse();
    tokio::pin!(source);
    let mut in_flight = FuturesUnordered::new();
    let mut pulled = 0usize;
    let mut exhausted = false;

    loop {
        if exhausted && in_flight.is_empty() {
            if pulled == 0 {
                next_turn().await;
            }
            return Ok(Exit::Exhausted);
        }

        let has_room = !exhausted && in_flight.len() < cap;
        let busy = !in_flight.is_empty();
        let step = tokio::select! {
            biased;
            Some(done) = in_flight.next(), if busy => Step::Settled(done),
            next = source.next(), if has_room => Step::Pulled(next),
        };

        match step {
            Step::Pulled(Some(value)) => {
                let index = pulled;
                pulled += 1;
                let pending = unit(index, value);
                in_flight.push(async move { (index, pending.await) });
            }
            Step::Pulled(None) => exhausted = true,
            Step::Settled((index, outcome)) => {
                let decided = match outcome {
                    Ok(ControlFlow::Continue(output)) => {
                        absorb(index, output);
                        continue;
                    }
                    Ok(ControlFlow::Break(found)) => Ok(Exit::Stopped(found)),
                    Err(error) => Err(error),
                };
                settle_abandoned(in_flight).await;
                return decided;
            }
        }
    }
}

/// Run `unit` for every keyed element of `collection`.
///
/// The unit receives the element's key and value and returns
/// `ControlFlow::Break(())` to end the iteration early with success.
pub async fn each_of<C, F, Fut, E>(collection: C, limit: Limit, unit: F) -> Result<(), E>
where
    C: Collection,
    C::Key: Clone,
    F: FnMut(C::Key, C::Value) -> Fut,
    Fut: Future<Output = Result<ControlFlow<()>, E>>,
{
    drive(collection.into_entries(), limit, unit, |_, ()| {})
        .await
        .map(|_| ())
}

/// Run `unit` for every value of `collection`, ignoring keys.
pub async fn each<C, F, Fut, E>(collection: C, limit: Limit, mut unit: F) -> Result<(), E>
where
    C: Collection,
    C::Key: Clone,
    F: FnMut(C::Value) -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    each_of(collection, limit, |_, value| {
        let pending = unit(value);
        async move { pending.await.map(ControlFlow::Continue) }
    })
    .await
}

/// Run `unit` for every element a stream produces, keyed by arrival order.
///
/// The stream is only polled for its next element while fewer than `limit`
/// units are in flight.
pub async fn each_of_stream<S, F, Fut, E>(source: S, limit: Limit, unit: F) -> Result<(), E>
where
    S: Stream,
    F: FnMut(usize, S::Item) -> Fut,
    Fut: Future<Output = Result<ControlFlow<()>, E>>,
{
    drive_stream(source, limit, unit, |_, ()| {})
        .await
        .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use std::time::Duration;
    use tokio::time::{sleep, Instant};

    fn limit(n: usize) -> Limit {
        Limit::new(n).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn never_exceeds_limit_and_replenishes() {
        let active = Rc::new(Cell::new(0usize));
        let peak = Rc::new(Cell::new(0usize));
        let order = Rc::new(RefCell::new(Vec::new()));

        let result: Result<(), String> = each(vec![30u64, 10, 15, 50, 5], limit(2), |ms| {
            let active = active.clone();
            let peak = peak.clone();
            let order = order.clone();
            async move {
                active.set(active.get() + 1);
                peak.set(peak.get().max(active.get()));
                sleep(Duration::from_millis(ms)).await;
                active.set(active.get() - 1);
                order.borrow_mut().push(ms);
                Ok(())
            }
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(peak.get(), 2);
        // each freed slot is refilled immediately while 30 is still running
        assert_eq!(*order.borrow(), vec![10, 15, 30, 5, 50]);
    }

    #[tokio::test(start_paused = true)]
    async fn first_error_stops_dispatch() {
        let started = Rc::new(RefCell::new(Vec::new()));

        let result = each_of(vec![1, 2, 3, 4], limit(2), |_, n| {
            let started = started.clone();
            async move {
                started.borrow_mut().push(n);
                sleep(Duration::from_millis(10 * n as u64)).await;
                if n == 1 {
                    Err(format!("item {} failed", n))
                } else {
                    Ok(ControlFlow::Continue(()))
                }
            }
        })
        .await;

        assert_eq!(result, Err("item 1 failed".to_string()));
        assert_eq!(*started.borrow(), vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_units_finish_after_a_failure() {
        let finished = Rc::new(Cell::new(0usize));
        let began = Instant::now();

        let result = each_of(vec![10u64, 50], Limit::UNBOUNDED, |_, ms| {
            let finished = finished.clone();
            async move {
                sleep(Duration::from_millis(ms)).await;
                finished.set(finished.get() + 1);
                if ms == 10 {
                    Err("x")
                } else {
                    Ok(ControlFlow::Continue(()))
                }
            }
        })
        .await;

        assert_eq!(result, Err("x"));
        assert_eq!(finished.get(), 2);
        assert_eq!(began.elapsed(), Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_units_finish_after_an_early_stop() {
        let finished = Rc::new(RefCell::new(Vec::new()));

        let result: Result<(), ()> = each_of(vec![5u64, 40, 60, 80], limit(3), |_, ms| {
            let finished = finished.clone();
            async move {
                sleep(Duration::from_millis(ms)).await;
                finished.borrow_mut().push(ms);
                Ok(if ms == 5 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                })
            }
        })
        .await;

        assert!(result.is_ok());
        // 80 was never started; 40 and 60 were already running
        assert_eq!(*finished.borrow(), vec![5, 40, 60]);
    }

    #[tokio::test(start_paused = true)]
    async fn stream_units_in_flight_finish_after_a_failure() {
        let finished = Rc::new(Cell::new(0usize));

        let result = each_of_stream(futures::stream::iter(vec![30u64, 5, 90]), limit(2), |_, ms| {
            let finished = finished.clone();
            async move {
                sleep(Duration::from_millis(ms)).await;
                finished.set(finished.get() + 1);
                if ms == 5 {
                    Err("five")
                } else {
                    Ok(ControlFlow::Continue(()))
                }
            }
        })
        .await;

        assert_eq!(result, Err("five"));
        assert_eq!(finished.get(), 2);
    }

    #[tokio::test]
    async fn break_completes_successfully() {
        let calls = Cell::new(0);

        let result: Result<(), ()> = each_of(vec![1, 2, 3, 4, 5], Limit::SERIES, |_, n| {
            calls.set(calls.get() + 1);
            async move {
                Ok(if n == 3 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                })
            }
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn empty_collection_completes_on_a_later_turn() {
        let pending = each(Vec::<u8>::new(), Limit::UNBOUNDED, |_| async { Ok::<_, ()>(()) });
        tokio::pin!(pending);

        assert!(futures::poll!(pending.as_mut()).is_pending());
        assert_eq!(pending.await, Ok(()));
    }

    #[tokio::test]
    async fn maps_are_keyed_by_their_own_keys() {
        let mut input = HashMap::new();
        input.insert("x", 1);
        input.insert("y", 2);
        let seen = RefCell::new(BTreeMap::new());

        let result: Result<(), ()> = each_of(input, Limit::UNBOUNDED, |key, value| {
            seen.borrow_mut().insert(key, value);
            async { Ok(ControlFlow::Continue(())) }
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(seen.into_inner().into_iter().collect::<Vec<_>>(), vec![("x", 1), ("y", 2)]);
    }

    #[tokio::test(start_paused = true)]
    async fn lazy_sources_are_pulled_on_demand() {
        let pulls = Rc::new(Cell::new(0usize));
        let counter = pulls.clone();
        let source = Lazy((0..10u64).inspect(move |_| counter.set(counter.get() + 1)));

        let iteration = each(source, limit(2), |n| async move {
            sleep(Duration::from_millis(n + 1)).await;
            Ok::<_, ()>(())
        });
        tokio::pin!(iteration);

        assert!(futures::poll!(iteration.as_mut()).is_pending());
        assert_eq!(pulls.get(), 2);

        assert_eq!(iteration.await, Ok(()));
        assert_eq!(pulls.get(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn stream_source_respects_limit() {
        let active = Rc::new(Cell::new(0usize));
        let peak = Rc::new(Cell::new(0usize));
        let seen = Rc::new(RefCell::new(Vec::new()));

        let result: Result<(), ()> = each_of_stream(futures::stream::iter(0..6u64), limit(3), |index, n| {
            let active = active.clone();
            let peak = peak.clone();
            let seen = seen.clone();
            async move {
                active.set(active.get() + 1);
                peak.set(peak.get().max(active.get()));
                sleep(Duration::from_millis(5)).await;
                active.set(active.get() - 1);
                seen.borrow_mut().push((index, n));
                Ok(ControlFlow::Continue(()))
            }
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(peak.get(), 3);
        let mut seen = seen.borrow().clone();
        seen.sort();
        assert_eq!(seen, (0..6).map(|n| (n as usize, n)).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn stream_error_is_returned() {
        let result = each_of_stream(futures::stream::iter(vec![1, 2, 3]), Limit::SERIES, |_, n| async move {
            if n == 2 {
                Err("two")
            } else {
                Ok(ControlFlow::Continue(()))
            }
        })
        .await;

        assert_eq!(result, Err("two"));
    }

    #[tokio::test]
    async fn empty_stream_completes() {
        let result: Result<(), ()> = each_of_stream(futures::stream::empty::<u8>(), Limit::SERIES, |_, _| async {
            Ok(ControlFlow::Continue(()))
        })
        .await;

        assert!(result.is_ok());
    }
}
