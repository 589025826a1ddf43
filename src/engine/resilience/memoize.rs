// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Result caching for units of work.
//!
//! The first call for a key runs the unit. Calls for the same key that arrive
//! while it is running wait for its outcome instead of starting their own. A
//! success is cached; an error is delivered to everyone waiting and then
//! forgotten, so the next call tries again.
//!
//! A memoized unit is meant for a single cooperative task and is neither
//! `Send` nor `Sync`.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;

use tokio::sync::oneshot;

use crate::engine::defer::next_turn;

enum Slot<V, E> {
    Resolved(V),
    InFlight {
        generation: u64,
        waiters: Vec<oneshot::Sender<Result<V, E>>>,
    },
}

enum Lookup<V, E> {
    Hit(V),
    Wait(oneshot::Receiver<Result<V, E>>),
    Lead(u64),
}

/// Clears an in-flight slot if the leading call is dropped before it settles.
/// Dropping the slot drops the waiters' senders, which sends them back to
/// [`Memoized::call`]'s lookup.
struct Leader<'a, K: Eq + Hash, V, E> {
    slots: &'a RefCell<HashMap<K, Slot<V, E>>>,
    key: Option<K>,
    generation: u64,
}

impl<'a, K: Eq + Hash, V, E> Leader<'a, K, V, E> {
    fn settle(mut self) -> Vec<oneshot::Sender<Result<V, E>>> {
        match self.key.take() {
            Some(key) => take_in_flight(self.slots, &key, self.generation),
            None => Vec::new(),
        }
    }
}

impl<K: Eq + Hash, V, E> Drop for Leader<'_, K, V, E> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            take_in_flight(self.slots, &key, self.generation);
        }
    }
}

fn take_in_flight<K: Eq + Hash, V, E>(
    slots: &RefCell<HashMap<K, Slot<V, E>>>,
    key: &K,
    generation: u64,
) -> Vec<oneshot::Sender<Result<V, E>>> {
    let mut slots = slots.borrow_mut();
    let ours = matches!(
        slots.get(key),
        Some(Slot::InFlight { generation: current, .. }) if *current == generation
    );
    if !ours {
        return Vec::new();
    }
    match slots.remove(key) {
        Some(Slot::InFlight { waiters, .. }) => waiters,
        _ => Vec::new(),
    }
}

/// A unit with cached results. Built by [`memoize`] or [`memoize_by`].
pub struct Memoized<F, H, K, V, E> {
    unit: F,
    key_of: H,
    slots: RefCell<HashMap<K, Slot<V, E>>>,
    generation: Cell<u64>,
}

impl<F, H, K, V, E> Memoized<F, H, K, V, E>
where
    K: Eq + Hash + Clone,
    V: Clone,
    E: Clone,
{
    pub async fn call<A, Fut>(&self, arg: A) -> Result<V, E>
    where
        F: Fn(A) -> Fut,
        H: Fn(&A) -> K,
        Fut: Future<Output = Result<V, E>>,
    {
        let key = (self.key_of)(&arg);

        loop {
            let lookup = {
                let mut slots = self.slots.borrow_mut();
                match slots.get_mut(&key) {
                    Some(Slot::Resolved(value)) => Lookup::Hit(value.clone()),
                    Some(Slot::InFlight { waiters, .. }) => {
                        let (sender, receiver) = oneshot::channel();
                        waiters.push(sender);
                        Lookup::Wait(receiver)
                    }
                    None => {
                        let generation = self.generation.get() + 1;
                        self.generation.set(generation);
                        slots.insert(
                            key.clone(),
                            Slot::InFlight {
                                generation,
                                waiters: Vec::new(),
                            },
                        );
                        Lookup::Lead(generation)
                    }
                }
            };

            match lookup {
                Lookup::Hit(value) => {
                    next_turn().await;
                    return Ok(value);
                }
                Lookup::Wait(receiver) => match receiver.await {
                    Ok(outcome) => return outcome,
                    // the leader was dropped; look again
                    Err(_) => continue,
                },
                Lookup::Lead(generation) => {
                    let leader = Leader {
                        slots: &self.slots,
                        key: Some(key.clone()),
                        generation,
                    };
                    let outcome = (self.unit)(arg).await;
                    let waiters = leader.settle();

                    if let Ok(value) = &outcome {
                        self.slots
                            .borrow_mut()
                            .insert(key, Slot::Resolved(value.clone()));
                    }
                    for waiter in waiters {
                        let _ = waiter.send(outcome.clone());
                    }
                    return outcome;
                }
            }
        }
    }

    /// Drop the cached value for `key`. Returns whether one was cached.
    pub fn forget(&self, key: &K) -> bool {
        let mut slots = self.slots.borrow_mut();
        if matches!(slots.get(key), Some(Slot::Resolved(_))) {
            slots.remove(key);
            true
        } else {
            false
        }
    }

    /// Number of cached values.
    pub fn len(&self) -> usize {
        self.slots
            .borrow()
            .values()
            .filter(|slot| matches!(slot, Slot::Resolved(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Give back the original unit, discarding the cache.
    pub fn unmemoize(self) -> F {
        self.unit
    }
}

impl<F, H, K, V, E> fmt::Debug for Memoized<F, H, K, V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memoized")
            .field("entries", &self.slots.borrow().len())
            .finish()
    }
}

/// Cache `unit`'s results keyed by its argument.
pub fn memoize<F, A, V, E>(unit: F) -> Memoized<F, fn(&A) -> A, A, V, E>
where
    A: Eq + Hash + Clone,
{
    memoize_by(unit, <A as Clone>::clone as fn(&A) -> A)
}

/// Cache `unit`'s results keyed by `key_of(argument)`.
pub fn memoize_by<F, H, K, V, E>(unit: F, key_of: H) -> Memoized<F, H, K, V, E> {
    Memoized {
        unit,
        key_of,
        slots: RefCell::new(HashMap::new()),
        generation: Cell::new(0),
    }
}
