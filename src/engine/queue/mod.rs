// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Long-lived task queues with bounded concurrency, batching and priorities.
//!
//! A queue is a handle to shared state. Items are pushed from anywhere, wait in
//! pending storage and are handed to the worker in batches of up to `payload`
//! items while fewer than `concurrency` batches are running.
//!
//! # Turns
//!
//! Pushing never dispatches synchronously. The first push in a turn schedules
//! one dispatch pass with `tokio::spawn`, so a burst of pushes lands in pending
//! storage together and a cargo can batch them. Each batch runs as its own
//! spawned task; when it settles the queue replies to every item in the batch,
//! fires its hooks and immediately runs another dispatch pass.
//!
//! # Hooks
//!
//! | hook          | fires when                                                        |
//! |---------------|-------------------------------------------------------------------|
//! | `saturated`   | a dispatch brings running batches up to `concurrency`            |
//! | `unsaturated` | a batch settles and running drops to `concurrency - buffer`       |
//! | `empty`       | the last pending item is handed to the worker                    |
//! | `drain`       | a batch settles leaving nothing pending and nothing running      |
//! | `error`       | once per item of a failed batch, with the error and the item     |
//!
//! Hooks never run while the queue's internal lock is held, so a hook may push,
//! pause or kill the queue it belongs to.
//!
//! # Example
//!
//! ```rust
//! use the_cadence::config::Limit;
//! use the_cadence::engine::queue::Queue;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let queue = Queue::new(Limit::new(2).unwrap(), |batch: Vec<u32>| async move {
//!     Ok::<_, String>(batch[0] * 10)
//! });
//!
//! let first = queue.push(1);
//! let second = queue.push(2);
//!
//! assert_eq!(first.await, Ok(10));
//! assert_eq!(second.await, Ok(20));
//! # }
//! ```

mod pending;

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use tokio::sync::futures::Notified;
use tokio::sync::{oneshot, Notify};

use crate::config::consts::BUFFER_DIVISOR;
use crate::config::{Limit, QueueOptions};
use crate::errors::QueueError;
use crate::observability::messages::queue::{BatchDispatched, BatchFailed, ItemsDiscarded, QueueEvent};
use crate::observability::messages::StructuredLog;
use crate::traits::Worker;

use pending::{Entry, Pending};

/// Marker for first-in first-out dispatch.
pub struct Fifo;

/// Marker for dispatch by ascending priority number.
pub struct Prioritized;

/// A queue that dispatches items in ascending priority order, FIFO among equals.
pub type PriorityQueue<T, R, E> = Queue<T, R, E, Prioritized>;

type Hook = Arc<dyn Fn() + Send + Sync>;
type ErrorHook<T, E> = Arc<dyn Fn(&E, &T) + Send + Sync>;

struct Hooks<T, E> {
    saturated: Option<Hook>,
    unsaturated: Option<Hook>,
    empty: Option<Hook>,
    drain: Option<Hook>,
    error: Option<ErrorHook<T, E>>,
}

impl<T, E> Default for Hooks<T, E> {
    fn default() -> Self {
        Self {
            saturated: None,
            unsaturated: None,
            empty: None,
            drain: None,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    Saturated,
    Unsaturated,
    Empty,
    Drain,
}

impl Event {
    fn name(self) -> &'static str {
        match self {
            Event::Saturated => "saturated",
            Event::Unsaturated => "unsaturated",
            Event::Empty => "empty",
            Event::Drain => "drain",
        }
    }
}

struct State<T, R, E> {
    pending: Pending<T, R, E>,
    in_progress: Vec<(u64, T)>,
    running: usize,
    concurrency: Limit,
    payload: Limit,
    buffer: usize,
    paused: bool,
    started: bool,
    pass_scheduled: bool,
    next_seq: u64,
}

struct Shared<T: Send + 'static, R, E> {
    worker: Arc<dyn Worker<T, Output = R, Error = E>>,
    state: Mutex<State<T, R, E>>,
    hooks: Mutex<Hooks<T, E>>,
    idle: Notify,
}

fn lock<S>(mutex: &Mutex<S>) -> MutexGuard<'_, S> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Resolves with the outcome of one queued item.
///
/// Items that were removed or discarded by [`Queue::kill`] resolve to
/// [`QueueError::Discarded`] without ever reaching the worker. Dropping a
/// ticket does not cancel its item.
#[must_use = "a ticket does nothing unless awaited; dropping it leaves the item queued"]
pub struct Ticket<R, E> {
    reply: oneshot::Receiver<Result<R, QueueError<E>>>,
}

impl<R, E> Future for Ticket<R, E> {
    type Output = Result<R, QueueError<E>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.reply)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(QueueError::Discarded)))
    }
}

/// Handle to a task queue. Clones share the same queue.
pub struct Queue<T: Send + 'static, R, E, D = Fifo> {
    shared: Arc<Shared<T, R, E>>,
    _discipline: PhantomData<fn() -> D>,
}

impl<T: Send + 'static, R, E, D> Clone for Queue<T, R, E, D> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            _discipline: PhantomData,
        }
    }
}

impl<T, R, E> Shared<T, R, E>
where
    T: Clone + Send + 'static,
    R: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn state(&self) -> MutexGuard<'_, State<T, R, E>> {
        lock(&self.state)
    }

    fn hooks(&self) -> MutexGuard<'_, Hooks<T, E>> {
        lock(&self.hooks)
    }

    fn fire(&self, event: Event) {
        let (running, pending) = {
            let state = self.state();
            (state.running, state.pending.len())
        };
        QueueEvent {
            event: event.name(),
            running,
            pending,
        }
        .log();

        let hook = {
            let hooks = self.hooks();
            match event {
                Event::Saturated => hooks.saturated.clone(),
                Event::Unsaturated => hooks.unsaturated.clone(),
                Event::Empty => hooks.empty.clone(),
                Event::Drain => hooks.drain.clone(),
            }
        };
        if let Some(hook) = hook {
            hook();
        }
        if event == Event::Drain {
            self.idle.notify_waiters();
        }
    }

    fn schedule_pass(self: &Arc<Self>) {
        {
            let mut state = self.state();
            if state.pass_scheduled {
                return;
            }
            state.pass_scheduled = true;
        }
        let shared = Arc::clone(self);
        tokio::spawn(async move { shared.process() });
    }

    /// Hand pending items to the worker until the queue is paused, saturated
    /// or out of items.
    fn process(self: &Arc<Self>) {
        let mut events = Vec::new();
        let mut batches = Vec::new();
        {
            let mut guard = self.state();
            let state = &mut *guard;
            state.pass_scheduled = false;

            while !state.paused
                && state.running < state.concurrency.get()
                && !state.pending.is_empty()
            {
                let batch = state.pending.take(state.payload.get());
                state.running += 1;
                state
                    .in_progress
                    .extend(batch.iter().map(|entry| (entry.seq, entry.data.clone())));

                BatchDispatched {
                    batch_size: batch.len(),
                    running: state.running,
                    pending: state.pending.len(),
                }
                .log();

                if state.pending.is_empty() {
                    events.push(Event::Empty);
                }
                if state.running == state.concurrency.get() {
                    events.push(Event::Saturated);
                }
                batches.push(batch);
            }
        }

        for event in events {
            self.fire(event);
        }
        for batch in batches {
            let shared = Arc::clone(self);
            tokio::spawn(async move { shared.run_batch(batch).await });
        }
    }

    async fn run_batch(self: Arc<Self>, batch: Vec<Entry<T, R, E>>) {
        let data = batch.iter().map(|entry| entry.data.clone()).collect();
        let outcome = self.worker.run(data).await;
        self.complete(batch, outcome);
    }

    fn complete(self: &Arc<Self>, batch: Vec<Entry<T, R, E>>, outcome: Result<R, E>) {
        // Both transitions are decided under the lock that decrements `running`,
        // so exactly one completer observes the queue going idle.
        let (unsaturated, idle) = {
            let mut guard = self.state();
            let state = &mut *guard;
            state.running -= 1;
            state
                .in_progress
                .retain(|(seq, _)| !batch.iter().any(|entry| entry.seq == *seq));
            (
                state.running <= state.concurrency.get().saturating_sub(state.buffer),
                state.running == 0 && state.pending.is_empty(),
            )
        };

        match outcome {
            Ok(value) => {
                for entry in batch {
                    let _ = entry.reply.send(Ok(value.clone()));
                }
            }
            Err(error) => {
                BatchFailed {
                    batch_size: batch.len(),
                }
                .log();
                let hook = self.hooks().error.clone();
                for entry in batch {
                    let _ = entry.reply.send(Err(QueueError::Failed(error.clone())));
                    if let Some(hook) = &hook {
                        hook(&error, &entry.data);
                    }
                }
            }
        }

        if unsaturated {
            self.fire(Event::Unsaturated);
        }
        if idle {
            self.fire(Event::Drain);
        }
        self.process();
    }

    fn insert(self: &Arc<Self>, data: T, priority: i64, front: bool) -> Ticket<R, E> {
        let (reply, receiver) = oneshot::channel();
        {
            let mut state = self.state();
            state.started = true;
            let seq = state.next_seq;
            state.next_seq += 1;
            let entry = Entry {
                seq,
                priority,
                data,
                reply,
            };
            if front {
                state.pending.push_front(entry);
            } else {
                state.pending.push_back(entry);
            }
        }
        self.schedule_pass();
        Ticket { reply: receiver }
    }

    /// An empty push onto an idle queue still reports `drain`, on a later turn.
    fn drain_later_if_idle(self: &Arc<Self>) {
        let idle = {
            let mut state = self.state();
            state.started = true;
            state.running == 0 && state.pending.is_empty()
        };
        if idle {
            let shared = Arc::clone(self);
            tokio::spawn(async move { shared.fire(Event::Drain) });
        }
    }
}

impl<T, R, E> Queue<T, R, E, Fifo>
where
    T: Clone + Send + 'static,
    R: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// A queue handing one item at a time to `worker`, at most `concurrency`
    /// items in flight.
    pub fn new<W>(concurrency: Limit, worker: W) -> Self
    where
        W: Worker<T, Output = R, Error = E> + 'static,
    {
        Self::with_options(
            QueueOptions {
                concurrency,
                ..QueueOptions::default()
            },
            worker,
        )
    }

    /// A single-flight queue that hands the worker up to `payload` items at once.
    pub fn cargo<W>(payload: Limit, worker: W) -> Self
    where
        W: Worker<T, Output = R, Error = E> + 'static,
    {
        Self::cargo_queue(Limit::SERIES, payload, worker)
    }

    /// Batches of up to `payload` items, at most `concurrency` batches in flight.
    pub fn cargo_queue<W>(concurrency: Limit, payload: Limit, worker: W) -> Self
    where
        W: Worker<T, Output = R, Error = E> + 'static,
    {
        Self::with_options(
            QueueOptions {
                concurrency,
                payload,
                buffer: None,
            },
            worker,
        )
    }

    pub fn with_options<W>(options: QueueOptions, worker: W) -> Self
    where
        W: Worker<T, Output = R, Error = E> + 'static,
    {
        Self::build(options, Pending::fifo(), worker)
    }

    /// Append an item.
    pub fn push(&self, data: T) -> Ticket<R, E> {
        self.shared.insert(data, 0, false)
    }

    /// Append several items in order, one ticket per item.
    pub fn push_all<I>(&self, items: I) -> Vec<Ticket<R, E>>
    where
        I: IntoIterator<Item = T>,
    {
        let tickets: Vec<_> = items
            .into_iter()
            .map(|data| self.shared.insert(data, 0, false))
            .collect();
        if tickets.is_empty() {
            self.shared.drain_later_if_idle();
        }
        tickets
    }

    /// Insert an item ahead of everything pending.
    pub fn unshift(&self, data: T) -> Ticket<R, E> {
        self.shared.insert(data, 0, true)
    }
}

impl<T, R, E> Queue<T, R, E, Prioritized>
where
    T: Clone + Send + 'static,
    R: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// A priority queue handing one item at a time to `worker`.
    pub fn prioritized<W>(concurrency: Limit, worker: W) -> Self
    where
        W: Worker<T, Output = R, Error = E> + 'static,
    {
        let options = QueueOptions {
            concurrency,
            ..QueueOptions::default()
        };
        Self::build(options, Pending::ranked(), worker)
    }

    /// Queue an item; lower numbers are dispatched first.
    pub fn push(&self, data: T, priority: i64) -> Ticket<R, E> {
        self.shared.insert(data, priority, false)
    }

    /// Queue several items sharing one priority.
    pub fn push_all<I>(&self, items: I, priority: i64) -> Vec<Ticket<R, E>>
    where
        I: IntoIterator<Item = T>,
    {
        let tickets: Vec<_> = items
            .into_iter()
            .map(|data| self.shared.insert(data, priority, false))
            .collect();
        if tickets.is_empty() {
            self.shared.drain_later_if_idle();
        }
        tickets
    }
}

impl<T, R, E, D> Queue<T, R, E, D>
where
    T: Clone + Send + 'static,
    R: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn build<W>(options: QueueOptions, pending: Pending<T, R, E>, worker: W) -> Self
    where
        W: Worker<T, Output = R, Error = E> + 'static,
    {
        let buffer = options
            .buffer
            .unwrap_or(options.concurrency.get() / BUFFER_DIVISOR);
        let state = State {
            pending,
            in_progress: Vec::new(),
            running: 0,
            concurrency: options.concurrency,
            payload: options.payload,
            buffer,
            paused: false,
            started: false,
            pass_scheduled: false,
            next_seq: 0,
        };
        Self {
            shared: Arc::new(Shared {
                worker: Arc::new(worker),
                state: Mutex::new(state),
                hooks: Mutex::new(Hooks::default()),
                idle: Notify::new(),
            }),
            _discipline: PhantomData,
        }
    }

    /// Number of items waiting to be dispatched.
    pub fn length(&self) -> usize {
        self.shared.state().pending.len()
    }

    /// Number of batches currently with the worker.
    pub fn running(&self) -> usize {
        self.shared.state().running
    }

    /// Items currently with the worker.
    pub fn workers_list(&self) -> Vec<T> {
        self.shared
            .state()
            .in_progress
            .iter()
            .map(|(_, data)| data.clone())
            .collect()
    }

    /// Nothing pending and nothing running.
    pub fn idle(&self) -> bool {
        let state = self.shared.state();
        state.pending.is_empty() && state.running == 0
    }

    /// Whether anything was ever pushed.
    pub fn started(&self) -> bool {
        self.shared.state().started
    }

    pub fn is_paused(&self) -> bool {
        self.shared.state().paused
    }

    /// Stop dispatching. Running batches finish normally.
    pub fn pause(&self) {
        self.shared.state().paused = true;
    }

    /// Resume dispatching on a later turn.
    pub fn resume(&self) {
        {
            let mut state = self.shared.state();
            if !state.paused {
                return;
            }
            state.paused = false;
        }
        self.shared.schedule_pass();
    }

    /// Discard every pending item and unregister the drain hook.
    ///
    /// Running batches are unaffected. Tickets of discarded items resolve to
    /// [`QueueError::Discarded`].
    pub fn kill(&self) {
        let discarded = self.shared.state().pending.clear();
        self.shared.hooks().drain = None;
        ItemsDiscarded {
            count: discarded.len(),
            reason: "killed",
        }
        .log();
    }

    /// Discard every pending item matching `predicate`; returns how many were removed.
    pub fn remove<P>(&self, predicate: P) -> usize
    where
        P: FnMut(&T) -> bool,
    {
        let removed = self.shared.state().pending.remove_where(predicate);
        ItemsDiscarded {
            count: removed.len(),
            reason: "removed",
        }
        .log();
        removed.len()
    }

    pub fn concurrency(&self) -> Limit {
        self.shared.state().concurrency
    }

    /// Change the concurrency; takes effect on the next dispatch pass.
    pub fn set_concurrency(&self, concurrency: Limit) {
        self.shared.state().concurrency = concurrency;
        self.shared.schedule_pass();
    }

    pub fn payload(&self) -> Limit {
        self.shared.state().payload
    }

    pub fn buffer(&self) -> usize {
        self.shared.state().buffer
    }

    pub fn set_buffer(&self, buffer: usize) {
        self.shared.state().buffer = buffer;
    }

    /// Resolves at the next transition to idle after this call.
    pub fn drained(&self) -> Notified<'_> {
        self.shared.idle.notified()
    }

    pub fn on_saturated(&self, hook: impl Fn() + Send + Sync + 'static) {
        self.shared.hooks().saturated = Some(Arc::new(hook));
    }

    pub fn on_unsaturated(&self, hook: impl Fn() + Send + Sync + 'static) {
        self.shared.hooks().unsaturated = Some(Arc::new(hook));
    }

    pub fn on_empty(&self, hook: impl Fn() + Send + Sync + 'static) {
        self.shared.hooks().empty = Some(Arc::new(hook));
    }

    pub fn on_drain(&self, hook: impl Fn() + Send + Sync + 'static) {
        self.shared.hooks().drain = Some(Arc::new(hook));
    }

    /// Called once per item of a failed batch, after the item's ticket is answered.
    pub fn on_error(&self, hook: impl Fn(&E, &T) + Send + Sync + 'static) {
        self.shared.hooks().error = Some(Arc::new(hook));
    }
}
