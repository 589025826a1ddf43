// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Storage for queue items that have not been handed to a worker yet.
//!
//! A plain queue keeps insertion order in a `VecDeque`. A priority queue keeps
//! a `BinaryHeap` whose ordering puts the smallest priority number on top and
//! breaks ties by insertion sequence, so equal priorities stay FIFO.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

use tokio::sync::oneshot;

use crate::errors::QueueError;

pub(crate) type Reply<R, E> = oneshot::Sender<Result<R, QueueError<E>>>;

/// A queued item and the channel its outcome is delivered on.
///
/// Dropping an entry without sending drops the reply sender, which is how
/// removed and killed items resolve their tickets as discarded.
pub(crate) struct Entry<T, R, E> {
    pub seq: u64,
    pub priority: i64,
    pub data: T,
    pub reply: Reply<R, E>,
}

pub(crate) struct Ranked<T, R, E>(Entry<T, R, E>);

impl<T, R, E> PartialEq for Ranked<T, R, E> {
    fn eq(&self, other: &Self) -> bool {
        self.0.seq == other.0.seq
    }
}

impl<T, R, E> Eq for Ranked<T, R, E> {}

impl<T, R, E> PartialOrd for Ranked<T, R, E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T, R, E> Ord for Ranked<T, R, E> {
    fn cmp(&self, other: &Self) -> Ordering {
        // max-heap: the lower priority number, then the earlier insertion, sits on top
        other
            .0
            .priority
            .cmp(&self.0.priority)
            .then_with(|| other.0.seq.cmp(&self.0.seq))
    }
}

pub(crate) enum Pending<T, R, E> {
    Fifo(VecDeque<Entry<T, R, E>>),
    Ranked(BinaryHeap<Ranked<T, R, E>>),
}

impl<T, R, E> Pending<T, R, E> {
    pub fn fifo() -> Self {
        Pending::Fifo(VecDeque::new())
    }

    pub fn ranked() -> Self {
        Pending::Ranked(BinaryHeap::new())
    }

    pub fn len(&self) -> usize {
        match self {
            Pending::Fifo(items) => items.len(),
            Pending::Ranked(heap) => heap.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn push_back(&mut self, entry: Entry<T, R, E>) {
        match self {
            Pending::Fifo(items) => items.push_back(entry),
            Pending::Ranked(heap) => heap.push(Ranked(entry)),
        }
    }

    /// Jump the line. Ranked storage has no front, so the entry is ranked
    /// by its priority like any other.
    pub fn push_front(&mut self, entry: Entry<T, R, E>) {
        match self {
            Pending::Fifo(items) => items.push_front(entry),
            Pending::Ranked(heap) => heap.push(Ranked(entry)),
        }
    }

    /// Remove up to `max` entries from the front, in dispatch order.
    pub fn take(&mut self, max: usize) -> Vec<Entry<T, R, E>> {
        let count = max.min(self.len());
        match self {
            Pending::Fifo(items) => items.drain(..count).collect(),
            Pending::Ranked(heap) => (0..count).filter_map(|_| heap.pop().map(|r| r.0)).collect(),
        }
    }

    /// Remove every entry whose data matches, preserving the order of the rest.
    pub fn remove_where<P>(&mut self, mut matches: P) -> Vec<Entry<T, R, E>>
    where
        P: FnMut(&T) -> bool,
    {
        match self {
            Pending::Fifo(items) => {
                let (removed, kept): (VecDeque<_>, VecDeque<_>) =
                    std::mem::take(items).into_iter().partition(|e| matches(&e.data));
                *items = kept;
                removed.into()
            }
            Pending::Ranked(heap) => {
                let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(heap)
                    .into_vec()
                    .into_iter()
                    .partition(|r| matches(&r.0.data));
                *heap = kept.into();
                removed.into_iter().map(|r| r.0).collect()
            }
        }
    }

    pub fn clear(&mut self) -> Vec<Entry<T, R, E>> {
        self.remove_where(|_| true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(seq: u64, priority: i64, data: &'static str) -> Entry<&'static str, (), ()> {
        let (reply, _) = oneshot::channel();
        Entry {
            seq,
            priority,
            data,
            reply,
        }
    }

    fn data(entries: Vec<Entry<&'static str, (), ()>>) -> Vec<&'static str> {
        entries.into_iter().map(|e| e.data).collect()
    }

    #[test]
    fn ranked_orders_by_priority_then_insertion() {
        let mut pending = Pending::ranked();
        pending.push_back(entry(0, 3, "low"));
        pending.push_back(entry(1, 1, "first-high"));
        pending.push_back(entry(2, 2, "mid"));
        pending.push_back(entry(3, 1, "second-high"));

        assert_eq!(data(pending.take(10)), vec!["first-high", "second-high", "mid", "low"]);
    }

    #[test]
    fn fifo_front_insertion_jumps_the_line() {
        let mut pending = Pending::fifo();
        pending.push_back(entry(0, 0, "a"));
        pending.push_back(entry(1, 0, "b"));
        pending.push_front(entry(2, 0, "urgent"));

        assert_eq!(data(pending.take(2)), vec!["urgent", "a"]);
        assert_eq!(pending.len(), 1);
    }

    #[test]
    fn remove_where_keeps_order_of_survivors() {
        let mut pending = Pending::fifo();
        for (seq, name) in ["a", "bb", "c", "dd"].into_iter().enumerate() {
            pending.push_back(entry(seq as u64, 0, name));
        }

        let removed = pending.remove_where(|d| d.len() == 2);
        assert_eq!(data(removed), vec!["bb", "dd"]);
        assert_eq!(data(pending.take(usize::MAX)), vec!["a", "c"]);
    }

    #[test]
    fn ranked_remove_rebuilds_heap() {
        let mut pending = Pending::ranked();
        pending.push_back(entry(0, 5, "keep-late"));
        pending.push_back(entry(1, 1, "drop"));
        pending.push_back(entry(2, 2, "keep-early"));

        assert_eq!(data(pending.remove_where(|d| *d == "drop")), vec!["drop"]);
        assert_eq!(data(pending.clear()).len(), 2);
        assert!(pending.is_empty());
    }
}
