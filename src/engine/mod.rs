// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod auto;
pub mod collections;
pub mod control;
pub mod defer;
pub mod iteration;
pub mod queue;
pub mod resilience;

pub use auto::{auto, Results, Scheduler, Task, TaskGraph};
pub use collections::{
    concat, detect, every, filter, group_by, map, map_values, reduce, reduce_right, reject, some,
    sort_by, times,
};
pub use control::{parallel, race, series, stage, until, waterfall, whilst, Stage};
pub use defer::next_turn;
pub use iteration::{each, each_of, each_of_stream, Collection, Lazy};
pub use queue::{PriorityQueue, Queue, Ticket};
pub use resilience::{
    ensure_async, memoize, memoize_by, retry, retryable, timeout, with_deadline, yield_if_ready,
    RetryOptions,
};
