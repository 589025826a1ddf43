// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Dependency-driven task scheduling.
//!
//! A [`TaskGraph`] names tasks and their prerequisites. [`auto`] validates the
//! graph as a whole (duplicate names, unknown dependencies, cycles) and only
//! then starts running it, so an invalid graph never runs a single task.
//! [`auto_inject!`](crate::auto_inject) offers the same graph with
//! dependency results bound as named variables.

pub mod graph;
pub mod inject;
pub mod plan;
pub mod scheduler;

pub use graph::{Results, Task, TaskFuture, TaskGraph, Work};
pub use plan::Plan;
pub use scheduler::{auto, Scheduler};
