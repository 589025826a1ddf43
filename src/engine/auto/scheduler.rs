// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::VecDeque;
use std::time::Instant;

use futures::stream::{FuturesUnordered, StreamExt};
use tracing::Instrument;

use crate::config::Limit;
use crate::engine::auto::graph::{Results, TaskGraph, Work};
use crate::engine::auto::plan::Plan;
use crate::engine::defer::next_turn;
use crate::engine::iteration::settle_abandoned;
use crate::errors::{AutoError, ValidationError};
use crate::observability::messages::scheduler::{
    ScheduleCompleted, ScheduleStarted, TaskFailed, TaskStarted,
};
use crate::observability::messages::validation::GraphRejected;
use crate::observability::messages::StructuredLog;

/// Dependency-driven executor for a validated [`TaskGraph`].
///
/// A task starts once all of its dependencies have succeeded and fewer than
/// `limit` tasks are running. Ready tasks start in the order they became
/// ready; tasks ready at the outset start in insertion order. Each task sees a
/// snapshot of its own dependencies' results only.
///
/// The first failing task ends the run. Nothing further is started and the
/// error carries the results gathered up to that failure. Tasks still running
/// are allowed to finish before the error is returned; what they produce is
/// ignored.
pub struct Scheduler<V, E> {
    plan: Plan,
    work: Vec<Option<Work<V, E>>>,
    limit: Limit,
}

impl<V, E> std::fmt::Debug for Scheduler<V, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("plan", &self.plan)
            .field("limit", &self.limit)
            .finish()
    }
}

impl<V, E> Scheduler<V, E>
where
    V: Clone + 'static,
    E: 'static,
{
    /// Validate `graph`. Nothing runs if validation fails.
    pub fn new(graph: TaskGraph<V, E>, limit: Limit) -> Result<Self, ValidationError> {
        let tasks = graph.into_tasks();
        let plan = match Plan::build(
            tasks
                .iter()
                .map(|(name, task)| (name.as_str(), task.dependencies())),
        ) {
            Ok(plan) => plan,
            Err(error) => {
                GraphRejected {
                    task_count: tasks.len(),
                    error: &error,
                }
                .log();
                return Err(error);
            }
        };

        let work = tasks
            .into_iter()
            .map(|(_, task)| Some(task.into_work()))
            .collect();

        Ok(Self { plan, work, limit })
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub async fn run(self) -> Result<Results<V>, AutoError<V, E>> {
        let concurrency = self.limit.to_string();
        let started = ScheduleStarted {
            task_count: self.plan.len(),
            concurrency: &concurrency,
        };
        started.log();
        let span = started.span("auto");

        self.execute().instrument(span).await
    }

    async fn execute(self) -> Result<Results<V>, AutoError<V, E>> {
        let Scheduler {
            plan,
            mut work,
            limit,
        } = self;
        let began = Instant::now();
        let cap = limit.get();
        let mut results = Results::default();

        if plan.is_empty() {
            next_turn().await;
            ScheduleCompleted {
                task_count: 0,
                duration: began.elapsed(),
            }
            .log();
            return Ok(results);
        }

        let mut unmet: Vec<usize> = (0..plan.len())
            .map(|task| plan.dependencies(task).len())
            .collect();
        let mut ready: VecDeque<usize> = (0..plan.len()).filter(|&task| unmet[task] == 0).collect();
        let mut in_flight = FuturesUnordered::new();

        loop {
            while in_flight.len() < cap {
                let Some(task) = ready.pop_front() else {
                    break;
                };
                let Some(unit) = work[task].take() else {
                    continue;
                };

                let mut inputs = Results::default();
                for &dependency in plan.dependencies(task) {
                    let name = plan.name(dependency);
                    if let Some(value) = results.get(name) {
                        inputs.insert(name.to_string(), value.clone());
                    }
                }

                TaskStarted {
                    task: plan.name(task),
                    dependency_count: plan.dependencies(task).len(),
                }
                .log();

                let pending = unit(inputs);
                in_flight.push(async move { (task, pending.await) });
            }

            let Some((task, outcome)) = in_flight.next().await else {
                break;
            };

            match outcome {
                Ok(value) => {
                    results.insert(plan.name(task).to_string(), value);
                    for &dependent in plan.dependents(task) {
                        unmet[dependent] -= 1;
                        if unmet[dependent] == 0 {
                            ready.push_back(dependent);
                        }
                    }
                }
                Err(error) => {
                    TaskFailed {
                        task: plan.name(task),
                        still_running: in_flight.len(),
                    }
                    .log();
                    let snapshot = results.into_inner();
                    settle_abandoned(in_flight).await;
                    return Err(AutoError::TaskFailed {
                        task: plan.name(task).to_string(),
                        error,
                        results: snapshot,
                    });
                }
            }
        }

        ScheduleCompleted {
            task_count: plan.len(),
            duration: began.elapsed(),
        }
        .log();

        Ok(results)
    }
}

/// Validate and run `graph` with at most `limit` tasks in flight.
///
/// ```rust
/// use the_cadence::config::Limit;
/// use the_cadence::engine::auto::{auto, Results, Task, TaskGraph};
///
/// # #[tokio::main]
/// # async fn main() {
/// let graph: TaskGraph<i32, String> = TaskGraph::new()
///     .with("base", Task::independent(|| async { Ok(20) }))
///     .with(
///         "answer",
///         Task::dependent(["base"], |inputs: Results<i32>| async move {
///             Ok(inputs.get("base").copied().unwrap_or_default() + 22)
///         }),
///     );
///
/// let results = auto(graph, Limit::UNBOUNDED).await.unwrap();
/// assert_eq!(results.get("answer"), Some(&42));
/// # }
/// ```
pub async fn auto<V, E>(graph: TaskGraph<V, E>, limit: Limit) -> Result<Results<V>, AutoError<V, E>>
where
    V: Clone + 'static,
    E: 'static,
{
    Scheduler::new(graph, limit)?.run().await
}
