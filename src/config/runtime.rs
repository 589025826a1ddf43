// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::cell::Cell;
use std::collections::BTreeMap;
use std::time::Duration;

use tokio::time::sleep;

use crate::config::{Config, QueueOptions, TaskConfig};
use crate::engine::auto::{Results, Task, TaskGraph};
use crate::engine::queue::Queue;
use crate::engine::resilience::{retry, with_deadline, RetryOptions};
use crate::errors::{ConfigError, QueueError};

/// Task graph builder - turns a config's task list into a runnable graph.
///
/// Every configured task becomes a simulated unit: each attempt sleeps for
/// `duration_ms`, the first `fail_times` attempts fail, and `timeout_ms`
/// bounds a single attempt. Attempts are repeated according to the config's
/// `retry` section.
///
/// A task's result names the task and, in `depends_on` order, the results it
/// was given, so the output shows how data flowed through the graph.
///
/// # Examples
///
/// ```
/// use the_cadence::config::{Config, GraphBuilder};
/// use the_cadence::engine::auto;
///
/// # #[tokio::main]
/// # async fn main() {
/// let config: Config = serde_yaml::from_str(
///     r#"
/// tasks:
///   - id: fetch
///   - id: parse
///     depends_on: [fetch]
/// "#,
/// )
/// .unwrap();
///
/// let graph = GraphBuilder::from_config(&config).unwrap();
/// let results = auto(graph, config.concurrency).await.unwrap();
///
/// assert_eq!(results.get("parse").map(String::as_str), Some("parse(fetch)"));
/// # }
/// ```
pub struct GraphBuilder;

impl GraphBuilder {
    /// Build a `TaskGraph` from configuration.
    ///
    /// Fails if the retry policy is invalid. The graph's shape is checked when
    /// it is handed to a scheduler.
    pub fn from_config(cfg: &Config) -> Result<TaskGraph<String, String>, ConfigError> {
        let options: RetryOptions<String> = cfg.retry.options()?;
        let mut graph = TaskGraph::new();

        for task in &cfg.tasks {
            let task_cfg = task.clone();
            let options = options.clone();
            graph.insert(
                task.id.clone(),
                Task::from_parts(task.depends_on.clone(), move |inputs: Results<String>| {
                    run_task(task_cfg, options, inputs)
                }),
            );
        }

        Ok(graph)
    }
}

/// Hand finished task results to a queue built from the config's `queue`
/// section and collect what it publishes, ordered by task name.
///
/// Each worker call receives up to `payload` results and at most
/// `concurrency` batches are in flight at once.
pub async fn publish_results(
    results: Results<String>,
    options: QueueOptions,
) -> Result<BTreeMap<String, String>, QueueError<String>> {
    let queue = Queue::with_options(options, |batch: Vec<(String, String)>| async move {
        Ok::<_, String>(batch.into_iter().collect::<BTreeMap<String, String>>())
    });

    let mut published = BTreeMap::new();
    for ticket in queue.push_all(results) {
        published.extend(ticket.await?);
    }
    Ok(published)
}

async fn run_task(
    task_cfg: TaskConfig,
    options: RetryOptions<String>,
    inputs: Results<String>,
) -> Result<String, String> {
    let output = render_output(&task_cfg, &inputs);
    let attempts = Cell::new(0u32);

    retry(&options, || {
        attempts.set(attempts.get() + 1);
        attempt(&task_cfg, attempts.get(), output.clone())
    })
    .await
}

async fn attempt(task_cfg: &TaskConfig, number: u32, output: String) -> Result<String, String> {
    let duration = Duration::from_millis(task_cfg.duration_ms);
    let failure = (number <= task_cfg.fail_times)
        .then(|| format!("task '{}' failed on attempt {}", task_cfg.id, number));
    let work = async move {
        sleep(duration).await;
        match failure {
            Some(message) => Err(message),
            None => Ok(output),
        }
    };

    match task_cfg.timeout_ms {
        Some(ms) => with_deadline(work, Duration::from_millis(ms), Some(task_cfg.id.as_str()))
            .await
            .map_err(|error| error.to_string()),
        None => work.await,
    }
}

fn render_output(task_cfg: &TaskConfig, inputs: &Results<String>) -> String {
    if task_cfg.depends_on.is_empty() {
        return task_cfg.id.clone();
    }
    let upstream: Vec<&str> = task_cfg
        .depends_on
        .iter()
        .filter_map(|dependency| inputs.get(dependency).map(String::as_str))
        .collect();
    format!("{}({})", task_cfg.id, upstream.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Limit, RetryConfig};
    use crate::engine::auto::auto;
    use crate::errors::AutoError;
    use tokio::time::Instant;

    fn task(id: &str, depends_on: &[&str]) -> TaskConfig {
        TaskConfig {
            id: id.to_string(),
            depends_on: depends_on.iter().map(|d| d.to_string()).collect(),
            duration_ms: 10,
            fail_times: 0,
            timeout_ms: None,
        }
    }

    fn config(tasks: Vec<TaskConfig>, retry: RetryConfig) -> Config {
        Config {
            concurrency: Limit::UNBOUNDED,
            queue: Default::default(),
            retry,
            tasks,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn outputs_trace_the_data_flow() {
        let cfg = config(
            vec![
                task("a", &[]),
                task("b", &["a"]),
                task("c", &["a"]),
                task("d", &["c", "b"]),
            ],
            RetryConfig::default(),
        );

        let results = auto(GraphBuilder::from_config(&cfg).unwrap(), cfg.concurrency)
            .await
            .unwrap();

        assert_eq!(results.get("d").map(String::as_str), Some("d(c(a), b(a))"));
    }

    #[tokio::test(start_paused = true)]
    async fn flaky_task_is_retried_per_config() {
        let mut flaky = task("flaky", &[]);
        flaky.fail_times = 2;
        let cfg = config(
            vec![flaky],
            RetryConfig {
                times: 3,
                interval_ms: 5,
            },
        );
        let began = Instant::now();

        let results = auto(GraphBuilder::from_config(&cfg).unwrap(), cfg.concurrency)
            .await
            .unwrap();

        assert_eq!(results.get("flaky").map(String::as_str), Some("flaky"));
        // three 10ms attempts and two 5ms pauses
        assert_eq!(began.elapsed(), Duration::from_millis(40));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_fail_the_schedule() {
        let mut flaky = task("flaky", &[]);
        flaky.fail_times = 5;
        let cfg = config(
            vec![task("ok", &[]), flaky],
            RetryConfig {
                times: 2,
                interval_ms: 0,
            },
        );

        let err = auto(GraphBuilder::from_config(&cfg).unwrap(), cfg.concurrency)
            .await
            .unwrap_err();

        match err {
            AutoError::TaskFailed { task, error, results } => {
                assert_eq!(task, "flaky");
                assert_eq!(error, "task 'flaky' failed on attempt 2");
                assert_eq!(results.get("ok").map(String::as_str), Some("ok"));
            }
            other => panic!("expected task failure, got {}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_attempt_times_out() {
        let mut slow = task("slow", &[]);
        slow.duration_ms = 200;
        slow.timeout_ms = Some(50);
        let cfg = config(
            vec![slow],
            RetryConfig {
                times: 1,
                interval_ms: 0,
            },
        );

        let err = auto(GraphBuilder::from_config(&cfg).unwrap(), cfg.concurrency)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "task 'slow' failed: operation timed out after 50ms: slow");
    }

    #[tokio::test(start_paused = true)]
    async fn results_are_published_through_the_configured_queue() {
        let mut cfg = config(
            vec![task("a", &[]), task("b", &["a"]), task("c", &["a"])],
            RetryConfig::default(),
        );
        cfg.queue = QueueOptions {
            concurrency: Limit::new(2).unwrap(),
            payload: Limit::new(2).unwrap(),
            buffer: None,
        };
        let results = auto(GraphBuilder::from_config(&cfg).unwrap(), cfg.concurrency)
            .await
            .unwrap();

        let published = publish_results(results, cfg.queue).await.unwrap();

        let names: Vec<&str> = published.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(published.get("c").map(String::as_str), Some("c(a)"));
    }

    #[tokio::test]
    async fn publishing_nothing_yields_an_empty_report() {
        let published = publish_results(Results::default(), QueueOptions::default())
            .await
            .unwrap();
        assert!(published.is_empty());
    }

    #[test]
    fn zero_retry_attempts_are_rejected() {
        let cfg = config(
            vec![task("a", &[])],
            RetryConfig {
                times: 0,
                interval_ms: 0,
            },
        );
        assert!(matches!(
            GraphBuilder::from_config(&cfg),
            Err(ConfigError::ZeroAttempts)
        ));
    }
}
