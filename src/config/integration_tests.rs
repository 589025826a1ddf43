// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod integration_tests {
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::config::{load_and_validate_config, load_config, GraphBuilder, Limit};
    use crate::engine::auto::auto;
    use crate::engine::queue::Queue;
    use crate::errors::{ConfigError, ValidationError};

    fn write_config(suffix: &str, body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(suffix)
            .tempfile()
            .unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    /// Test that the bundled YAML configuration loads and validates
    #[test]
    fn test_diamond_yaml_loading() {
        let config = load_and_validate_config("configs/diamond.yaml").unwrap();

        assert_eq!(config.concurrency, Limit::new(2).unwrap());
        assert_eq!(config.retry.times, 3);
        assert_eq!(config.tasks.len(), 4);
        assert_eq!(config.tasks[0].id, "fetch");
        assert_eq!(config.tasks[3].depends_on, vec!["parse", "index"]);
        assert_eq!(config.tasks[1].timeout_ms, Some(100));
    }

    /// Test that the bundled TOML configuration loads and validates
    #[test]
    fn test_pipeline_toml_loading() {
        let config = load_and_validate_config("configs/pipeline.toml").unwrap();

        assert!(config.concurrency.is_unbounded());
        assert_eq!(config.queue.concurrency.get(), 2);
        assert_eq!(config.queue.payload.get(), 4);
        assert_eq!(config.retry.interval_ms, 0);
        assert_eq!(config.tasks[2].depends_on, vec!["transform"]);
    }

    #[test]
    fn test_bundled_cyclic_config_is_rejected() {
        let err = load_and_validate_config("configs/cyclic.yaml").unwrap_err();
        assert!(err.to_string().contains("Cyclic dependency detected"));
    }

    #[test]
    fn test_validation_errors_are_all_reported() {
        let file = write_config(
            ".yaml",
            r#"
tasks:
  - id: a
    depends_on: [nowhere]
  - id: a
"#,
        );

        match load_and_validate_config(file.path()) {
            Err(ConfigError::Invalid(errors)) => {
                assert_eq!(errors.len(), 2);
                assert!(errors.contains(&ValidationError::DuplicateTask { task: "a".into() }));
            }
            other => panic!("expected validation failure, got {:?}", other.map(|c| c.tasks.len())),
        }
    }

    #[test]
    fn test_zero_retry_attempts_rejected_at_load() {
        let file = write_config(".yml", "retry:\n  times: 0\ntasks: []\n");
        assert!(matches!(
            load_and_validate_config(file.path()),
            Err(ConfigError::ZeroAttempts)
        ));
    }

    #[test]
    fn test_malformed_toml_reports_parse_error() {
        let file = write_config(".toml", "concurrency = [not valid");
        assert!(matches!(load_config(file.path()), Err(ConfigError::Toml { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_diamond_config_runs_end_to_end() {
        let config = load_and_validate_config("configs/diamond.yaml").unwrap();
        let graph = GraphBuilder::from_config(&config).unwrap();

        let results = auto(graph, config.concurrency).await.unwrap();

        assert_eq!(results.len(), 4);
        assert_eq!(
            results.get("publish").map(String::as_str),
            Some("publish(parse(fetch), index(fetch))")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_queue_built_from_config_options() {
        let config = load_and_validate_config("configs/pipeline.toml").unwrap();
        let batches = Arc::new(AtomicUsize::new(0));
        let seen = batches.clone();

        let queue = Queue::with_options(config.queue, move |batch: Vec<u32>| {
            seen.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, String>(batch.iter().sum::<u32>()) }
        });

        let tickets = queue.push_all(1..=8);
        let mut sums = Vec::new();
        for ticket in tickets {
            sums.push(ticket.await.unwrap());
        }

        assert_eq!(batches.load(Ordering::SeqCst), 2);
        assert_eq!(sums, vec![10, 10, 10, 10, 26, 26, 26, 26]);
    }
}
