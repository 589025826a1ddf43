// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::env;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use the_cadence::config::{load_and_validate_config, publish_results, GraphBuilder};
use the_cadence::engine::auto::Scheduler;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let config_file = env::args()
        .nth(1)
        .context("usage: the-cadence <config.yaml|config.toml>")?;
    let start_time = Instant::now();

    let config = load_and_validate_config(&config_file)
        .with_context(|| format!("failed to load {}", config_file))?;
    let graph = GraphBuilder::from_config(&config)?;
    let scheduler = Scheduler::new(graph, config.concurrency)?;

    for (depth, level) in scheduler.plan().levels().iter().enumerate() {
        tracing::info!(depth, tasks = %level.join(", "), "execution level");
    }
    tracing::info!(
        config = %config_file,
        tasks = config.tasks.len(),
        concurrency = %config.concurrency,
        "running task graph"
    );

    let results = scheduler.run().await?;
    let published = publish_results(results, config.queue).await?;

    println!("{}", serde_json::to_string_pretty(&published)?);
    tracing::info!(elapsed = ?start_time.elapsed(), "task graph complete");

    Ok(())
}
