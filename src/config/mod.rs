// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod limit;
mod loader;
mod runtime;
mod validation;

#[cfg(test)]
mod integration_tests;
pub mod consts;

pub use limit::Limit;
pub use loader::{
    load_and_validate_config, load_config, Config, QueueOptions, RetryConfig, TaskConfig,
};
pub use runtime::{publish_results, GraphBuilder};
pub use validation::validate_dependency_graph;
