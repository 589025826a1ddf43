// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Named tasks and the graph that holds them.

use std::collections::hash_map;
use std::collections::HashMap;
use std::future::Future;

use futures::future::LocalBoxFuture;

pub type TaskFuture<V, E> = LocalBoxFuture<'static, Result<V, E>>;

/// The body of a task. It receives the results of its dependencies.
pub type Work<V, E> = Box<dyn FnOnce(Results<V>) -> TaskFuture<V, E>>;

/// A unit in a [`TaskGraph`], with or without prerequisites.
pub enum Task<V, E> {
    Independent(Work<V, E>),
    Dependent(Vec<String>, Work<V, E>),
}

impl<V: 'static, E: 'static> Task<V, E> {
    /// A task with no prerequisites. It starts as soon as capacity allows.
    pub fn independent<F, Fut>(unit: F) -> Self
    where
        F: FnOnce() -> Fut + 'static,
        Fut: Future<Output = Result<V, E>> + 'static,
    {
        Task::Independent(Box::new(
            move |_: Results<V>| -> TaskFuture<V, E> { Box::pin(unit()) },
        ))
    }

    /// A task that starts once every named dependency has succeeded.
    pub fn dependent<S, F, Fut>(dependencies: impl IntoIterator<Item = S>, unit: F) -> Self
    where
        S: Into<String>,
        F: FnOnce(Results<V>) -> Fut + 'static,
        Fut: Future<Output = Result<V, E>> + 'static,
    {
        Task::from_parts(dependencies.into_iter().map(Into::into).collect(), unit)
    }

    /// Build a task from an explicit dependency list, which may be empty.
    pub fn from_parts<F, Fut>(dependencies: Vec<String>, unit: F) -> Self
    where
        F: FnOnce(Results<V>) -> Fut + 'static,
        Fut: Future<Output = Result<V, E>> + 'static,
    {
        let work: Work<V, E> =
            Box::new(move |results: Results<V>| -> TaskFuture<V, E> { Box::pin(unit(results)) });
        if dependencies.is_empty() {
            Task::Independent(work)
        } else {
            Task::Dependent(dependencies, work)
        }
    }

    pub fn dependencies(&self) -> &[String] {
        match self {
            Task::Independent(_) => &[],
            Task::Dependent(dependencies, _) => dependencies,
        }
    }

    pub(crate) fn into_work(self) -> Work<V, E> {
        match self {
            Task::Independent(work) | Task::Dependent(_, work) => work,
        }
    }
}

/// Successful task results keyed by task name.
#[derive(Debug, Clone, PartialEq)]
pub struct Results<V> {
    values: HashMap<String, V>,
}

impl<V> Default for Results<V> {
    fn default() -> Self {
        Self {
            values: HashMap::new(),
        }
    }
}

impl<V> Results<V> {
    pub fn get(&self, task: &str) -> Option<&V> {
        self.values.get(task)
    }

    pub fn take(&mut self, task: &str) -> Option<V> {
        self.values.remove(task)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> hash_map::Iter<'_, String, V> {
        self.values.iter()
    }

    pub fn into_inner(self) -> HashMap<String, V> {
        self.values
    }

    pub(crate) fn insert(&mut self, task: String, value: V) {
        self.values.insert(task, value);
    }
}

impl<V> IntoIterator for Results<V> {
    type Item = (String, V);
    type IntoIter = hash_map::IntoIter<String, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

/// Tasks in insertion order. Validation happens when a scheduler is built.
pub struct TaskGraph<V, E> {
    tasks: Vec<(String, Task<V, E>)>,
}

impl<V, E> Default for TaskGraph<V, E> {
    fn default() -> Self {
        Self { tasks: Vec::new() }
    }
}

impl<V, E> TaskGraph<V, E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, task: Task<V, E>) -> Self {
        self.insert(name, task);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, task: Task<V, E>) -> &mut Self {
        self.tasks.push((name.into(), task));
        self
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.tasks.iter().map(|(name, _)| name.as_str())
    }

    pub(crate) fn into_tasks(self) -> Vec<(String, Task<V, E>)> {
        self.tasks
    }
}
