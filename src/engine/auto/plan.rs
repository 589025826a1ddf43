// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Validated, index-based view of a task dependency graph.
//!
//! Building a [`Plan`] is the whole validation phase of a dependency schedule:
//!
//! 1. **Uniqueness**: every task name appears once.
//! 2. **Resolution**: every dependency names a task in the graph.
//! 3. **Reachability**: Kahn's algorithm must visit every task. Tasks left
//!    unvisited sit on or behind a cycle, and one concrete cycle among them is
//!    reported.
//!
//! Tasks are addressed by their insertion index from here on. Both edge
//! directions are kept: `dependencies[i]` for building a task's inputs and
//! `dependents[i]` for releasing tasks when `i` completes.

use std::collections::{HashMap, VecDeque};

use crate::errors::ValidationError;

#[derive(Debug, Clone)]
pub struct Plan {
    names: Vec<String>,
    dependencies: Vec<Vec<usize>>,
    dependents: Vec<Vec<usize>>,
    order: Vec<usize>,
}

impl Plan {
    /// Validate `(name, dependencies)` pairs given in insertion order.
    pub fn build<'a, I>(tasks: I) -> Result<Plan, ValidationError>
    where
        I: IntoIterator<Item = (&'a str, &'a [String])>,
    {
        let tasks: Vec<(&str, &[String])> = tasks.into_iter().collect();
        let count = tasks.len();

        let mut index: HashMap<&str, usize> = HashMap::with_capacity(count);
        for (position, (name, _)) in tasks.iter().enumerate() {
            if index.insert(name, position).is_some() {
                return Err(ValidationError::DuplicateTask {
                    task: name.to_string(),
                });
            }
        }

        let mut dependencies = vec![Vec::new(); count];
        let mut dependents = vec![Vec::new(); count];
        for (position, (name, wanted)) in tasks.iter().enumerate() {
            for dependency in wanted.iter() {
                let Some(&target) = index.get(dependency.as_str()) else {
                    return Err(ValidationError::UnresolvedDependency {
                        task: name.to_string(),
                        missing_dependency: dependency.clone(),
                    });
                };
                if !dependencies[position].contains(&target) {
                    dependencies[position].push(target);
                    dependents[target].push(position);
                }
            }
        }

        let names: Vec<String> = tasks.iter().map(|(name, _)| name.to_string()).collect();
        let mut unmet: Vec<usize> = dependencies.iter().map(Vec::len).collect();
        let mut ready: VecDeque<usize> = (0..count).filter(|&i| unmet[i] == 0).collect();
        let mut order = Vec::with_capacity(count);

        while let Some(current) = ready.pop_front() {
            order.push(current);
            for &dependent in &dependents[current] {
                unmet[dependent] -= 1;
                if unmet[dependent] == 0 {
                    ready.push_back(dependent);
                }
            }
        }

        if order.len() < count {
            return Err(ValidationError::CyclicDependency {
                cycle: find_cycle(&names, &dependencies, &unmet),
            });
        }

        Ok(Plan {
            names,
            dependencies,
            dependents,
            order,
        })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, task: usize) -> &str {
        &self.names[task]
    }

    pub fn dependencies(&self, task: usize) -> &[usize] {
        &self.dependencies[task]
    }

    pub fn dependents(&self, task: usize) -> &[usize] {
        &self.dependents[task]
    }

    /// Task names in one valid execution order.
    pub fn topological_order(&self) -> impl Iterator<Item = &str> + '_ {
        self.order.iter().map(|&task| self.names[task].as_str())
    }

    /// Group tasks by depth: level 0 has no dependencies, level N depends on
    /// something in level N-1.
    pub fn levels(&self) -> Vec<Vec<&str>> {
        let mut depth = vec![0usize; self.len()];
        for &task in &self.order {
            depth[task] = self.dependencies[task]
                .iter()
                .map(|&dependency| depth[dependency] + 1)
                .max()
                .unwrap_or(0);
        }

        let mut levels: Vec<Vec<&str>> = Vec::new();
        for &task in &self.order {
            if levels.len() <= depth[task] {
                levels.resize_with(depth[task] + 1, Vec::new);
            }
            levels[depth[task]].push(self.names[task].as_str());
        }
        levels
    }
}

/// Walk unmet dependency edges from any unvisited task until a task repeats.
///
/// Every task Kahn's algorithm could not visit still has an unvisited
/// dependency, so the walk cannot dead-end.
fn find_cycle(names: &[String], dependencies: &[Vec<usize>], unmet: &[usize]) -> Vec<String> {
    let Some(start) = (0..names.len()).find(|&task| unmet[task] > 0) else {
        return Vec::new();
    };

    let mut position_in_path: HashMap<usize, usize> = HashMap::new();
    let mut path = Vec::new();
    let mut current = start;

    loop {
        if let Some(&first) = position_in_path.get(&current) {
            let mut cycle: Vec<String> = path[first..].iter().map(|&t: &usize| names[t].clone()).collect();
            cycle.push(names[current].clone());
            return cycle;
        }
        position_in_path.insert(current, path.len());
        path.push(current);

        match dependencies[current].iter().copied().find(|&dep| unmet[dep] > 0) {
            Some(next) => current = next,
            None => return path.iter().map(|&t| names[t].clone()).collect(),
        }
    }
}
