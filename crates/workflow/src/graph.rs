// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job dependency graph

use crate::workflow::Workflow;
use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;

/// One concrete cycle, first member repeated at the end
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CyclicDependencyError {
    pub cycle: Vec<String>,
}

impl fmt::Display for CyclicDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cyclic dependency: {}", self.cycle.join(" -> "))
    }
}

impl std::error::Error for CyclicDependencyError {}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error(transparent)]
    Cycle(#[from] CyclicDependencyError),
    #[error("job `{job}` needs unknown job `{dependency}`")]
    UnknownDependency { job: String, dependency: String },
}

/// Validated DAG over job names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyGraph {
    layers: Vec<Vec<String>>,
    needs: HashMap<String, Vec<String>>,
    dependents: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// Layer jobs with Kahn's algorithm.
    ///
    /// Each layer lists jobs in declaration order.
    pub fn build(workflow: &Workflow) -> Result<Self, GraphError> {
        let order: Vec<&str> = workflow.job_names().collect();
        let known: HashSet<&str> = order.iter().copied().collect();

        let mut needs: HashMap<String, Vec<String>> = HashMap::new();
        let mut dependents: HashMap<String, Vec<String>> = HashMap::new();
        let mut in_degree: HashMap<&str, usize> = HashMap::new();

        for job in &workflow.jobs {
            let mut deps: Vec<String> = Vec::new();
            for dep in &job.needs {
                if !known.contains(dep.as_str()) {
                    return Err(GraphError::UnknownDependency {
                        job: job.name.clone(),
                        dependency: dep.clone(),
                    });
                }
                if !deps.contains(dep) {
                    deps.push(dep.clone());
                }
            }
            for dep in &deps {
                dependents
                    .entry(dep.clone())
                    .or_default()
                    .push(job.name.clone());
            }
            in_degree.insert(job.name.as_str(), deps.len());
            needs.insert(job.name.clone(), deps);
        }

        let mut layers: Vec<Vec<String>> = Vec::new();
        let mut placed: HashSet<&str> = HashSet::new();
        let mut current: Vec<&str> = order
            .iter()
            .copied()
            .filter(|name| in_degree.get(name) == Some(&0))
            .collect();

        while !current.is_empty() {
            for name in &current {
                placed.insert(*name);
                for dependent in dependents.get(*name).into_iter().flatten() {
                    if let Some(degree) = in_degree.get_mut(dependent.as_str()) {
                        *degree = degree.saturating_sub(1);
                    }
                }
            }
            layers.push(current.iter().map(|s| s.to_string()).collect());
            current = order
                .iter()
                .copied()
                .filter(|name| !placed.contains(name) && in_degree.get(name) == Some(&0))
                .collect();
        }

        if placed.len() < order.len() {
            let remaining: Vec<&str> = order
                .iter()
                .copied()
                .filter(|name| !placed.contains(name))
                .collect();
            return Err(find_cycle(&remaining, &needs, &placed).into());
        }

        Ok(Self {
            layers,
            needs,
            dependents,
        })
    }

    pub fn layers(&self) -> &[Vec<String>] {
        &self.layers
    }

    /// All jobs in topological order
    pub fn order(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().flatten().map(String::as_str)
    }

    pub fn needs(&self, job: &str) -> &[String] {
        self.needs.get(job).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn dependents(&self, job: &str) -> &[String] {
        self.dependents.get(job).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Layer index of a job
    pub fn depth(&self, job: &str) -> Option<usize> {
        self.layers.iter().position(|layer| layer.iter().any(|j| j == job))
    }
}

/// Every unplaced job has an unplaced dependency, so following the first
/// such edge from any of them must revisit a node.
fn find_cycle(
    remaining: &[&str],
    needs: &HashMap<String, Vec<String>>,
    placed: &HashSet<&str>,
) -> CyclicDependencyError {
    let mut path: Vec<String> = Vec::new();
    let mut current = remaining.first().map(|s| s.to_string());

    while let Some(name) = current {
        if let Some(start) = path.iter().position(|p| *p == name) {
            let mut cycle = path.split_off(start);
            cycle.push(name);
            return CyclicDependencyError { cycle };
        }
        current = needs
            .get(&name)
            .and_then(|deps| deps.iter().find(|d| !placed.contains(d.as_str())))
            .cloned();
        path.push(name);
    }

    // Unreachable for a graph that failed Kahn layering
    CyclicDependencyError {
        cycle: remaining.iter().map(|s| s.to_string()).collect(),
    }
}

#[cfg(test)]
#[path = "graph_tests.rs"]
mod tests;
