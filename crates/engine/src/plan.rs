// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Expansion of a workflow into the ordered list of job instances

use crate::executor::InstancePlan;
use crate::workspace::unique_slugs;
use oc_core::MatrixValues;
use oc_workflow::{DependencyGraph, EmptyMatrixError, GraphError, Workflow};
use std::sync::Arc;

/// A job instance, or the placeholder for a job whose matrix is empty
#[derive(Debug, Clone)]
pub struct PlannedInstance {
    pub plan: InstancePlan,
    pub empty_matrix: Option<EmptyMatrixError>,
}

/// Validated graph plus every instance in submission order
/// (job declaration order, then matrix order)
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub graph: DependencyGraph,
    pub instances: Vec<PlannedInstance>,
}

impl RunPlan {
    pub fn build(workflow: &Workflow) -> Result<Self, GraphError> {
        let graph = DependencyGraph::build(workflow)?;

        let mut expanded: Vec<(Arc<oc_workflow::JobDef>, MatrixValues, Option<EmptyMatrixError>)> =
            Vec::new();
        for job in &workflow.jobs {
            let job = Arc::new(job.clone());
            match job.instances() {
                Ok(tuples) => {
                    for values in tuples {
                        expanded.push((Arc::clone(&job), values, None));
                    }
                }
                Err(e) => {
                    tracing::warn!(job = %job.name, "{}", e);
                    expanded.push((Arc::clone(&job), MatrixValues::new(), Some(e)));
                }
            }
        }

        let ids: Vec<String> = expanded
            .iter()
            .map(|(job, values, _)| job.instance_id(values))
            .collect();
        let slugs = unique_slugs(ids.iter().map(String::as_str));

        let instances = expanded
            .into_iter()
            .zip(ids.into_iter().zip(slugs))
            .map(|((job, matrix, empty_matrix), (id, slug))| PlannedInstance {
                plan: InstancePlan {
                    job,
                    id,
                    slug,
                    matrix,
                },
                empty_matrix,
            })
            .collect();

        Ok(Self { graph, instances })
    }

    /// Number of instances per job, in declaration order
    pub fn instance_counts(&self) -> Vec<(&str, usize)> {
        let mut counts: Vec<(&str, usize)> = Vec::new();
        for instance in &self.instances {
            let name = instance.plan.job.name.as_str();
            let runnable = usize::from(instance.empty_matrix.is_none());
            match counts.last_mut() {
                Some((last, count)) if *last == name => *count += runnable,
                _ => counts.push((name, runnable)),
            }
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}
