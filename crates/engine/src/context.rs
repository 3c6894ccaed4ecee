// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-run state shared by every job task, and the expression scope
//! built on top of it

use oc_core::{EventKind, JobStatus, MatrixValues, RunId, SecretStore, StepStatus, TriggerEvent};
use oc_workflow::{EvalError, JobDef, Resolver, StatusFn, Value};
use oc_workflow::{Access, Scope as PermissionScope};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Read-only state for one run, shared behind an `Arc`
#[derive(Debug)]
pub struct RunContext {
    pub run_id: RunId,
    pub workflow: String,
    pub event: TriggerEvent,
    secrets: SecretStore,
    /// Workflow-level environment as declared; expanded per instance
    pub env: BTreeMap<String, String>,
    /// Cache partition shared by every instance of the run
    pub cache_namespace: String,
    /// Project checkout the run was started from
    pub source_dir: PathBuf,
    pub run_dir: PathBuf,
}

impl RunContext {
    pub fn new(
        run_id: RunId,
        workflow: impl Into<String>,
        event: TriggerEvent,
        secrets: SecretStore,
        source_dir: PathBuf,
        run_dir: PathBuf,
    ) -> Self {
        let workflow = workflow.into();
        Self {
            run_id,
            cache_namespace: workflow.clone(),
            workflow,
            event,
            secrets,
            env: BTreeMap::new(),
            source_dir,
            run_dir,
        }
    }

    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn secrets(&self) -> &SecretStore {
        &self.secrets
    }

    pub fn redact(&self, text: &str) -> String {
        self.secrets.redact(text)
    }
}

/// What a dependent instance sees of a finished dependency job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeedsView {
    /// Worst status across the dependency's instances
    pub result: JobStatus,
    pub outputs: BTreeMap<String, String>,
}

/// Outcome and outputs of an earlier step of the same instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepView {
    pub outcome: StepStatus,
    pub outputs: BTreeMap<String, String>,
}

/// Resolver for `${{ }}` expressions and `if` predicates
pub(crate) struct Scope<'a> {
    pub ctx: &'a RunContext,
    pub job: &'a JobDef,
    pub instance: &'a str,
    pub matrix: &'a MatrixValues,
    pub env: &'a BTreeMap<String, String>,
    pub steps: &'a BTreeMap<String, StepView>,
    pub needs: &'a BTreeMap<String, NeedsView>,
    /// A step (or a dependency, for job conditions) has failed
    pub failed: bool,
    pub cancelled: bool,
}

impl Scope<'_> {
    fn job_status(&self) -> &'static str {
        if self.cancelled {
            "cancelled"
        } else if self.failed {
            "failure"
        } else {
            "success"
        }
    }

    fn event_field(&self, field: &str) -> Option<String> {
        let event = &self.ctx.event;
        let is_tag = event.kind == EventKind::Tag;
        match field {
            "kind" | "name" => Some(event.kind.as_str().to_string()),
            "ref" => Some(event.git_ref.clone()),
            "branch" => (!is_tag).then(|| event.git_ref.clone()),
            "tag" => is_tag.then(|| event.git_ref.clone()),
            "actor" => Some(event.actor.clone()),
            _ => None,
        }
    }
}

impl Resolver for Scope<'_> {
    fn resolve(&self, path: &[String]) -> Result<Value, EvalError> {
        let parts: Vec<&str> = path.iter().map(String::as_str).collect();
        let value = match parts.as_slice() {
            ["matrix", axis] => self.matrix.get(axis).map(String::from),
            ["env", name] => self.env.get(*name).cloned(),
            ["secrets", name] => {
                if !self.job.permissions.allows(PermissionScope::Secrets, Access::Read) {
                    return Err(EvalError::Denied(format!(
                        "job `{}` lacks secrets:read to read secrets.{}",
                        self.job.name, name
                    )));
                }
                self.ctx.secrets.get(name).map(String::from)
            }
            ["steps", id, "outputs", key] => self
                .steps
                .get(*id)
                .and_then(|step| step.outputs.get(*key).cloned()),
            ["steps", id, "outcome"] => self
                .steps
                .get(*id)
                .map(|step| step.outcome.as_str().to_string()),
            ["needs", job, "outputs", key] => self
                .needs
                .get(*job)
                .and_then(|needs| needs.outputs.get(*key).cloned()),
            ["needs", job, "result"] => self
                .needs
                .get(*job)
                .map(|needs| needs.result.as_str().to_string()),
            ["event", field] => self.event_field(field),
            ["run", "id"] => Some(self.ctx.run_id.to_string()),
            ["run", "workflow"] => Some(self.ctx.workflow.clone()),
            ["job", "name"] => Some(self.job.name.clone()),
            ["job", "instance"] => Some(self.instance.to_string()),
            ["job", "status"] => Some(self.job_status().to_string()),
            _ => None,
        };
        Ok(value.into())
    }

    fn status(&self, function: StatusFn) -> bool {
        match function {
            StatusFn::Success => !self.failed && !self.cancelled,
            StatusFn::Failure => self.failed,
            StatusFn::Always => true,
            StatusFn::Cancelled => self.cancelled,
        }
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
