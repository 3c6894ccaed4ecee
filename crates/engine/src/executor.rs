// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step executor: runs the steps of one job instance in order

use crate::config::EngineConfig;
use crate::context::{NeedsView, RunContext, Scope, StepView};
use crate::error::{CacheError, StepFailure};
use crate::events::EventSink;
use crate::report::{CacheReport, StepReport};
use crate::workspace::InstanceDirs;
use oc_adapters::{CommandOutput, CommandRequest, CommandRunner, Program, RunnerError};
use oc_core::{Clock, JobStatus, MatrixValues, RunEvent, StepStatus};
use oc_storage::{artifact_name, ArtifactHandle, SaveOutcome, Store, StoreError};
use oc_workflow::{
    interpolate, Access, EvalError, JobDef, Scope as PermissionScope, StepDef, StepKind,
    TemplateError,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// One concrete job instance handed to the executor
#[derive(Debug, Clone)]
pub struct InstancePlan {
    pub job: Arc<JobDef>,
    /// `build` or `build (linux, stable)`
    pub id: String,
    /// Directory-safe form of `id`, unique within the run
    pub slug: String,
    pub matrix: MatrixValues,
}

/// Result of running one instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceOutcome {
    /// Succeeded, Failed or Cancelled
    pub status: JobStatus,
    pub reason: Option<String>,
    pub steps: Vec<StepReport>,
    pub outputs: BTreeMap<String, String>,
    pub artifacts: Vec<ArtifactHandle>,
    pub cache: Option<CacheReport>,
    pub warnings: Vec<String>,
}

impl InstanceOutcome {
    fn new() -> Self {
        Self {
            status: JobStatus::Succeeded,
            reason: None,
            steps: Vec::new(),
            outputs: BTreeMap::new(),
            artifacts: Vec::new(),
            cache: None,
            warnings: Vec::new(),
        }
    }

    fn failed(mut self, reason: String) -> Self {
        self.status = JobStatus::Failed;
        self.reason = Some(reason);
        self
    }
}

/// Cache declaration with its templates expanded
struct ResolvedCache {
    key: String,
    restore_keys: Vec<String>,
    paths: Vec<String>,
}

enum StepRun {
    Finished(Result<Result<CommandOutput, RunnerError>, tokio::time::error::Elapsed>),
    Cancelled,
}

/// Mutable per-instance state threaded through the step loop
struct InstanceRun<'a> {
    ctx: &'a RunContext,
    plan: &'a InstancePlan,
    needs: &'a BTreeMap<String, NeedsView>,
    dirs: InstanceDirs,
    steps: BTreeMap<String, StepView>,
    /// Outputs of every step so far; later steps win
    job_outputs: BTreeMap<String, String>,
    failed: bool,
    cancelled: bool,
    outcome: InstanceOutcome,
}

impl<'a> InstanceRun<'a> {
    fn scope<'s>(&'s self, env: &'s BTreeMap<String, String>) -> Scope<'s> {
        Scope {
            ctx: self.ctx,
            job: &self.plan.job,
            instance: &self.plan.id,
            matrix: &self.plan.matrix,
            env,
            steps: &self.steps,
            needs: self.needs,
            failed: self.failed,
            cancelled: self.cancelled,
        }
    }

    fn interpolate_map(
        &self,
        values: &BTreeMap<String, String>,
        env: &BTreeMap<String, String>,
    ) -> Result<BTreeMap<String, String>, TemplateError> {
        let scope = self.scope(env);
        values
            .iter()
            .map(|(k, v)| Ok((k.clone(), interpolate(v, &scope)?)))
            .collect()
    }

    fn warn(&mut self, message: String) {
        let message = self.ctx.redact(&message);
        tracing::warn!(instance = %self.plan.id, "{}", message);
        self.outcome.warnings.push(message);
    }

    fn log(&self, header: &str, body: &str) {
        if let Err(e) = self.dirs.append_log(header, &self.ctx.redact(body)) {
            tracing::warn!(path = %self.dirs.log.display(), error = %e, "failed to write step log");
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn record(
        &mut self,
        events: &EventSink,
        step: &StepDef,
        name: String,
        status: StepStatus,
        exit_code: Option<i32>,
        duration: Duration,
        reason: Option<String>,
        outputs: BTreeMap<String, String>,
    ) {
        self.job_outputs
            .extend(outputs.iter().map(|(k, v)| (k.clone(), v.clone())));
        if let Some(id) = &step.id {
            self.steps.insert(
                id.clone(),
                StepView {
                    outcome: status,
                    outputs,
                },
            );
        }
        events.emit(RunEvent::StepFinished {
            instance: self.plan.id.clone(),
            step: name.clone(),
            status,
            exit_code,
        });
        self.outcome.steps.push(StepReport {
            name,
            id: step.id.clone(),
            status,
            exit_code,
            duration_ms: duration.as_millis() as u64,
            reason: reason.map(|r| self.ctx.redact(&r)),
        });
    }

    /// Record a failed step; tolerated if the step is `continue-on-error`
    #[allow(clippy::too_many_arguments)]
    fn fail_step(
        &mut self,
        events: &EventSink,
        step: &StepDef,
        name: String,
        failure: StepFailure,
        exit_code: Option<i32>,
        duration: Duration,
        outputs: BTreeMap<String, String>,
    ) {
        let status = if step.continue_on_error {
            tracing::info!(step = %name, %failure, "step failed, continuing");
            StepStatus::Tolerated
        } else {
            tracing::info!(step = %name, %failure, "step failed");
            if !self.failed {
                let reason = format!("step `{}` failed: {}", name, failure);
                self.outcome.reason = Some(self.ctx.redact(&reason));
            }
            self.failed = true;
            StepStatus::Failed
        };
        self.record(
            events,
            step,
            name,
            status,
            exit_code,
            duration,
            Some(failure.to_string()),
            outputs,
        );
    }
}

fn template_failure(error: TemplateError) -> StepFailure {
    match error {
        TemplateError::Eval(EvalError::Denied(message)) => StepFailure::Permission(message),
        other => StepFailure::Template(other.to_string()),
    }
}

fn env_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect()
}

/// Runs job instances step by step
pub struct StepExecutor<R, C> {
    runner: R,
    store: Arc<Store>,
    clock: C,
    config: Arc<EngineConfig>,
}

impl<R: CommandRunner, C: Clock + 'static> StepExecutor<R, C> {
    pub fn new(runner: R, store: Arc<Store>, clock: C, config: Arc<EngineConfig>) -> Self {
        Self {
            runner,
            store,
            clock,
            config,
        }
    }

    /// Run every step of `plan`, then save its cache and artifacts.
    ///
    /// Never returns an error: every failure is folded into the outcome.
    pub async fn run_instance(
        &self,
        ctx: &RunContext,
        plan: &InstancePlan,
        needs: &BTreeMap<String, NeedsView>,
        events: &EventSink,
        cancel: &CancellationToken,
    ) -> InstanceOutcome {
        let job = &*plan.job;
        let deadline = Instant::now() + job.timeout.unwrap_or(self.config.job_timeout);
        let mut run = InstanceRun {
            ctx,
            plan,
            needs,
            dirs: InstanceDirs::new(&ctx.run_dir, &plan.slug),
            steps: BTreeMap::new(),
            job_outputs: BTreeMap::new(),
            failed: false,
            cancelled: false,
            outcome: InstanceOutcome::new(),
        };

        if let Err(e) = run.dirs.prepare() {
            return run
                .outcome
                .failed(format!("failed to prepare workspace: {}", e));
        }

        // workflow env < job env, both expanded once per instance
        let empty = BTreeMap::new();
        let env = match run.interpolate_map(&ctx.env, &empty).and_then(|workflow_env| {
            let job_env = run.interpolate_map(&job.env, &workflow_env)?;
            let mut merged = workflow_env;
            merged.extend(job_env);
            Ok(merged)
        }) {
            Ok(env) => env,
            Err(e) => {
                let reason = ctx.redact(&format!("invalid job env: {}", template_failure(e)));
                return run.outcome.failed(reason);
            }
        };

        let cache = self.restore_cache(&mut run, &env).await;

        for (index, step) in job.steps.iter().enumerate() {
            let name = step.display_name(index);
            if cancel.is_cancelled() {
                run.cancelled = true;
            }
            if run.cancelled {
                run.record(
                    events,
                    step,
                    name,
                    StepStatus::Cancelled,
                    None,
                    Duration::ZERO,
                    Some("run cancelled".to_string()),
                    BTreeMap::new(),
                );
                continue;
            }
            self.run_step(&mut run, index, step, name, &env, deadline, events, cancel)
                .await;
        }
        if cancel.is_cancelled() {
            run.cancelled = true;
        }

        if run.cancelled {
            run.outcome.status = JobStatus::Cancelled;
            run.outcome.reason.get_or_insert_with(|| "run cancelled".to_string());
        } else if run.failed {
            run.outcome.status = JobStatus::Failed;
        } else {
            if let Some(cache) = &cache {
                self.save_cache(&mut run, cache).await;
            }
            self.store_artifacts(&mut run).await;
        }

        run.outcome.outputs = std::mem::take(&mut run.job_outputs);
        run.outcome
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_step(
        &self,
        run: &mut InstanceRun<'_>,
        index: usize,
        step: &StepDef,
        name: String,
        env: &BTreeMap<String, String>,
        deadline: Instant,
        events: &EventSink,
        cancel: &CancellationToken,
    ) {
        let started = Instant::now();

        let verdict = match &step.condition {
            None => Ok(!run.failed),
            Some(condition) => condition.evaluate(&run.scope(env)),
        };
        let should_run = match verdict {
            Ok(result) => result,
            Err(EvalError::Denied(message)) => {
                let failure = StepFailure::Permission(message);
                let elapsed = started.elapsed();
                run.fail_step(events, step, name, failure, None, elapsed, BTreeMap::new());
                return;
            }
        };
        if !should_run {
            tracing::debug!(step = %name, "step skipped");
            run.record(
                events,
                step,
                name,
                StepStatus::Skipped,
                None,
                Duration::ZERO,
                step.condition.as_ref().map(|c| format!("condition `{}` was false", c)),
                BTreeMap::new(),
            );
            return;
        }

        let request = match self.build_request(run, index, step, env) {
            Ok(request) => request,
            Err(failure) => {
                let elapsed = started.elapsed();
                run.fail_step(events, step, name, failure, None, elapsed, BTreeMap::new());
                return;
            }
        };

        let remaining = deadline.saturating_duration_since(started);
        let limit = step
            .timeout
            .unwrap_or(self.config.step_timeout)
            .min(remaining);
        if limit.is_zero() {
            let job_timeout = run.plan.job.timeout.unwrap_or(self.config.job_timeout);
            let failure = StepFailure::TimedOut(job_timeout);
            run.fail_step(events, step, name, failure, None, Duration::ZERO, BTreeMap::new());
            return;
        }

        let shown = match &request.program {
            Program::Shell { script } => run.ctx.redact(script),
            action @ Program::Action { .. } => action.to_string(),
        };
        tracing::info!(step = %name, command = %shown, "running step");

        let execution = tokio::time::timeout(limit, self.runner.run(request));
        tokio::pin!(execution);
        let result = tokio::select! {
            biased;
            result = &mut execution => StepRun::Finished(result),
            _ = cancel.cancelled() => {
                match tokio::time::timeout(self.config.cancel_grace, &mut execution).await {
                    Ok(result) => StepRun::Finished(result),
                    Err(_) => StepRun::Cancelled,
                }
            }
        };
        let duration = started.elapsed();

        match result {
            StepRun::Cancelled => {
                run.log(&format!("{} (cancelled)", name), "");
                run.cancelled = true;
                run.record(
                    events,
                    step,
                    name,
                    StepStatus::Cancelled,
                    None,
                    duration,
                    Some("cancelled while running".to_string()),
                    BTreeMap::new(),
                );
            }
            StepRun::Finished(Err(_)) => {
                run.log(&format!("{} (timed out)", name), "");
                let failure = StepFailure::TimedOut(limit);
                run.fail_step(events, step, name, failure, None, duration, BTreeMap::new());
            }
            StepRun::Finished(Ok(Err(e))) => {
                let message = run.ctx.redact(&e.to_string());
                run.log(&format!("{} (error)", name), &message);
                let failure = StepFailure::Runner(message);
                run.fail_step(events, step, name, failure, None, duration, BTreeMap::new());
            }
            StepRun::Finished(Ok(Ok(output))) => {
                run.log(&format!("{} (exit {})", name, output.exit_code), &output.stdout);
                if !output.stderr.is_empty() {
                    run.log(&format!("{} (stderr)", name), &output.stderr);
                }
                let outputs: BTreeMap<String, String> = output
                    .outputs
                    .into_iter()
                    .filter(|(key, _)| step.outputs.is_empty() || step.outputs.contains(key))
                    .map(|(key, value)| (key, run.ctx.redact(&value)))
                    .collect();
                if output.exit_code == 0 {
                    run.record(
                        events,
                        step,
                        name,
                        StepStatus::Succeeded,
                        Some(0),
                        duration,
                        None,
                        outputs,
                    );
                } else {
                    let code = output.exit_code;
                    let failure = StepFailure::NonZeroExit(code);
                    run.fail_step(events, step, name, failure, Some(code), duration, outputs);
                }
            }
        }
    }

    /// Expand templates and assemble the environment for one step.
    ///
    /// Precedence: built-ins < workflow env < job env < step env < inputs.
    fn build_request(
        &self,
        run: &InstanceRun<'_>,
        index: usize,
        step: &StepDef,
        env: &BTreeMap<String, String>,
    ) -> Result<CommandRequest, StepFailure> {
        let step_env = run.interpolate_map(&step.env, env).map_err(template_failure)?;
        let mut visible = env.clone();
        visible.extend(step_env.clone());

        let ctx = run.ctx;
        let job = &run.plan.job;
        let mut vars: BTreeMap<String, String> = BTreeMap::new();
        vars.insert("CI".to_string(), "true".to_string());
        vars.insert("OC_RUN_ID".to_string(), ctx.run_id.to_string());
        vars.insert("OC_WORKFLOW".to_string(), ctx.workflow.clone());
        vars.insert("OC_JOB".to_string(), job.name.clone());
        vars.insert("OC_INSTANCE".to_string(), run.plan.id.clone());
        vars.insert("OC_EVENT".to_string(), ctx.event.kind.to_string());
        vars.insert("OC_REF".to_string(), ctx.event.git_ref.clone());
        vars.insert("OC_ACTOR".to_string(), ctx.event.actor.clone());
        vars.insert("OC_SOURCE".to_string(), ctx.source_dir.display().to_string());
        vars.insert(
            "OC_WORKSPACE".to_string(),
            run.dirs.workspace.display().to_string(),
        );
        vars.insert("OC_PERMISSIONS".to_string(), job.permissions.to_string());
        for (axis, value) in run.plan.matrix.iter() {
            vars.insert(format!("MATRIX_{}", env_name(axis)), value.to_string());
        }
        vars.extend(visible.clone());

        let scope = run.scope(&visible);
        let program = match &step.kind {
            StepKind::Run { command } => Program::Shell {
                script: interpolate(command, &scope).map_err(template_failure)?,
            },
            StepKind::Uses { action, inputs } => {
                for (input, value) in inputs {
                    let value = interpolate(value, &scope).map_err(template_failure)?;
                    vars.insert(format!("INPUT_{}", env_name(input)), value);
                }
                Program::Action {
                    owner: action.owner.clone(),
                    name: action.name.clone(),
                    git_ref: action.git_ref.clone(),
                }
            }
        };

        Ok(CommandRequest {
            program,
            cwd: run.dirs.workspace.clone(),
            env: vars.into_iter().collect(),
            output_path: run.dirs.output_file(index),
        })
    }

    /// Run a store operation on the blocking pool under `store_timeout`
    async fn with_store<T, F>(&self, op: F) -> Result<T, CacheError>
    where
        T: Send + 'static,
        F: FnOnce(&Store) -> Result<T, StoreError> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let task = tokio::task::spawn_blocking(move || op(&store));
        match tokio::time::timeout(self.config.store_timeout, task).await {
            Ok(Ok(result)) => result.map_err(CacheError::from),
            Ok(Err(e)) => Err(CacheError::Task(e.to_string())),
            Err(_) => Err(CacheError::Timeout(self.config.store_timeout)),
        }
    }

    async fn restore_cache(
        &self,
        run: &mut InstanceRun<'_>,
        env: &BTreeMap<String, String>,
    ) -> Option<ResolvedCache> {
        let def = run.plan.job.cache.clone()?;
        let resolved = {
            let scope = run.scope(env);
            let key = interpolate(&def.key, &scope);
            let restore_keys: Result<Vec<String>, TemplateError> = def
                .restore_keys
                .iter()
                .map(|k| interpolate(k, &scope))
                .collect();
            key.and_then(|key| {
                Ok(ResolvedCache {
                    key,
                    restore_keys: restore_keys?,
                    paths: def.paths.clone(),
                })
            })
        };
        let resolved = match resolved {
            Ok(resolved) => resolved,
            Err(e) => {
                run.warn(format!("cache disabled: {}", CacheError::Template(e.to_string())));
                return None;
            }
        };

        let mut report = CacheReport {
            key: run.ctx.redact(&resolved.key),
            ..CacheReport::default()
        };
        if run
            .plan
            .job
            .permissions
            .allows(PermissionScope::Cache, Access::Read)
        {
            let namespace = run.ctx.cache_namespace.clone();
            let key = resolved.key.clone();
            let fallbacks = resolved.restore_keys.clone();
            let dest = run.dirs.workspace.clone();
            match self
                .with_store(move |store| store.restore(&namespace, &key, &fallbacks, &dest))
                .await
            {
                Ok(Some(hit)) => {
                    tracing::info!(key = %hit.key, exact = hit.exact, files = hit.files, "cache restored");
                    report.restored = Some(run.ctx.redact(&hit.key));
                    report.exact = hit.exact;
                }
                Ok(None) => tracing::info!(key = %report.key, "cache miss"),
                Err(e) => run.warn(format!("cache restore failed: {}", e)),
            }
        } else {
            run.warn(format!("cache restore skipped: {}", CacheError::Denied("cache:read")));
        }
        run.outcome.cache = Some(report);
        Some(resolved)
    }

    async fn save_cache(&self, run: &mut InstanceRun<'_>, cache: &ResolvedCache) {
        if run.outcome.cache.as_ref().is_some_and(|c| c.exact) {
            return;
        }
        if !run
            .plan
            .job
            .permissions
            .allows(PermissionScope::Cache, Access::Write)
        {
            run.warn(format!("cache save skipped: {}", CacheError::Denied("cache:write")));
            return;
        }
        let namespace = run.ctx.cache_namespace.clone();
        let key = cache.key.clone();
        let paths = cache.paths.clone();
        let src = run.dirs.workspace.clone();
        let now = self.clock.now();
        match self
            .with_store(move |store| store.save(&namespace, &key, &paths, &src, now))
            .await
        {
            Ok(SaveOutcome::Saved { files, bytes }) => {
                tracing::info!(files, bytes, "cache saved");
                if let Some(report) = run.outcome.cache.as_mut() {
                    report.saved = true;
                }
            }
            Ok(SaveOutcome::AlreadyExists) => tracing::debug!("cache key already saved"),
            Err(e) => run.warn(format!("cache save failed: {}", e)),
        }
    }

    async fn store_artifacts(&self, run: &mut InstanceRun<'_>) {
        let job = Arc::clone(&run.plan.job);
        if job.artifacts.is_empty() {
            return;
        }
        if !job.permissions.allows(PermissionScope::Artifacts, Access::Write) {
            run.warn(format!(
                "artifact upload skipped: {}",
                CacheError::Denied("artifacts:write")
            ));
            return;
        }
        for def in &job.artifacts {
            let name = artifact_name(&def.name, &run.plan.matrix);
            let run_id = run.ctx.run_id.clone();
            let paths = def.paths.clone();
            let src = run.dirs.workspace.clone();
            let retention = def.retention_days;
            let now = self.clock.now();
            let store_name = name.clone();
            match self
                .with_store(move |store| {
                    store.store_artifact(&run_id, &store_name, &paths, &src, retention, now)
                })
                .await
            {
                Ok(handle) => {
                    tracing::info!(artifact = %handle.name, files = handle.files, "artifact stored");
                    run.outcome.artifacts.push(handle);
                }
                Err(e) => run.warn(format!("artifact `{}` not stored: {}", name, e)),
            }
        }
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
