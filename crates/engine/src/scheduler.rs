// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler: dispatches runnable job instances to a bounded pool
//!
//! Instances are considered in submission order. An instance is runnable
//! once every instance of every job it needs is terminal and none of them
//! blocks it. Failures of required jobs cascade as Skipped, cancellations
//! as Cancelled.

use crate::config::EngineConfig;
use crate::context::{NeedsView, RunContext, Scope};
use crate::events::EventSink;
use crate::executor::{InstanceOutcome, StepExecutor};
use crate::plan::RunPlan;
use crate::report::InstanceReport;
use oc_adapters::CommandRunner;
use oc_core::{Clock, JobState, JobStatus, RunEvent};
use oc_workflow::{EvalError, Workflow};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

struct Slot {
    plan: crate::executor::InstancePlan,
    state: JobState,
    report: InstanceReport,
}

enum Readiness {
    /// Some dependency instance has not finished
    Waiting,
    /// A dependency outcome decides this instance without running it
    Blocked(JobStatus, String),
    Ready {
        needs: BTreeMap<String, NeedsView>,
        dependency_failed: bool,
    },
}

/// Drives every instance of a run to a terminal state
pub struct Scheduler<R, C> {
    executor: Arc<StepExecutor<R, C>>,
    clock: C,
    config: Arc<EngineConfig>,
}

impl<R: CommandRunner, C: Clock + 'static> Scheduler<R, C> {
    pub fn new(executor: Arc<StepExecutor<R, C>>, clock: C, config: Arc<EngineConfig>) -> Self {
        Self {
            executor,
            clock,
            config,
        }
    }

    /// Run every planned instance; returns one report per instance in plan order
    pub async fn run(
        &self,
        ctx: Arc<RunContext>,
        workflow: &Workflow,
        plan: &RunPlan,
        events: &EventSink,
        cancel: &CancellationToken,
    ) -> Vec<InstanceReport> {
        let mut slots: Vec<Slot> = plan
            .instances
            .iter()
            .map(|planned| {
                let mut report = InstanceReport::unstarted(
                    planned.plan.id.clone(),
                    planned.plan.job.name.clone(),
                    planned.plan.matrix.clone(),
                );
                report.tolerated = planned.plan.job.continue_on_error;
                Slot {
                    plan: planned.plan.clone(),
                    state: JobState::default(),
                    report,
                }
            })
            .collect();

        for (idx, planned) in plan.instances.iter().enumerate() {
            if let Some(e) = &planned.empty_matrix {
                self.finish(&mut slots[idx], JobStatus::Skipped, Some(e.to_string()), events);
            }
        }

        let mut tasks: JoinSet<(usize, InstanceOutcome)> = JoinSet::new();
        let mut cancel_seen = false;

        loop {
            self.dispatch(&mut slots, &mut tasks, &ctx, workflow, events, cancel);

            if tasks.is_empty() {
                // Only reachable with a lost task; fail it so dependents resolve
                if self.fail_orphans(&mut slots, events) {
                    continue;
                }
                break;
            }

            tokio::select! {
                joined = tasks.join_next() => match joined {
                    Some(Ok((idx, outcome))) => self.complete(&mut slots[idx], outcome, events),
                    Some(Err(e)) => tracing::error!(error = %e, "job task failed"),
                    None => {}
                },
                _ = cancel.cancelled(), if !cancel_seen => {
                    cancel_seen = true;
                    tracing::info!(running = tasks.len(), "run cancelled");
                }
            }
        }

        slots.into_iter().map(|slot| slot.report).collect()
    }

    /// Resolve every pending instance that can be decided, dispatching
    /// runnable ones while pool capacity remains
    fn dispatch(
        &self,
        slots: &mut [Slot],
        tasks: &mut JoinSet<(usize, InstanceOutcome)>,
        ctx: &Arc<RunContext>,
        workflow: &Workflow,
        events: &EventSink,
        cancel: &CancellationToken,
    ) {
        let mut progressed = true;
        while progressed {
            progressed = false;
            for idx in 0..slots.len() {
                if slots[idx].state.status != JobStatus::Pending {
                    continue;
                }
                if cancel.is_cancelled() {
                    let reason = Some("run cancelled".to_string());
                    self.finish(&mut slots[idx], JobStatus::Cancelled, reason, events);
                    progressed = true;
                    continue;
                }

                let (needs, dependency_failed) = match readiness(slots, idx) {
                    Readiness::Waiting => continue,
                    Readiness::Blocked(status, reason) => {
                        self.finish(&mut slots[idx], status, Some(reason), events);
                        progressed = true;
                        continue;
                    }
                    Readiness::Ready {
                        needs,
                        dependency_failed,
                    } => (needs, dependency_failed),
                };
                if tasks.len() >= self.config.max_parallel {
                    continue;
                }

                let job = Arc::clone(&slots[idx].plan.job);
                if let Some(condition) = &job.condition {
                    let mut env = ctx.env.clone();
                    env.extend(job.env.clone());
                    let steps = BTreeMap::new();
                    let scope = Scope {
                        ctx,
                        job: &job,
                        instance: &slots[idx].plan.id,
                        matrix: &slots[idx].plan.matrix,
                        env: &env,
                        steps: &steps,
                        needs: &needs,
                        failed: dependency_failed,
                        cancelled: false,
                    };
                    // A tolerated dependency failure leaves the job runnable, so only
                    // an explicit status function sees it
                    let verdict = if condition.overrides_failure() {
                        condition.evaluate(&scope)
                    } else {
                        condition.expr().eval(&scope).map(|value| value.truthy())
                    };
                    match verdict {
                        Ok(true) => {}
                        Ok(false) => {
                            let reason = format!("condition `{}` was false", condition);
                            self.finish(&mut slots[idx], JobStatus::Skipped, Some(reason), events);
                            progressed = true;
                            continue;
                        }
                        Err(EvalError::Denied(message)) => {
                            let reason = format!("condition `{}` failed: {}", condition, message);
                            let reason = ctx.redact(&reason);
                            self.finish(&mut slots[idx], JobStatus::Failed, Some(reason), events);
                            progressed = true;
                            continue;
                        }
                    }
                }

                if !self.config.accepts_label(&job.runs_on) {
                    let reason = format!("no runner matches label `{}`", job.runs_on);
                    self.finish(&mut slots[idx], JobStatus::Failed, Some(reason), events);
                    progressed = true;
                    continue;
                }

                self.transition(&mut slots[idx], JobStatus::Running, None, events);
                progressed = true;

                let executor = Arc::clone(&self.executor);
                let ctx = Arc::clone(ctx);
                let plan = slots[idx].plan.clone();
                let events = events.clone();
                let child = cancel.child_token();
                let span = tracing::info_span!("job", instance = %plan.id);
                tasks.spawn(
                    async move {
                        tracing::info!("started");
                        let outcome = executor
                            .run_instance(&ctx, &plan, &needs, &events, &child)
                            .await;
                        tracing::info!(status = %outcome.status, "finished");
                        (idx, outcome)
                    }
                    .instrument(span),
                );
            }
        }
    }

    fn complete(&self, slot: &mut Slot, outcome: InstanceOutcome, events: &EventSink) {
        let InstanceOutcome {
            status,
            reason,
            steps,
            outputs,
            artifacts,
            cache,
            warnings,
        } = outcome;
        slot.report.steps = steps;
        slot.report.outputs = outputs;
        slot.report.artifacts = artifacts;
        slot.report.cache = cache;
        slot.report.warnings = warnings;
        self.finish(slot, status, reason, events);
    }

    /// Fail instances left Running without a task
    fn fail_orphans(&self, slots: &mut [Slot], events: &EventSink) -> bool {
        let mut any = false;
        for slot in slots.iter_mut() {
            if slot.state.status == JobStatus::Running {
                self.finish(slot, JobStatus::Failed, Some("job task aborted".to_string()), events);
                any = true;
            }
        }
        any
    }

    fn finish(
        &self,
        slot: &mut Slot,
        status: JobStatus,
        reason: Option<String>,
        events: &EventSink,
    ) {
        self.transition(slot, status, reason, events);
        slot.report.duration_ms = slot.state.duration().as_millis() as u64;
    }

    fn transition(
        &self,
        slot: &mut Slot,
        status: JobStatus,
        reason: Option<String>,
        events: &EventSink,
    ) {
        let now = self.clock.now();
        let result = match &reason {
            Some(reason) => slot.state.transition_with_reason(status, reason.clone(), now),
            None => slot.state.transition(status, now),
        };
        if let Err(e) = result {
            tracing::error!(instance = %slot.plan.id, error = %e, "refused job transition");
            return;
        }
        tracing::debug!(instance = %slot.plan.id, status = %status, "job transition");
        slot.report.status = status;
        slot.report.reason = reason.clone();
        events.emit(RunEvent::JobTransition {
            instance: slot.plan.id.clone(),
            status,
            reason,
        });
    }
}

/// Decide whether the instance at `idx` can run, must wait, or is blocked
fn readiness(slots: &[Slot], idx: usize) -> Readiness {
    let job = &slots[idx].plan.job;
    let mut needs = BTreeMap::new();
    let mut blocked: Option<(JobStatus, String)> = None;
    let mut dependency_failed = false;

    for dep in &job.needs {
        let mut view = NeedsView {
            result: JobStatus::Succeeded,
            outputs: BTreeMap::new(),
        };
        for slot in slots.iter().filter(|s| s.plan.job.name == *dep) {
            match slot.state.status {
                JobStatus::Pending | JobStatus::Running => return Readiness::Waiting,
                JobStatus::Succeeded => {}
                JobStatus::Failed if slot.report.tolerated => {
                    view.result = JobStatus::Failed;
                    dependency_failed = true;
                }
                JobStatus::Failed => {
                    let reason = format!("dependency `{}` failed", dep);
                    blocked.get_or_insert((JobStatus::Skipped, reason));
                }
                JobStatus::Skipped => {
                    let reason = format!("dependency `{}` was skipped", dep);
                    blocked.get_or_insert((JobStatus::Skipped, reason));
                }
                JobStatus::Cancelled => {
                    if !matches!(blocked, Some((JobStatus::Cancelled, _))) {
                        let reason = format!("dependency `{}` was cancelled", dep);
                        blocked = Some((JobStatus::Cancelled, reason));
                    }
                }
            }
            view.outputs.extend(slot.report.outputs.clone());
        }
        needs.insert(dep.clone(), view);
    }

    match blocked {
        Some((status, reason)) => Readiness::Blocked(status, reason),
        None => Readiness::Ready {
            needs,
            dependency_failed,
        },
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
