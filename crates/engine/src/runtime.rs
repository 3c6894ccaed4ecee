// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Entry point that takes one workflow run from trigger to report

use crate::config::EngineConfig;
use crate::context::RunContext;
use crate::error::EngineError;
use crate::events::spawn_journal_writer;
use crate::executor::StepExecutor;
use crate::notifier;
use crate::plan::RunPlan;
use crate::report::{aggregate, CacheStats, RunReport};
use crate::scheduler::Scheduler;
use oc_adapters::{CommandRunner, NotifyAdapter};
use oc_core::{Clock, IdGen, RunEvent, SecretStore, TriggerEvent};
use oc_storage::{PruneStats, RunHistory, Store};
use oc_workflow::Workflow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Engine adapter dependencies
pub struct EngineDeps<R, N> {
    pub runner: R,
    pub notifier: N,
}

/// What to run a workflow for
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub event: TriggerEvent,
    pub secrets: SecretStore,
    /// Project checkout exported to steps as `OC_SOURCE`
    pub source_dir: PathBuf,
}

/// Removed by [`Engine::prune`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneSummary {
    pub store: PruneStats,
    pub runs: usize,
}

/// Runs workflows against a state directory
pub struct Engine<R, N, C: Clock, I: IdGen> {
    runner: R,
    notifier: N,
    clock: C,
    id_gen: I,
    config: Arc<EngineConfig>,
    state_dir: PathBuf,
}

impl<R, N, C, I> Engine<R, N, C, I>
where
    R: CommandRunner,
    N: NotifyAdapter,
    C: Clock + 'static,
    I: IdGen,
{
    pub fn new(
        deps: EngineDeps<R, N>,
        clock: C,
        id_gen: I,
        config: EngineConfig,
        state_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            runner: deps.runner,
            notifier: deps.notifier,
            clock,
            id_gen,
            config: Arc::new(config),
            state_dir: state_dir.into(),
        }
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    pub fn history(&self) -> RunHistory {
        RunHistory::new(&self.state_dir)
    }

    fn store(&self) -> Result<Store, EngineError> {
        Ok(Store::open(self.state_dir.join("store"))?)
    }

    /// Run `workflow` for `request` until every instance is terminal.
    ///
    /// Parse, graph and trigger problems are errors; everything that
    /// happens once jobs start is reported in the returned [`RunReport`].
    pub async fn run(
        &self,
        workflow: &Workflow,
        request: RunRequest,
        cancel: CancellationToken,
    ) -> Result<RunReport, EngineError> {
        if !workflow.triggered_by(&request.event) {
            return Err(EngineError::NotTriggered {
                workflow: workflow.name.clone(),
                event: request.event,
            });
        }
        let plan = RunPlan::build(workflow)?;
        let store = Arc::new(self.store()?);

        let run_id = self.id_gen.next();
        let history = self.history();
        let journal = history.create(&run_id)?;
        let started_at = self.clock.now();
        let (events, writer) = spawn_journal_writer(journal, self.clock.clone());
        events.emit(RunEvent::RunStarted {
            run_id: run_id.clone(),
            workflow: workflow.name.clone(),
            event: request.event.clone(),
        });

        let ctx = Arc::new(
            RunContext::new(
                run_id.clone(),
                workflow.name.clone(),
                request.event.clone(),
                request.secrets,
                request.source_dir,
                history.run_dir(&run_id),
            )
            .with_env(workflow.env.clone()),
        );
        let executor = Arc::new(StepExecutor::new(
            self.runner.clone(),
            store,
            self.clock.clone(),
            Arc::clone(&self.config),
        ));
        let scheduler = Scheduler::new(executor, self.clock.clone(), Arc::clone(&self.config));

        let span = tracing::info_span!("run", run_id = %run_id, workflow = %workflow.name);
        let start = std::time::Instant::now();
        let instances = scheduler
            .run(Arc::clone(&ctx), workflow, &plan, &events, &cancel)
            .instrument(span)
            .await;

        let status = aggregate(cancel.is_cancelled(), &instances);
        let finished_at = self.clock.now();
        let mut report = RunReport {
            run_id: run_id.clone(),
            workflow: workflow.name.clone(),
            event: request.event,
            status,
            started_at,
            finished_at,
            duration_ms: start.elapsed().as_millis() as u64,
            cache: CacheStats::collect(&instances),
            instances,
            warnings: Vec::new(),
        };
        tracing::info!(
            run_id = %run_id,
            status = %status,
            elapsed_ms = report.duration_ms,
            "run finished"
        );

        let warnings = notifier::notify(
            &self.notifier,
            workflow.sinks_for(status),
            &report,
            self.config.notify_timeout,
        )
        .await;
        report.warnings.extend(warnings);

        events.emit(RunEvent::RunFinished { status });
        drop(events);
        match writer.await {
            Ok(stats) if stats.failed > 0 => report
                .warnings
                .push(format!("{} journal entries could not be written", stats.failed)),
            Ok(_) => {}
            Err(e) => report.warnings.push(format!("journal writer failed: {}", e)),
        }

        if let Err(e) = history.write_report(&run_id, &report) {
            tracing::warn!(run_id = %run_id, error = %e, "failed to write report");
            report.warnings.push(format!("report not saved: {}", e));
        }
        Ok(report)
    }

    /// Drop expired artifacts and finished runs older than `keep`
    pub fn prune(&self, keep: Duration) -> Result<PruneSummary, EngineError> {
        let store = self.store()?.prune_expired(&self.clock)?;
        let keep = chrono::Duration::from_std(keep).unwrap_or(chrono::Duration::MAX);
        let cutoff = self
            .clock
            .now()
            .checked_sub_signed(keep)
            .unwrap_or(chrono::DateTime::<chrono::Utc>::MIN_UTC);
        let runs = self.history().prune_finished(cutoff)?;
        Ok(PruneSummary { store, runs })
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
