// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oc show` - Print a stored run report

use crate::error::CliError;
use crate::output::{self, OutputFormat};
use crate::render::ReportView;
use anyhow::Result;
use clap::Args;
use oc_core::{RunEvent, RunId};
use oc_engine::{EngineConfig, RunReport};
use oc_storage::{JournalEntry, RunHistory, StoreError};
use std::fmt;
use std::path::Path;

#[derive(Args)]
pub struct ShowArgs {
    /// Run id or a unique prefix of it
    pub id: String,

    /// Print the event journal instead of the report
    #[arg(long)]
    pub events: bool,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn show(root: &Path, args: ShowArgs) -> Result<()> {
    let config = EngineConfig::load(root)?;
    let history = RunHistory::new(&config.resolve_state_dir()?);
    let run_id = resolve(&history, &args.id)?;
    let format = OutputFormat::from_json_flag(args.json);

    if args.events {
        let entries = history.read_journal(&run_id)?;
        let text = JournalView(&entries);
        return output::print(&entries, text, format);
    }

    let report: RunReport = match history.read_report(&run_id) {
        Ok(report) => report,
        Err(StoreError::NotFound(_)) => {
            return Err(CliError::new(format!("run `{}` has no report", run_id))
                .with_context("The run is still in progress or was interrupted")
                .with_suggestion(format!("Inspect its journal: oc show {} --events", run_id))
                .into())
        }
        Err(e) => return Err(e.into()),
    };
    output::print(&report, ReportView::detailed(&report), format)
}

fn resolve(history: &RunHistory, id: &str) -> Result<RunId> {
    match history.resolve(id) {
        Ok(run_id) => Ok(run_id),
        Err(StoreError::NotFound(_)) => Err(CliError::run_not_found(id).into()),
        Err(StoreError::Ambiguous { prefix, count }) => {
            Err(CliError::ambiguous_run(&prefix, count).into())
        }
        Err(e) => Err(e.into()),
    }
}

struct JournalView<'a>(&'a [JournalEntry]);

impl fmt::Display for JournalView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in self.0 {
            write!(f, "{:>4} {} ", entry.seq, entry.at.format("%H:%M:%S%.3f"))?;
            match &entry.event {
                RunEvent::RunStarted {
                    workflow, event, ..
                } => writeln!(f, "run started: {} ({})", workflow, event)?,
                RunEvent::JobTransition {
                    instance,
                    status,
                    reason,
                } => match reason {
                    Some(reason) => writeln!(f, "{} -> {}: {}", instance, status, reason)?,
                    None => writeln!(f, "{} -> {}", instance, status)?,
                },
                RunEvent::StepFinished {
                    instance,
                    step,
                    status,
                    exit_code,
                } => match exit_code {
                    Some(code) => {
                        writeln!(f, "{} / {}: {} (exit {})", instance, step, status, code)?
                    }
                    None => writeln!(f, "{} / {}: {}", instance, step, status)?,
                },
                RunEvent::RunFinished { status } => writeln!(f, "run finished: {}", status)?,
            }
        }
        Ok(())
    }
}
