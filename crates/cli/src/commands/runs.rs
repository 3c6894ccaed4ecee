// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oc runs` - List recorded runs

use crate::output::{self, OutputFormat};
use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use oc_engine::EngineConfig;
use oc_storage::{RunHistory, RunRecord};
use serde::Serialize;
use std::fmt;
use std::path::Path;

#[derive(Args)]
pub struct RunsArgs {
    /// Show only the newest N runs
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Print runs as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct RunInfo {
    id: String,
    workflow: String,
    event: String,
    status: String,
    started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    finished_at: Option<DateTime<Utc>>,
}

impl From<RunRecord> for RunInfo {
    fn from(record: RunRecord) -> Self {
        Self {
            id: record.run_id.to_string(),
            workflow: record.workflow,
            event: format!("{} {}", record.event.kind, record.event.git_ref),
            status: match record.status {
                Some(status) => status.to_string(),
                None => "unfinished".to_string(),
            },
            started_at: record.started_at,
            finished_at: record.finished_at,
        }
    }
}

impl fmt::Display for RunInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short: String = self.id.chars().take(8).collect();
        write!(
            f,
            "{:<10} {:<16} {:<20} {:<11} {}",
            short,
            self.workflow,
            self.event,
            self.status,
            self.started_at.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

pub fn runs(root: &Path, args: RunsArgs) -> Result<()> {
    let config = EngineConfig::load(root)?;
    let history = RunHistory::new(&config.resolve_state_dir()?);

    // Newest first
    let mut infos: Vec<RunInfo> = history.list()?.into_iter().rev().map(RunInfo::from).collect();
    if let Some(limit) = args.limit {
        infos.truncate(limit);
    }

    let header = format!(
        "{:<10} {:<16} {:<20} {:<11} STARTED",
        "ID", "WORKFLOW", "EVENT", "STATUS"
    );
    output::print_list(
        &infos,
        &header,
        "No runs",
        OutputFormat::from_json_flag(args.json),
    )
}
