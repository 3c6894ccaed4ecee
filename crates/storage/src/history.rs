// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Past runs under `<state>/runs/<run_id>/`

use crate::error::{IoContext, StoreError};
use crate::journal::{Journal, JournalError};
use chrono::{DateTime, Utc};
use oc_core::{RunEvent, RunId, RunStatus, TriggerEvent};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const JOURNAL_FILE: &str = "events.jsonl";
const REPORT_FILE: &str = "report.json";

/// Summary of one past run, rebuilt from its journal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRecord {
    pub run_id: RunId,
    pub workflow: String,
    pub event: TriggerEvent,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// None while the run is in progress or if it was interrupted
    pub status: Option<RunStatus>,
}

/// Directory of run journals and reports
#[derive(Debug, Clone)]
pub struct RunHistory {
    root: PathBuf,
}

impl RunHistory {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            root: state_dir.join("runs"),
        }
    }

    pub fn run_dir(&self, run_id: &RunId) -> PathBuf {
        self.root.join(run_id.as_str())
    }

    /// Create the run directory and open its journal
    pub fn create(&self, run_id: &RunId) -> Result<Journal, JournalError> {
        let dir = self.run_dir(run_id);
        fs::create_dir_all(&dir)?;
        Journal::open(&dir.join(JOURNAL_FILE))
    }

    pub fn write_report<T: Serialize>(&self, run_id: &RunId, report: &T) -> Result<(), StoreError> {
        let dir = self.run_dir(run_id);
        fs::create_dir_all(&dir).at(&dir)?;
        let path = dir.join(REPORT_FILE);
        let tmp = dir.join(format!("{}.tmp", REPORT_FILE));
        fs::write(&tmp, serde_json::to_vec_pretty(report)?).at(&tmp)?;
        fs::rename(&tmp, &path).at(&path)
    }

    pub fn read_report<T: DeserializeOwned>(&self, run_id: &RunId) -> Result<T, StoreError> {
        let path = self.run_dir(run_id).join(REPORT_FILE);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(format!("report for run {}", run_id)))
            }
            Err(e) => return Err(StoreError::Io { path, source: e }),
        };
        Ok(serde_json::from_str(&content)?)
    }

    pub fn read_journal(&self, run_id: &RunId) -> Result<Vec<crate::JournalEntry>, StoreError> {
        let path = self.run_dir(run_id).join(JOURNAL_FILE);
        match Journal::read(&path) {
            Ok(read) => Ok(read.entries),
            Err(JournalError::Io(source)) => Err(StoreError::Io { path, source }),
            Err(JournalError::Json(e)) => Err(StoreError::Json(e)),
        }
    }

    /// Every run with a readable journal, oldest first
    pub fn list(&self) -> Result<Vec<RunRecord>, StoreError> {
        let read = match fs::read_dir(&self.root) {
            Ok(read) => read,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StoreError::Io {
                    path: self.root.clone(),
                    source: e,
                })
            }
        };

        let mut records = Vec::new();
        for entry in read.filter_map(Result::ok) {
            if !entry.path().is_dir() {
                continue;
            }
            let run_id = RunId::new(entry.file_name().to_string_lossy());
            if let Some(record) = self.record(&run_id)? {
                records.push(record);
            }
        }
        records.sort_by(|a, b| {
            a.started_at
                .cmp(&b.started_at)
                .then_with(|| a.run_id.cmp(&b.run_id))
        });
        Ok(records)
    }

    /// Rebuild a run's summary from its journal
    pub fn record(&self, run_id: &RunId) -> Result<Option<RunRecord>, StoreError> {
        let entries = self.read_journal(run_id)?;
        let mut record: Option<RunRecord> = None;
        for entry in entries {
            match entry.event {
                RunEvent::RunStarted {
                    run_id,
                    workflow,
                    event,
                } => {
                    record = Some(RunRecord {
                        run_id,
                        workflow,
                        event,
                        started_at: entry.at,
                        finished_at: None,
                        status: None,
                    });
                }
                RunEvent::RunFinished { status } => {
                    if let Some(record) = record.as_mut() {
                        record.status = Some(status);
                        record.finished_at = Some(entry.at);
                    }
                }
                _ => {}
            }
        }
        Ok(record)
    }

    /// Resolve a run id or unique prefix
    pub fn resolve(&self, id_or_prefix: &str) -> Result<RunId, StoreError> {
        let exact = RunId::new(id_or_prefix);
        if self.run_dir(&exact).is_dir() && !id_or_prefix.is_empty() {
            return Ok(exact);
        }
        let matches: Vec<RunRecord> = self
            .list()?
            .into_iter()
            .filter(|r| r.run_id.as_str().starts_with(id_or_prefix))
            .collect();
        match matches.len() {
            0 => Err(StoreError::NotFound(format!("run {}", id_or_prefix))),
            1 => Ok(matches[0].run_id.clone()),
            count => Err(StoreError::Ambiguous {
                prefix: id_or_prefix.to_string(),
                count,
            }),
        }
    }

    /// Delete finished runs that ended before `cutoff`
    pub fn prune_finished(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut removed = 0;
        for record in self.list()? {
            let Some(finished_at) = record.finished_at else {
                continue;
            };
            if finished_at < cutoff {
                let dir = self.run_dir(&record.run_id);
                fs::remove_dir_all(&dir).at(&dir)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
#[path = "history_tests.rs"]
mod tests;
