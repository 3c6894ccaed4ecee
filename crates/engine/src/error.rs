// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine

use oc_core::TriggerEvent;
use oc_storage::{JournalError, StoreError};
use oc_workflow::{GraphError, ParseError};
use std::time::Duration;
use thiserror::Error;

/// Errors that stop a run before or around job execution
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error("workflow `{workflow}` is not triggered by {event}")]
    NotTriggered { workflow: String, event: TriggerEvent },
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("journal error: {0}")]
    Journal(#[from] JournalError),
    #[error("failed to prepare {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Why a step did not succeed
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StepFailure {
    #[error("exit code {0}")]
    NonZeroExit(i32),
    #[error("timed out after {}", humantime_secs(*.0))]
    TimedOut(Duration),
    #[error("runner error: {0}")]
    Runner(String),
    #[error("permission denied: {0}")]
    Permission(String),
    #[error("{0}")]
    Template(String),
}

/// Cache or artifact operations that degraded to a warning
#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("timed out after {}", humantime_secs(*.0))]
    Timeout(Duration),
    #[error("missing permission {0}")]
    Denied(&'static str),
    #[error("store task failed: {0}")]
    Task(String),
    #[error("{0}")]
    Template(String),
}

fn humantime_secs(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs == 0 {
        format!("{}ms", duration.as_millis())
    } else if secs % 3600 == 0 {
        format!("{}h", secs / 3600)
    } else if secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}
