// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trigger events and run lifecycle events

use crate::{JobStatus, RunId, RunStatus, StepStatus};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Kind of source-control event that can trigger a workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Push,
    PullRequest,
    Tag,
    Manual,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::Push,
        EventKind::PullRequest,
        EventKind::Tag,
        EventKind::Manual,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Push => "push",
            EventKind::PullRequest => "pull_request",
            EventKind::Tag => "tag",
            EventKind::Manual => "manual",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown event kind: {0} (expected push, pull_request, tag or manual)")]
pub struct UnknownEventKind(pub String);

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "push" => Ok(EventKind::Push),
            "pull_request" | "pull-request" => Ok(EventKind::PullRequest),
            "tag" => Ok(EventKind::Tag),
            "manual" => Ok(EventKind::Manual),
            other => Err(UnknownEventKind(other.to_string())),
        }
    }
}

/// The event a run was started for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub kind: EventKind,
    /// Branch name (push, pull_request target, manual) or tag name (tag)
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub actor: String,
}

impl TriggerEvent {
    pub fn new(kind: EventKind, git_ref: impl Into<String>, actor: impl Into<String>) -> Self {
        Self {
            kind,
            git_ref: git_ref.into(),
            actor: actor.into(),
        }
    }

    pub fn push(branch: impl Into<String>) -> Self {
        Self::new(EventKind::Push, branch, "local")
    }
}

impl fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {} by {}", self.kind, self.git_ref, self.actor)
    }
}

/// Lifecycle events recorded in a run's journal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    RunStarted {
        run_id: RunId,
        workflow: String,
        event: TriggerEvent,
    },
    JobTransition {
        instance: String,
        status: JobStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    StepFinished {
        instance: String,
        step: String,
        status: StepStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
    },
    RunFinished {
        status: RunStatus,
    },
}

impl RunEvent {
    pub fn name(&self) -> &'static str {
        match self {
            RunEvent::RunStarted { .. } => "run:started",
            RunEvent::JobTransition { .. } => "job:transition",
            RunEvent::StepFinished { .. } => "step:finished",
            RunEvent::RunFinished { .. } => "run:finished",
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
