// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parsed workflow definition

use crate::job::JobDef;
use crate::trigger::Trigger;
use oc_core::{RunStatus, TriggerEvent};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// When a notification sink fires
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyWhen {
    #[default]
    Always,
    Success,
    Failure,
}

impl NotifyWhen {
    /// Failure covers both failed and cancelled runs
    pub fn matches(self, status: RunStatus) -> bool {
        match self {
            NotifyWhen::Always => true,
            NotifyWhen::Success => status == RunStatus::Succeeded,
            NotifyWhen::Failure => status != RunStatus::Succeeded,
        }
    }
}

/// One `[[notify]]` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifySink {
    pub url: String,
    pub when: NotifyWhen,
}

/// A parsed workflow. Immutable once built by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workflow {
    pub name: String,
    pub triggers: Vec<Trigger>,
    pub env: BTreeMap<String, String>,
    /// Jobs in declaration order
    pub jobs: Vec<JobDef>,
    pub notify: Vec<NotifySink>,
}

impl Workflow {
    pub fn get_job(&self, name: &str) -> Option<&JobDef> {
        self.jobs.iter().find(|j| j.name == name)
    }

    pub fn job_names(&self) -> impl Iterator<Item = &str> {
        self.jobs.iter().map(|j| j.name.as_str())
    }

    /// True if any trigger predicate accepts the event
    pub fn triggered_by(&self, event: &TriggerEvent) -> bool {
        self.triggers.iter().any(|t| t.matches(event))
    }

    /// Sinks that should receive a notification for this outcome
    pub fn sinks_for(&self, status: RunStatus) -> impl Iterator<Item = &NotifySink> {
        self.notify.iter().filter(move |s| s.when.matches(status))
    }
}
