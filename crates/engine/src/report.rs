// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run report and status aggregation

use chrono::{DateTime, Utc};
use oc_core::{JobStatus, MatrixValues, RunId, RunStatus, StepStatus, TriggerEvent};
use oc_storage::ArtifactHandle;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Cache activity of one instance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheReport {
    pub key: String,
    /// Key of the restored entry, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restored: Option<String>,
    pub exact: bool,
    pub saved: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceReport {
    pub id: String,
    pub job: String,
    #[serde(default, skip_serializing_if = "MatrixValues::is_empty")]
    pub matrix: MatrixValues,
    pub status: JobStatus,
    /// Job is `continue-on-error`; its failure does not fail the run
    #[serde(default)]
    pub tolerated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, String>,
    #[serde(default)]
    pub steps: Vec<StepReport>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<ArtifactHandle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheReport>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl InstanceReport {
    /// An instance that never ran
    pub fn unstarted(id: impl Into<String>, job: impl Into<String>, matrix: MatrixValues) -> Self {
        Self {
            id: id.into(),
            job: job.into(),
            matrix,
            status: JobStatus::Pending,
            tolerated: false,
            reason: None,
            duration_ms: 0,
            outputs: BTreeMap::new(),
            steps: Vec::new(),
            artifacts: Vec::new(),
            cache: None,
            warnings: Vec::new(),
        }
    }

    /// Failed or cancelled without `continue-on-error`
    pub fn fails_run(&self) -> bool {
        !self.tolerated && matches!(self.status, JobStatus::Failed | JobStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: usize,
    pub exact_hits: usize,
    pub misses: usize,
    pub saves: usize,
}

impl CacheStats {
    pub fn collect<'a>(instances: impl IntoIterator<Item = &'a InstanceReport>) -> Self {
        let mut stats = Self::default();
        for cache in instances.into_iter().filter_map(|i| i.cache.as_ref()) {
            match &cache.restored {
                Some(_) => {
                    stats.hits += 1;
                    if cache.exact {
                        stats.exact_hits += 1;
                    }
                }
                None => stats.misses += 1,
            }
            if cache.saved {
                stats.saves += 1;
            }
        }
        stats
    }
}

/// Everything known about a finished run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub workflow: String,
    pub event: TriggerEvent,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub instances: Vec<InstanceReport>,
    pub cache: CacheStats,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl RunReport {
    pub fn count(&self, status: JobStatus) -> usize {
        self.instances.iter().filter(|i| i.status == status).count()
    }

    pub fn instance(&self, id: &str) -> Option<&InstanceReport> {
        self.instances.iter().find(|i| i.id == id)
    }

    pub fn artifacts(&self) -> impl Iterator<Item = &ArtifactHandle> {
        self.instances.iter().flat_map(|i| i.artifacts.iter())
    }
}

/// Overall status: cancelled if the run was cancelled, failed if any
/// instance that is not `continue-on-error` failed or was cancelled.
pub fn aggregate(cancelled: bool, instances: &[InstanceReport]) -> RunStatus {
    if cancelled {
        RunStatus::Cancelled
    } else if instances.iter().any(InstanceReport::fails_run) {
        RunStatus::Failed
    } else {
        RunStatus::Succeeded
    }
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
