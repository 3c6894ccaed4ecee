// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step definitions and action references

use crate::expr::Condition;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;

// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static VERSION_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^v\d+(\.\d+){0,2}$").expect("constant regex pattern is valid")
});

#[allow(clippy::expect_used)]
static COMMIT_SHA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-f]{40}$").expect("constant regex pattern is valid"));

#[allow(clippy::expect_used)]
static ACTION_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("constant regex pattern is valid")
});

/// Refs that move over time and never count as a pin
const FLOATING_REFS: [&str; 4] = ["latest", "main", "master", "HEAD"];

/// Rule for acceptable action refs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinPolicy {
    /// Any non-floating ref
    #[default]
    Explicit,
    /// Version tags or full commit SHAs only
    Strict,
}

impl FromStr for PinPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "explicit" => Ok(PinPolicy::Explicit),
            "strict" => Ok(PinPolicy::Strict),
            other => Err(format!(
                "unknown pin policy: {} (expected explicit or strict)",
                other
            )),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PinError {
    #[error("expected owner/name@ref, got `{0}`")]
    Malformed(String),
    #[error("action `{0}` is not pinned (add @<version>)")]
    Unpinned(String),
    #[error("`{0}` is a floating ref")]
    Floating(String),
    #[error("`{0}` is neither a version tag (v1.2.3) nor a full commit SHA")]
    NotStrict(String),
}

/// A pinned `owner/name@ref` action invocation target
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActionRef {
    pub owner: String,
    pub name: String,
    pub git_ref: String,
}

impl ActionRef {
    pub fn parse(spec: &str, policy: PinPolicy) -> Result<Self, PinError> {
        let spec = spec.trim();
        let Some((path, git_ref)) = spec.split_once('@') else {
            return Err(PinError::Unpinned(spec.to_string()));
        };
        let Some((owner, name)) = path.split_once('/') else {
            return Err(PinError::Malformed(spec.to_string()));
        };
        if !ACTION_SEGMENT.is_match(owner) || !ACTION_SEGMENT.is_match(name) {
            return Err(PinError::Malformed(spec.to_string()));
        }
        if git_ref.is_empty() {
            return Err(PinError::Unpinned(spec.to_string()));
        }
        if FLOATING_REFS.contains(&git_ref) {
            return Err(PinError::Floating(git_ref.to_string()));
        }
        if git_ref.contains('/') || git_ref.contains("..") || git_ref.contains(char::is_whitespace)
        {
            return Err(PinError::Malformed(spec.to_string()));
        }
        if policy == PinPolicy::Strict
            && !VERSION_TAG.is_match(git_ref)
            && !COMMIT_SHA.is_match(git_ref)
        {
            return Err(PinError::NotStrict(git_ref.to_string()));
        }
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
            git_ref: git_ref.to_string(),
        })
    }
}

impl fmt::Display for ActionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.owner, self.name, self.git_ref)
    }
}

/// What a step executes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepKind {
    /// Inline shell command
    Run { command: String },
    /// Pinned action with string inputs
    Uses {
        action: ActionRef,
        inputs: BTreeMap<String, String>,
    },
}

/// One `[[job.<name>.step]]` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDef {
    pub id: Option<String>,
    pub name: Option<String>,
    pub kind: StepKind,
    pub condition: Option<Condition>,
    pub continue_on_error: bool,
    pub timeout: Option<Duration>,
    pub env: BTreeMap<String, String>,
    /// Output names captured from `OC_OUTPUT`
    pub outputs: Vec<String>,
}

impl StepDef {
    pub fn run(command: impl Into<String>) -> Self {
        Self::with_kind(StepKind::Run {
            command: command.into(),
        })
    }

    pub fn uses(action: ActionRef) -> Self {
        Self::with_kind(StepKind::Uses {
            action,
            inputs: BTreeMap::new(),
        })
    }

    fn with_kind(kind: StepKind) -> Self {
        Self {
            id: None,
            name: None,
            kind,
            condition: None,
            continue_on_error: false,
            timeout: None,
            env: BTreeMap::new(),
            outputs: Vec::new(),
        }
    }

    /// Name used in logs and reports: name, then id, then the command or action
    pub fn display_name(&self, index: usize) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        if let Some(id) = &self.id {
            return id.clone();
        }
        match &self.kind {
            StepKind::Run { command } => {
                let first = command.lines().next().unwrap_or("").trim();
                if first.is_empty() {
                    format!("step {}", index + 1)
                } else if first.chars().count() > 40 {
                    format!("{}...", first.chars().take(40).collect::<String>())
                } else {
                    first.to_string()
                }
            }
            StepKind::Uses { action, .. } => action.to_string(),
        }
    }
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
